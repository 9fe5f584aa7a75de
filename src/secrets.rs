use std::collections::HashMap;
use std::env;
use tracing::info;

/// Load secrets from AWS Secrets Manager and set them as environment variables
///
/// If NFT_SERVER_SECRETS_ARN is set, it:
/// 1. Fetches the secret from AWS Secrets Manager
/// 2. Parses the JSON secret string
/// 3. Sets all key-value pairs as environment variables
///
/// Called once at startup, before the server config is read.
pub async fn load_secrets_from_manager() -> Result<(), Box<dyn std::error::Error>> {
    let secret_arn = match env::var("NFT_SERVER_SECRETS_ARN") {
        Ok(arn) => arn,
        Err(_) => {
            info!("NFT_SERVER_SECRETS_ARN not set, skipping secrets loading");
            return Ok(());
        }
    };

    info!("Loading secrets from AWS Secrets Manager: {}", secret_arn);

    let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let client = aws_sdk_secretsmanager::Client::new(&config);

    let response = client
        .get_secret_value()
        .secret_id(&secret_arn)
        .send()
        .await
        .map_err(|e| format!("Failed to fetch secret from Secrets Manager: {}", e))?;

    let secret_string = response
        .secret_string()
        .ok_or("Secret does not contain a string value")?;

    let secrets = parse_secret_string(secret_string)?;
    info!("Loaded {} secrets from Secrets Manager", secrets.len());

    // Runs during startup, before any handler reads the environment
    for (key, value) in secrets {
        env::set_var(&key, &value);
        info!("Set environment variable: {}", key);
    }

    Ok(())
}

/// Secrets are stored as a flat JSON object of string values
pub fn parse_secret_string(secret_string: &str) -> Result<HashMap<String, String>, String> {
    serde_json::from_str(secret_string).map_err(|e| format!("Failed to parse secret JSON: {}", e))
}

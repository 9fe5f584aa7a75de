use std::env;
use std::path::PathBuf;
use std::str::FromStr;

/// Where tokens and achievements are persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            other => Err(ConfigError::Invalid {
                name: "STORE_BACKEND",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Server settings read from the environment after secrets are loaded
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub store_backend: StoreBackend,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub jwt_secret: String,
    pub session_idle_timeout_secs: i64,
    pub rules_path: Option<PathBuf>,
    pub image_base_uri: String,
}

fn parsed<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.trim().parse::<T>().map_err(|_| ConfigError::Invalid { name, value: raw }),
        Err(_) => Ok(default),
    }
}

fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let store_backend = parsed("STORE_BACKEND", StoreBackend::Postgres)?;

        let database_url = optional("DATABASE_URL");
        if store_backend == StoreBackend::Postgres && database_url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }

        // Secrets Manager values can arrive JSON-quoted
        let jwt_secret = optional("JWT_SECRET")
            .map(|secret| secret.trim_matches('"').to_string())
            .ok_or(ConfigError::Missing("JWT_SECRET"))?;

        let session_idle_timeout_secs = parsed("SESSION_IDLE_TIMEOUT_SECS", 86_400_i64)?;
        if session_idle_timeout_secs <= 0 {
            return Err(ConfigError::Invalid {
                name: "SESSION_IDLE_TIMEOUT_SECS",
                value: session_idle_timeout_secs.to_string(),
            });
        }

        Ok(Self {
            port: parsed("PORT", 3000)?,
            store_backend,
            database_url,
            db_max_connections: parsed("DB_MAX_CONNECTIONS", 5)?,
            jwt_secret,
            session_idle_timeout_secs,
            rules_path: optional("RULES_PATH").map(PathBuf::from),
            image_base_uri: optional("METADATA_IMAGE_BASE_URI")
                .unwrap_or_else(|| "ipfs://academic-nft".to_string()),
        })
    }
}

use rand::Rng;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::{info, warn};

use crate::db::errors::{DatabaseError, Result, Retryable};

/// Create the connection pool used by the Postgres token store
pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<PgPool> {
    info!("Creating database connection pool");

    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(3))
        .idle_timeout(Duration::from_secs(60))
        .max_lifetime(Duration::from_secs(1800))
        .connect(database_url)
        .await
        .map_err(|e| DatabaseError::ConnectionError(format!("Failed to create pool: {}", e)))?;

    info!("Database connection pool created successfully");
    Ok(pool)
}

/// Apply the embedded schema migrations
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    info!("Database migrations applied");
    Ok(())
}

/// Health check for the database connection
pub async fn health_check(pool: &PgPool) -> Result<()> {
    sqlx::query("SELECT 1")
        .fetch_one(pool)
        .await
        .map_err(DatabaseError::QueryError)?;

    Ok(())
}

/// Execute an operation, retrying transient failures with exponential backoff.
///
/// The operation is re-run from scratch on each attempt, so it must re-read
/// whatever state it depends on.
pub async fn with_retry<F, Fut, T, E>(
    max_attempts: u8,
    mut operation: F,
) -> std::result::Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = std::result::Result<T, E>>,
    E: Retryable + std::fmt::Display,
{
    let mut attempt = 0;

    loop {
        attempt += 1;

        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) if !e.is_retryable() => return Err(e),
            Err(_) if attempt >= max_attempts => {
                return Err(E::retry_limit_exceeded(max_attempts));
            }
            Err(e) => {
                warn!(
                    attempt = attempt,
                    max_attempts = max_attempts,
                    error = %e,
                    "Retryable error occurred, retrying..."
                );

                // Exponential backoff capped at 1 second, plus 0-50ms jitter
                let delay_ms = (50 * 2_u64.pow(attempt as u32 - 1)).min(1000)
                    + rand::thread_rng().gen_range(0..50);

                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
        }
    }
}

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Database connection error: {0}")]
    ConnectionError(String),

    #[error("Query execution error: {0}")]
    QueryError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    #[error("Integrity constraint violation: {0}")]
    IntegrityError(String),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Stale write on token {id}: expected version {expected_version}")]
    StaleWrite { id: i64, expected_version: i64 },

    #[error("Retry limit exceeded after {attempts} attempts")]
    RetryLimitExceeded { attempts: u8 },
}

/// Errors that `with_retry` knows how to classify
pub trait Retryable {
    fn is_retryable(&self) -> bool;

    /// Error reported once every attempt has failed with a retryable error
    fn retry_limit_exceeded(attempts: u8) -> Self;
}

impl DatabaseError {
    /// Check if this is an integrity constraint violation
    pub fn is_integrity_error(&self) -> bool {
        match self {
            Self::IntegrityError(_) => true,
            Self::QueryError(e) => {
                if let Some(db_error) = e.as_database_error() {
                    // PostgreSQL integrity constraint violation codes
                    matches!(db_error.code().as_deref(),
                        Some("23505") | // unique_violation
                        Some("23503") | // foreign_key_violation
                        Some("23502") | // not_null_violation
                        Some("23514")   // check_violation
                    )
                } else {
                    false
                }
            }
            _ => false,
        }
    }
}

impl Retryable for DatabaseError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::StaleWrite { .. } => true,
            Self::QueryError(e) => {
                // Transient errors like deadlocks or serialization failures
                if let Some(db_error) = e.as_database_error() {
                    matches!(db_error.code().as_deref(),
                        Some("40001") | // serialization_failure
                        Some("40P01")   // deadlock_detected
                    )
                } else {
                    matches!(e, sqlx::Error::PoolTimedOut | sqlx::Error::Io(_))
                }
            }
            Self::ConnectionError(_) => true,
            _ => false,
        }
    }

    fn retry_limit_exceeded(attempts: u8) -> Self {
        Self::RetryLimitExceeded { attempts }
    }
}

pub type Result<T> = std::result::Result<T, DatabaseError>;

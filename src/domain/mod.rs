// Domain layer - the evolution engine with no HTTP concerns.
// Pure transitions live next to the async service functions that load,
// apply and persist them through a TokenStore.

pub mod achievements;
pub mod evolution;
pub mod metadata;
pub mod points;
pub mod stacking;

use crate::db::{DatabaseError, Retryable};

// Domain error type - no HTTP concerns
#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Insufficient points: {required} required, {current} available")]
    InsufficientPoints { required: i64, current: i64 },

    #[error("Maximum level reached: token is already at level {level}")]
    MaxLevelReached { level: i32 },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Concurrent update: {0}")]
    ConcurrentUpdate(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<DatabaseError> for DomainError {
    fn from(e: DatabaseError) -> Self {
        match e {
            DatabaseError::NotFound(what) => DomainError::NotFound(what),
            DatabaseError::StaleWrite { .. } => DomainError::ConcurrentUpdate(e.to_string()),
            DatabaseError::IntegrityError(msg) => DomainError::Conflict(msg),
            DatabaseError::InvalidData(msg) => DomainError::Internal(msg),
            other => DomainError::Database(other.to_string()),
        }
    }
}

impl Retryable for DomainError {
    fn is_retryable(&self) -> bool {
        matches!(self, DomainError::ConcurrentUpdate(_))
    }

    fn retry_limit_exceeded(attempts: u8) -> Self {
        DomainError::ConcurrentUpdate(format!("Retry limit exceeded after {} attempts", attempts))
    }
}

/// Attempts for load-compute-swap loops before giving up
pub const MAX_UPDATE_ATTEMPTS: u8 = 3;

// Re-export commonly used types and functions
pub use achievements::{submit_achievement, verify_achievement, RecommendedAction, VerificationSignal};
pub use evolution::{add_points, award_points, evolve, evolve_token, EvolutionOutcome, PointsAward};
pub use metadata::{metadata_for_achievement, project_metadata, MetadataAttribute, TokenMetadata};
pub use points::{compute_initial_points, gpa_points, PointFactors};
pub use stacking::{
    create_composite, find_stacking_opportunities, mint_composite,
    stacking_opportunities_for_owner, CompositeDraft, StackingOpportunity,
};

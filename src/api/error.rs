use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::fmt;

use crate::db::DatabaseError;
use crate::domain::DomainError;

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unauthorized(String),
    Forbidden(String),
    NotFound(String),
    Conflict(String),
    InsufficientPoints { required: i64, current: i64 },
    MaxLevelReached(String),
    Internal(String),
    Database(String),
    Validation(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            ApiError::InsufficientPoints { required, current } => {
                write!(f, "Insufficient points: {} required, {} available", required, current)
            }
            ApiError::MaxLevelReached(msg) => write!(f, "Maximum level reached: {}", msg),
            ApiError::Internal(msg) => write!(f, "Internal error: {}", msg),
            ApiError::Database(msg) => write!(f, "Database error: {}", msg),
            ApiError::Validation(msg) => write!(f, "Validation error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    required: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    current: Option<i64>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut points = None;
        let (status, error_type, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg),
            ApiError::InsufficientPoints { required, current } => {
                points = Some((required, current));
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "insufficient_points",
                    format!("{} points required, {} available", required, current),
                )
            }
            ApiError::MaxLevelReached(msg) => (StatusCode::CONFLICT, "max_level_reached", msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg),
            ApiError::Database(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "database_error", msg),
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, "validation_error", msg),
        };

        if status.is_server_error() {
            tracing::error!(error = error_type, "{}", message);
        }

        let body = Json(ErrorResponse {
            error: error_type.to_string(),
            message,
            required: points.map(|(required, _)| required),
            current: points.map(|(_, current)| current),
        });

        (status, body).into_response()
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(msg) => ApiError::Validation(msg),
            DomainError::InsufficientPoints { required, current } => {
                ApiError::InsufficientPoints { required, current }
            }
            DomainError::MaxLevelReached { level } => {
                ApiError::MaxLevelReached(format!("token is already at level {}", level))
            }
            DomainError::NotFound(msg) => ApiError::NotFound(msg),
            DomainError::Conflict(msg) => ApiError::Conflict(msg),
            DomainError::ConcurrentUpdate(msg) => ApiError::Conflict(msg),
            DomainError::Database(msg) => ApiError::Database(msg),
            DomainError::Internal(msg) => ApiError::Internal(msg),
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        ApiError::Database(err.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Internal(format!("JSON error: {}", err))
    }
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound(msg) => ApiError::NotFound(msg),
            DatabaseError::IntegrityError(msg) => ApiError::Conflict(msg),
            DatabaseError::StaleWrite { .. } => ApiError::Conflict(err.to_string()),
            DatabaseError::ConnectionError(msg) => ApiError::Database(msg),
            DatabaseError::QueryError(e) => ApiError::Database(e.to_string()),
            DatabaseError::MigrationError(e) => ApiError::Database(e.to_string()),
            DatabaseError::InvalidData(msg) => ApiError::Internal(msg),
            DatabaseError::RetryLimitExceeded { attempts } => {
                ApiError::Database(format!("Retry limit exceeded after {} attempts", attempts))
            }
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

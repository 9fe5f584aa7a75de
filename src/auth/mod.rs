pub mod jwt;
pub mod session;

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use chrono::{DateTime, Utc};

use crate::api::error::ApiError;
use crate::api::state::AppState;

pub use jwt::{extract_jwt_from_header, validate_jwt, Claims};
pub use session::{InMemorySessionStore, Session, SessionError, SessionStore};

/// Caller identity resolved from a bearer token and a live session
#[derive(Debug, Clone, PartialEq)]
pub struct AuthenticatedOwner {
    pub owner_id: String,
    pub session_id: String,
    pub expires_at: DateTime<Utc>,
}

impl FromRequestParts<AppState> for AuthenticatedOwner {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok());
        let token = extract_jwt_from_header(header)?;
        let claims = validate_jwt(token, &state.jwt_secret)?;
        let expires_at = DateTime::<Utc>::from_timestamp(claims.exp, 0)
            .ok_or_else(|| ApiError::Unauthorized("JWT expiry is out of range".to_string()))?;

        state
            .sessions
            .touch(&claims.sid, &claims.sub, expires_at)
            .await
            .map_err(|e| {
                tracing::info!("Rejected session: {}", e);
                ApiError::Unauthorized(e.to_string())
            })?;

        Ok(Self {
            owner_id: claims.sub,
            session_id: claims.sid,
            expires_at,
        })
    }
}

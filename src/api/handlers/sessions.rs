use axum::{extract::State, Json};
use tracing::info;

use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::auth::{AuthenticatedOwner, SessionStore};
use crate::models::LogoutResponse;

/// Revoke the session behind the caller's bearer token
#[tracing::instrument(skip(state), fields(owner_id = %owner.owner_id))]
pub async fn logout_handler(
    State(state): State<AppState>,
    owner: AuthenticatedOwner,
) -> ApiResult<Json<LogoutResponse>> {
    let session = state
        .sessions
        .revoke(&owner.session_id, &owner.owner_id, owner.expires_at)
        .await
        .map_err(|e| ApiError::Unauthorized(e.to_string()))?;

    info!(session_id = %session.session_id, "Logged out");
    Ok(Json(LogoutResponse {
        session_id: session.session_id,
        revoked: session.revoked,
    }))
}

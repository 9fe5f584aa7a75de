use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::auth::AuthenticatedOwner;
use crate::db::TokenStore;
use crate::domain::{self, EvolutionOutcome, PointsAward};
use crate::models::{AwardPointsRequest, EvolvableToken, TokenHistoryResponse};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AwardPointsResponse {
    pub token: EvolvableToken,
    pub award: PointsAward,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolveResponse {
    pub token: EvolvableToken,
    pub evolution: EvolutionOutcome,
}

#[tracing::instrument(skip(state))]
pub async fn get_token_handler(
    Path(token_id): Path<i64>,
    State(state): State<AppState>,
) -> ApiResult<Json<EvolvableToken>> {
    let token = state.store.get_token(token_id).await?;
    Ok(Json(token))
}

/// Token with its point ledger, oldest entry first
#[tracing::instrument(skip(state))]
pub async fn token_history_handler(
    Path(token_id): Path<i64>,
    State(state): State<AppState>,
) -> ApiResult<Json<TokenHistoryResponse>> {
    let token = state.store.get_token(token_id).await?;
    let events = state.store.list_point_events(token_id).await?;
    Ok(Json(TokenHistoryResponse { token, events }))
}

/// Internal: award (or deduct) evolution points
#[tracing::instrument(skip(state, request), fields(amount = request.amount))]
pub async fn award_points_handler(
    Path(token_id): Path<i64>,
    State(state): State<AppState>,
    Json(request): Json<AwardPointsRequest>,
) -> ApiResult<Json<AwardPointsResponse>> {
    info!("Processing point award");

    let (token, award) = domain::award_points(
        state.store.as_ref(),
        &state.rules,
        token_id,
        request.amount,
        &request.reason,
    )
    .await?;

    Ok(Json(AwardPointsResponse { token, award }))
}

/// Evolve one of the caller's tokens to the next level
#[tracing::instrument(skip(state), fields(owner_id = %owner.owner_id))]
pub async fn evolve_token_handler(
    Path(token_id): Path<i64>,
    State(state): State<AppState>,
    owner: AuthenticatedOwner,
) -> ApiResult<Json<EvolveResponse>> {
    info!("Processing evolve request");

    // Ownership never changes, so checking before the swap loop is enough
    let token = state.store.get_token(token_id).await?;
    if token.owner_id != owner.owner_id {
        return Err(ApiError::Forbidden(format!("token {} belongs to another owner", token_id)));
    }

    let (token, evolution) = domain::evolve_token(state.store.as_ref(), &state.rules, token_id).await?;
    Ok(Json(EvolveResponse { token, evolution }))
}

#[tracing::instrument(skip(state), fields(owner_id = %owner_id))]
pub async fn owner_tokens_handler(
    Path(owner_id): Path<String>,
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<EvolvableToken>>> {
    let tokens = state.store.list_tokens_by_owner(&owner_id).await?;
    Ok(Json(tokens))
}

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use tracing::info;

use crate::api::error::ApiResult;
use crate::api::state::AppState;
use crate::auth::AuthenticatedOwner;
use crate::db::TokenStore;
use crate::domain::{self, TokenMetadata, VerificationSignal};
use crate::models::{AchievementRecord, MetadataQuery, MintedTokenResponse, SubmitAchievementRequest};

/// Submit an achievement for the caller
#[tracing::instrument(skip(state, request), fields(owner_id = %owner.owner_id))]
pub async fn submit_achievement_handler(
    State(state): State<AppState>,
    owner: AuthenticatedOwner,
    Json(request): Json<SubmitAchievementRequest>,
) -> ApiResult<(StatusCode, Json<AchievementRecord>)> {
    info!("Processing achievement submission");

    let record =
        domain::submit_achievement(state.store.as_ref(), &state.rules, &owner.owner_id, &request).await?;

    Ok((StatusCode::CREATED, Json(record)))
}

#[tracing::instrument(skip(state))]
pub async fn get_achievement_handler(
    Path(achievement_id): Path<i64>,
    State(state): State<AppState>,
) -> ApiResult<Json<AchievementRecord>> {
    let record = state.store.get_achievement(achievement_id).await?;
    Ok(Json(record))
}

/// Display metadata for an achievement, optionally previewed at another level
#[tracing::instrument(skip(state))]
pub async fn achievement_metadata_handler(
    Path(achievement_id): Path<i64>,
    Query(query): Query<MetadataQuery>,
    State(state): State<AppState>,
) -> ApiResult<Json<TokenMetadata>> {
    let metadata = domain::metadata_for_achievement(
        state.store.as_ref(),
        &state.rules,
        achievement_id,
        query.level,
        &state.image_base_uri,
    )
    .await?;

    Ok(Json(metadata))
}

/// Internal: the verification actor approves an achievement and a token is minted
#[tracing::instrument(skip(state))]
pub async fn verify_achievement_handler(
    Path(achievement_id): Path<i64>,
    State(state): State<AppState>,
    Json(signal): Json<VerificationSignal>,
) -> ApiResult<(StatusCode, Json<MintedTokenResponse>)> {
    info!("Processing achievement verification");

    let (achievement, token) =
        domain::verify_achievement(state.store.as_ref(), &state.rules, achievement_id, &signal).await?;

    Ok((StatusCode::CREATED, Json(MintedTokenResponse { achievement, token })))
}

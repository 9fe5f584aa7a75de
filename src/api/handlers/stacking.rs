use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::info;

use crate::api::error::ApiResult;
use crate::api::state::AppState;
use crate::auth::AuthenticatedOwner;
use crate::domain::{self, StackingOpportunity};
use crate::models::{CreateCompositeRequest, MintedTokenResponse};

#[tracing::instrument(skip(state), fields(owner_id = %owner_id))]
pub async fn stacking_opportunities_handler(
    Path(owner_id): Path<String>,
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<StackingOpportunity>>> {
    let opportunities =
        domain::stacking_opportunities_for_owner(state.store.as_ref(), &state.rules, &owner_id).await?;
    Ok(Json(opportunities))
}

/// Stack the caller's tokens into a composite
#[tracing::instrument(
    skip(state, request),
    fields(owner_id = %owner.owner_id, result_type = %request.result_type)
)]
pub async fn create_composite_handler(
    State(state): State<AppState>,
    owner: AuthenticatedOwner,
    Json(request): Json<CreateCompositeRequest>,
) -> ApiResult<(StatusCode, Json<MintedTokenResponse>)> {
    info!("Processing composite creation");

    let (achievement, token) = domain::mint_composite(
        state.store.as_ref(),
        &state.rules,
        &owner.owner_id,
        &request.result_type,
        &request.source_token_ids,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(MintedTokenResponse { achievement, token })))
}

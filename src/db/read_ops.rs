use sqlx::PgPool;
use tracing::debug;

use crate::db::errors::{DatabaseError, Result};
use crate::models::rows::{AchievementRow, PointEventRow, TokenRow};
use crate::models::{AchievementRecord, EvolvableToken, PointEvent};

pub(crate) const TOKEN_COLUMNS: &str = r#"
    id, owner_id, achievement_id, nft_type, level, rarity, evolution_points,
    is_composite, stacked_achievement_ids, version, created_at, updated_at
"#;

pub(crate) const ACHIEVEMENT_COLUMNS: &str = r#"
    id, owner_id, achievement_type, title, institution, gpa_value,
    verified, verified_at, created_at
"#;

/// Load a single token by id
#[tracing::instrument(skip(pool))]
pub async fn load_token(pool: &PgPool, id: i64) -> Result<EvolvableToken> {
    let row = sqlx::query_as::<_, TokenRow>(&format!(
        "SELECT {} FROM evolvable_tokens WHERE id = $1",
        TOKEN_COLUMNS
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
    .map_err(DatabaseError::QueryError)?
    .ok_or_else(|| DatabaseError::NotFound(format!("token {}", id)))?;

    EvolvableToken::try_from(row)
}

/// Load the token minted for an achievement, if any
#[tracing::instrument(skip(pool))]
pub async fn load_token_by_achievement(
    pool: &PgPool,
    achievement_id: i64,
) -> Result<Option<EvolvableToken>> {
    let row = sqlx::query_as::<_, TokenRow>(&format!(
        "SELECT {} FROM evolvable_tokens WHERE achievement_id = $1",
        TOKEN_COLUMNS
    ))
    .bind(achievement_id)
    .fetch_optional(pool)
    .await
    .map_err(DatabaseError::QueryError)?;

    row.map(EvolvableToken::try_from).transpose()
}

/// Load every token an owner holds, oldest first
#[tracing::instrument(skip(pool), fields(owner_id = %owner_id))]
pub async fn load_tokens_by_owner(pool: &PgPool, owner_id: &str) -> Result<Vec<EvolvableToken>> {
    let rows = sqlx::query_as::<_, TokenRow>(&format!(
        "SELECT {} FROM evolvable_tokens WHERE owner_id = $1 ORDER BY id",
        TOKEN_COLUMNS
    ))
    .bind(owner_id)
    .fetch_all(pool)
    .await
    .map_err(DatabaseError::QueryError)?;

    debug!("Loaded {} tokens for owner {}", rows.len(), owner_id);
    rows.into_iter().map(EvolvableToken::try_from).collect()
}

/// Check whether a token row exists, used to tell a stale write from a missing row
pub async fn token_exists(pool: &PgPool, id: i64) -> Result<bool> {
    let exists: Option<bool> = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM evolvable_tokens WHERE id = $1)"
    )
    .bind(id)
    .fetch_one(pool)
    .await
    .map_err(DatabaseError::QueryError)?;

    Ok(exists.unwrap_or(false))
}

/// Load a single achievement by id
#[tracing::instrument(skip(pool))]
pub async fn load_achievement(pool: &PgPool, id: i64) -> Result<AchievementRecord> {
    let row = sqlx::query_as::<_, AchievementRow>(&format!(
        "SELECT {} FROM achievements WHERE id = $1",
        ACHIEVEMENT_COLUMNS
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
    .map_err(DatabaseError::QueryError)?
    .ok_or_else(|| DatabaseError::NotFound(format!("achievement {}", id)))?;

    AchievementRecord::try_from(row)
}

/// Load the point ledger for a token, oldest first
#[tracing::instrument(skip(pool))]
pub async fn load_point_events(pool: &PgPool, token_id: i64) -> Result<Vec<PointEvent>> {
    let rows = sqlx::query_as::<_, PointEventRow>(
        r#"
        SELECT id, token_id, delta, reason, kind, balance_after, level_after, created_at
        FROM token_point_events
        WHERE token_id = $1
        ORDER BY id
        "#
    )
    .bind(token_id)
    .fetch_all(pool)
    .await
    .map_err(DatabaseError::QueryError)?;

    rows.into_iter().map(PointEvent::try_from).collect()
}

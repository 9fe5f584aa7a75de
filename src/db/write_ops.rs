use chrono::{DateTime, Utc};
use sqlx::{Postgres, Transaction};
use tracing::{debug, info};

use crate::db::errors::{DatabaseError, Result};
use crate::db::read_ops::{ACHIEVEMENT_COLUMNS, TOKEN_COLUMNS};
use crate::models::rows::{AchievementRow, PointEventRow, TokenRow};
use crate::models::{
    AchievementRecord, EvolvableToken, NewAchievement, NewPointEvent, NewToken, PointEvent,
    TokenPatch,
};

/// Map unique/check violations to IntegrityError so callers can report them cleanly
fn classify(e: sqlx::Error, context: &str) -> DatabaseError {
    let err = DatabaseError::QueryError(e);
    if err.is_integrity_error() {
        return DatabaseError::IntegrityError(format!("{}: {}", context, err));
    }
    err
}

/// Insert an achievement record
pub async fn insert_achievement(
    tx: &mut Transaction<'_, Postgres>,
    data: &NewAchievement,
) -> Result<AchievementRecord> {
    debug!("Inserting {} achievement for owner {}", data.achievement_type, data.owner_id);

    let row = sqlx::query_as::<_, AchievementRow>(&format!(
        r#"
        INSERT INTO achievements
            (owner_id, achievement_type, title, institution, gpa_value, verified, verified_at, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, NOW())
        RETURNING {}
        "#,
        ACHIEVEMENT_COLUMNS
    ))
    .bind(&data.owner_id)
    .bind(data.achievement_type.as_str())
    .bind(&data.title)
    .bind(&data.institution)
    .bind(data.gpa_value)
    .bind(data.verified_at.is_some())
    .bind(data.verified_at)
    .fetch_one(&mut **tx)
    .await
    .map_err(|e| classify(e, "achievement insert rejected"))?;

    let record = AchievementRecord::try_from(row)?;
    info!("Inserted achievement with ID: {}", record.id);
    Ok(record)
}

/// Flip an achievement to verified. Returns None if it is missing or already verified.
pub async fn mark_achievement_verified(
    tx: &mut Transaction<'_, Postgres>,
    achievement_id: i64,
    verified_at: DateTime<Utc>,
) -> Result<Option<AchievementRecord>> {
    let row = sqlx::query_as::<_, AchievementRow>(&format!(
        r#"
        UPDATE achievements
        SET verified = TRUE, verified_at = $2
        WHERE id = $1 AND verified = FALSE
        RETURNING {}
        "#,
        ACHIEVEMENT_COLUMNS
    ))
    .bind(achievement_id)
    .bind(verified_at)
    .fetch_optional(&mut **tx)
    .await
    .map_err(DatabaseError::QueryError)?;

    row.map(AchievementRecord::try_from).transpose()
}

/// Insert a token linked to its achievement
pub async fn insert_token(
    tx: &mut Transaction<'_, Postgres>,
    achievement_id: i64,
    data: &NewToken,
) -> Result<EvolvableToken> {
    debug!("Inserting {} token for achievement {}", data.nft_type, achievement_id);

    let row = sqlx::query_as::<_, TokenRow>(&format!(
        r#"
        INSERT INTO evolvable_tokens (
            owner_id, achievement_id, nft_type, level, rarity, evolution_points,
            is_composite, stacked_achievement_ids, version, created_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 0, NOW(), NOW())
        RETURNING {}
        "#,
        TOKEN_COLUMNS
    ))
    .bind(&data.owner_id)
    .bind(achievement_id)
    .bind(&data.nft_type)
    .bind(data.level)
    .bind(data.rarity.as_str())
    .bind(data.evolution_points)
    .bind(data.is_composite)
    .bind(&data.stacked_achievement_ids)
    .fetch_one(&mut **tx)
    .await
    .map_err(|e| classify(e, "token insert rejected"))?;

    let token = EvolvableToken::try_from(row)?;
    info!("Inserted token with ID: {}", token.id);
    Ok(token)
}

/// Compare-and-swap update of a token's mutable state.
/// Returns None when no row matched the id and version.
pub async fn update_token_if_version(
    tx: &mut Transaction<'_, Postgres>,
    id: i64,
    patch: &TokenPatch,
    expected_version: i64,
) -> Result<Option<EvolvableToken>> {
    let row = sqlx::query_as::<_, TokenRow>(&format!(
        r#"
        UPDATE evolvable_tokens
        SET level = $3,
            rarity = $4,
            evolution_points = $5,
            version = version + 1,
            updated_at = NOW()
        WHERE id = $1 AND version = $2
        RETURNING {}
        "#,
        TOKEN_COLUMNS
    ))
    .bind(id)
    .bind(expected_version)
    .bind(patch.level)
    .bind(patch.rarity.as_str())
    .bind(patch.evolution_points)
    .fetch_optional(&mut **tx)
    .await
    .map_err(|e| classify(e, "token update rejected"))?;

    row.map(EvolvableToken::try_from).transpose()
}

/// Append a ledger entry
pub async fn insert_point_event(
    tx: &mut Transaction<'_, Postgres>,
    event: &NewPointEvent,
) -> Result<PointEvent> {
    let row = sqlx::query_as::<_, PointEventRow>(
        r#"
        INSERT INTO token_point_events
            (token_id, delta, reason, kind, balance_after, level_after, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, NOW())
        RETURNING id, token_id, delta, reason, kind, balance_after, level_after, created_at
        "#
    )
    .bind(event.token_id)
    .bind(event.delta)
    .bind(&event.reason)
    .bind(event.kind.as_str())
    .bind(event.balance_after)
    .bind(event.level_after)
    .fetch_one(&mut **tx)
    .await
    .map_err(|e| classify(e, "point event rejected"))?;

    PointEvent::try_from(row)
}

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::warn;

use crate::db::errors::{DatabaseError, Result};
use crate::db::store::TokenStore;
use crate::db::{read_ops, write_ops};
use crate::models::{
    AchievementRecord, EvolvableToken, LedgerEntry, NewAchievement, NewToken, PointEvent,
    TokenPatch,
};

/// PostgreSQL-backed token store
#[derive(Debug, Clone)]
pub struct PgTokenStore {
    pool: PgPool,
}

impl PgTokenStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl TokenStore for PgTokenStore {
    async fn get_token(&self, id: i64) -> Result<EvolvableToken> {
        read_ops::load_token(&self.pool, id).await
    }

    async fn get_token_by_achievement(&self, achievement_id: i64) -> Result<Option<EvolvableToken>> {
        read_ops::load_token_by_achievement(&self.pool, achievement_id).await
    }

    async fn list_tokens_by_owner(&self, owner_id: &str) -> Result<Vec<EvolvableToken>> {
        read_ops::load_tokens_by_owner(&self.pool, owner_id).await
    }

    async fn update_token(
        &self,
        id: i64,
        patch: &TokenPatch,
        expected_version: i64,
        entry: &LedgerEntry,
    ) -> Result<EvolvableToken> {
        let mut tx = self.pool.begin().await.map_err(DatabaseError::QueryError)?;

        let token = match write_ops::update_token_if_version(&mut tx, id, patch, expected_version).await? {
            Some(token) => token,
            None => {
                drop(tx);
                if read_ops::token_exists(&self.pool, id).await? {
                    warn!(token_id = id, expected_version, "Token changed underneath update");
                    return Err(DatabaseError::StaleWrite { id, expected_version });
                }
                return Err(DatabaseError::NotFound(format!("token {}", id)));
            }
        };

        write_ops::insert_point_event(&mut tx, &entry.for_token(&token)).await?;
        tx.commit().await.map_err(DatabaseError::QueryError)?;
        Ok(token)
    }

    async fn create_achievement(&self, data: &NewAchievement) -> Result<AchievementRecord> {
        let mut tx = self.pool.begin().await.map_err(DatabaseError::QueryError)?;
        let record = write_ops::insert_achievement(&mut tx, data).await?;
        tx.commit().await.map_err(DatabaseError::QueryError)?;
        Ok(record)
    }

    async fn get_achievement(&self, id: i64) -> Result<AchievementRecord> {
        read_ops::load_achievement(&self.pool, id).await
    }

    async fn verify_and_mint(
        &self,
        achievement_id: i64,
        verified_at: DateTime<Utc>,
        token: &NewToken,
        entry: &LedgerEntry,
    ) -> Result<(AchievementRecord, EvolvableToken)> {
        let mut tx = self.pool.begin().await.map_err(DatabaseError::QueryError)?;

        let achievement = match write_ops::mark_achievement_verified(&mut tx, achievement_id, verified_at).await? {
            Some(achievement) => achievement,
            None => {
                // Transaction is rolled back when dropped
                drop(tx);
                read_ops::load_achievement(&self.pool, achievement_id).await?;
                return Err(DatabaseError::IntegrityError(format!(
                    "achievement {} is already verified",
                    achievement_id
                )));
            }
        };

        let minted = write_ops::insert_token(&mut tx, achievement_id, token).await?;
        write_ops::insert_point_event(&mut tx, &entry.for_token(&minted)).await?;
        tx.commit().await.map_err(DatabaseError::QueryError)?;

        Ok((achievement, minted))
    }

    async fn create_composite(
        &self,
        achievement: &NewAchievement,
        token: &NewToken,
        entry: &LedgerEntry,
    ) -> Result<(AchievementRecord, EvolvableToken)> {
        let mut tx = self.pool.begin().await.map_err(DatabaseError::QueryError)?;

        let record = write_ops::insert_achievement(&mut tx, achievement).await?;
        let composite = write_ops::insert_token(&mut tx, record.id, token).await?;
        write_ops::insert_point_event(&mut tx, &entry.for_token(&composite)).await?;

        tx.commit().await.map_err(DatabaseError::QueryError)?;
        Ok((record, composite))
    }

    async fn list_point_events(&self, token_id: i64) -> Result<Vec<PointEvent>> {
        read_ops::load_point_events(&self.pool, token_id).await
    }
}

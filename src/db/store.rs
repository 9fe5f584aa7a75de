use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::db::errors::Result;
use crate::models::{
    AchievementRecord, EvolvableToken, LedgerEntry, NewAchievement, NewToken, PointEvent,
    TokenPatch,
};

/// Persistence boundary for achievements, tokens and the point ledger.
///
/// Implementations must provide read-after-write consistency per record and
/// make `update_token` a compare-and-swap on the token version. Every write
/// that moves a balance appends its ledger entry in the same transaction.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn get_token(&self, id: i64) -> Result<EvolvableToken>;

    async fn get_token_by_achievement(&self, achievement_id: i64) -> Result<Option<EvolvableToken>>;

    async fn list_tokens_by_owner(&self, owner_id: &str) -> Result<Vec<EvolvableToken>>;

    /// Write `patch` and append `entry` only if the stored version still equals
    /// `expected_version`. Fails with `StaleWrite` when another writer got there first.
    async fn update_token(
        &self,
        id: i64,
        patch: &TokenPatch,
        expected_version: i64,
        entry: &LedgerEntry,
    ) -> Result<EvolvableToken>;

    async fn create_achievement(&self, data: &NewAchievement) -> Result<AchievementRecord>;

    async fn get_achievement(&self, id: i64) -> Result<AchievementRecord>;

    /// Flip an unverified achievement to verified and mint its token, atomically.
    /// Fails with `IntegrityError` if the achievement was already verified.
    async fn verify_and_mint(
        &self,
        achievement_id: i64,
        verified_at: DateTime<Utc>,
        token: &NewToken,
        entry: &LedgerEntry,
    ) -> Result<(AchievementRecord, EvolvableToken)>;

    /// Insert a synthesized composite achievement and its token, atomically.
    /// Fails with `IntegrityError` if the owner already holds a composite of that type.
    async fn create_composite(
        &self,
        achievement: &NewAchievement,
        token: &NewToken,
        entry: &LedgerEntry,
    ) -> Result<(AchievementRecord, EvolvableToken)>;

    /// Ledger entries for a token, oldest first
    async fn list_point_events(&self, token_id: i64) -> Result<Vec<PointEvent>>;
}

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tokio::sync::RwLock;
use tracing::debug;

use crate::db::errors::{DatabaseError, Result};
use crate::db::store::TokenStore;
use crate::models::{
    AchievementRecord, EvolvableToken, LedgerEntry, NewAchievement, NewToken, PointEvent,
    TokenPatch,
};

#[derive(Debug, Default)]
struct MemoryState {
    achievements: BTreeMap<i64, AchievementRecord>,
    tokens: BTreeMap<i64, EvolvableToken>,
    events: Vec<PointEvent>,
    last_achievement_id: i64,
    last_token_id: i64,
}

impl MemoryState {
    fn insert_achievement(&mut self, data: &NewAchievement) -> AchievementRecord {
        self.last_achievement_id += 1;
        let record = AchievementRecord {
            id: self.last_achievement_id,
            owner_id: data.owner_id.clone(),
            achievement_type: data.achievement_type,
            title: data.title.clone(),
            institution: data.institution.clone(),
            gpa_value: data.gpa_value,
            verified: data.verified_at.is_some(),
            verified_at: data.verified_at,
            created_at: Utc::now(),
        };
        self.achievements.insert(record.id, record.clone());
        record
    }

    fn insert_token(&mut self, achievement_id: i64, data: &NewToken) -> EvolvableToken {
        self.last_token_id += 1;
        let now = Utc::now();
        let token = EvolvableToken {
            id: self.last_token_id,
            owner_id: data.owner_id.clone(),
            achievement_id,
            nft_type: data.nft_type.clone(),
            level: data.level,
            rarity: data.rarity,
            evolution_points: data.evolution_points,
            is_composite: data.is_composite,
            stacked_achievement_ids: data.stacked_achievement_ids.clone(),
            version: 0,
            created_at: now,
            updated_at: now,
        };
        self.tokens.insert(token.id, token.clone());
        token
    }

    fn append_event(&mut self, token: &EvolvableToken, entry: &LedgerEntry) -> PointEvent {
        let event = entry.for_token(token);
        let recorded = PointEvent {
            id: self.events.len() as i64 + 1,
            token_id: event.token_id,
            delta: event.delta,
            reason: event.reason,
            kind: event.kind,
            balance_after: event.balance_after,
            level_after: event.level_after,
            created_at: Utc::now(),
        };
        self.events.push(recorded.clone());
        recorded
    }
}

/// Process-local store with the same guarantees as the Postgres store.
/// Used for tests and single-node development runs.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: RwLock<MemoryState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenStore for InMemoryStore {
    async fn get_token(&self, id: i64) -> Result<EvolvableToken> {
        let state = self.state.read().await;
        state
            .tokens
            .get(&id)
            .cloned()
            .ok_or_else(|| DatabaseError::NotFound(format!("token {}", id)))
    }

    async fn get_token_by_achievement(&self, achievement_id: i64) -> Result<Option<EvolvableToken>> {
        let state = self.state.read().await;
        Ok(state
            .tokens
            .values()
            .find(|token| token.achievement_id == achievement_id)
            .cloned())
    }

    async fn list_tokens_by_owner(&self, owner_id: &str) -> Result<Vec<EvolvableToken>> {
        let state = self.state.read().await;
        Ok(state
            .tokens
            .values()
            .filter(|token| token.owner_id == owner_id)
            .cloned()
            .collect())
    }

    async fn update_token(
        &self,
        id: i64,
        patch: &TokenPatch,
        expected_version: i64,
        entry: &LedgerEntry,
    ) -> Result<EvolvableToken> {
        let mut state = self.state.write().await;
        let token = state
            .tokens
            .get_mut(&id)
            .ok_or_else(|| DatabaseError::NotFound(format!("token {}", id)))?;

        if token.version != expected_version {
            return Err(DatabaseError::StaleWrite { id, expected_version });
        }
        if patch.evolution_points < 0 {
            return Err(DatabaseError::IntegrityError(format!(
                "token {} cannot hold negative points",
                id
            )));
        }

        token.level = patch.level;
        token.rarity = patch.rarity;
        token.evolution_points = patch.evolution_points;
        token.version += 1;
        token.updated_at = Utc::now();
        let updated = token.clone();

        state.append_event(&updated, entry);
        debug!(token_id = id, version = updated.version, "Updated token");
        Ok(updated)
    }

    async fn create_achievement(&self, data: &NewAchievement) -> Result<AchievementRecord> {
        let mut state = self.state.write().await;
        Ok(state.insert_achievement(data))
    }

    async fn get_achievement(&self, id: i64) -> Result<AchievementRecord> {
        let state = self.state.read().await;
        state
            .achievements
            .get(&id)
            .cloned()
            .ok_or_else(|| DatabaseError::NotFound(format!("achievement {}", id)))
    }

    async fn verify_and_mint(
        &self,
        achievement_id: i64,
        verified_at: DateTime<Utc>,
        token: &NewToken,
        entry: &LedgerEntry,
    ) -> Result<(AchievementRecord, EvolvableToken)> {
        let mut state = self.state.write().await;

        let achievement = state
            .achievements
            .get_mut(&achievement_id)
            .ok_or_else(|| DatabaseError::NotFound(format!("achievement {}", achievement_id)))?;
        if achievement.verified {
            return Err(DatabaseError::IntegrityError(format!(
                "achievement {} is already verified",
                achievement_id
            )));
        }
        achievement.verified = true;
        achievement.verified_at = Some(verified_at);
        let achievement = achievement.clone();

        let token = state.insert_token(achievement_id, token);
        state.append_event(&token, entry);
        Ok((achievement, token))
    }

    async fn create_composite(
        &self,
        achievement: &NewAchievement,
        token: &NewToken,
        entry: &LedgerEntry,
    ) -> Result<(AchievementRecord, EvolvableToken)> {
        let mut state = self.state.write().await;

        let duplicate = state.tokens.values().any(|existing| {
            existing.is_composite
                && existing.owner_id == token.owner_id
                && existing.nft_type == token.nft_type
        });
        if duplicate {
            return Err(DatabaseError::IntegrityError(format!(
                "owner {} already holds a {} composite",
                token.owner_id, token.nft_type
            )));
        }

        let achievement = state.insert_achievement(achievement);
        let token = state.insert_token(achievement.id, token);
        state.append_event(&token, entry);
        Ok((achievement, token))
    }

    async fn list_point_events(&self, token_id: i64) -> Result<Vec<PointEvent>> {
        let state = self.state.read().await;
        Ok(state
            .events
            .iter()
            .filter(|event| event.token_id == token_id)
            .cloned()
            .collect())
    }
}

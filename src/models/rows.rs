use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;

use crate::db::errors::DatabaseError;
use super::{AchievementRecord, EvolvableToken, PointEvent};

/// achievements table
#[derive(Debug, Clone, FromRow)]
pub struct AchievementRow {
    pub id: i64,
    pub owner_id: String,
    pub achievement_type: String,
    pub title: Option<String>,
    pub institution: Option<String>,
    pub gpa_value: Option<Decimal>,
    pub verified: bool,
    pub verified_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// evolvable_tokens table
#[derive(Debug, Clone, FromRow)]
pub struct TokenRow {
    pub id: i64,
    pub owner_id: String,
    pub achievement_id: i64,
    pub nft_type: String,
    pub level: i32,
    pub rarity: String,
    pub evolution_points: i64,
    pub is_composite: bool,
    pub stacked_achievement_ids: Vec<i64>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// token_point_events table
#[derive(Debug, Clone, FromRow)]
pub struct PointEventRow {
    pub id: i64,
    pub token_id: i64,
    pub delta: i64,
    pub reason: String,
    pub kind: String,
    pub balance_after: i64,
    pub level_after: i32,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<AchievementRow> for AchievementRecord {
    type Error = DatabaseError;

    fn try_from(row: AchievementRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            owner_id: row.owner_id,
            achievement_type: row.achievement_type.parse().map_err(DatabaseError::InvalidData)?,
            title: row.title,
            institution: row.institution,
            gpa_value: row.gpa_value,
            verified: row.verified,
            verified_at: row.verified_at,
            created_at: row.created_at,
        })
    }
}

impl TryFrom<TokenRow> for EvolvableToken {
    type Error = DatabaseError;

    fn try_from(row: TokenRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            owner_id: row.owner_id,
            achievement_id: row.achievement_id,
            nft_type: row.nft_type,
            level: row.level,
            rarity: row.rarity.parse().map_err(DatabaseError::InvalidData)?,
            evolution_points: row.evolution_points,
            is_composite: row.is_composite,
            stacked_achievement_ids: row.stacked_achievement_ids,
            version: row.version,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

impl TryFrom<PointEventRow> for PointEvent {
    type Error = DatabaseError;

    fn try_from(row: PointEventRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            token_id: row.token_id,
            delta: row.delta,
            reason: row.reason,
            kind: row.kind.parse().map_err(DatabaseError::InvalidData)?,
            balance_after: row.balance_after,
            level_after: row.level_after,
            created_at: row.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Rarity;

    fn token_row(rarity: &str) -> TokenRow {
        let now = Utc::now();
        TokenRow {
            id: 1,
            owner_id: "owner-1".to_string(),
            achievement_id: 10,
            nft_type: "gpa_guardian".to_string(),
            level: 2,
            rarity: rarity.to_string(),
            evolution_points: 15,
            is_composite: false,
            stacked_achievement_ids: vec![],
            version: 4,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_token_row_translation() {
        let token = EvolvableToken::try_from(token_row("rare")).unwrap();
        assert_eq!(token.rarity, Rarity::Rare);
        assert_eq!(token.version, 4);
        assert_eq!(token.evolution_points, 15);
    }

    #[test]
    fn test_corrupt_rarity_is_invalid_data() {
        let result = EvolvableToken::try_from(token_row("golden"));
        assert!(matches!(result, Err(DatabaseError::InvalidData(_))));
    }
}

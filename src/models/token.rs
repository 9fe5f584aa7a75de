use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lowest level a token can hold
pub const MIN_LEVEL: i32 = 1;

/// Hard ceiling on token levels, regardless of how many levels a rule table configures
pub const MAX_LEVEL: i32 = 5;

/// Level at which composite tokens are minted
pub const COMPOSITE_LEVEL: i32 = 3;

/// Ordinal rarity tier. Declaration order is the tier order, so `Ord` compares tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rarity {
    Common,
    Rare,
    Epic,
    Legendary,
    Mythic,
}

impl Rarity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Common => "common",
            Self::Rare => "rare",
            Self::Epic => "epic",
            Self::Legendary => "legendary",
            Self::Mythic => "mythic",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Common => "Common",
            Self::Rare => "Rare",
            Self::Epic => "Epic",
            Self::Legendary => "Legendary",
            Self::Mythic => "Mythic",
        }
    }
}

impl fmt::Display for Rarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Rarity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "common" => Ok(Self::Common),
            "rare" => Ok(Self::Rare),
            "epic" => Ok(Self::Epic),
            "legendary" => Ok(Self::Legendary),
            "mythic" => Ok(Self::Mythic),
            other => Err(format!("unknown rarity '{}'", other)),
        }
    }
}

/// Gamified representation of a verified achievement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvolvableToken {
    pub id: i64,
    pub owner_id: String,
    pub achievement_id: i64,
    pub nft_type: String,
    pub level: i32,
    pub rarity: Rarity,
    pub evolution_points: i64,
    pub is_composite: bool,
    pub stacked_achievement_ids: Vec<i64>,
    /// Bumped on every write; updates compare against it
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Token data before the store assigns ids. The store links it to its achievement.
#[derive(Debug, Clone, PartialEq)]
pub struct NewToken {
    pub owner_id: String,
    pub nft_type: String,
    pub level: i32,
    pub rarity: Rarity,
    pub evolution_points: i64,
    pub is_composite: bool,
    pub stacked_achievement_ids: Vec<i64>,
}

/// Mutable part of a token written back after a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenPatch {
    pub level: i32,
    pub rarity: Rarity,
    pub evolution_points: i64,
}

impl From<&EvolvableToken> for TokenPatch {
    fn from(token: &EvolvableToken) -> Self {
        Self {
            level: token.level,
            rarity: token.rarity,
            evolution_points: token.evolution_points,
        }
    }
}

/// Why a token's point balance moved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointEventKind {
    Award,
    Evolution,
}

impl PointEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Award => "award",
            Self::Evolution => "evolution",
        }
    }
}

impl FromStr for PointEventKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "award" => Ok(Self::Award),
            "evolution" => Ok(Self::Evolution),
            other => Err(format!("unknown point event kind '{}'", other)),
        }
    }
}

/// Append-only ledger entry for a token's point balance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointEvent {
    pub id: i64,
    pub token_id: i64,
    pub delta: i64,
    pub reason: String,
    pub kind: PointEventKind,
    pub balance_after: i64,
    pub level_after: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewPointEvent {
    pub token_id: i64,
    pub delta: i64,
    pub reason: String,
    pub kind: PointEventKind,
    pub balance_after: i64,
    pub level_after: i32,
}

/// The caller's half of a ledger entry. Balance and level are taken from the
/// token as written, in the same transaction as the write.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerEntry {
    pub delta: i64,
    pub reason: String,
    pub kind: PointEventKind,
}

impl LedgerEntry {
    pub fn award(delta: i64, reason: impl Into<String>) -> Self {
        Self {
            delta,
            reason: reason.into(),
            kind: PointEventKind::Award,
        }
    }

    pub fn for_token(&self, token: &EvolvableToken) -> NewPointEvent {
        NewPointEvent {
            token_id: token.id,
            delta: self.delta,
            reason: self.reason.clone(),
            kind: self.kind,
            balance_after: token.evolution_points,
            level_after: token.level,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rarity_ordering() {
        assert!(Rarity::Common < Rarity::Rare);
        assert!(Rarity::Rare < Rarity::Epic);
        assert!(Rarity::Epic < Rarity::Legendary);
        assert!(Rarity::Legendary < Rarity::Mythic);
        assert_eq!(Rarity::Epic.max(Rarity::Rare), Rarity::Epic);
    }

    #[test]
    fn test_rarity_codes() {
        assert_eq!("legendary".parse::<Rarity>(), Ok(Rarity::Legendary));
        assert_eq!(Rarity::Mythic.to_string(), "mythic");
        assert!("shiny".parse::<Rarity>().is_err());
        assert_eq!(serde_json::to_value(Rarity::Epic).unwrap(), "epic");
    }
}

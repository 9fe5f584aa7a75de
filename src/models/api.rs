use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{AchievementRecord, AchievementType, EvolvableToken, PointEvent};

/// POST /achievements body
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitAchievementRequest {
    #[serde(rename = "type")]
    pub achievement_type: AchievementType,
    #[serde(default)]
    pub gpa_value: Option<Decimal>,
    #[serde(default)]
    pub institution: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

/// POST /internal/tokens/{id}/points body
#[derive(Debug, Clone, Deserialize)]
pub struct AwardPointsRequest {
    pub amount: i64,
    pub reason: String,
}

/// POST /composites body
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCompositeRequest {
    pub result_type: String,
    pub source_token_ids: Vec<i64>,
}

/// GET /achievements/{id}/metadata query
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetadataQuery {
    #[serde(default)]
    pub level: Option<i32>,
}

/// Achievement together with the token minted for it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MintedTokenResponse {
    pub achievement: AchievementRecord,
    pub token: EvolvableToken,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenHistoryResponse {
    pub token: EvolvableToken,
    pub events: Vec<PointEvent>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogoutResponse {
    pub session_id: String,
    pub revoked: bool,
}

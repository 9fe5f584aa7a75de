use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::models::Rarity;

/// One rung of the evolution ladder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvolutionLevelConfig {
    pub level: i32,
    /// Points spent to reach this level from the previous one
    pub required_points: i64,
    #[serde(default)]
    pub rarity_upgrade: Option<Rarity>,
    #[serde(default)]
    pub unlocks_bonuses: Vec<String>,
    /// Presentation hints, passed through untouched
    #[serde(default)]
    pub visual: Value,
}

pub fn default_levels() -> Vec<EvolutionLevelConfig> {
    vec![
        EvolutionLevelConfig {
            level: 1,
            required_points: 0,
            rarity_upgrade: Some(Rarity::Common),
            unlocks_bonuses: vec![],
            visual: json!({ "frame": "bronze", "glow": "none", "animation": "static" }),
        },
        EvolutionLevelConfig {
            level: 2,
            required_points: 100,
            rarity_upgrade: Some(Rarity::Rare),
            unlocks_bonuses: vec!["profile_badge".to_string()],
            visual: json!({ "frame": "silver", "glow": "soft_blue", "animation": "shimmer" }),
        },
        EvolutionLevelConfig {
            level: 3,
            required_points: 250,
            rarity_upgrade: Some(Rarity::Epic),
            unlocks_bonuses: vec!["marketplace_highlight".to_string()],
            visual: json!({ "frame": "gold", "glow": "violet", "animation": "pulse" }),
        },
        EvolutionLevelConfig {
            level: 4,
            required_points: 500,
            rarity_upgrade: Some(Rarity::Legendary),
            unlocks_bonuses: vec![
                "priority_opportunity_matching".to_string(),
                "custom_theme".to_string(),
            ],
            visual: json!({ "frame": "platinum", "glow": "amber", "animation": "orbit" }),
        },
        EvolutionLevelConfig {
            level: 5,
            required_points: 1000,
            rarity_upgrade: Some(Rarity::Mythic),
            unlocks_bonuses: vec![
                "mentor_status".to_string(),
                "exclusive_events".to_string(),
            ],
            visual: json!({ "frame": "prismatic", "glow": "aurora", "animation": "ascend" }),
        },
    ]
}

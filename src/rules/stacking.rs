use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::models::Rarity;

/// A combination of token types that unlocks a composite token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackingRule {
    /// Required nft types, treated as a set
    pub combination: Vec<String>,
    pub result_type: String,
    pub rarity: Rarity,
    pub bonus_points: i64,
    #[serde(default)]
    pub special_effects: Vec<String>,
}

impl StackingRule {
    pub fn required_types(&self) -> BTreeSet<&str> {
        self.combination.iter().map(String::as_str).collect()
    }
}

pub fn default_stacking_rules() -> Vec<StackingRule> {
    vec![
        StackingRule {
            combination: vec!["gpa_guardian".to_string(), "research_rockstar".to_string()],
            result_type: "academic_titan".to_string(),
            rarity: Rarity::Epic,
            bonus_points: 200,
            special_effects: vec!["titan_aura".to_string(), "research_multiplier".to_string()],
        },
        StackingRule {
            combination: vec!["gpa_guardian".to_string(), "leadership_legend".to_string()],
            result_type: "scholar_commander".to_string(),
            rarity: Rarity::Epic,
            bonus_points: 180,
            special_effects: vec!["command_banner".to_string()],
        },
        StackingRule {
            combination: vec!["research_rockstar".to_string(), "leadership_legend".to_string()],
            result_type: "innovation_pioneer".to_string(),
            rarity: Rarity::Epic,
            bonus_points: 180,
            special_effects: vec!["pioneer_trail".to_string()],
        },
        StackingRule {
            combination: vec![
                "gpa_guardian".to_string(),
                "research_rockstar".to_string(),
                "leadership_legend".to_string(),
            ],
            result_type: "renaissance_scholar".to_string(),
            rarity: Rarity::Legendary,
            bonus_points: 400,
            special_effects: vec!["triple_crown".to_string(), "mentor_unlock".to_string()],
        },
    ]
}

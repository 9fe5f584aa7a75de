// Scoring rules table - static configuration consumed by the evolution engine.
// The table is plain data: a built-in default, or a JSON file loaded at startup,
// so tests can swap in synthetic tables.

pub mod levels;
pub mod stacking;

use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use crate::models::{AchievementType, Rarity, COMPOSITE_LEVEL, MAX_LEVEL};

pub use levels::{default_levels, EvolutionLevelConfig};
pub use stacking::{default_stacking_rules, StackingRule};

#[derive(Debug, thiserror::Error)]
pub enum RulesError {
    #[error("Failed to read rule table: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse rule table: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid rule table: {0}")]
    Invalid(String),
}

/// Bonus granted when the verification confidence reaches `min_confidence`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceTier {
    pub min_confidence: u32,
    pub bonus: i64,
}

/// Inputs to the initial point formula
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointRules {
    /// Lowest GPA that earns a token; the GPA formula is anchored here
    pub gpa_threshold: Decimal,
    pub gpa_base: i64,
    pub research_base: i64,
    pub leadership_base: i64,
    pub default_base: i64,
    pub confidence_tiers: Vec<ConfidenceTier>,
    pub institution_bonus: i64,
    pub partner_institutions: Vec<String>,
}

impl PointRules {
    /// Case-insensitive match on the trimmed institution name
    pub fn is_partner_institution(&self, institution: &str) -> bool {
        let institution = institution.trim();
        !institution.is_empty()
            && self
                .partner_institutions
                .iter()
                .any(|partner| partner.eq_ignore_ascii_case(institution))
    }

    /// Highest tier bonus the confidence qualifies for
    pub fn confidence_bonus(&self, confidence: u32) -> i64 {
        self.confidence_tiers
            .iter()
            .filter(|tier| confidence >= tier.min_confidence)
            .map(|tier| tier.bonus)
            .max()
            .unwrap_or(0)
    }
}

/// nft type tag minted for each verifiable achievement type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenTypeNames {
    pub gpa: String,
    pub research: String,
    pub leadership: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleTable {
    pub points: PointRules,
    pub levels: Vec<EvolutionLevelConfig>,
    pub stacking: Vec<StackingRule>,
    pub token_types: TokenTypeNames,
}

/// Built-in rule table used when no RULES_PATH is configured
pub static DEFAULT_RULE_TABLE: Lazy<RuleTable> = Lazy::new(RuleTable::builtin);

impl RuleTable {
    pub fn builtin() -> Self {
        Self {
            points: PointRules {
                gpa_threshold: Decimal::new(35, 1),
                gpa_base: 50,
                research_base: 80,
                leadership_base: 70,
                default_base: 40,
                confidence_tiers: vec![
                    ConfidenceTier { min_confidence: 90, bonus: 20 },
                    ConfidenceTier { min_confidence: 80, bonus: 10 },
                ],
                institution_bonus: 15,
                partner_institutions: vec![
                    "Massachusetts Institute of Technology".to_string(),
                    "Stanford University".to_string(),
                    "Harvard University".to_string(),
                    "California Institute of Technology".to_string(),
                    "University of Oxford".to_string(),
                    "University of Cambridge".to_string(),
                ],
            },
            levels: default_levels(),
            stacking: default_stacking_rules(),
            token_types: TokenTypeNames {
                gpa: "gpa_guardian".to_string(),
                research: "research_rockstar".to_string(),
                leadership: "leadership_legend".to_string(),
            },
        }
    }

    /// Parse and validate a JSON rule table
    pub fn from_json_str(raw: &str) -> Result<Self, RulesError> {
        let table: RuleTable = serde_json::from_str(raw)?;
        table.validate()?;
        Ok(table)
    }

    pub fn load(path: &Path) -> Result<Self, RulesError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Check the structural invariants the engine relies on
    pub fn validate(&self) -> Result<(), RulesError> {
        self.validate_levels()?;
        self.validate_points()?;
        self.validate_stacking()?;

        let names = [
            &self.token_types.gpa,
            &self.token_types.research,
            &self.token_types.leadership,
        ];
        if names.iter().any(|name| name.trim().is_empty()) {
            return Err(RulesError::Invalid("token type names must not be empty".to_string()));
        }
        if names.iter().collect::<HashSet<_>>().len() != names.len() {
            return Err(RulesError::Invalid("token type names must be distinct".to_string()));
        }

        Ok(())
    }

    fn validate_levels(&self) -> Result<(), RulesError> {
        if self.levels.is_empty() {
            return Err(RulesError::Invalid("at least one level is required".to_string()));
        }
        if self.levels.len() > MAX_LEVEL as usize {
            return Err(RulesError::Invalid(format!(
                "at most {} levels are supported, got {}",
                MAX_LEVEL,
                self.levels.len()
            )));
        }
        if self.levels.len() < COMPOSITE_LEVEL as usize {
            return Err(RulesError::Invalid(format!(
                "composite tokens are minted at level {}, which must be configured",
                COMPOSITE_LEVEL
            )));
        }

        let mut floor = Rarity::Common;
        for (index, config) in self.levels.iter().enumerate() {
            let expected = index as i32 + 1;
            if config.level != expected {
                return Err(RulesError::Invalid(format!(
                    "levels must be numbered consecutively from 1 (found {} at position {})",
                    config.level, expected
                )));
            }

            if expected == 1 && config.required_points != 0 {
                return Err(RulesError::Invalid("level 1 must require 0 points".to_string()));
            }
            if expected > 1 && config.required_points <= 0 {
                return Err(RulesError::Invalid(format!(
                    "level {} must require a positive number of points",
                    expected
                )));
            }

            if let Some(upgrade) = config.rarity_upgrade {
                if upgrade < floor {
                    return Err(RulesError::Invalid(format!(
                        "level {} downgrades rarity from {} to {}",
                        expected, floor, upgrade
                    )));
                }
                floor = upgrade;
            }
        }

        Ok(())
    }

    fn validate_points(&self) -> Result<(), RulesError> {
        let points = &self.points;
        let bases = [
            points.gpa_base,
            points.research_base,
            points.leadership_base,
            points.default_base,
            points.institution_bonus,
        ];
        if bases.iter().any(|value| *value < 0) {
            return Err(RulesError::Invalid("point bases and bonuses must be non-negative".to_string()));
        }
        if points.gpa_threshold < Decimal::ZERO || points.gpa_threshold > Decimal::new(40, 1) {
            return Err(RulesError::Invalid("gpa_threshold must be within 0.0-4.0".to_string()));
        }
        for tier in &points.confidence_tiers {
            if tier.min_confidence > 100 || tier.bonus < 0 {
                return Err(RulesError::Invalid(format!(
                    "confidence tier {} is out of range",
                    tier.min_confidence
                )));
            }
        }
        Ok(())
    }

    fn validate_stacking(&self) -> Result<(), RulesError> {
        let mut result_types = HashSet::new();
        let composite_floor = self.rarity_at(COMPOSITE_LEVEL);

        for rule in &self.stacking {
            if rule.result_type.trim().is_empty() {
                return Err(RulesError::Invalid("stacking rule result_type must not be empty".to_string()));
            }
            if !result_types.insert(rule.result_type.as_str()) {
                return Err(RulesError::Invalid(format!(
                    "duplicate stacking rule for {}",
                    rule.result_type
                )));
            }
            if rule.combination.is_empty() {
                return Err(RulesError::Invalid(format!(
                    "stacking rule {} has an empty combination",
                    rule.result_type
                )));
            }
            if rule.required_types().len() != rule.combination.len() {
                return Err(RulesError::Invalid(format!(
                    "stacking rule {} repeats a token type",
                    rule.result_type
                )));
            }
            if rule.required_types().contains(rule.result_type.as_str()) {
                return Err(RulesError::Invalid(format!(
                    "stacking rule {} lists its own result type",
                    rule.result_type
                )));
            }
            if rule.bonus_points < 0 {
                return Err(RulesError::Invalid(format!(
                    "stacking rule {} has negative bonus points",
                    rule.result_type
                )));
            }
            if rule.rarity < composite_floor {
                return Err(RulesError::Invalid(format!(
                    "stacking rule {} mints {} below the level {} rarity {}",
                    rule.result_type, rule.rarity, COMPOSITE_LEVEL, composite_floor
                )));
            }
        }

        Ok(())
    }

    pub fn level(&self, level: i32) -> Option<&EvolutionLevelConfig> {
        self.levels.iter().find(|config| config.level == level)
    }

    /// Config for the level after `current`, if one exists below the hard ceiling
    pub fn next_level(&self, current: i32) -> Option<&EvolutionLevelConfig> {
        if current >= MAX_LEVEL {
            return None;
        }
        self.level(current + 1)
    }

    pub fn max_level(&self) -> i32 {
        self.levels.len() as i32
    }

    /// Minimum rarity a token holds at `level`: the highest upgrade configured up to it
    pub fn rarity_at(&self, level: i32) -> Rarity {
        self.levels
            .iter()
            .filter(|config| config.level <= level)
            .filter_map(|config| config.rarity_upgrade)
            .max()
            .unwrap_or(Rarity::Common)
    }

    pub fn stacking_rule(&self, result_type: &str) -> Option<&StackingRule> {
        self.stacking.iter().find(|rule| rule.result_type == result_type)
    }

    /// Composite achievements take their type from the stacking rule instead
    pub fn nft_type_for(&self, achievement_type: AchievementType) -> Option<&str> {
        match achievement_type {
            AchievementType::Gpa => Some(&self.token_types.gpa),
            AchievementType::Research => Some(&self.token_types.research),
            AchievementType::Leadership => Some(&self.token_types.leadership),
            AchievementType::Composite => None,
        }
    }
}

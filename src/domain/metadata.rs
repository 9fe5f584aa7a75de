use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::db::TokenStore;
use crate::domain::DomainError;
use crate::models::{AchievementRecord, EvolvableToken, Rarity, MIN_LEVEL};
use crate::rules::RuleTable;

/// One entry of the marketplace attribute list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataAttribute {
    pub trait_type: String,
    pub value: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_type: Option<String>,
}

impl MetadataAttribute {
    fn new(trait_type: &str, value: impl Into<Value>) -> Self {
        Self {
            trait_type: trait_type.to_string(),
            value: value.into(),
            display_type: None,
        }
    }

    fn shown_as(mut self, display_type: &str) -> Self {
        self.display_type = Some(display_type.to_string());
        self
    }
}

/// Display metadata for an achievement at a given level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenMetadata {
    pub name: String,
    pub description: String,
    pub image: String,
    pub attributes: Vec<MetadataAttribute>,
    pub visual: Value,
}

/// Rarity shown for a level: the token's own when looking at its current
/// level, never below the ladder's rarity when looking ahead.
fn rarity_for(token: Option<&EvolvableToken>, level: i32, rules: &RuleTable) -> Rarity {
    let ladder = rules.rarity_at(level);
    match token {
        Some(token) if token.level == level => token.rarity,
        Some(token) if level > token.level => token.rarity.max(ladder),
        _ => ladder,
    }
}

/// Project an achievement, and its token if minted, into display metadata
pub fn project_metadata(
    achievement: &AchievementRecord,
    token: Option<&EvolvableToken>,
    level: Option<i32>,
    rules: &RuleTable,
    image_base_uri: &str,
) -> Result<TokenMetadata, DomainError> {
    let level = level
        .or_else(|| token.map(|token| token.level))
        .unwrap_or(MIN_LEVEL);
    let config = rules
        .level(level)
        .ok_or_else(|| DomainError::Validation(format!("level {} is not on the evolution ladder", level)))?;

    let rarity = rarity_for(token, level, rules);
    let kind = achievement.achievement_type;
    let title = achievement
        .title
        .clone()
        .unwrap_or_else(|| format!("{} Achievement", kind.label()));

    let description = match achievement.institution.as_deref() {
        Some(institution) => format!(
            "{} {} achievement from {}, level {} of {}.",
            rarity.label(),
            kind.label(),
            institution,
            level,
            rules.max_level()
        ),
        None => format!(
            "{} {} achievement, level {} of {}.",
            rarity.label(),
            kind.label(),
            level,
            rules.max_level()
        ),
    };

    let issued = achievement.verified_at.unwrap_or(achievement.created_at);
    let mut attributes = vec![
        MetadataAttribute::new("Achievement Type", kind.label()),
        MetadataAttribute::new(
            "Institution",
            achievement.institution.clone().unwrap_or_else(|| "Unspecified".to_string()),
        ),
        MetadataAttribute::new("Level", level).shown_as("number"),
        MetadataAttribute::new("Rarity", rarity.label()),
        MetadataAttribute::new(
            "Evolution Points",
            token.map(|token| token.evolution_points).unwrap_or(0),
        )
        .shown_as("number"),
        MetadataAttribute::new("Verified", achievement.verified),
        MetadataAttribute::new("Issue Date", issued.timestamp()).shown_as("date"),
    ];

    if let Some(gpa) = achievement.gpa_value {
        attributes.push(MetadataAttribute::new("GPA", json!(gpa.to_string())));
    }
    if let Some(token) = token.filter(|token| token.is_composite) {
        attributes.push(MetadataAttribute::new("Composite", true));
        attributes.push(
            MetadataAttribute::new("Stacked Achievements", token.stacked_achievement_ids.len() as i64)
                .shown_as("number"),
        );
    }

    Ok(TokenMetadata {
        name: format!("{} (Level {})", title, level),
        description,
        image: format!(
            "{}/{}/level-{}/{}.png",
            image_base_uri.trim_end_matches('/'),
            kind.as_str(),
            level,
            rarity.as_str()
        ),
        attributes,
        visual: config.visual.clone(),
    })
}

#[tracing::instrument(skip(store, rules, image_base_uri))]
pub async fn metadata_for_achievement(
    store: &dyn TokenStore,
    rules: &RuleTable,
    achievement_id: i64,
    level: Option<i32>,
    image_base_uri: &str,
) -> Result<TokenMetadata, DomainError> {
    let achievement = store.get_achievement(achievement_id).await?;
    let token = store.get_token_by_achievement(achievement_id).await?;

    project_metadata(&achievement, token.as_ref(), level, rules, image_base_uri)
}

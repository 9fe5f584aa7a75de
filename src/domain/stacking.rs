use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use tracing::info;

use crate::db::TokenStore;
use crate::domain::DomainError;
use crate::models::{
    AchievementRecord, AchievementType, EvolvableToken, LedgerEntry, NewAchievement, NewToken,
    COMPOSITE_LEVEL,
};
use crate::rules::{RuleTable, StackingRule};

/// A stacking rule the owner's tokens currently satisfy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackingOpportunity {
    pub rule: StackingRule,
    /// One token per required type, in the rule's combination order
    pub source_tokens: Vec<EvolvableToken>,
    pub can_create: bool,
}

/// Achievement and token to persist together for a new composite
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeDraft {
    pub achievement: NewAchievement,
    pub token: NewToken,
}

fn holds_composite(owner_tokens: &[EvolvableToken], result_type: &str) -> bool {
    owner_tokens
        .iter()
        .any(|token| token.is_composite && token.nft_type == result_type)
}

/// Lowest-id non-composite token of each required type, or None if one is missing
fn pick_sources(owner_tokens: &[EvolvableToken], rule: &StackingRule) -> Option<Vec<EvolvableToken>> {
    rule.combination
        .iter()
        .map(|required| {
            owner_tokens
                .iter()
                .filter(|token| !token.is_composite && &token.nft_type == required)
                .min_by_key(|token| token.id)
                .cloned()
        })
        .collect()
}

/// Every rule the owner could turn into a new composite right now
pub fn find_stacking_opportunities(
    owner_tokens: &[EvolvableToken],
    rules: &[StackingRule],
) -> Vec<StackingOpportunity> {
    rules
        .iter()
        .filter(|rule| !holds_composite(owner_tokens, &rule.result_type))
        .filter_map(|rule| {
            pick_sources(owner_tokens, rule).map(|source_tokens| StackingOpportunity {
                rule: rule.clone(),
                source_tokens,
                can_create: true,
            })
        })
        .collect()
}

/// Check the source set against the rule and draft the composite records.
/// Source tokens are only read, never consumed.
pub fn create_composite(
    owner_id: &str,
    rule: &StackingRule,
    source_token_ids: &[i64],
    owner_tokens: &[EvolvableToken],
    now: DateTime<Utc>,
) -> Result<CompositeDraft, DomainError> {
    let invalid = |detail: String| DomainError::Validation(format!("invalid source set: {}", detail));

    if holds_composite(owner_tokens, &rule.result_type) {
        return Err(DomainError::Validation(format!(
            "owner already holds a {} composite",
            rule.result_type
        )));
    }

    let unique_ids: HashSet<i64> = source_token_ids.iter().copied().collect();
    if unique_ids.len() != source_token_ids.len() {
        return Err(invalid("duplicate token ids".to_string()));
    }

    let sources = source_token_ids
        .iter()
        .map(|id| {
            owner_tokens
                .iter()
                .find(|token| token.id == *id)
                .ok_or_else(|| invalid(format!("token {} is not held by {}", id, owner_id)))
        })
        .collect::<Result<Vec<_>, _>>()?;

    if let Some(composite) = sources.iter().find(|token| token.is_composite) {
        return Err(invalid(format!("token {} is itself a composite", composite.id)));
    }

    let provided: BTreeSet<&str> = sources.iter().map(|token| token.nft_type.as_str()).collect();
    if sources.len() != rule.combination.len() || provided != rule.required_types() {
        return Err(invalid(format!(
            "{} requires one each of [{}]",
            rule.result_type,
            rule.combination.join(", ")
        )));
    }

    Ok(CompositeDraft {
        achievement: NewAchievement {
            owner_id: owner_id.to_string(),
            achievement_type: AchievementType::Composite,
            title: Some(rule.result_type.clone()),
            institution: None,
            gpa_value: None,
            verified_at: Some(now),
        },
        token: NewToken {
            owner_id: owner_id.to_string(),
            nft_type: rule.result_type.clone(),
            level: COMPOSITE_LEVEL,
            rarity: rule.rarity,
            evolution_points: rule.bonus_points,
            is_composite: true,
            stacked_achievement_ids: sources.iter().map(|token| token.achievement_id).collect(),
        },
    })
}

/// Institution every source achievement names, if they agree on one
pub fn shared_institution(sources: &[AchievementRecord]) -> Option<String> {
    let (first, rest) = sources.split_first()?;
    let institution = first.institution.as_deref()?;
    rest.iter()
        .all(|record| {
            record
                .institution
                .as_deref()
                .is_some_and(|other| other.eq_ignore_ascii_case(institution))
        })
        .then(|| institution.to_string())
}

#[tracing::instrument(skip(store, rules), fields(owner_id = %owner_id))]
pub async fn stacking_opportunities_for_owner(
    store: &dyn TokenStore,
    rules: &RuleTable,
    owner_id: &str,
) -> Result<Vec<StackingOpportunity>, DomainError> {
    let tokens = store.list_tokens_by_owner(owner_id).await?;
    Ok(find_stacking_opportunities(&tokens, &rules.stacking))
}

/// Create a composite for the owner from the given source tokens
#[tracing::instrument(skip(store, rules), fields(owner_id = %owner_id, result_type = %result_type))]
pub async fn mint_composite(
    store: &dyn TokenStore,
    rules: &RuleTable,
    owner_id: &str,
    result_type: &str,
    source_token_ids: &[i64],
) -> Result<(AchievementRecord, EvolvableToken), DomainError> {
    let rule = rules
        .stacking_rule(result_type)
        .ok_or_else(|| DomainError::NotFound(format!("stacking rule {}", result_type)))?;

    let owner_tokens = store.list_tokens_by_owner(owner_id).await?;
    let mut draft = create_composite(owner_id, rule, source_token_ids, &owner_tokens, Utc::now())?;

    let mut sources = Vec::with_capacity(draft.token.stacked_achievement_ids.len());
    for achievement_id in &draft.token.stacked_achievement_ids {
        sources.push(store.get_achievement(*achievement_id).await?);
    }
    draft.achievement.institution = shared_institution(&sources);

    let entry = LedgerEntry::award(draft.token.evolution_points, "stacking bonus");
    let (achievement, token) = store
        .create_composite(&draft.achievement, &draft.token, &entry)
        .await?;

    info!(
        token_id = token.id,
        achievement_id = achievement.id,
        rarity = %token.rarity,
        "Created composite token"
    );
    Ok((achievement, token))
}

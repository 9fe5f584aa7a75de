use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::db::{with_retry, TokenStore};
use crate::domain::{DomainError, MAX_UPDATE_ATTEMPTS};
use crate::models::{EvolvableToken, LedgerEntry, PointEventKind, Rarity, TokenPatch};
use crate::rules::RuleTable;

/// Result of a successful level-up
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvolutionOutcome {
    pub token_id: i64,
    pub previous_level: i32,
    pub new_level: i32,
    pub rarity: Rarity,
    pub points_spent: i64,
    pub evolution_points: i64,
    pub unlocked_bonuses: Vec<String>,
    pub visual: Value,
}

/// Result of a point award, with the evolution readiness it leaves behind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointsAward {
    pub token_id: i64,
    pub amount: i64,
    pub reason: String,
    pub previous_points: i64,
    pub evolution_points: i64,
    pub level: i32,
    pub can_evolve: bool,
    /// Cost of the next level, None at the top of the ladder
    pub next_level_required: Option<i64>,
}

/// Move a token one level up, spending the level's cost.
/// The token is left untouched on failure.
pub fn evolve(token: &mut EvolvableToken, rules: &RuleTable) -> Result<EvolutionOutcome, DomainError> {
    let next = rules
        .next_level(token.level)
        .ok_or(DomainError::MaxLevelReached { level: token.level })?;

    if token.evolution_points < next.required_points {
        return Err(DomainError::InsufficientPoints {
            required: next.required_points,
            current: token.evolution_points,
        });
    }

    let previous_level = token.level;
    token.level = next.level;
    token.evolution_points -= next.required_points;
    if let Some(upgrade) = next.rarity_upgrade {
        token.rarity = token.rarity.max(upgrade);
    }

    Ok(EvolutionOutcome {
        token_id: token.id,
        previous_level,
        new_level: token.level,
        rarity: token.rarity,
        points_spent: next.required_points,
        evolution_points: token.evolution_points,
        unlocked_bonuses: next.unlocks_bonuses.clone(),
        visual: next.visual.clone(),
    })
}

/// Adjust a token's balance by a signed amount without evolving it
pub fn add_points(
    token: &mut EvolvableToken,
    amount: i64,
    reason: &str,
    rules: &RuleTable,
) -> Result<PointsAward, DomainError> {
    let reason = reason.trim();
    if reason.is_empty() {
        return Err(DomainError::Validation("a reason is required when awarding points".to_string()));
    }

    let balance = token
        .evolution_points
        .checked_add(amount)
        .ok_or_else(|| DomainError::Validation(format!("award of {} overflows the balance", amount)))?;
    if balance < 0 {
        return Err(DomainError::Validation(format!(
            "deducting {} would leave token {} with a negative balance",
            -amount, token.id
        )));
    }

    let previous_points = token.evolution_points;
    token.evolution_points = balance;

    let next_level_required = rules.next_level(token.level).map(|next| next.required_points);

    Ok(PointsAward {
        token_id: token.id,
        amount,
        reason: reason.to_string(),
        previous_points,
        evolution_points: balance,
        level: token.level,
        can_evolve: next_level_required.is_some_and(|required| balance >= required),
        next_level_required,
    })
}

/// Award points to a stored token, recording the ledger entry with the write
#[tracing::instrument(skip(store, rules), fields(token_id = token_id, amount = amount))]
pub async fn award_points(
    store: &dyn TokenStore,
    rules: &RuleTable,
    token_id: i64,
    amount: i64,
    reason: &str,
) -> Result<(EvolvableToken, PointsAward), DomainError> {
    let (token, award) = with_retry(MAX_UPDATE_ATTEMPTS, || async move {
        let mut token = store.get_token(token_id).await?;
        let expected_version = token.version;
        let award = add_points(&mut token, amount, reason, rules)?;
        let entry = LedgerEntry::award(amount, award.reason.clone());
        let stored = store
            .update_token(token_id, &TokenPatch::from(&token), expected_version, &entry)
            .await?;
        Ok::<_, DomainError>((stored, award))
    })
    .await?;

    info!(
        balance = token.evolution_points,
        can_evolve = award.can_evolve,
        "Awarded points"
    );
    Ok((token, award))
}

/// Evolve a stored token one level, recording the ledger entry with the write
#[tracing::instrument(skip(store, rules), fields(token_id = token_id))]
pub async fn evolve_token(
    store: &dyn TokenStore,
    rules: &RuleTable,
    token_id: i64,
) -> Result<(EvolvableToken, EvolutionOutcome), DomainError> {
    let attempt = with_retry(MAX_UPDATE_ATTEMPTS, || async move {
        let mut token = store.get_token(token_id).await?;
        let expected_version = token.version;
        let outcome = evolve(&mut token, rules)?;
        let entry = LedgerEntry {
            delta: -outcome.points_spent,
            reason: format!("evolved to level {}", outcome.new_level),
            kind: PointEventKind::Evolution,
        };
        let stored = store
            .update_token(token_id, &TokenPatch::from(&token), expected_version, &entry)
            .await?;
        Ok::<_, DomainError>((stored, outcome))
    })
    .await;

    let (token, outcome) = match attempt {
        Ok(evolved) => evolved,
        Err(e @ (DomainError::InsufficientPoints { .. } | DomainError::MaxLevelReached { .. })) => {
            info!(reason = %e, "Token not evolved");
            return Err(e);
        }
        Err(e) => return Err(e),
    };

    info!(
        level = outcome.new_level,
        rarity = %outcome.rarity,
        balance = outcome.evolution_points,
        "Token evolved"
    );
    Ok((token, outcome))
}

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::db::TokenStore;
use crate::domain::points::{compute_initial_points, gpa_points, PointFactors};
use crate::domain::DomainError;
use crate::models::{
    AchievementRecord, AchievementType, EvolvableToken, LedgerEntry, NewAchievement, NewToken,
    SubmitAchievementRequest, MIN_LEVEL,
};
use crate::rules::RuleTable;

const GPA_SCALE: u32 = 2;

/// What the external verifier suggests doing with a submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendedAction {
    Approve,
    Reject,
    ManualReview,
}

/// Body of the internal verify route
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VerificationSignal {
    #[serde(default)]
    pub confidence: Option<u32>,
    #[serde(default)]
    pub recommended_action: Option<RecommendedAction>,
}

fn clean(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Record a new unverified achievement for the owner
#[tracing::instrument(skip(store, rules, request), fields(owner_id = %owner_id, achievement_type = %request.achievement_type))]
pub async fn submit_achievement(
    store: &dyn TokenStore,
    rules: &RuleTable,
    owner_id: &str,
    request: &SubmitAchievementRequest,
) -> Result<AchievementRecord, DomainError> {
    match (request.achievement_type, request.gpa_value) {
        (AchievementType::Composite, _) => {
            return Err(DomainError::Validation(
                "composite achievements are created through stacking".to_string(),
            ));
        }
        (AchievementType::Gpa, None) => {
            return Err(DomainError::Validation("GPA achievements require a gpa_value".to_string()));
        }
        (AchievementType::Gpa, Some(gpa)) => {
            // Stored as NUMERIC(3, 2)
            if gpa.normalize().scale() > GPA_SCALE {
                return Err(DomainError::Validation(format!(
                    "gpa_value {} has more than {} decimal places",
                    gpa, GPA_SCALE
                )));
            }
            // Rejects GPAs below the eligibility threshold
            gpa_points(gpa, &rules.points)?;
        }
        (kind, Some(_)) => {
            return Err(DomainError::Validation(format!(
                "gpa_value is only accepted for gpa achievements, not {}",
                kind
            )));
        }
        (_, None) => {}
    }

    let record = store
        .create_achievement(&NewAchievement {
            owner_id: owner_id.to_string(),
            achievement_type: request.achievement_type,
            title: clean(&request.title),
            institution: clean(&request.institution),
            gpa_value: request.gpa_value,
            verified_at: None,
        })
        .await?;

    info!(achievement_id = record.id, "Achievement submitted");
    Ok(record)
}

/// Mark an achievement verified and mint its level-1 token
#[tracing::instrument(skip(store, rules), fields(achievement_id = achievement_id))]
pub async fn verify_achievement(
    store: &dyn TokenStore,
    rules: &RuleTable,
    achievement_id: i64,
    signal: &VerificationSignal,
) -> Result<(AchievementRecord, EvolvableToken), DomainError> {
    let achievement = store.get_achievement(achievement_id).await?;
    if achievement.verified {
        info!("Achievement already verified");
        return Err(DomainError::Validation(format!(
            "achievement {} is already verified",
            achievement_id
        )));
    }
    if signal.recommended_action == Some(RecommendedAction::Reject) {
        return Err(DomainError::Validation(format!(
            "verifier rejected achievement {}",
            achievement_id
        )));
    }

    let nft_type = rules
        .nft_type_for(achievement.achievement_type)
        .ok_or_else(|| {
            DomainError::Validation(format!(
                "{} achievements cannot be verified directly",
                achievement.achievement_type
            ))
        })?;

    let factors = PointFactors {
        confidence: signal.confidence,
        institution: achievement.institution.clone(),
    };
    let points = compute_initial_points(
        achievement.achievement_type,
        achievement.gpa_value,
        &factors,
        &rules.points,
    )?;

    let draft = NewToken {
        owner_id: achievement.owner_id.clone(),
        nft_type: nft_type.to_string(),
        level: MIN_LEVEL,
        rarity: rules.rarity_at(MIN_LEVEL),
        evolution_points: points,
        is_composite: false,
        stacked_achievement_ids: vec![],
    };

    let entry = LedgerEntry::award(points, "initial points");
    let (achievement, token) = match store.verify_and_mint(achievement_id, Utc::now(), &draft, &entry).await {
        Ok(minted) => minted,
        // Lost a race with another verifier
        Err(e) => match DomainError::from(e) {
            DomainError::Conflict(msg) => return Err(DomainError::Validation(msg)),
            other => return Err(other),
        },
    };

    info!(
        token_id = token.id,
        nft_type = %token.nft_type,
        points = token.evolution_points,
        "Achievement verified and token minted"
    );
    Ok((achievement, token))
}

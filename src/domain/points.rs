use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::domain::DomainError;
use crate::models::AchievementType;
use crate::rules::PointRules;

const MAX_CONFIDENCE: u32 = 100;

/// Optional inputs that add bonuses to the base points
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointFactors {
    /// Verification confidence, 0-100
    pub confidence: Option<u32>,
    pub institution: Option<String>,
}

/// Points for a GPA: floor((gpa - threshold) * 100) + base.
/// Rejects values below the threshold or above 4.0.
pub fn gpa_points(gpa: Decimal, rules: &PointRules) -> Result<i64, DomainError> {
    let max_gpa = Decimal::new(40, 1);
    if gpa < rules.gpa_threshold || gpa > max_gpa {
        return Err(DomainError::Validation(format!(
            "GPA {} is outside the eligible range {} to {}",
            gpa, rules.gpa_threshold, max_gpa
        )));
    }

    let above = ((gpa - rules.gpa_threshold) * Decimal::ONE_HUNDRED).floor();
    let above = above
        .to_i64()
        .ok_or_else(|| DomainError::Internal(format!("GPA {} does not fit in points", gpa)))?;

    above
        .checked_add(rules.gpa_base)
        .ok_or_else(|| DomainError::Internal(format!("GPA points for {} overflow", gpa)))
}

/// Initial evolution points for a freshly minted token
pub fn compute_initial_points(
    achievement_type: AchievementType,
    gpa_value: Option<Decimal>,
    factors: &PointFactors,
    rules: &PointRules,
) -> Result<i64, DomainError> {
    let base = match achievement_type {
        AchievementType::Gpa => {
            let gpa = gpa_value.ok_or_else(|| {
                DomainError::Validation("GPA achievements require a gpa_value".to_string())
            })?;
            gpa_points(gpa, rules)?
        }
        AchievementType::Research => rules.research_base,
        AchievementType::Leadership => rules.leadership_base,
        AchievementType::Composite => rules.default_base,
    };

    let confidence_bonus = match factors.confidence {
        Some(confidence) if confidence > MAX_CONFIDENCE => {
            return Err(DomainError::Validation(format!(
                "confidence {} exceeds {}",
                confidence, MAX_CONFIDENCE
            )));
        }
        Some(confidence) => rules.confidence_bonus(confidence),
        None => 0,
    };

    let institution_bonus = match factors.institution.as_deref() {
        Some(institution) if rules.is_partner_institution(institution) => rules.institution_bonus,
        _ => 0,
    };

    base.checked_add(confidence_bonus)
        .and_then(|points| points.checked_add(institution_bonus))
        .ok_or_else(|| DomainError::Internal("initial points overflow the rule table's range".to_string()))
}

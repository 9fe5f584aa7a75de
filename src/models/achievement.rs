use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of academic accomplishment an achievement record claims
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AchievementType {
    Gpa,
    Research,
    Leadership,
    Composite,
}

impl AchievementType {
    /// Database string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gpa => "gpa",
            Self::Research => "research",
            Self::Leadership => "leadership",
            Self::Composite => "composite",
        }
    }

    /// Human readable label used in metadata
    pub fn label(&self) -> &'static str {
        match self {
            Self::Gpa => "GPA",
            Self::Research => "Research",
            Self::Leadership => "Leadership",
            Self::Composite => "Composite",
        }
    }
}

impl fmt::Display for AchievementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AchievementType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gpa" => Ok(Self::Gpa),
            "research" => Ok(Self::Research),
            "leadership" => Ok(Self::Leadership),
            "composite" => Ok(Self::Composite),
            other => Err(format!("unknown achievement type '{}'", other)),
        }
    }
}

/// One claimed academic accomplishment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AchievementRecord {
    pub id: i64,
    pub owner_id: String,
    #[serde(rename = "type")]
    pub achievement_type: AchievementType,
    pub title: Option<String>,
    pub institution: Option<String>,
    pub gpa_value: Option<Decimal>,
    pub verified: bool,
    pub verified_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Achievement data before the store assigns an id.
///
/// `verified_at` is only set for synthesized composite achievements, which
/// are born verified.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAchievement {
    pub owner_id: String,
    pub achievement_type: AchievementType,
    pub title: Option<String>,
    pub institution: Option<String>,
    pub gpa_value: Option<Decimal>,
    pub verified_at: Option<DateTime<Utc>>,
}

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod domain;
pub mod models;
pub mod rules;
pub mod secrets;

// Re-export commonly used types
pub use models::{
    AchievementRecord, AchievementType, EvolvableToken, PointEvent, Rarity,
};

pub use db::{with_retry, DatabaseError, InMemoryStore, PgTokenStore, TokenStore};

pub use domain::{
    add_points, compute_initial_points, evolve, find_stacking_opportunities, project_metadata,
    DomainError,
};

pub use rules::{RuleTable, DEFAULT_RULE_TABLE};

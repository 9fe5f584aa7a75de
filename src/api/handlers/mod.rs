// Handlers are thin: extract, call the domain layer, map errors.
// Routes under /internal are for the verification service on the private network.

pub mod achievements;
pub mod sessions;
pub mod stacking;
pub mod tokens;

pub use achievements::{
    achievement_metadata_handler, get_achievement_handler, submit_achievement_handler,
    verify_achievement_handler,
};
pub use sessions::logout_handler;
pub use stacking::{create_composite_handler, stacking_opportunities_handler};
pub use tokens::{
    award_points_handler, evolve_token_handler, get_token_handler, owner_tokens_handler,
    token_history_handler,
};

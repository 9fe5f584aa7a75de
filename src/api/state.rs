use std::sync::Arc;

use crate::auth::SessionStore;
use crate::db::TokenStore;
use crate::rules::RuleTable;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn TokenStore>,
    pub rules: Arc<RuleTable>,
    pub sessions: Arc<dyn SessionStore>,
    pub jwt_secret: Arc<str>,
    pub image_base_uri: Arc<str>,
}

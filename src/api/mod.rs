pub mod error;
pub mod handlers;
pub mod server;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use server::{build_state, create_app, init_tracing, run_server};
pub use state::AppState;

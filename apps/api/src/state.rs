use std::sync::Arc;

use tokio::sync::RwLock;

use crate::config::Config;
use crate::llm_client::LlmClient;
use crate::session::Session;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub llm: Arc<LlmClient>,
    pub config: Config,
    /// The single analysis session. One user at a time is a stated non-goal
    /// boundary, so a server-wide lock is sufficient.
    pub session: Arc<RwLock<Session>>,
}

use std::sync::Arc;

use crate::use_cases::SessionRegistry;

#[derive(Clone)]
pub struct AppState {
    // Registry of active sessions; the only cross-connection shared state.
    pub session_registry: Arc<SessionRegistry>,
}

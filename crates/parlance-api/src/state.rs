//! Application state shared across all route handlers.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parlance_dialog::Assistant;

/// Shared application state.
///
/// The assistant is fully registered before it is wrapped here and is only
/// read afterwards, so no locking is needed.
#[derive(Clone)]
pub struct AppState {
    pub assistant: Arc<Assistant>,
    /// Bearer token required on `POST /webhook`; `None` leaves it open.
    pub webhook_token: Option<String>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(assistant: Assistant, webhook_token: Option<String>) -> Self {
        Self {
            assistant: Arc::new(assistant),
            webhook_token,
            started_at: Utc::now(),
        }
    }

    pub fn uptime_secs(&self) -> u64 {
        (Utc::now() - self.started_at).num_seconds().max(0) as u64
    }
}

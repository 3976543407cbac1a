//! Shared application state.

use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::config::Config;

/// State shared by every worker
#[derive(Clone)]
pub struct AppState {
    /// Global configuration
    pub config: Arc<Config>,
    /// When this process started serving
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(config: Arc<Config>) -> Self {
        Self {
            config,
            started_at: Utc::now(),
        }
    }

    /// Seconds since the server started
    pub fn uptime_secs(&self) -> i64 {
        (Utc::now() - self.started_at).num_seconds()
    }
}

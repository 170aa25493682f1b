// crates/server/src/state.rs
//! Application state for the Axum server.

use std::sync::Arc;
use std::time::Instant;

use trailview_core::ConfigStore;

use crate::live::Broadcaster;

/// Shared application state accessible from all route handlers.
pub struct AppState {
    /// Server start time for uptime reporting.
    pub start_time: Instant,
    /// Handle on the config file; every request loads a fresh snapshot.
    pub config: ConfigStore,
    /// Per-session live feed hub.
    pub broadcaster: Broadcaster,
}

impl AppState {
    /// Create a new application state wrapped in an Arc for sharing.
    pub fn new(config: ConfigStore) -> Arc<Self> {
        Arc::new(Self {
            start_time: Instant::now(),
            broadcaster: Broadcaster::new(config.clone()),
            config,
        })
    }
}

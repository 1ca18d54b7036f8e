//! Shared application state for the harbor server

use std::sync::Arc;

use chrono::{DateTime, Utc};
use harbor_core::{AggregateRouteTable, ExtensionSummary};

/// Shared application state accessible by all handlers
#[derive(Debug, Clone)]
pub struct AppState {
    /// Dispatch table built at start-up
    pub routes: Arc<AggregateRouteTable>,
    /// Extensions collected at start-up
    pub extensions: Arc<[ExtensionSummary]>,
    /// When the server started
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(routes: Arc<AggregateRouteTable>, extensions: Vec<ExtensionSummary>) -> Self {
        Self {
            routes,
            extensions: extensions.into(),
            started_at: Utc::now(),
        }
    }

    /// Returns how long the server has been running
    pub fn uptime_seconds(&self) -> i64 {
        (Utc::now() - self.started_at).num_seconds()
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(Arc::new(AggregateRouteTable::default()), Vec::new())
    }
}

//! REST API handlers

use std::sync::Arc;

use axum::{Json, extract::State};
use harbor_core::plugins::RouteInfo;
use harbor_core::ExtensionSummary;
use serde::{Deserialize, Serialize};

use crate::AppState;

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Status of the server
    pub status: String,
    /// Server version
    pub version: String,
    /// Seconds since server started
    pub uptime_seconds: i64,
    /// Number of servable routes
    pub routes: usize,
    /// Number of collected extensions
    pub extensions: usize,
}

/// Health check endpoint
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.uptime_seconds(),
        routes: state.routes.len(),
        extensions: state.extensions.len(),
    })
}

/// Every entry of the aggregate route table, in dispatch order
pub async fn list_routes(State(state): State<Arc<AppState>>) -> Json<Vec<RouteInfo>> {
    Json(state.routes.describe())
}

/// Extensions collected at start-up
pub async fn list_extensions(State(state): State<Arc<AppState>>) -> Json<Vec<ExtensionSummary>> {
    Json(state.extensions.to_vec())
}

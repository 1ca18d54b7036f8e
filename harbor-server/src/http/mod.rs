//! HTTP server module

mod api;
mod plugins;

use std::sync::Arc;

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::AppState;

pub use api::HealthResponse;
pub use plugins::{handle_table_route, table_router};

/// Create the HTTP router with all routes configured.
///
/// The host API lives under `/api`; every other request is served from the
/// aggregate route table.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(api::health))
        .route("/api/routes", get(api::list_routes))
        .route("/api/extensions", get(api::list_extensions))
        .merge(table_router())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

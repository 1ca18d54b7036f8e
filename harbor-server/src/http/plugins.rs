//! Fallback handler dispatching into the aggregate route table

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    extract::{Request, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use harbor_plugin_api::{HttpMethod, RouteRequest, RouteResponse};
use serde_json::json;

use crate::AppState;

/// Largest request body handed to a route handler
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Convert axum Method to plugin HttpMethod
fn to_http_method(method: &axum::http::Method) -> Option<HttpMethod> {
    match *method {
        axum::http::Method::GET => Some(HttpMethod::Get),
        axum::http::Method::POST => Some(HttpMethod::Post),
        axum::http::Method::PUT => Some(HttpMethod::Put),
        axum::http::Method::DELETE => Some(HttpMethod::Delete),
        axum::http::Method::PATCH => Some(HttpMethod::Patch),
        _ => None,
    }
}

/// Serve any request not claimed by the host's own API
pub async fn handle_table_route(State(state): State<Arc<AppState>>, request: Request) -> Response {
    let Some(method) = to_http_method(request.method()) else {
        return (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed").into_response();
    };

    let path = request.uri().path().to_string();
    let query = parse_query(request.uri().query());
    let headers = extract_headers(request.headers());

    let body = match axum::body::to_bytes(request.into_body(), MAX_BODY_BYTES).await {
        Ok(b) => b.to_vec(),
        Err(_) => {
            return (StatusCode::BAD_REQUEST, "Failed to read body").into_response();
        }
    };

    let route_request = RouteRequest {
        params: HashMap::new(),
        query,
        body,
        headers,
    };

    match state.routes.dispatch(method, &path, route_request) {
        None => json_response(StatusCode::NOT_FOUND, json!({"error": "Not found"})),
        Some(Ok(resp)) => to_response(resp),
        Some(Err(e)) => {
            tracing::warn!(method = %method, path = %path, error = %e, "Route handler failed");
            json_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({"error": e.to_string()}),
            )
        }
    }
}

fn to_response(resp: RouteResponse) -> Response {
    Response::builder()
        .status(resp.status)
        .header("Content-Type", resp.content_type)
        .body(Body::from(resp.body))
        .unwrap_or_else(|e| {
            tracing::error!("Failed to build HTTP response: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
        })
}

fn json_response(status: StatusCode, body: serde_json::Value) -> Response {
    (
        status,
        [("Content-Type", "application/json")],
        body.to_string(),
    )
        .into_response()
}

fn parse_query(query: Option<&str>) -> HashMap<String, String> {
    query
        .map(|q| {
            url::form_urlencoded::parse(q.as_bytes())
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect()
        })
        .unwrap_or_default()
}

fn extract_headers(headers: &axum::http::HeaderMap) -> HashMap<String, String> {
    headers
        .iter()
        .filter_map(|(k, v)| v.to_str().ok().map(|val| (k.to_string(), val.to_string())))
        .collect()
}

/// Router whose fallback serves the aggregate route table
pub fn table_router() -> Router<Arc<AppState>> {
    Router::new().fallback(handle_table_route)
}

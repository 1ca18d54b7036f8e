//! HTTP types for plugin route contributions
//!
//! Plugins contribute routes in two shapes:
//!
//! - [`DeclarativeRoute`]: a [`RoutePredicate`] paired with a handler function,
//!   appended directly to the host dispatch table.
//! - [`HandlerObject`]: an object describing its own request mappings. The host
//!   registers it as a singleton keyed by its concrete type name and resolves
//!   the mappings into routes.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::error::PluginError;

/// HTTP method for route registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
}

impl HttpMethod {
    /// Upper-case method name as it appears on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Patch => "PATCH",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request predicate: method, path pattern and optional accepted media type.
///
/// Path parameters use `:name` syntax: `/quarantine/:id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePredicate {
    /// HTTP method
    pub method: HttpMethod,
    /// Path pattern
    pub path: String,
    /// Media type the client must accept, e.g. `text/plain`
    pub accept: Option<String>,
}

impl RoutePredicate {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            accept: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, path)
    }

    /// Builder: only match requests whose `Accept` header admits `media_type`
    pub fn accept(mut self, media_type: impl Into<String>) -> Self {
        self.accept = Some(media_type.into());
        self
    }

    /// Check the content-negotiation part of the predicate.
    ///
    /// A missing `Accept` header admits everything, as does a predicate
    /// without an accepted media type.
    pub fn accepts(&self, accept_header: Option<&str>) -> bool {
        let (Some(media_type), Some(header)) = (self.accept.as_deref(), accept_header) else {
            return true;
        };

        header
            .split(',')
            .filter_map(|range| range.split(';').next())
            .map(str::trim)
            .any(|range| media_range_matches(range, media_type))
    }
}

impl fmt::Display for RoutePredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)?;
        if let Some(accept) = &self.accept {
            write!(f, " [accept {}]", accept)?;
        }
        Ok(())
    }
}

fn media_range_matches(range: &str, media_type: &str) -> bool {
    if range == "*/*" || range.eq_ignore_ascii_case(media_type) {
        return true;
    }
    match (range.strip_suffix("/*"), media_type.split_once('/')) {
        (Some(range_type), Some((top, _))) => range_type.eq_ignore_ascii_case(top),
        _ => false,
    }
}

/// Incoming HTTP request passed to plugin handlers
#[derive(Debug, Default)]
pub struct RouteRequest {
    /// Path parameters extracted from route pattern (e.g., ":id" -> "123")
    pub params: HashMap<String, String>,
    /// Query parameters
    pub query: HashMap<String, String>,
    /// Request body as bytes
    pub body: Vec<u8>,
    /// Request headers
    pub headers: HashMap<String, String>,
}

impl RouteRequest {
    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// HTTP response from plugin handler
#[derive(Debug)]
pub struct RouteResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body
    pub body: Vec<u8>,
    /// Content-Type header
    pub content_type: String,
}

impl RouteResponse {
    /// Create a JSON response
    pub fn json<T: Serialize>(status: u16, data: &T) -> Result<Self, PluginError> {
        Ok(Self {
            status,
            body: serde_json::to_vec(data).map_err(|e| PluginError::Json(e.to_string()))?,
            content_type: "application/json".to_string(),
        })
    }

    /// Create a plain text response
    pub fn text(status: u16, text: impl Into<String>) -> Self {
        Self {
            status,
            body: text.into().into_bytes(),
            content_type: "text/plain".to_string(),
        }
    }

    /// Create an empty response with status code
    pub fn empty(status: u16) -> Self {
        Self {
            status,
            body: vec![],
            content_type: "application/json".to_string(),
        }
    }
}

/// Handler function attached to a declarative route
pub type RouteHandler =
    Arc<dyn Fn(&RouteRequest) -> Result<RouteResponse, PluginError> + Send + Sync>;

/// A predicate plus the handler that serves it
#[derive(Clone)]
pub struct DeclarativeRoute {
    pub predicate: RoutePredicate,
    pub handler: RouteHandler,
}

impl DeclarativeRoute {
    pub fn new<F>(predicate: RoutePredicate, handler: F) -> Self
    where
        F: Fn(&RouteRequest) -> Result<RouteResponse, PluginError> + Send + Sync + 'static,
    {
        Self {
            predicate,
            handler: Arc::new(handler),
        }
    }

    /// Invoke the handler
    pub fn handle(&self, request: &RouteRequest) -> Result<RouteResponse, PluginError> {
        (self.handler)(request)
    }
}

impl fmt::Debug for DeclarativeRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeclarativeRoute")
            .field("predicate", &self.predicate)
            .finish_non_exhaustive()
    }
}

/// Shorthand for [`DeclarativeRoute::new`]
pub fn route<F>(predicate: RoutePredicate, handler: F) -> DeclarativeRoute
where
    F: Fn(&RouteRequest) -> Result<RouteResponse, PluginError> + Send + Sync + 'static,
{
    DeclarativeRoute::new(predicate, handler)
}

/// One request mapping exposed by a [`HandlerObject`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerMapping {
    /// Predicate relative to the object's base path
    pub predicate: RoutePredicate,
    /// Endpoint name passed back to [`HandlerObject::handle`]
    pub endpoint: String,
}

impl HandlerMapping {
    pub fn new(predicate: RoutePredicate, endpoint: impl Into<String>) -> Self {
        Self {
            predicate,
            endpoint: endpoint.into(),
        }
    }
}

/// An object registered into the host's handler registry.
///
/// The host keys registrations by [`HandlerObject::type_name`]; registering a
/// second object with the same key replaces the first.
pub trait HandlerObject: Send + Sync {
    /// Registration key. Defaults to the concrete Rust type name.
    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Path prefix applied to every mapping
    fn base_path(&self) -> &str {
        ""
    }

    /// Request mappings this object serves
    fn mappings(&self) -> Vec<HandlerMapping>;

    /// Serve a request for one of the endpoints named in [`Self::mappings`]
    fn handle(&self, endpoint: &str, request: &RouteRequest)
    -> Result<RouteResponse, PluginError>;
}

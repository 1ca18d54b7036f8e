//! The aggregate route table and its path matching

use std::collections::HashMap;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use harbor_plugin_api::{
    DeclarativeRoute, HandlerObject, HttpMethod, PluginError, RouteHandler, RoutePredicate,
    RouteRequest, RouteResponse,
};
use serde::Serialize;

use super::namespace::Namespace;

/// The extension a route contribution came from
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ContributionOwner {
    pub unit_id: String,
    /// Type name of the contributing extension
    pub extension: String,
}

impl ContributionOwner {
    pub fn new(unit_id: impl Into<String>, extension: impl Into<String>) -> Self {
        Self {
            unit_id: unit_id.into(),
            extension: extension.into(),
        }
    }
}

impl fmt::Display for ContributionOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.unit_id, self.extension)
    }
}

/// Where a table entry came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RouteSource {
    /// Host-provided route
    Base,
    /// Declarative route contributed by an extension
    Declarative { owner: ContributionOwner },
    /// Mapping of a registered handler object
    Handler {
        owner: ContributionOwner,
        type_name: String,
    },
}

impl fmt::Display for RouteSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Base => f.write_str("base"),
            Self::Declarative { owner } => write!(f, "{}", owner),
            Self::Handler { owner, type_name } => write!(f, "{} ({})", owner, type_name),
        }
    }
}

/// Path matcher supporting `:param` segments
#[derive(Debug, Clone)]
pub struct PathMatcher {
    segments: Vec<PathSegment>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum PathSegment {
    Literal(String),
    Param(String),
}

impl PathMatcher {
    pub fn new(path: &str) -> Self {
        let segments = path
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| {
                if let Some(name) = s.strip_prefix(':') {
                    PathSegment::Param(name.to_string())
                } else {
                    PathSegment::Literal(s.to_string())
                }
            })
            .collect();

        Self { segments }
    }

    /// Match a concrete request path, returning extracted parameters
    pub fn match_path(&self, path: &str) -> Option<HashMap<String, String>> {
        let path_parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        if path_parts.len() != self.segments.len() {
            return None;
        }

        let mut params = HashMap::new();

        for (segment, part) in self.segments.iter().zip(path_parts.iter()) {
            match segment {
                PathSegment::Literal(expected) => {
                    if expected != *part {
                        return None;
                    }
                }
                PathSegment::Param(name) => {
                    params.insert(name.clone(), (*part).to_string());
                }
            }
        }

        Some(params)
    }

    /// Whether every path `other` matches is also matched by `self`
    pub fn covers(&self, other: &PathMatcher) -> bool {
        self.segments.len() == other.segments.len()
            && self
                .segments
                .iter()
                .zip(&other.segments)
                .all(|(mine, theirs)| match (mine, theirs) {
                    (PathSegment::Param(_), _) => true,
                    (PathSegment::Literal(a), PathSegment::Literal(b)) => a == b,
                    (PathSegment::Literal(_), PathSegment::Param(_)) => false,
                })
    }
}

/// What serves a table entry
#[derive(Clone)]
enum RouteTarget {
    Function(RouteHandler),
    Handler {
        object: Arc<dyn HandlerObject>,
        endpoint: String,
    },
}

/// One servable route.
///
/// A plugin route holds a handle on its unit's namespace; the target is
/// declared first so it is dropped while that code is still mapped.
#[derive(Clone)]
pub struct TableRoute {
    predicate: RoutePredicate,
    source: RouteSource,
    target: RouteTarget,
    matcher: PathMatcher,
    namespace: Option<Arc<dyn Namespace>>,
}

impl TableRoute {
    pub(crate) fn declarative(route: DeclarativeRoute, source: RouteSource) -> Self {
        let matcher = PathMatcher::new(&route.predicate.path);
        Self {
            predicate: route.predicate,
            source,
            target: RouteTarget::Function(route.handler),
            matcher,
            namespace: None,
        }
    }

    pub(crate) fn handler(
        predicate: RoutePredicate,
        object: Arc<dyn HandlerObject>,
        endpoint: String,
        source: RouteSource,
    ) -> Self {
        let matcher = PathMatcher::new(&predicate.path);
        Self {
            predicate,
            source,
            target: RouteTarget::Handler { object, endpoint },
            matcher,
            namespace: None,
        }
    }

    /// Keep `namespace` loaded for as long as this route exists
    pub(crate) fn with_namespace(mut self, namespace: Option<Arc<dyn Namespace>>) -> Self {
        self.namespace = namespace;
        self
    }

    /// Whether this route pins a plugin namespace
    pub fn pins_namespace(&self) -> bool {
        self.namespace.is_some()
    }

    pub fn predicate(&self) -> &RoutePredicate {
        &self.predicate
    }

    pub fn source(&self) -> &RouteSource {
        &self.source
    }

    /// Whether `later`, placed after `self`, can never be reached.
    ///
    /// True when the methods are equal, this route's path pattern covers the
    /// later one, and this route accepts at least what the later one does.
    pub fn shadows(&self, later: &TableRoute) -> bool {
        self.predicate.method == later.predicate.method
            && self.matcher.covers(&later.matcher)
            && match (&self.predicate.accept, &later.predicate.accept) {
                (None, _) => true,
                (Some(mine), Some(theirs)) => mine.eq_ignore_ascii_case(theirs),
                (Some(_), None) => false,
            }
    }

    fn invoke(&self, request: &RouteRequest) -> Result<RouteResponse, PluginError> {
        match &self.target {
            RouteTarget::Function(handler) => handler(request),
            RouteTarget::Handler { object, endpoint } => object.handle(endpoint, request),
        }
    }
}

impl fmt::Debug for TableRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableRoute")
            .field("predicate", &self.predicate)
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

/// Serializable description of a table entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteInfo {
    pub method: String,
    pub path: String,
    pub accept: Option<String>,
    pub source: RouteSource,
}

/// The merged, immutable dispatch table.
///
/// Lookup is first match in table order: base routes, then declarative
/// routes in extension order, then handler-object mappings.
#[derive(Debug, Clone, Default)]
pub struct AggregateRouteTable {
    routes: Vec<TableRoute>,
}

impl AggregateRouteTable {
    pub(crate) fn from_routes(routes: Vec<TableRoute>) -> Self {
        Self { routes }
    }

    pub fn routes(&self) -> &[TableRoute] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn describe(&self) -> Vec<RouteInfo> {
        self.routes
            .iter()
            .map(|r| RouteInfo {
                method: r.predicate.method.to_string(),
                path: r.predicate.path.clone(),
                accept: r.predicate.accept.clone(),
                source: r.source.clone(),
            })
            .collect()
    }

    /// Find the first route serving the request
    pub fn match_route(
        &self,
        method: HttpMethod,
        path: &str,
        accept: Option<&str>,
    ) -> Option<(&TableRoute, HashMap<String, String>)> {
        for route in &self.routes {
            if route.predicate.method == method
                && route.predicate.accepts(accept)
                && let Some(params) = route.matcher.match_path(path)
            {
                return Some((route, params));
            }
        }
        None
    }

    /// Serve a request. `None` when no route matches.
    ///
    /// Path parameters are filled into `request`. A handler panic is
    /// reported as an error instead of unwinding into the caller.
    pub fn dispatch(
        &self,
        method: HttpMethod,
        path: &str,
        mut request: RouteRequest,
    ) -> Option<Result<RouteResponse, PluginError>> {
        let accept = request.header("accept").map(str::to_string);
        let (route, params) = self.match_route(method, path, accept.as_deref())?;
        request.params = params;

        let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| route.invoke(&request)));
        Some(match outcome {
            Ok(result) => result,
            Err(_) => {
                tracing::error!(
                    route = %route.predicate,
                    source = %route.source,
                    "Route handler panicked"
                );
                Err(PluginError::custom("route handler panicked"))
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use harbor_plugin_api::{HandlerMapping, route};

    fn text_route(predicate: RoutePredicate, body: &'static str) -> TableRoute {
        TableRoute::declarative(
            route(predicate, move |_| Ok(RouteResponse::text(200, body))),
            RouteSource::Base,
        )
    }

    fn body(response: RouteResponse) -> String {
        String::from_utf8(response.body).unwrap()
    }

    #[test]
    fn test_path_parameter_extraction() {
        let matcher = PathMatcher::new("/sessions/:session_id/messages/:msg_id");
        let params = matcher.match_path("/sessions/abc/messages/123").unwrap();
        assert_eq!(params.get("session_id"), Some(&"abc".to_string()));
        assert_eq!(params.get("msg_id"), Some(&"123".to_string()));
        assert!(matcher.match_path("/sessions/abc").is_none());
    }

    #[test]
    fn test_covers() {
        let param = PathMatcher::new("/items/:id");
        let literal = PathMatcher::new("/items/42");
        assert!(param.covers(&literal));
        assert!(!literal.covers(&param));
        assert!(literal.covers(&PathMatcher::new("/items/42/")));
        assert!(!param.covers(&PathMatcher::new("/items")));
    }

    #[test]
    fn test_shadowing_respects_method_and_accept() {
        let plain = text_route(RoutePredicate::get("/hello"), "a");
        let text = text_route(RoutePredicate::get("/hello").accept("text/plain"), "b");
        let post = text_route(RoutePredicate::post("/hello"), "c");

        assert!(plain.shadows(&text));
        assert!(!text.shadows(&plain));
        assert!(!plain.shadows(&post));
    }

    #[test]
    fn test_first_match_wins() {
        let table = AggregateRouteTable::from_routes(vec![
            text_route(RoutePredicate::get("/x"), "first"),
            text_route(RoutePredicate::get("/x"), "second"),
        ]);
        let response = table
            .dispatch(HttpMethod::Get, "/x", RouteRequest::default())
            .unwrap()
            .unwrap();
        assert_eq!(body(response), "first");
    }

    #[test]
    fn test_accept_negotiation() {
        let table = AggregateRouteTable::from_routes(vec![text_route(
            RoutePredicate::get("/hello").accept("text/plain"),
            "hi",
        )]);
        assert!(
            table
                .match_route(HttpMethod::Get, "/hello", Some("application/json"))
                .is_none()
        );
        assert!(
            table
                .match_route(HttpMethod::Get, "/hello", Some("text/*"))
                .is_some()
        );
        assert!(table.match_route(HttpMethod::Get, "/hello", None).is_some());
    }

    #[test]
    fn test_dispatch_no_match() {
        let table = AggregateRouteTable::default();
        assert!(
            table
                .dispatch(HttpMethod::Get, "/nothing", RouteRequest::default())
                .is_none()
        );
    }

    #[test]
    fn test_dispatch_fills_params() {
        let table = AggregateRouteTable::from_routes(vec![TableRoute::declarative(
            route(RoutePredicate::get("/greet/:name"), |req| {
                Ok(RouteResponse::text(200, format!("hi {}", req.params["name"])))
            }),
            RouteSource::Base,
        )]);
        let response = table
            .dispatch(HttpMethod::Get, "/greet/ada", RouteRequest::default())
            .unwrap()
            .unwrap();
        assert_eq!(body(response), "hi ada");
    }

    #[test]
    fn test_dispatch_contains_panics() {
        let table = AggregateRouteTable::from_routes(vec![TableRoute::declarative(
            route(RoutePredicate::get("/boom"), |_| panic!("boom")),
            RouteSource::Base,
        )]);
        let result = table
            .dispatch(HttpMethod::Get, "/boom", RouteRequest::default())
            .unwrap();
        assert!(result.is_err());
    }

    struct Echo;

    impl HandlerObject for Echo {
        fn mappings(&self) -> Vec<HandlerMapping> {
            vec![HandlerMapping::new(RoutePredicate::get("/echo"), "echo")]
        }
        fn handle(
            &self,
            endpoint: &str,
            _request: &RouteRequest,
        ) -> Result<RouteResponse, PluginError> {
            Ok(RouteResponse::text(200, endpoint))
        }
    }

    #[test]
    fn test_handler_target_receives_endpoint() {
        let owner = ContributionOwner::new("unit", "Ext");
        let table = AggregateRouteTable::from_routes(vec![TableRoute::handler(
            RoutePredicate::get("/echo"),
            Arc::new(Echo),
            "echo".into(),
            RouteSource::Handler {
                owner,
                type_name: "Echo".into(),
            },
        )]);
        let response = table
            .dispatch(HttpMethod::Get, "/echo", RouteRequest::default())
            .unwrap()
            .unwrap();
        assert_eq!(body(response), "echo");

        let described = table.describe();
        assert_eq!(described[0].method, "GET");
        assert_eq!(described[0].source.to_string(), "unit/Ext (Echo)");
    }
}

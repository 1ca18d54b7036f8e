//! Routes the host itself contributes ahead of every plugin route

use harbor_core::ExtensionSummary;
use harbor_plugin_api::{DeclarativeRoute, RoutePredicate, RouteResponse, route};

/// Body served by `GET /hello`
pub const HELLO_GREETING: &str = "Reactive endpoint on container";

/// Base routes: `GET /plugins` and `GET /hello` (text/plain).
///
/// `/plugins` lists every collected extension as `"<type name>: <identity>"`
/// in collection order.
pub fn builtin_routes(extensions: &[ExtensionSummary]) -> Vec<DeclarativeRoute> {
    let listing: Vec<String> = extensions.iter().map(ToString::to_string).collect();

    vec![
        route(RoutePredicate::get("/plugins"), move |_| {
            RouteResponse::json(200, &listing)
        }),
        route(RoutePredicate::get("/hello").accept("text/plain"), |_| {
            Ok(RouteResponse::text(200, HELLO_GREETING))
        }),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use harbor_plugin_api::RouteRequest;

    #[test]
    fn test_plugins_route_lists_identities() {
        let summaries = vec![ExtensionSummary {
            unit_id: "greeter".into(),
            type_name: "greeter_plugin::Greeter".into(),
            identity: "says hello".into(),
            ordinal: Some(1),
        }];
        let routes = builtin_routes(&summaries);
        let response = routes[0].handle(&RouteRequest::default()).unwrap();
        assert_eq!(response.content_type, "application/json");
        let listing: Vec<String> = serde_json::from_slice(&response.body).unwrap();
        assert_eq!(listing, vec!["greeter_plugin::Greeter: says hello"]);
    }

    #[test]
    fn test_hello_requires_text_plain() {
        let routes = builtin_routes(&[]);
        assert!(routes[1].predicate.accepts(Some("text/plain")));
        assert!(!routes[1].predicate.accepts(Some("application/json")));
    }
}

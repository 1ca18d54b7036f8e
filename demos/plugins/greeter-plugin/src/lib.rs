//! Greeter Plugin - sample plugin exercising every contribution kind
//!
//! - registers a plugin-scoped `GreetProvider` service in `start`
//! - contributes an extension (ordinal 1) whose identity comes from that service
//! - serves `GET /plugin-end-point` as a declarative route
//! - serves `GET /plugin-mvc-controller` through a handler object
//!
//! The greeting is read from the bundle's `config.toml`:
//!
//! ```toml
//! greeting = "Hello from my bundle"
//! ```

use std::sync::Arc;

use harbor_plugin_api::{
    DeclarativeRoute, Extension, ExtensionRegistrar, HandlerMapping, HandlerObject, Plugin,
    PluginContext, PluginError, RoutePredicate, RouteRequest, RouteResponse, export_plugin, route,
};

/// Service name the provider is registered under
pub const GREET_PROVIDER: &str = "greet_provider";

const DEFAULT_GREETING: &str = "Greetings from the greeter plugin";

/// Supplies the text the extension identifies itself with
pub struct GreetProvider {
    greeting: String,
}

impl GreetProvider {
    pub fn new(greeting: impl Into<String>) -> Self {
        Self {
            greeting: greeting.into(),
        }
    }

    pub fn greeting(&self) -> &str {
        &self.greeting
    }
}

#[derive(Default)]
pub struct GreeterPlugin;

pub struct GreeterExtension {
    provider: Arc<GreetProvider>,
}

impl Extension for GreeterExtension {
    fn identify(&self) -> String {
        self.provider.greeting().to_string()
    }

    fn declarative_routes(&self) -> Result<Vec<DeclarativeRoute>, PluginError> {
        Ok(vec![route(RoutePredicate::get("/plugin-end-point"), |_req| {
            Ok(RouteResponse::text(200, "reactive router endpoint"))
        })])
    }

    fn handler_objects(&self) -> Result<Vec<Arc<dyn HandlerObject>>, PluginError> {
        Ok(vec![Arc::new(PluginController)])
    }

    fn ordinal(&self) -> Option<i32> {
        Some(1)
    }
}

/// Controller-style handler mounted under `/plugin-mvc-controller`
pub struct PluginController;

impl HandlerObject for PluginController {
    fn base_path(&self) -> &str {
        "/plugin-mvc-controller"
    }

    fn mappings(&self) -> Vec<HandlerMapping> {
        vec![HandlerMapping::new(RoutePredicate::get(""), "endpoint")]
    }

    fn handle(
        &self,
        endpoint: &str,
        _request: &RouteRequest,
    ) -> Result<RouteResponse, PluginError> {
        match endpoint {
            "endpoint" => Ok(RouteResponse::text(
                200,
                "An endpoint defined by annotation in plugin",
            )),
            other => Err(PluginError::UnknownEndpoint(other.to_string())),
        }
    }
}

impl Plugin for GreeterPlugin {
    fn start(&mut self, ctx: &mut PluginContext) -> Result<(), PluginError> {
        let greeting: String = ctx
            .config_get("greeting")
            .unwrap_or_else(|| DEFAULT_GREETING.to_string());
        ctx.register_service(GREET_PROVIDER, GreetProvider::new(greeting));
        ctx.log_info("Greeter plugin started");
        Ok(())
    }

    fn stop(&mut self, ctx: &mut PluginContext) -> Result<(), PluginError> {
        ctx.log_info("Greeter plugin stopped");
        Ok(())
    }

    fn register_extensions(
        &self,
        registrar: &mut ExtensionRegistrar<'_>,
    ) -> Result<(), PluginError> {
        let provider = registrar.dependency::<GreetProvider>(GREET_PROVIDER)?;
        registrar.register_extension(GreeterExtension { provider });
        Ok(())
    }
}

export_plugin!(GreeterPlugin);

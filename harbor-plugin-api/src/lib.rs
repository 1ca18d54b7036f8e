//! harbor-plugin-api - Plugin API for the harbor plugin host
//!
//! This crate provides the traits and types needed to write plugins for harbor.
//! Plugins are native Rust dynamic libraries. Each one has a start/stop
//! lifecycle and contributes zero or more [`Extension`]s, which expose an
//! identity and HTTP routes that the host merges into its own dispatch table.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use harbor_plugin_api::{
//!     DeclarativeRoute, Extension, ExtensionRegistrar, HandlerObject, Plugin, PluginContext,
//!     PluginError, RoutePredicate, RouteResponse, export_plugin, route,
//! };
//!
//! #[derive(Default)]
//! pub struct MyPlugin;
//!
//! struct MyExtension;
//!
//! impl Extension for MyExtension {
//!     fn identify(&self) -> String {
//!         "my extension".to_string()
//!     }
//!
//!     fn declarative_routes(&self) -> Result<Vec<DeclarativeRoute>, PluginError> {
//!         Ok(vec![route(RoutePredicate::get("/mine"), |_req| {
//!             Ok(RouteResponse::text(200, "mine"))
//!         })])
//!     }
//!
//!     fn handler_objects(&self) -> Result<Vec<Arc<dyn HandlerObject>>, PluginError> {
//!         Ok(Vec::new())
//!     }
//! }
//!
//! impl Plugin for MyPlugin {
//!     fn start(&mut self, ctx: &mut PluginContext) -> Result<(), PluginError> {
//!         ctx.log_info("started");
//!         Ok(())
//!     }
//!
//!     fn stop(&mut self, _ctx: &mut PluginContext) -> Result<(), PluginError> {
//!         Ok(())
//!     }
//!
//!     fn register_extensions(&self, registrar: &mut ExtensionRegistrar<'_>) -> Result<(), PluginError> {
//!         registrar.register_extension(MyExtension);
//!         Ok(())
//!     }
//! }
//!
//! export_plugin!(MyPlugin);
//! ```

pub mod context;
pub mod error;
pub mod extension;
pub mod http;
pub mod types;

pub use context::{PluginConfig, PluginContext};
pub use error::PluginError;
pub use extension::{
    Extension, ExtensionRegistrar, ExtensionRegistration, InstanceBuilder, NoDependencies,
};
pub use http::{
    DeclarativeRoute, HandlerMapping, HandlerObject, HttpMethod, RouteHandler, RoutePredicate,
    RouteRequest, RouteResponse, route,
};
pub use types::PluginManifest;

/// Current plugin API version. Plugins must match this exactly.
/// This will be checked when loading plugins to ensure compatibility.
pub const API_VERSION: u32 = 1;

/// Symbol exported by [`export_plugin!`] when no custom entry point is given.
pub const DEFAULT_ENTRY_POINT: &str = "_harbor_plugin_create";

/// Symbol exported by [`export_plugin!`] that reports [`API_VERSION`].
pub const API_VERSION_SYMBOL: &str = "_harbor_plugin_api_version";

/// The plugin trait - implement this to create a harbor plugin.
///
/// The host drives the lifecycle: the plugin is instantiated at load time,
/// `start` runs once, then `register_extensions` is asked for the plugin's
/// extension instances. `stop` runs during shutdown. A stopped plugin is never
/// started again; the host loads a fresh instance instead.
pub trait Plugin: Send + Sync {
    /// Called when the host starts the plugin.
    fn start(&mut self, ctx: &mut PluginContext) -> Result<(), PluginError>;

    /// Called when the host stops the plugin.
    fn stop(&mut self, ctx: &mut PluginContext) -> Result<(), PluginError>;

    /// Register the extension instances this plugin contributes.
    ///
    /// Runs after a successful `start`. Dependencies are resolved through the
    /// registrar: services the plugin registered on its own context first,
    /// then the host's instance builder.
    fn register_extensions(
        &self,
        _registrar: &mut ExtensionRegistrar<'_>,
    ) -> Result<(), PluginError> {
        Ok(())
    }
}

/// Export a plugin type for dynamic loading.
///
/// This macro generates the C ABI entry points that harbor uses to load
/// plugins dynamically.
///
/// # Usage
///
/// ```ignore
/// harbor_plugin_api::export_plugin!(MyPlugin);
/// // or with a custom entry point named in plugin.toml
/// harbor_plugin_api::export_plugin!(MyPlugin, my_plugin_entry);
/// ```
///
/// # Generated Functions
///
/// - `_harbor_plugin_create()` (or the custom name): creates a plugin instance
/// - `_harbor_plugin_api_version()`: returns the API version
#[macro_export]
macro_rules! export_plugin {
    ($plugin_type:ty) => {
        $crate::export_plugin!($plugin_type, _harbor_plugin_create);
    };
    ($plugin_type:ty, $entry:ident) => {
        #[unsafe(no_mangle)]
        #[allow(improper_ctypes_definitions)]
        pub extern "C" fn $entry() -> *mut dyn $crate::Plugin {
            let plugin: Box<dyn $crate::Plugin> = Box::new(<$plugin_type>::default());
            Box::into_raw(plugin)
        }

        #[unsafe(no_mangle)]
        pub extern "C" fn _harbor_plugin_api_version() -> u32 {
            $crate::API_VERSION
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_version_is_set() {
        assert_eq!(API_VERSION, 1);
    }

    #[test]
    fn test_plugin_trait_is_object_safe() {
        // This compiles only if Plugin is object-safe
        fn _takes_boxed_plugin(_: Box<dyn Plugin>) {}
    }

    #[test]
    fn test_extension_trait_is_object_safe() {
        fn _takes_arc_extension(_: std::sync::Arc<dyn Extension>) {}
    }

    #[test]
    fn test_default_register_extensions_is_empty() {
        struct Bare;
        impl Plugin for Bare {
            fn start(&mut self, _ctx: &mut PluginContext) -> Result<(), PluginError> {
                Ok(())
            }
            fn stop(&mut self, _ctx: &mut PluginContext) -> Result<(), PluginError> {
                Ok(())
            }
        }

        let ctx = PluginContext::new("bare".into(), std::path::PathBuf::from("/tmp"));
        let mut registrar = ExtensionRegistrar::new(&ctx, &NoDependencies);
        Bare.register_extensions(&mut registrar).unwrap();
        assert!(registrar.into_registrations().is_empty());
    }
}

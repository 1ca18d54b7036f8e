//! Plugin system for harbor
//!
//! This module provides the infrastructure for hosting plugins:
//!
//! - [`PluginHost`]: start-up and shutdown of every unit
//! - [`PluginRegistry`]: discovery, loading and per-unit lifecycle
//! - [`collect`]: extensions of the started units, in deterministic order
//! - [`aggregate`]: merge base routes and contributions into an [`AggregateRouteTable`]
//! - [`PluginHostError`]: Error types for plugin operations
//!
//! # Plugin Discovery
//!
//! Plugins are discovered from one directory, `~/.config/harbor/plugins/` by
//! default. Each bundle is a subdirectory containing:
//! - `plugin.toml` - id, version, optional entry point and library name
//! - `lib<id>.so` (or `.dylib`/`.dll`) - the plugin binary
//! - `config.toml` (optional) - plugin configuration
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use harbor_core::{Dependencies, HostConfig, PluginHost};
//!
//! let mut host = PluginHost::with_dylibs(HostConfig::default(), Arc::new(Dependencies::new()));
//! let report = host.start_up(Vec::new())?;
//! let table = host.route_table();
//! // ... serve requests from `table` ...
//! drop(table);
//! host.shutdown()?;
//! ```

mod aggregate;
mod collector;
mod descriptor;
mod error;
mod handlers;
mod host;
mod namespace;
mod registry;
mod routes;
mod unit;

pub use aggregate::{Aggregation, RouteCollisionWarning, aggregate};
pub use collector::{CollectedExtension, ExtensionSummary, collect};
pub use descriptor::{Discovery, MANIFEST_FILE, PluginDescriptor, discover_plugins};
pub use error::{ErrorKind, PluginHostError, UnitFailure};
pub use handlers::HandlerRegistry;
pub use host::{PluginHost, StartupReport};
pub use namespace::{
    DylibNamespaceProvider, Namespace, NamespaceProvider, PluginFactory, StaticNamespaceProvider,
};
pub use registry::{PLUGIN_CONFIG_FILE, PluginRegistry};
pub use routes::{
    AggregateRouteTable, ContributionOwner, PathMatcher, RouteInfo, RouteSource, TableRoute,
};
pub use unit::{PluginUnit, UnitState};

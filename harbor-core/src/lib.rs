//! harbor-core: plugin host runtime
//!
//! This crate discovers plugin bundles, loads each into its own namespace,
//! drives their lifecycle and merges the routes they contribute:
//!
//! - **Discovery and lifecycle** - [`PluginRegistry`] and [`PluginUnit`]
//! - **Extension collection** - [`collect`], ordered by ordinal then discovery
//! - **Route aggregation** - [`aggregate`] into an immutable [`AggregateRouteTable`]
//! - **Host controller** - [`PluginHost`] tying the steps together
//!
//! # Architecture
//!
//! ```text
//! discover → load → start → collect → aggregate → serve
//!                                                   │
//!            unload ← stop (reverse order) ←────────┘
//! ```

pub mod config;
pub mod dependencies;
pub mod plugins;

pub use config::HostConfig;
pub use dependencies::Dependencies;
pub use plugins::{
    AggregateRouteTable, Aggregation, CollectedExtension, ErrorKind, ExtensionSummary,
    HandlerRegistry, PluginDescriptor, PluginHost, PluginHostError, PluginRegistry, PluginUnit,
    RouteCollisionWarning, StartupReport, StaticNamespaceProvider, UnitFailure, UnitState,
    aggregate, collect,
};

//! Route aggregation - merge base routes and extension contributions
//!
//! Declarative routes are concatenated: base routes first, then every
//! extension's routes in collector order. Lookup is first-match, so a later
//! route covered by an earlier one is unreachable and reported. Handler
//! objects go through the [`HandlerRegistry`], where the last registration for
//! a type name wins and the replacement is reported.

use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use harbor_plugin_api::{DeclarativeRoute, HandlerObject, PluginError};
use serde::Serialize;

use super::collector::CollectedExtension;
use super::error::{ErrorKind, PluginHostError, UnitFailure};
use super::handlers::HandlerRegistry;
use super::namespace::Namespace;
use super::routes::{AggregateRouteTable, ContributionOwner, RouteSource, TableRoute};

/// Diagnostic produced while merging routes. Never an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RouteCollisionWarning {
    /// A route placed after `shadowed_by` that can never be reached
    ShadowedRoute {
        route: String,
        source: RouteSource,
        shadowed_by: RouteSource,
    },
    /// A handler object replaced an earlier one with the same type name
    HandlerReplaced {
        type_name: String,
        previous: ContributionOwner,
        replacement: ContributionOwner,
    },
}

impl fmt::Display for RouteCollisionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ShadowedRoute {
                route,
                source,
                shadowed_by,
            } => write!(
                f,
                "route '{}' from {} is shadowed by {}",
                route, source, shadowed_by
            ),
            Self::HandlerReplaced {
                type_name,
                previous,
                replacement,
            } => write!(
                f,
                "handler '{}' from {} replaced by {}",
                type_name, previous, replacement
            ),
        }
    }
}

/// Result of aggregation
#[derive(Debug)]
pub struct Aggregation {
    pub table: AggregateRouteTable,
    pub warnings: Vec<RouteCollisionWarning>,
    /// Extensions whose route-building code failed
    pub failures: Vec<UnitFailure>,
}

/// Everything one extension contributes, built before anything is committed
struct Contribution {
    owner: ContributionOwner,
    routes: Vec<DeclarativeRoute>,
    handlers: Vec<Arc<dyn HandlerObject>>,
    namespace: Option<Arc<dyn Namespace>>,
}

/// Merge `base` and the contributions of `extensions` into one table.
///
/// Extensions are taken in the given order. Declarative routes are built
/// first; if that fails or panics the extension contributes nothing. If its
/// handler objects then fail, its declarative routes stay and only the
/// handlers are skipped. Either failure is reported in
/// [`Aggregation::failures`]. The handler registry is sealed afterwards.
pub fn aggregate(
    base: Vec<DeclarativeRoute>,
    extensions: &[CollectedExtension],
    handlers: &mut HandlerRegistry,
) -> Aggregation {
    let mut warnings = Vec::new();
    let mut failures = Vec::new();

    let mut contributions = Vec::with_capacity(extensions.len());
    for ext in extensions {
        let mut report = |e: PluginHostError| {
            tracing::error!(
                plugin = %ext.unit_id,
                extension = %ext.type_name,
                error = %e,
                "Extension failed to build routes"
            );
            failures.push(UnitFailure::from_error(&ext.unit_id, &e));
        };

        let routes = match build_routes(ext) {
            Ok(routes) => routes,
            Err(e) => {
                report(e);
                continue;
            }
        };
        let handlers = build_handlers(ext).unwrap_or_else(|e| {
            report(e);
            Vec::new()
        });
        contributions.push(Contribution {
            owner: ContributionOwner::new(&ext.unit_id, &ext.type_name),
            routes,
            handlers,
            namespace: ext.namespace.clone(),
        });
    }

    let mut routes: Vec<TableRoute> = base
        .into_iter()
        .map(|r| TableRoute::declarative(r, RouteSource::Base))
        .collect();

    for contribution in &mut contributions {
        let owner = contribution.owner.clone();
        let namespace = contribution.namespace.clone();
        routes.extend(contribution.routes.drain(..).map(|r| {
            TableRoute::declarative(
                r,
                RouteSource::Declarative {
                    owner: owner.clone(),
                },
            )
            .with_namespace(namespace.clone())
        }));
    }

    for contribution in contributions {
        for object in contribution.handlers {
            let type_name = object.type_name().to_string();
            let registered = handlers.register_scoped(
                contribution.owner.clone(),
                object,
                contribution.namespace.clone(),
            );
            match registered {
                Ok(Some(previous)) => warnings.push(RouteCollisionWarning::HandlerReplaced {
                    type_name,
                    previous,
                    replacement: contribution.owner.clone(),
                }),
                Ok(None) => {}
                Err(e) => failures.push(UnitFailure::new(
                    &contribution.owner.unit_id,
                    ErrorKind::Lifecycle,
                    e.to_string(),
                )),
            }
        }
    }
    routes.extend(handlers.resolve_mappings());
    handlers.seal();

    for (idx, later) in routes.iter().enumerate() {
        if let Some(earlier) = routes[..idx].iter().find(|r| r.shadows(later)) {
            warnings.push(RouteCollisionWarning::ShadowedRoute {
                route: later.predicate().to_string(),
                source: later.source().clone(),
                shadowed_by: earlier.source().clone(),
            });
        }
    }

    for warning in &warnings {
        tracing::warn!(%warning, "Route collision");
    }

    Aggregation {
        table: AggregateRouteTable::from_routes(routes),
        warnings,
        failures,
    }
}

fn build_routes(ext: &CollectedExtension) -> Result<Vec<DeclarativeRoute>, PluginHostError> {
    guarded(ext, || ext.instance.declarative_routes())
}

fn build_handlers(
    ext: &CollectedExtension,
) -> Result<Vec<Arc<dyn HandlerObject>>, PluginHostError> {
    guarded(ext, || {
        let handlers = ext.instance.handler_objects()?;
        // Surface panics in mapping code now rather than during resolution
        for handler in &handlers {
            handler.mappings();
        }
        Ok(handlers)
    })
}

/// Run extension code, turning errors and panics into construction failures
fn guarded<T>(
    ext: &CollectedExtension,
    build: impl FnOnce() -> Result<T, PluginError>,
) -> Result<T, PluginHostError> {
    let construction_error = |reason: String| PluginHostError::ExtensionConstruction {
        id: ext.unit_id.clone(),
        extension: ext.type_name.clone(),
        reason,
    };

    match std::panic::catch_unwind(AssertUnwindSafe(build)) {
        Ok(Ok(built)) => Ok(built),
        Ok(Err(e)) => Err(construction_error(e.to_string())),
        Err(_) => Err(construction_error("extension panicked".to_string())),
    }
}

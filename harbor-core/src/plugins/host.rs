//! PluginHost - drives start-up and shutdown of every plugin unit

use std::sync::Arc;

use chrono::{DateTime, Utc};
use harbor_plugin_api::{DeclarativeRoute, InstanceBuilder};
use serde::Serialize;

use super::aggregate::{RouteCollisionWarning, aggregate};
use super::collector::{CollectedExtension, ExtensionSummary, collect};
use super::error::{PluginHostError, UnitFailure};
use super::handlers::HandlerRegistry;
use super::namespace::{DylibNamespaceProvider, NamespaceProvider};
use super::registry::PluginRegistry;
use super::routes::AggregateRouteTable;
use crate::config::HostConfig;

/// What happened during start-up
#[derive(Debug, Clone, Serialize)]
pub struct StartupReport {
    pub discovered: usize,
    pub loaded: usize,
    pub started: usize,
    pub extensions: Vec<ExtensionSummary>,
    pub failures: Vec<UnitFailure>,
    pub warnings: Vec<RouteCollisionWarning>,
    pub route_count: usize,
    pub completed_at: DateTime<Utc>,
}

impl StartupReport {
    pub fn shadowed_routes(&self) -> usize {
        self.warnings
            .iter()
            .filter(|w| matches!(w, RouteCollisionWarning::ShadowedRoute { .. }))
            .count()
    }

    pub fn replaced_handlers(&self) -> usize {
        self.warnings
            .iter()
            .filter(|w| matches!(w, RouteCollisionWarning::HandlerReplaced { .. }))
            .count()
    }

    /// No failures and no collisions
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.warnings.is_empty()
    }
}

/// The host lifecycle controller.
///
/// `start_up` runs discover → load → start → collect → aggregate once.
/// `shutdown` stops every unit in reverse discovery order, then releases
/// the units' namespace handles. Routes in a still shared table hold their
/// own handles, so plugin code stays mapped until the last route is dropped.
pub struct PluginHost {
    // Routes pin the namespaces their code lives in
    table: Arc<AggregateRouteTable>,
    handlers: HandlerRegistry,
    registry: PluginRegistry,
    config: HostConfig,
    started: bool,
}

impl PluginHost {
    pub fn new(
        config: HostConfig,
        provider: Box<dyn NamespaceProvider>,
        builder: Arc<dyn InstanceBuilder>,
    ) -> Self {
        Self {
            table: Arc::new(AggregateRouteTable::default()),
            handlers: HandlerRegistry::new(),
            registry: PluginRegistry::new(config.plugin_dir.clone(), provider, builder),
            config,
            started: false,
        }
    }

    /// Host loading plugins as dynamic libraries
    pub fn with_dylibs(config: HostConfig, builder: Arc<dyn InstanceBuilder>) -> Self {
        Self::new(config, Box::new(DylibNamespaceProvider), builder)
    }

    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    /// Start up with a fixed set of base routes
    pub fn start_up(
        &mut self,
        base_routes: Vec<DeclarativeRoute>,
    ) -> Result<StartupReport, PluginHostError> {
        self.start_up_with(move |_| base_routes)
    }

    /// Start up, building the base routes from the collected extensions.
    ///
    /// Only discovery errors abort start-up. Load and start failures skip the
    /// unit, construction failures skip the extension; all of them end up in
    /// the report.
    pub fn start_up_with<F>(&mut self, base_routes: F) -> Result<StartupReport, PluginHostError>
    where
        F: FnOnce(&[ExtensionSummary]) -> Vec<DeclarativeRoute>,
    {
        if self.started {
            return Err(PluginHostError::AlreadyStarted);
        }

        let descriptors = self.registry.discover()?;
        self.started = true;
        let mut failures = self.registry.skipped().to_vec();

        let mut loaded = Vec::new();
        for descriptor in &descriptors {
            if self.config.is_disabled(descriptor.id()) {
                tracing::info!(plugin = %descriptor.id(), "Plugin disabled, skipping");
                continue;
            }
            match self.registry.load(descriptor) {
                Ok(unit) => loaded.push(unit.id().to_string()),
                Err(e) => {
                    tracing::error!(plugin = %descriptor.id(), error = %e, "Failed to load plugin");
                    failures.push(UnitFailure::from_error(descriptor.id(), &e));
                }
            }
        }

        let mut started = 0;
        for id in &loaded {
            match self.registry.start(id) {
                Ok(()) => started += 1,
                Err(e) => failures.push(UnitFailure::from_error(id, &e)),
            }
        }

        let extensions = collect(&self.registry);
        let summaries: Vec<ExtensionSummary> =
            extensions.iter().map(CollectedExtension::summary).collect();
        tracing::info!(count = summaries.len(), "Found plugin extensions");
        for summary in &summaries {
            tracing::info!(plugin = %summary.unit_id, "{}", summary);
        }

        let aggregation = aggregate(base_routes(&summaries), &extensions, &mut self.handlers);
        failures.extend(aggregation.failures);
        self.table = Arc::new(aggregation.table);

        let report = StartupReport {
            discovered: descriptors.len(),
            loaded: loaded.len(),
            started,
            extensions: summaries,
            failures,
            warnings: aggregation.warnings,
            route_count: self.table.len(),
            completed_at: Utc::now(),
        };

        tracing::info!(
            discovered = report.discovered,
            loaded = report.loaded,
            started = report.started,
            routes = report.route_count,
            failures = report.failures.len(),
            shadowed = report.shadowed_routes(),
            replaced = report.replaced_handlers(),
            "Plugin host started"
        );
        Ok(report)
    }

    /// Shared handle on the aggregate route table
    pub fn route_table(&self) -> Arc<AggregateRouteTable> {
        Arc::clone(&self.table)
    }

    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    pub fn handlers(&self) -> &HandlerRegistry {
        &self.handlers
    }

    /// Extensions of the currently started units
    pub fn collect(&self) -> Vec<CollectedExtension> {
        collect(&self.registry)
    }

    /// Record a runtime fault; the unit's extensions stop being collected
    pub fn mark_failed(&mut self, id: &str, error: &str) -> Result<(), PluginHostError> {
        self.registry.mark_failed(id, error)
    }

    /// Stop every unit in reverse discovery order, then unload them.
    ///
    /// Every unit is attempted regardless of earlier failures; all failures
    /// are returned together. A namespace is only released once no route
    /// table handle outside the host still references it.
    pub fn shutdown(&mut self) -> Result<(), PluginHostError> {
        let ids: Vec<String> = self
            .registry
            .all_units()
            .iter()
            .rev()
            .map(|u| u.id().to_string())
            .collect();

        let mut failures = Vec::new();
        for id in &ids {
            if let Err(e) = self.registry.stop(id) {
                tracing::error!(plugin = %id, error = %e, "Plugin failed to stop");
                failures.push(UnitFailure::from_error(id, &e));
            }
        }

        let table = std::mem::take(&mut self.table);
        if Arc::strong_count(&table) > 1 {
            tracing::info!("Route table still in use, its routes keep plugin namespaces loaded");
        }
        drop(table);
        self.handlers = HandlerRegistry::new();

        for id in &ids {
            if let Err(e) = self.registry.unload(id) {
                failures.push(UnitFailure::from_error(id, &e));
            }
        }

        tracing::info!(units = ids.len(), failures = failures.len(), "Plugin host shut down");
        if failures.is_empty() {
            Ok(())
        } else {
            Err(PluginHostError::Shutdown { failures })
        }
    }
}

impl std::fmt::Debug for PluginHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginHost")
            .field("config", &self.config)
            .field("started", &self.started)
            .field("routes", &self.table.len())
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

//! Plugin registry - the single source of truth for unit lifecycle state

use std::path::{Path, PathBuf};
use std::sync::Arc;

use harbor_plugin_api::{InstanceBuilder, PluginConfig, PluginContext};

use super::collector::CollectedExtension;
use super::descriptor::{PluginDescriptor, discover_plugins};
use super::error::{PluginHostError, UnitFailure};
use super::namespace::NamespaceProvider;
use super::unit::PluginUnit;

/// Optional per-bundle configuration file
pub const PLUGIN_CONFIG_FILE: &str = "config.toml";

/// Tracks every discovered descriptor and every loaded unit.
///
/// Units are kept in discovery order, whatever order they were loaded in.
pub struct PluginRegistry {
    units: Vec<PluginUnit>,
    descriptors: Vec<PluginDescriptor>,
    skipped: Vec<UnitFailure>,
    plugin_dir: PathBuf,
    provider: Box<dyn NamespaceProvider>,
    builder: Arc<dyn InstanceBuilder>,
}

impl PluginRegistry {
    pub fn new(
        plugin_dir: impl Into<PathBuf>,
        provider: Box<dyn NamespaceProvider>,
        builder: Arc<dyn InstanceBuilder>,
    ) -> Self {
        Self {
            units: Vec::new(),
            descriptors: Vec::new(),
            skipped: Vec::new(),
            plugin_dir: plugin_dir.into(),
            provider,
            builder,
        }
    }

    pub fn plugin_dir(&self) -> &Path {
        &self.plugin_dir
    }

    /// Scan the plugin directory and remember what was found
    pub fn discover(&mut self) -> Result<Vec<PluginDescriptor>, PluginHostError> {
        let found = discover_plugins(&self.plugin_dir)?;
        tracing::info!(
            dir = %self.plugin_dir.display(),
            count = found.descriptors.len(),
            skipped = found.skipped.len(),
            "Plugin discovery finished"
        );
        self.descriptors = found.descriptors.clone();
        self.skipped = found.skipped;
        Ok(found.descriptors)
    }

    /// Bundles the last discovery could not use
    pub fn skipped(&self) -> &[UnitFailure] {
        &self.skipped
    }

    /// Descriptors from the last discovery, in discovery order
    pub fn descriptors(&self) -> &[PluginDescriptor] {
        &self.descriptors
    }

    /// Create a namespace for `descriptor`, resolve its entry point and
    /// instantiate the plugin. The unit is left in `Loaded`.
    ///
    /// A unit that already released its namespace is replaced. On failure no
    /// unit is recorded.
    pub fn load(&mut self, descriptor: &PluginDescriptor) -> Result<&PluginUnit, PluginHostError> {
        let id = descriptor.id();
        let existing = self.position(id);
        if let Some(idx) = existing
            && self.units[idx].holds_namespace()
        {
            return Err(PluginHostError::AlreadyLoaded { id: id.to_string() });
        }

        let config_path = descriptor.location().join(PLUGIN_CONFIG_FILE);
        let config =
            PluginConfig::load(&config_path).map_err(|e| PluginHostError::BundleConfig {
                id: id.to_string(),
                path: config_path.clone(),
                reason: e.to_string(),
            })?;

        let namespace = self.provider.create(descriptor)?;
        let instance = namespace.instantiate(descriptor.entry())?;
        let context = PluginContext::with_config(
            id.to_string(),
            descriptor.location().to_path_buf(),
            config,
        );
        let unit = PluginUnit::loaded(descriptor.clone(), namespace, instance, context);

        tracing::info!(plugin = %id, version = %descriptor.version(), "Loaded plugin");

        let idx = match existing {
            Some(idx) => {
                self.units[idx] = unit;
                idx
            }
            None => {
                let rank = self.discovery_rank(id);
                let idx = self
                    .units
                    .iter()
                    .position(|u| self.discovery_rank(u.id()) > rank)
                    .unwrap_or(self.units.len());
                self.units.insert(idx, unit);
                idx
            }
        };
        Ok(&self.units[idx])
    }

    /// Run the start hook and register the unit's extensions
    pub fn start(&mut self, id: &str) -> Result<(), PluginHostError> {
        let builder = Arc::clone(&self.builder);
        let unit = self.unit_mut(id)?;
        match unit.start(builder.as_ref()) {
            Ok(()) => {
                tracing::info!(
                    plugin = %id,
                    extensions = unit.registrations().len(),
                    "Started plugin"
                );
                Ok(())
            }
            Err(e) => {
                tracing::error!(plugin = %id, error = %e, "Plugin failed to start");
                Err(e)
            }
        }
    }

    /// Stop a unit. No-op unless the unit is started.
    pub fn stop(&mut self, id: &str) -> Result<(), PluginHostError> {
        let unit = self.unit_mut(id)?;
        let was_started = unit.is_started();
        let result = unit.stop();
        if was_started {
            tracing::info!(plugin = %id, "Stopped plugin");
        }
        result
    }

    /// Stop if needed, then release extensions, instance and namespace
    pub fn unload(&mut self, id: &str) -> Result<(), PluginHostError> {
        let unit = self.unit_mut(id)?;
        let result = unit.unload();
        tracing::debug!(plugin = %id, state = %unit.state(), "Unloaded plugin");
        result
    }

    /// Record a runtime fault reported by the host
    pub fn mark_failed(&mut self, id: &str, error: &str) -> Result<(), PluginHostError> {
        let unit = self.unit_mut(id)?;
        unit.mark_failed(error)?;
        tracing::warn!(plugin = %id, error = %error, "Plugin marked failed");
        Ok(())
    }

    /// Every unit, in discovery order
    pub fn all_units(&self) -> &[PluginUnit] {
        &self.units
    }

    pub fn unit(&self, id: &str) -> Option<&PluginUnit> {
        self.units.iter().find(|u| u.id() == id)
    }

    /// Every instance registered as capability `T` by a started unit.
    ///
    /// Explicit ordinals come first in ascending order, instances without
    /// one come last. Ties keep discovery order, then registration order.
    pub fn extensions_of<T>(&self) -> Vec<CollectedExtension<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let mut found: Vec<CollectedExtension<T>> = self
            .units
            .iter()
            .filter(|u| u.is_started())
            .flat_map(|unit| {
                unit.registrations().iter().filter_map(move |reg| {
                    reg.downcast::<T>().map(|instance| CollectedExtension {
                        unit_id: unit.id().to_string(),
                        type_name: reg.type_name().to_string(),
                        ordinal: reg.ordinal(),
                        instance,
                        namespace: unit.namespace().cloned(),
                    })
                })
            })
            .collect();

        // Stable: equal keys keep discovery/registration order
        found.sort_by_key(|ext| ordinal_key(ext.ordinal));
        found
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.units.iter().position(|u| u.id() == id)
    }

    fn unit_mut(&mut self, id: &str) -> Result<&mut PluginUnit, PluginHostError> {
        self.units
            .iter_mut()
            .find(|u| u.id() == id)
            .ok_or_else(|| PluginHostError::NotFound { id: id.to_string() })
    }

    /// Position in the last discovery; unknown ids sort after all of them
    fn discovery_rank(&self, id: &str) -> usize {
        self.descriptors
            .iter()
            .position(|d| d.id() == id)
            .unwrap_or(usize::MAX)
    }
}

fn ordinal_key(ordinal: Option<i32>) -> (bool, i32) {
    (ordinal.is_none(), ordinal.unwrap_or_default())
}

impl std::fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("plugin_dir", &self.plugin_dir)
            .field("descriptors", &self.descriptors.len())
            .field("units", &self.units)
            .finish_non_exhaustive()
    }
}

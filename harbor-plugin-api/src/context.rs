//! PluginContext - a plugin's view of the host

use crate::error::PluginError;
use serde::{Serialize, de::DeserializeOwned};
use std::any::Any;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Plugin's interface to the host.
///
/// Passed to the start and stop hooks. Provides:
/// - the plugin's bundle directory and configuration (`config.toml`)
/// - a plugin-scoped service container used when building extensions
/// - logging helpers tagged with the plugin id
pub struct PluginContext {
    plugin_name: String,
    plugin_dir: PathBuf,
    config: PluginConfig,
    /// Plugin-scoped services, resolved before the host's instance builder
    services: HashMap<String, Arc<dyn Any + Send + Sync>>,
}

/// Plugin configuration - key-value store backed by TOML
#[derive(Debug, Clone, Default)]
pub struct PluginConfig {
    values: HashMap<String, toml::Value>,
}

impl PluginContext {
    /// Create a new plugin context
    pub fn new(plugin_name: String, plugin_dir: PathBuf) -> Self {
        Self::with_config(plugin_name, plugin_dir, PluginConfig::new())
    }

    /// Create a context with a pre-loaded config
    pub fn with_config(plugin_name: String, plugin_dir: PathBuf, config: PluginConfig) -> Self {
        Self {
            plugin_name,
            plugin_dir,
            config,
            services: HashMap::new(),
        }
    }

    // ─── Configuration ───────────────────────────────────────────────

    /// Get the plugin's bundle directory
    pub fn plugin_dir(&self) -> &Path {
        &self.plugin_dir
    }

    /// Get the plugin's id
    pub fn plugin_name(&self) -> &str {
        &self.plugin_name
    }

    /// Read a configuration value
    ///
    /// # Example
    /// ```ignore
    /// let greeting: Option<String> = ctx.config_get("greeting");
    /// ```
    pub fn config_get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.config.get(key)
    }

    // ─── Services ────────────────────────────────────────────────────

    /// Register a plugin-scoped service for extension construction.
    ///
    /// Registering the same name twice replaces the earlier service.
    pub fn register_service<T: Send + Sync + 'static>(&mut self, name: &str, service: T) {
        self.services.insert(name.to_string(), Arc::new(service));
    }

    /// Look up a plugin-scoped service
    pub fn service(&self, name: &str) -> Option<Arc<dyn Any + Send + Sync>> {
        self.services.get(name).cloned()
    }

    /// Drop every plugin-scoped service (used by the host on stop)
    pub fn clear_services(&mut self) {
        self.services.clear();
    }

    // ─── Logging ─────────────────────────────────────────────────────

    /// Log an info message (automatically prefixed with plugin name)
    pub fn log_info(&self, message: &str) {
        tracing::info!(plugin = %self.plugin_name, "{}", message);
    }

    /// Log a warning message
    pub fn log_warn(&self, message: &str) {
        tracing::warn!(plugin = %self.plugin_name, "{}", message);
    }

    /// Log an error message
    pub fn log_error(&self, message: &str) {
        tracing::error!(plugin = %self.plugin_name, "{}", message);
    }

    /// Log a debug message
    pub fn log_debug(&self, message: &str) {
        tracing::debug!(plugin = %self.plugin_name, "{}", message);
    }
}

impl PluginConfig {
    /// Create a new empty config
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML file
    ///
    /// Returns an empty config if the file doesn't exist.
    pub fn load(path: &Path) -> Result<Self, PluginError> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let content = std::fs::read_to_string(path)?;
        let values: HashMap<String, toml::Value> =
            toml::from_str(&content).map_err(|e| PluginError::Config(e.to_string()))?;
        Ok(Self { values })
    }

    /// Get a configuration value
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.values.get(key).and_then(|v| v.clone().try_into().ok())
    }

    /// Set a configuration value
    pub fn set<T: Serialize>(&mut self, key: &str, value: T) -> Result<(), PluginError> {
        let toml_value =
            toml::Value::try_from(value).map_err(|e| PluginError::Config(e.to_string()))?;
        self.values.insert(key.to_string(), toml_value);
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

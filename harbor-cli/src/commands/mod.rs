pub mod plugin;
pub mod serve;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use harbor_core::{Dependencies, HostConfig, PluginHost};

use crate::config::ConfigLoader;

/// Dependencies every plugin extension may ask for
pub fn host_dependencies() -> Dependencies {
    Dependencies::new().with("host.version", env!("CARGO_PKG_VERSION").to_string())
}

/// Apply a `--plugin-dir` override to the configured host settings
pub fn override_plugin_dir(mut config: HostConfig, plugin_dir: Option<PathBuf>) -> HostConfig {
    if let Some(dir) = plugin_dir {
        config.plugin_dir = dir;
    }
    config
}

/// Layered host config with the command-line override applied
pub fn load_host_config(plugin_dir: Option<PathBuf>) -> Result<HostConfig> {
    Ok(override_plugin_dir(ConfigLoader::load()?.plugins, plugin_dir))
}

/// Host loading plugins as dynamic libraries from `config.plugin_dir`
pub fn dylib_host(config: HostConfig) -> PluginHost {
    PluginHost::with_dylibs(config, Arc::new(host_dependencies()))
}

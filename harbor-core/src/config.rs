//! Host configuration

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Configuration for [`crate::PluginHost`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Directory scanned for plugin bundles (~/.config/harbor/plugins)
    pub plugin_dir: PathBuf,
    /// Plugin ids that are discovered but never loaded
    pub disabled: Vec<String>,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            plugin_dir: harbor_paths::plugin_dir(),
            disabled: Vec::new(),
        }
    }
}

impl HostConfig {
    pub fn with_plugin_dir(plugin_dir: impl Into<PathBuf>) -> Self {
        Self {
            plugin_dir: plugin_dir.into(),
            ..Self::default()
        }
    }

    pub fn is_disabled(&self, id: &str) -> bool {
        self.disabled.iter().any(|d| d == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_uses_harbor_plugin_dir() {
        let config = HostConfig::default();
        assert!(config.plugin_dir.ends_with("harbor/plugins"));
        assert!(config.disabled.is_empty());
    }

    #[test]
    fn test_parse_partial_toml() {
        let config: HostConfig = toml::from_str("disabled = [\"noisy\"]").unwrap();
        assert!(config.is_disabled("noisy"));
        assert!(!config.is_disabled("quiet"));
        assert_eq!(config.plugin_dir, harbor_paths::plugin_dir());
    }

    #[test]
    fn test_with_plugin_dir() {
        let config = HostConfig::with_plugin_dir("/srv/plugins");
        assert_eq!(config.plugin_dir, PathBuf::from("/srv/plugins"));
    }
}

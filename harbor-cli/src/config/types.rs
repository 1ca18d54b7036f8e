use std::path::PathBuf;

use harbor_core::HostConfig;
use serde::Deserialize;

/// Configuration as stored in TOML files (with optional fields for merging)
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawHarborConfig {
    #[serde(default)]
    pub server: RawServerConfig,

    #[serde(default)]
    pub plugins: RawPluginsConfig,
}

/// Server config as stored in TOML (optional fields for proper merging)
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawServerConfig {
    /// Host to bind the harbor server to
    pub host: Option<String>,

    /// Port for the harbor server
    pub port: Option<u16>,
}

/// Plugin config as stored in TOML
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawPluginsConfig {
    /// Directory scanned for plugin bundles
    pub dir: Option<PathBuf>,

    /// Plugin ids to skip at load time
    pub disabled: Option<Vec<String>>,
}

/// Final configuration with defaults applied
#[derive(Debug, Clone, Default)]
pub struct HarborConfig {
    pub server: ServerSection,
    pub plugins: HostConfig,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSection {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: harbor_server::DEFAULT_PORT,
        }
    }
}

/// Default host for the harbor server
pub const DEFAULT_HOST: &str = "127.0.0.1";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = HarborConfig::default();
        assert_eq!(config.server.host, DEFAULT_HOST);
        assert_eq!(config.server.port, harbor_server::DEFAULT_PORT);
        assert!(config.plugins.disabled.is_empty());
    }

    #[test]
    fn test_parse_raw_sections() {
        let raw: RawHarborConfig = toml::from_str(
            r#"
            [server]
            port = 9000

            [plugins]
            dir = "/srv/harbor/plugins"
            disabled = ["noisy"]
            "#,
        )
        .unwrap();
        assert_eq!(raw.server.port, Some(9000));
        assert!(raw.server.host.is_none());
        assert_eq!(raw.plugins.dir, Some(PathBuf::from("/srv/harbor/plugins")));
        assert_eq!(raw.plugins.disabled, Some(vec!["noisy".to_string()]));
    }

    #[test]
    fn test_empty_file_parses() {
        let raw: RawHarborConfig = toml::from_str("").unwrap();
        assert!(raw.server.port.is_none());
        assert!(raw.plugins.dir.is_none());
    }
}

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use harbor_core::HostConfig;

use super::types::{
    DEFAULT_HOST, HarborConfig, RawHarborConfig, RawPluginsConfig, RawServerConfig, ServerSection,
};

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load merged configuration (user + project)
    pub fn load() -> Result<HarborConfig> {
        Self::load_from(Some(&Self::user_config_path()), &Self::project_config_path())
    }

    /// Load and merge the given files; missing files are skipped
    pub fn load_from(user_path: Option<&Path>, project_path: &Path) -> Result<HarborConfig> {
        let mut raw = RawHarborConfig::default();

        // Layer 1: User config
        if let Some(user_path) = user_path
            && user_path.exists()
        {
            raw = Self::merge_raw(raw, Self::read(user_path)?);
        }

        // Layer 2: Project config
        if project_path.exists() {
            raw = Self::merge_raw(raw, Self::read(project_path)?);
        }

        Ok(Self::finalize(raw))
    }

    /// Get user config path (~/.config/harbor/config.toml)
    pub fn user_config_path() -> PathBuf {
        harbor_paths::config_dir().join("config.toml")
    }

    /// Get project config path
    /// Can be overridden with HARBOR_PROJECT_CONFIG_DIR env var
    pub fn project_config_path() -> PathBuf {
        if let Ok(dir) = std::env::var("HARBOR_PROJECT_CONFIG_DIR") {
            PathBuf::from(dir).join("config.toml")
        } else {
            PathBuf::from(".harbor/config.toml")
        }
    }

    fn read(path: &Path) -> Result<RawHarborConfig> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        toml::from_str(&contents).with_context(|| format!("Invalid config in {}", path.display()))
    }

    /// Merge two raw configs (overlay values override base only if explicitly set)
    fn merge_raw(base: RawHarborConfig, overlay: RawHarborConfig) -> RawHarborConfig {
        RawHarborConfig {
            server: RawServerConfig {
                host: overlay.server.host.or(base.server.host),
                port: overlay.server.port.or(base.server.port),
            },
            plugins: RawPluginsConfig {
                dir: overlay.plugins.dir.or(base.plugins.dir),
                disabled: overlay.plugins.disabled.or(base.plugins.disabled),
            },
        }
    }

    /// Convert raw config to final config with defaults applied
    fn finalize(raw: RawHarborConfig) -> HarborConfig {
        let defaults = HostConfig::default();
        HarborConfig {
            server: ServerSection {
                host: raw.server.host.unwrap_or_else(|| DEFAULT_HOST.to_string()),
                port: raw.server.port.unwrap_or(harbor_server::DEFAULT_PORT),
            },
            plugins: HostConfig {
                plugin_dir: raw.plugins.dir.unwrap_or(defaults.plugin_dir),
                disabled: raw.plugins.disabled.unwrap_or(defaults.disabled),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_no_files_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config =
            ConfigLoader::load_from(Some(&dir.path().join("none.toml")), &dir.path().join("x"))
                .unwrap();
        assert_eq!(config.server.host, DEFAULT_HOST);
        assert_eq!(config.plugins.plugin_dir, harbor_paths::plugin_dir());
    }

    #[test]
    fn test_project_overrides_user() {
        let dir = TempDir::new().unwrap();
        let user = write(
            dir.path(),
            "user.toml",
            "[server]\nport = 8000\nhost = \"0.0.0.0\"\n[plugins]\ndisabled = [\"a\"]\n",
        );
        let project = write(dir.path(), "project.toml", "[server]\nport = 9000\n");

        let config = ConfigLoader::load_from(Some(&user), &project).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.plugins.disabled, vec!["a".to_string()]);
    }

    #[test]
    fn test_invalid_toml_names_the_file() {
        let dir = TempDir::new().unwrap();
        let project = write(dir.path(), "broken.toml", "[server\nport = ");
        let err = ConfigLoader::load_from(None, &project).unwrap_err();
        assert!(format!("{err:#}").contains("broken.toml"));
    }

    #[test]
    #[serial]
    fn test_project_config_path_env_override() {
        // SAFETY: serialized with other tests touching this variable
        unsafe { std::env::set_var("HARBOR_PROJECT_CONFIG_DIR", "/tmp/harbor-e2e") };
        let path = ConfigLoader::project_config_path();
        unsafe { std::env::remove_var("HARBOR_PROJECT_CONFIG_DIR") };
        assert_eq!(path, PathBuf::from("/tmp/harbor-e2e/config.toml"));
    }

    #[test]
    #[serial]
    fn test_project_config_path_default() {
        let path = ConfigLoader::project_config_path();
        assert_eq!(path, PathBuf::from(".harbor/config.toml"));
    }
}

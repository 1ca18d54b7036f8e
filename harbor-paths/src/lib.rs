//! XDG Base Directory paths for harbor.
//!
//! CLI tools should use XDG paths for cross-platform consistency,
//! not platform-native paths.

use std::path::PathBuf;

/// Get the harbor config directory.
///
/// Returns `$XDG_CONFIG_HOME/harbor` if set, otherwise `~/.config/harbor`.
/// This is where the config file and the plugin directory live.
///
/// # Examples
///
/// ```
/// use harbor_paths::config_dir;
///
/// let config = config_dir();
/// let plugin_dir = config.join("plugins");
/// ```
pub fn config_dir() -> PathBuf {
    resolve_config_dir(std::env::var("XDG_CONFIG_HOME").ok(), dirs::home_dir())
}

/// Get the default plugin directory (`<config_dir>/plugins`).
pub fn plugin_dir() -> PathBuf {
    config_dir().join("plugins")
}

fn resolve_config_dir(xdg_config: Option<String>, home: Option<PathBuf>) -> PathBuf {
    match (xdg_config, home) {
        (Some(xdg), _) if !xdg.is_empty() => PathBuf::from(xdg).join("harbor"),
        (_, Some(home)) => home.join(".config/harbor"),
        _ => PathBuf::from(".config/harbor"),
    }
}

//! Plugin bundle manifest

use serde::{Deserialize, Serialize};

/// Contents of a bundle's `plugin.toml`.
///
/// ```toml
/// id = "greeter"
/// version = "0.1.0"
/// description = "Greets people"
/// entry = "_harbor_plugin_create"
/// library = "libgreeter_plugin.so"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginManifest {
    /// Unique plugin id
    pub id: String,
    /// Plugin version (semver)
    pub version: String,
    /// Human-readable description
    #[serde(default)]
    pub description: String,
    /// Entry-point symbol that creates the plugin instance
    #[serde(default = "default_entry")]
    pub entry: String,
    /// Library file name inside the bundle, if it does not follow the
    /// `<id>.so` / `lib<id>.so` convention
    #[serde(default)]
    pub library: Option<String>,
}

fn default_entry() -> String {
    crate::DEFAULT_ENTRY_POINT.to_string()
}

impl Default for PluginManifest {
    fn default() -> Self {
        Self {
            id: String::new(),
            version: "0.0.1".to_string(),
            description: String::new(),
            entry: default_entry(),
            library: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_manifest_uses_default_entry() {
        let manifest: PluginManifest = toml::from_str(
            r#"
            id = "simple"
            version = "1.0.0"
            "#,
        )
        .unwrap();

        assert_eq!(manifest.id, "simple");
        assert_eq!(manifest.entry, crate::DEFAULT_ENTRY_POINT);
        assert!(manifest.library.is_none());
        assert!(manifest.description.is_empty());
    }

    #[test]
    fn test_full_manifest() {
        let manifest: PluginManifest = toml::from_str(
            r#"
            id = "greeter"
            version = "0.2.0"
            description = "Greets people"
            entry = "greeter_entry"
            library = "libgreeter_plugin.so"
            "#,
        )
        .unwrap();

        assert_eq!(manifest.entry, "greeter_entry");
        assert_eq!(manifest.library.as_deref(), Some("libgreeter_plugin.so"));
    }

    #[test]
    fn test_manifest_requires_id() {
        let result: Result<PluginManifest, _> = toml::from_str("version = \"1.0.0\"");
        assert!(result.is_err());
    }
}

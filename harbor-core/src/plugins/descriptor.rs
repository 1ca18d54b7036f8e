//! Plugin discovery - scan the plugin directory for bundle manifests

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use harbor_plugin_api::PluginManifest;
use serde::Serialize;

use super::error::{ErrorKind, PluginHostError, UnitFailure};

/// Manifest file every bundle directory carries
pub const MANIFEST_FILE: &str = "plugin.toml";

/// A discovered, not yet loaded plugin bundle.
///
/// Immutable once discovered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginDescriptor {
    id: String,
    version: String,
    description: String,
    entry: String,
    library: Option<String>,
    location: PathBuf,
}

impl PluginDescriptor {
    pub fn new(manifest: PluginManifest, location: PathBuf) -> Self {
        Self {
            id: manifest.id,
            version: manifest.version,
            description: manifest.description,
            entry: manifest.entry,
            library: manifest.library,
            location,
        }
    }

    /// Parse `<dir>/plugin.toml`
    pub fn from_dir(dir: &Path) -> Result<Self, PluginHostError> {
        let path = dir.join(MANIFEST_FILE);
        let content = std::fs::read_to_string(&path)?;
        let manifest: PluginManifest =
            toml::from_str(&content).map_err(|e| PluginHostError::InvalidManifest {
                path: path.clone(),
                reason: e.to_string(),
            })?;

        if manifest.id.trim().is_empty() {
            return Err(PluginHostError::InvalidManifest {
                path,
                reason: "plugin id is empty".to_string(),
            });
        }

        Ok(Self::new(manifest, dir.to_path_buf()))
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Entry-point symbol resolved inside the unit's namespace
    pub fn entry(&self) -> &str {
        &self.entry
    }

    /// Library file name declared in the manifest, if any
    pub fn library(&self) -> Option<&str> {
        self.library.as_deref()
    }

    /// Bundle directory
    pub fn location(&self) -> &Path {
        &self.location
    }
}

/// Outcome of scanning the plugin directory
#[derive(Debug, Default)]
pub struct Discovery {
    /// Usable bundles, in discovery order
    pub descriptors: Vec<PluginDescriptor>,
    /// Bundles with a broken manifest, keyed by directory name
    pub skipped: Vec<UnitFailure>,
}

/// Scan `dir` for plugin bundles.
///
/// Each immediate subdirectory holding a `plugin.toml` yields one descriptor.
/// Subdirectories are visited in file-name order so discovery order is
/// reproducible. A missing directory yields nothing; an unreadable one, or
/// two bundles sharing an id, is an error. Bundles with a broken manifest are
/// recorded in [`Discovery::skipped`] as load failures.
pub fn discover_plugins(dir: &Path) -> Result<Discovery, PluginHostError> {
    if !dir.exists() {
        tracing::debug!(dir = %dir.display(), "Plugin directory does not exist");
        return Ok(Discovery::default());
    }

    let unreadable = |source: std::io::Error| PluginHostError::DirUnreadable {
        path: dir.to_path_buf(),
        source,
    };

    let mut bundle_dirs = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(unreadable)? {
        let path = entry.map_err(unreadable)?.path();
        if path.is_dir() && path.join(MANIFEST_FILE).is_file() {
            bundle_dirs.push(path);
        }
    }
    bundle_dirs.sort();

    let mut found = Discovery::default();
    let mut seen: HashMap<String, PathBuf> = HashMap::new();

    for bundle in bundle_dirs {
        let descriptor = match PluginDescriptor::from_dir(&bundle) {
            Ok(d) => d,
            Err(e) => {
                tracing::warn!(path = %bundle.display(), error = %e, "Skipping plugin bundle");
                let name = bundle
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                found
                    .skipped
                    .push(UnitFailure::new(name, ErrorKind::Load, e.to_string()));
                continue;
            }
        };

        if let Some(first) = seen.get(descriptor.id()) {
            return Err(PluginHostError::DuplicateId {
                id: descriptor.id().to_string(),
                first: first.clone(),
                second: bundle,
            });
        }

        tracing::debug!(
            plugin = %descriptor.id(),
            version = %descriptor.version(),
            path = %bundle.display(),
            "Discovered plugin"
        );
        seen.insert(descriptor.id().to_string(), bundle);
        found.descriptors.push(descriptor);
    }

    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_bundle(root: &Path, dir_name: &str, manifest: &str) -> PathBuf {
        let dir = root.join(dir_name);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(MANIFEST_FILE), manifest).unwrap();
        dir
    }

    #[test]
    fn test_discover_missing_dir_is_empty() {
        let found = discover_plugins(Path::new("/nonexistent/harbor/plugins")).unwrap();
        assert!(found.descriptors.is_empty());
        assert!(found.skipped.is_empty());
    }

    #[test]
    fn test_discover_empty_dir() {
        let dir = TempDir::new().unwrap();
        assert!(discover_plugins(dir.path()).unwrap().descriptors.is_empty());
    }

    #[test]
    fn test_discover_valid_bundles_in_name_order() {
        let dir = TempDir::new().unwrap();
        write_bundle(dir.path(), "b-bundle", "id = \"b\"\nversion = \"1.0.0\"\n");
        let a_dir = write_bundle(dir.path(), "a-bundle", "id = \"a\"\nversion = \"0.1.0\"\n");

        let found = discover_plugins(dir.path()).unwrap().descriptors;
        let ids: Vec<&str> = found.iter().map(PluginDescriptor::id).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(found[0].location(), a_dir);
        assert_eq!(found[0].version(), "0.1.0");
        assert_eq!(found[0].entry(), harbor_plugin_api::DEFAULT_ENTRY_POINT);
    }

    #[test]
    fn test_discover_skips_dirs_without_manifest_and_plain_files() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("no-manifest")).unwrap();
        std::fs::write(dir.path().join("stray.txt"), "hi").unwrap();
        write_bundle(dir.path(), "ok", "id = \"ok\"\nversion = \"1.0.0\"\n");

        let found = discover_plugins(dir.path()).unwrap();
        assert!(found.skipped.is_empty());
        let found = found.descriptors;
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id(), "ok");
    }

    #[test]
    fn test_discover_records_invalid_manifest_as_load_failure() {
        let dir = TempDir::new().unwrap();
        write_bundle(dir.path(), "broken", "this is not toml =");
        write_bundle(dir.path(), "blank-id", "id = \"  \"\nversion = \"1.0.0\"\n");
        write_bundle(dir.path(), "ok", "id = \"ok\"\nversion = \"1.0.0\"\n");

        let found = discover_plugins(dir.path()).unwrap();
        assert_eq!(found.descriptors.len(), 1);
        let skipped: Vec<&str> = found.skipped.iter().map(|f| f.unit.as_str()).collect();
        assert_eq!(skipped, vec!["blank-id", "broken"]);
        assert!(found.skipped.iter().all(|f| f.kind == ErrorKind::Load));
    }

    #[test]
    fn test_discover_duplicate_id_is_an_error() {
        let dir = TempDir::new().unwrap();
        write_bundle(dir.path(), "one", "id = \"same\"\nversion = \"1.0.0\"\n");
        write_bundle(dir.path(), "two", "id = \"same\"\nversion = \"2.0.0\"\n");

        let result = discover_plugins(dir.path());
        assert!(matches!(
            result,
            Err(PluginHostError::DuplicateId { ref id, .. }) if id == "same"
        ));
    }

    #[test]
    fn test_discover_file_instead_of_dir_is_unreadable() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("plugins");
        std::fs::write(&file, "not a directory").unwrap();

        let result = discover_plugins(&file);
        assert!(matches!(result, Err(PluginHostError::DirUnreadable { .. })));
    }

    #[test]
    fn test_descriptor_keeps_manifest_fields() {
        let dir = TempDir::new().unwrap();
        let bundle = write_bundle(
            dir.path(),
            "greeter",
            "id = \"greeter\"\nversion = \"0.2.0\"\ndescription = \"hi\"\nentry = \"greet_entry\"\nlibrary = \"libgreeter.so\"\n",
        );

        let descriptor = PluginDescriptor::from_dir(&bundle).unwrap();
        assert_eq!(descriptor.description(), "hi");
        assert_eq!(descriptor.entry(), "greet_entry");
        assert_eq!(descriptor.library(), Some("libgreeter.so"));
    }
}

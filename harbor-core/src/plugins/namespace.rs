//! Isolated namespaces - one symbol-resolution scope per plugin unit
//!
//! A [`NamespaceProvider`] turns a descriptor into a [`Namespace`] that the
//! unit owns exclusively. Resolving the descriptor's entry point inside that
//! namespace yields the plugin instance. Dropping the namespace releases it.
//!
//! Two providers ship with the host:
//! - [`DylibNamespaceProvider`]: one dynamic-library handle per unit
//! - [`StaticNamespaceProvider`]: plugins compiled into the host binary,
//!   each id seeing only its own entry points

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use harbor_plugin_api::{API_VERSION, API_VERSION_SYMBOL, Plugin};
use libloading::Library;

use super::descriptor::PluginDescriptor;
use super::error::PluginHostError;

/// An exclusively owned symbol-resolution scope
pub trait Namespace: Send + Sync {
    /// Resolve `entry` inside this namespace and instantiate the plugin
    fn instantiate(&self, entry: &str) -> Result<Box<dyn Plugin>, PluginHostError>;
}

/// Creates namespaces for descriptors
pub trait NamespaceProvider: Send + Sync {
    fn create(&self, descriptor: &PluginDescriptor) -> Result<Box<dyn Namespace>, PluginHostError>;
}

// ─── Dynamic libraries ───────────────────────────────────────────────

/// Loads each bundle's library into its own handle
#[derive(Debug, Default)]
pub struct DylibNamespaceProvider;

impl NamespaceProvider for DylibNamespaceProvider {
    fn create(&self, descriptor: &PluginDescriptor) -> Result<Box<dyn Namespace>, PluginHostError> {
        let lib_path = find_library(descriptor)?;

        // SAFETY: the library comes from the configured plugin directory and
        // is expected to follow the export_plugin! contract.
        let library = unsafe { Library::new(&lib_path) }.map_err(|e| {
            PluginHostError::Namespace {
                id: descriptor.id().to_string(),
                reason: e.to_string(),
            }
        })?;

        // SAFETY: the symbol is generated by export_plugin! with this signature.
        let api_version_fn: libloading::Symbol<extern "C" fn() -> u32> =
            unsafe { library.get(API_VERSION_SYMBOL.as_bytes()) }.map_err(|e| {
                PluginHostError::Namespace {
                    id: descriptor.id().to_string(),
                    reason: e.to_string(),
                }
            })?;

        let found = api_version_fn();
        if found != API_VERSION {
            return Err(PluginHostError::ApiVersionMismatch {
                expected: API_VERSION,
                found,
            });
        }

        tracing::debug!(
            plugin = %descriptor.id(),
            library = %lib_path.display(),
            "Namespace created"
        );

        Ok(Box::new(DylibNamespace {
            id: descriptor.id().to_string(),
            library,
        }))
    }
}

struct DylibNamespace {
    id: String,
    library: Library,
}

impl Namespace for DylibNamespace {
    fn instantiate(&self, entry: &str) -> Result<Box<dyn Plugin>, PluginHostError> {
        // SAFETY: entry points are generated by export_plugin! and return a
        // pointer obtained from Box::into_raw.
        let create_fn: libloading::Symbol<extern "C" fn() -> *mut dyn Plugin> =
            unsafe { self.library.get(entry.as_bytes()) }.map_err(|_| {
                PluginHostError::EntryPointMissing {
                    id: self.id.clone(),
                    entry: entry.to_string(),
                }
            })?;

        let raw = create_fn();
        if raw.is_null() {
            return Err(PluginHostError::Namespace {
                id: self.id.clone(),
                reason: format!("entry point '{}' returned null", entry),
            });
        }

        Ok(unsafe { Box::from_raw(raw) })
    }
}

/// Find the library file in a bundle directory
fn find_library(descriptor: &PluginDescriptor) -> Result<PathBuf, PluginHostError> {
    let dir = descriptor.location();

    if let Some(declared) = descriptor.library() {
        let lib_path = dir.join(declared);
        if lib_path.exists() {
            return Ok(lib_path);
        }
        return Err(PluginHostError::LibraryNotFound {
            dir: dir.to_path_buf(),
        });
    }

    library_candidates(dir, &descriptor.id().replace('-', "_"))
        .into_iter()
        .chain(library_candidates(dir, descriptor.id()))
        .find(|p| p.exists())
        .ok_or_else(|| PluginHostError::LibraryNotFound {
            dir: dir.to_path_buf(),
        })
}

fn library_candidates(dir: &Path, stem: &str) -> Vec<PathBuf> {
    let extensions: &[&str] = if cfg!(target_os = "macos") {
        &["dylib", "so"]
    } else if cfg!(target_os = "windows") {
        &["dll"]
    } else {
        &["so"]
    };

    extensions
        .iter()
        .flat_map(|ext| {
            [
                dir.join(format!("{}.{}", stem, ext)),
                dir.join(format!("lib{}.{}", stem, ext)),
            ]
        })
        .collect()
}

// ─── Statically linked plugins ───────────────────────────────────────

/// Factory producing a fresh plugin instance
pub type PluginFactory = Arc<dyn Fn() -> Box<dyn Plugin> + Send + Sync>;

/// Serves plugins compiled into the host.
///
/// Entry points are registered per plugin id; a unit's namespace only sees
/// the entry points registered for its own id.
#[derive(Default, Clone)]
pub struct StaticNamespaceProvider {
    scopes: HashMap<String, HashMap<String, PluginFactory>>,
}

impl StaticNamespaceProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: expose `entry` inside the namespace of plugin `id`
    pub fn with_entry<F>(mut self, id: &str, entry: &str, factory: F) -> Self
    where
        F: Fn() -> Box<dyn Plugin> + Send + Sync + 'static,
    {
        self.register(id, entry, factory);
        self
    }

    pub fn register<F>(&mut self, id: &str, entry: &str, factory: F)
    where
        F: Fn() -> Box<dyn Plugin> + Send + Sync + 'static,
    {
        self.scopes
            .entry(id.to_string())
            .or_default()
            .insert(entry.to_string(), Arc::new(factory));
    }
}

impl NamespaceProvider for StaticNamespaceProvider {
    fn create(&self, descriptor: &PluginDescriptor) -> Result<Box<dyn Namespace>, PluginHostError> {
        Ok(Box::new(StaticNamespace {
            id: descriptor.id().to_string(),
            symbols: self
                .scopes
                .get(descriptor.id())
                .cloned()
                .unwrap_or_default(),
        }))
    }
}

struct StaticNamespace {
    id: String,
    symbols: HashMap<String, PluginFactory>,
}

impl Namespace for StaticNamespace {
    fn instantiate(&self, entry: &str) -> Result<Box<dyn Plugin>, PluginHostError> {
        let factory = self
            .symbols
            .get(entry)
            .ok_or_else(|| PluginHostError::EntryPointMissing {
                id: self.id.clone(),
                entry: entry.to_string(),
            })?;
        Ok(factory())
    }
}

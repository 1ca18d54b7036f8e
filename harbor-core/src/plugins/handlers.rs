//! Handler registry - singleton handler objects keyed by type name

use std::sync::Arc;

use harbor_plugin_api::{HandlerObject, RoutePredicate};

use super::error::PluginHostError;
use super::namespace::Namespace;
use super::routes::{ContributionOwner, RouteSource, TableRoute};

struct HandlerEntry {
    key: String,
    owner: ContributionOwner,
    object: Arc<dyn HandlerObject>,
    namespace: Option<Arc<dyn Namespace>>,
}

/// Owned registration surface for handler objects.
///
/// One object per type name; registering the same key again replaces the
/// earlier object in place. Once sealed, further writes are rejected.
#[derive(Default)]
pub struct HandlerRegistry {
    entries: Vec<HandlerEntry>,
    sealed: bool,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `object` under its type name.
    ///
    /// Returns the owner of the object it replaced, if any.
    pub fn register_singleton(
        &mut self,
        owner: ContributionOwner,
        object: Arc<dyn HandlerObject>,
    ) -> Result<Option<ContributionOwner>, PluginHostError> {
        self.register_scoped(owner, object, None)
    }

    /// Register `object` along with the namespace its code lives in
    pub(crate) fn register_scoped(
        &mut self,
        owner: ContributionOwner,
        object: Arc<dyn HandlerObject>,
        namespace: Option<Arc<dyn Namespace>>,
    ) -> Result<Option<ContributionOwner>, PluginHostError> {
        let key = object.type_name().to_string();
        if self.sealed {
            return Err(PluginHostError::RegistrySealed { key });
        }

        if let Some(entry) = self.entries.iter_mut().find(|e| e.key == key) {
            let replaced = std::mem::replace(&mut entry.owner, owner);
            entry.object = object;
            entry.namespace = namespace;
            return Ok(Some(replaced));
        }

        self.entries.push(HandlerEntry {
            key,
            owner,
            object,
            namespace,
        });
        Ok(None)
    }

    /// Resolve every registered object's mappings into table routes
    pub fn resolve_mappings(&self) -> Vec<TableRoute> {
        self.entries
            .iter()
            .flat_map(|entry| {
                let base = entry.object.base_path().to_string();
                entry.object.mappings().into_iter().map(move |mapping| {
                    let predicate = RoutePredicate {
                        path: join_paths(&base, &mapping.predicate.path),
                        ..mapping.predicate
                    };
                    TableRoute::handler(
                        predicate,
                        Arc::clone(&entry.object),
                        mapping.endpoint,
                        RouteSource::Handler {
                            owner: entry.owner.clone(),
                            type_name: entry.key.clone(),
                        },
                    )
                    .with_namespace(entry.namespace.clone())
                })
            })
            .collect()
    }

    /// Owner of the object registered under `key`
    pub fn owner_of(&self, key: &str) -> Option<&ContributionOwner> {
        self.entries.iter().find(|e| e.key == key).map(|e| &e.owner)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn seal(&mut self) {
        self.sealed = true;
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field(
                "keys",
                &self.entries.iter().map(|e| e.key.as_str()).collect::<Vec<_>>(),
            )
            .field("sealed", &self.sealed)
            .finish()
    }
}

fn join_paths(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    match (base.is_empty(), path.is_empty()) {
        (true, true) => "/".to_string(),
        (true, false) => format!("/{}", path),
        (false, true) => ensure_leading_slash(base),
        (false, false) => format!("{}/{}", ensure_leading_slash(base), path),
    }
}

fn ensure_leading_slash(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    }
}

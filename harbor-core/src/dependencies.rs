//! Name-keyed instance builder supplied by the host

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use harbor_plugin_api::InstanceBuilder;

/// Dependencies offered to extensions, looked up by name
#[derive(Default, Clone)]
pub struct Dependencies {
    instances: HashMap<String, Arc<dyn Any + Send + Sync>>,
}

impl Dependencies {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<T: Send + Sync + 'static>(&mut self, name: impl Into<String>, instance: T) {
        self.instances.insert(name.into(), Arc::new(instance));
    }

    /// Builder form of [`Self::insert`]
    pub fn with<T: Send + Sync + 'static>(mut self, name: impl Into<String>, instance: T) -> Self {
        self.insert(name, instance);
        self
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}

impl InstanceBuilder for Dependencies {
    fn resolve(&self, name: &str) -> Option<Arc<dyn Any + Send + Sync>> {
        self.instances.get(name).cloned()
    }
}

impl std::fmt::Debug for Dependencies {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&str> = self.instances.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("Dependencies").field("names", &names).finish()
    }
}

//! Extension collection over started units

use std::sync::Arc;

use harbor_plugin_api::Extension;
use serde::Serialize;

use super::namespace::Namespace;
use super::registry::PluginRegistry;

/// An extension instance together with the unit that owns it
pub struct CollectedExtension<T: ?Sized = dyn Extension> {
    /// Owning unit id
    pub unit_id: String,
    /// Concrete type name the instance was registered under
    pub type_name: String,
    pub ordinal: Option<i32>,
    pub instance: Arc<T>,
    /// Keeps the owning unit's namespace alive as long as the instance
    pub(crate) namespace: Option<Arc<dyn Namespace>>,
}

impl<T: ?Sized> Clone for CollectedExtension<T> {
    fn clone(&self) -> Self {
        Self {
            unit_id: self.unit_id.clone(),
            type_name: self.type_name.clone(),
            ordinal: self.ordinal,
            instance: Arc::clone(&self.instance),
            namespace: self.namespace.clone(),
        }
    }
}

impl<T: ?Sized> std::fmt::Debug for CollectedExtension<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectedExtension")
            .field("unit_id", &self.unit_id)
            .field("type_name", &self.type_name)
            .field("ordinal", &self.ordinal)
            .finish_non_exhaustive()
    }
}

impl CollectedExtension {
    pub fn identify(&self) -> String {
        self.instance.identify()
    }

    pub fn summary(&self) -> ExtensionSummary {
        ExtensionSummary {
            unit_id: self.unit_id.clone(),
            type_name: self.type_name.clone(),
            identity: self.identify(),
            ordinal: self.ordinal,
        }
    }
}

/// Plain-data view of a collected extension
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtensionSummary {
    pub unit_id: String,
    pub type_name: String,
    pub identity: String,
    pub ordinal: Option<i32>,
}

impl std::fmt::Display for ExtensionSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.type_name, self.identity)
    }
}

/// Every [`Extension`] of every started unit, in registry order.
///
/// Pure: repeated calls against an unchanged registry return the same
/// sequence, and zero started units yield an empty one.
pub fn collect(registry: &PluginRegistry) -> Vec<CollectedExtension> {
    registry.extensions_of::<dyn Extension>()
}

//! Extension contract and extension registration

use std::any::Any;
use std::sync::Arc;

use crate::context::PluginContext;
use crate::error::PluginError;
use crate::http::{DeclarativeRoute, HandlerObject};

/// The capability every plugin extension implements.
///
/// Both route-producing methods return an empty vector when the extension
/// offers no routes of that kind.
pub trait Extension: Send + Sync {
    /// Human-readable identity. Not required to be unique across plugins.
    fn identify(&self) -> String;

    /// Routes appended to the host dispatch table, in declaration order
    fn declarative_routes(&self) -> Result<Vec<DeclarativeRoute>, PluginError>;

    /// Handler objects registered into the host handler registry
    fn handler_objects(&self) -> Result<Vec<Arc<dyn HandlerObject>>, PluginError>;

    /// Ordering hint. Explicit ordinals sort ascending, `None` sorts last.
    fn ordinal(&self) -> Option<i32> {
        None
    }
}

/// Host capability that builds extension dependencies by name.
///
/// How a dependency is produced is up to the host; plugins only ask for it.
pub trait InstanceBuilder: Send + Sync {
    fn resolve(&self, name: &str) -> Option<Arc<dyn Any + Send + Sync>>;
}

/// Instance builder with nothing to offer
#[derive(Debug, Default, Clone, Copy)]
pub struct NoDependencies;

impl InstanceBuilder for NoDependencies {
    fn resolve(&self, _name: &str) -> Option<Arc<dyn Any + Send + Sync>> {
        None
    }
}

/// One extension instance registered by a plugin under some capability type.
///
/// The instance is stored as `Arc<T>` behind `Any`, so the host can filter
/// registrations by capability with [`ExtensionRegistration::downcast`].
pub struct ExtensionRegistration {
    type_name: String,
    ordinal: Option<i32>,
    instance: Box<dyn Any + Send + Sync>,
}

impl ExtensionRegistration {
    pub fn new<T>(type_name: impl Into<String>, ordinal: Option<i32>, instance: Arc<T>) -> Self
    where
        T: ?Sized + Send + Sync + 'static,
    {
        Self {
            type_name: type_name.into(),
            ordinal,
            instance: Box::new(instance),
        }
    }

    /// Concrete type name of the registered instance
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn ordinal(&self) -> Option<i32> {
        self.ordinal
    }

    /// Return the instance if it was registered as capability `T`
    pub fn downcast<T: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.instance.downcast_ref::<Arc<T>>().cloned()
    }
}

impl std::fmt::Debug for ExtensionRegistration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtensionRegistration")
            .field("type_name", &self.type_name)
            .field("ordinal", &self.ordinal)
            .finish_non_exhaustive()
    }
}

/// Collects a plugin's extension instances and resolves their dependencies.
pub struct ExtensionRegistrar<'a> {
    context: &'a PluginContext,
    builder: &'a dyn InstanceBuilder,
    registrations: Vec<ExtensionRegistration>,
}

impl<'a> ExtensionRegistrar<'a> {
    pub fn new(context: &'a PluginContext, builder: &'a dyn InstanceBuilder) -> Self {
        Self {
            context,
            builder,
            registrations: Vec::new(),
        }
    }

    /// The registering plugin's context
    pub fn context(&self) -> &PluginContext {
        self.context
    }

    /// Resolve a dependency by name.
    ///
    /// Services registered on the plugin's own context win over the host's.
    pub fn dependency<T: Send + Sync + 'static>(&self, name: &str) -> Result<Arc<T>, PluginError> {
        let instance = self
            .context
            .service(name)
            .or_else(|| self.builder.resolve(name))
            .ok_or_else(|| PluginError::MissingDependency(name.to_string()))?;

        instance
            .downcast::<T>()
            .map_err(|_| PluginError::DependencyType {
                name: name.to_string(),
                expected: std::any::type_name::<T>(),
            })
    }

    /// Register an [`Extension`] implementation
    pub fn register_extension<E: Extension + 'static>(&mut self, extension: E) -> &mut Self {
        let ordinal = extension.ordinal();
        let instance: Arc<dyn Extension> = Arc::new(extension);
        self.registrations.push(ExtensionRegistration::new(
            std::any::type_name::<E>(),
            ordinal,
            instance,
        ));
        self
    }

    /// Register an instance under an arbitrary capability type `T`
    pub fn register<T: ?Sized + Send + Sync + 'static>(
        &mut self,
        type_name: impl Into<String>,
        ordinal: Option<i32>,
        instance: Arc<T>,
    ) -> &mut Self {
        self.registrations
            .push(ExtensionRegistration::new(type_name, ordinal, instance));
        self
    }

    /// Finish registration (used by the host)
    pub fn into_registrations(self) -> Vec<ExtensionRegistration> {
        self.registrations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::path::PathBuf;

    struct Identity(&'static str);

    impl Extension for Identity {
        fn identify(&self) -> String {
            self.0.to_string()
        }
        fn declarative_routes(&self) -> Result<Vec<DeclarativeRoute>, PluginError> {
            Ok(Vec::new())
        }
        fn handler_objects(&self) -> Result<Vec<Arc<dyn HandlerObject>>, PluginError> {
            Ok(Vec::new())
        }
        fn ordinal(&self) -> Option<i32> {
            Some(3)
        }
    }

    struct MapBuilder(HashMap<String, Arc<dyn Any + Send + Sync>>);

    impl InstanceBuilder for MapBuilder {
        fn resolve(&self, name: &str) -> Option<Arc<dyn Any + Send + Sync>> {
            self.0.get(name).cloned()
        }
    }

    fn context() -> PluginContext {
        PluginContext::new("test".into(), PathBuf::from("/tmp/test"))
    }

    #[test]
    fn test_register_extension_records_type_and_ordinal() {
        let ctx = context();
        let mut registrar = ExtensionRegistrar::new(&ctx, &NoDependencies);
        registrar.register_extension(Identity("a"));

        let registrations = registrar.into_registrations();
        assert_eq!(registrations.len(), 1);
        assert!(registrations[0].type_name().ends_with("Identity"));
        assert_eq!(registrations[0].ordinal(), Some(3));

        let ext = registrations[0].downcast::<dyn Extension>().unwrap();
        assert_eq!(ext.identify(), "a");
    }

    #[test]
    fn test_downcast_filters_by_capability() {
        trait Other: Send + Sync {}
        struct Thing;
        impl Other for Thing {}

        let ctx = context();
        let mut registrar = ExtensionRegistrar::new(&ctx, &NoDependencies);
        let other: Arc<dyn Other> = Arc::new(Thing);
        registrar.register("Thing", None, other);

        let registrations = registrar.into_registrations();
        assert!(registrations[0].downcast::<dyn Extension>().is_none());
        assert!(registrations[0].downcast::<dyn Other>().is_some());
    }

    #[test]
    fn test_dependency_from_host_builder() {
        let ctx = context();
        let mut deps: HashMap<String, Arc<dyn Any + Send + Sync>> = HashMap::new();
        deps.insert("greeting".into(), Arc::new("hi".to_string()));
        let builder = MapBuilder(deps);

        let registrar = ExtensionRegistrar::new(&ctx, &builder);
        let greeting = registrar.dependency::<String>("greeting").unwrap();
        assert_eq!(greeting.as_str(), "hi");
    }

    #[test]
    fn test_plugin_service_wins_over_host() {
        let mut ctx = context();
        ctx.register_service("greeting", "from plugin".to_string());

        let mut deps: HashMap<String, Arc<dyn Any + Send + Sync>> = HashMap::new();
        deps.insert("greeting".into(), Arc::new("from host".to_string()));
        let builder = MapBuilder(deps);

        let registrar = ExtensionRegistrar::new(&ctx, &builder);
        let greeting = registrar.dependency::<String>("greeting").unwrap();
        assert_eq!(greeting.as_str(), "from plugin");
    }

    #[test]
    fn test_missing_and_mistyped_dependencies() {
        let mut ctx = context();
        ctx.register_service("count", 7u32);
        let registrar = ExtensionRegistrar::new(&ctx, &NoDependencies);

        assert!(matches!(
            registrar.dependency::<String>("absent"),
            Err(PluginError::MissingDependency(_))
        ));
        assert!(matches!(
            registrar.dependency::<String>("count"),
            Err(PluginError::DependencyType { .. })
        ));
    }
}

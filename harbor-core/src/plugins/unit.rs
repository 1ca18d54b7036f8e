//! Plugin units and their lifecycle state machine
//!
//! ```text
//! Discovered → Loaded → Started → Stopped → Unloaded
//!                 │         │
//!                 └─────────┴────→ Failed
//! ```
//!
//! Transitions are driven by the registry only. `Failed` and `Unloaded` are
//! terminal, and a stopped unit is never restarted.

use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use harbor_plugin_api::{
    ExtensionRegistrar, ExtensionRegistration, InstanceBuilder, Plugin, PluginContext,
};
use serde::Serialize;

use super::descriptor::PluginDescriptor;
use super::error::PluginHostError;
use super::namespace::Namespace;

/// Lifecycle state of a plugin unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum UnitState {
    Discovered,
    Loaded,
    Started,
    Stopped,
    Unloaded,
    /// Start failure or runtime fault
    Failed { error: String },
}

impl UnitState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Unloaded | Self::Failed { .. })
    }

    fn failed(error: impl Into<String>) -> Self {
        Self::Failed {
            error: error.into(),
        }
    }
}

impl fmt::Display for UnitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Discovered => "discovered",
            Self::Loaded => "loaded",
            Self::Started => "started",
            Self::Stopped => "stopped",
            Self::Unloaded => "unloaded",
            Self::Failed { .. } => "failed",
        };
        f.write_str(s)
    }
}

/// A loaded plugin: its instance, context, extensions and namespace.
///
/// Field order is drop order: extensions go before the plugin instance, which
/// goes before the unit's handle on the namespace holding their code. Routes
/// built from the extensions keep their own handle, so the namespace is only
/// released once the last of them is gone.
pub struct PluginUnit {
    descriptor: PluginDescriptor,
    state: UnitState,
    extensions: Vec<ExtensionRegistration>,
    instance: Option<Box<dyn Plugin>>,
    context: PluginContext,
    namespace: Option<Arc<dyn Namespace>>,
}

impl PluginUnit {
    pub(crate) fn loaded(
        descriptor: PluginDescriptor,
        namespace: Box<dyn Namespace>,
        instance: Box<dyn Plugin>,
        context: PluginContext,
    ) -> Self {
        Self {
            descriptor,
            state: UnitState::Loaded,
            extensions: Vec::new(),
            instance: Some(instance),
            context,
            namespace: Some(Arc::from(namespace)),
        }
    }

    pub fn id(&self) -> &str {
        self.descriptor.id()
    }

    pub fn descriptor(&self) -> &PluginDescriptor {
        &self.descriptor
    }

    pub fn state(&self) -> &UnitState {
        &self.state
    }

    pub fn is_started(&self) -> bool {
        self.state == UnitState::Started
    }

    /// Whether the unit still owns its namespace
    pub fn holds_namespace(&self) -> bool {
        self.namespace.is_some()
    }

    /// Shared handle on the unit's namespace, while it holds one
    pub(crate) fn namespace(&self) -> Option<&Arc<dyn Namespace>> {
        self.namespace.as_ref()
    }

    /// Extension registrations, populated while the unit is started
    pub fn registrations(&self) -> &[ExtensionRegistration] {
        &self.extensions
    }

    fn invalid(&self, to: UnitState) -> PluginHostError {
        PluginHostError::InvalidTransition {
            id: self.id().to_string(),
            from: self.state.clone(),
            to,
        }
    }

    /// Loaded → Started, or Loaded → Failed
    pub(crate) fn start(&mut self, builder: &dyn InstanceBuilder) -> Result<(), PluginHostError> {
        if self.state != UnitState::Loaded {
            return Err(self.invalid(UnitState::Started));
        }
        let id = self.id().to_string();
        let Some(instance) = self.instance.as_mut() else {
            return Err(self.invalid(UnitState::Started));
        };

        let context = &mut self.context;
        let started = std::panic::catch_unwind(AssertUnwindSafe(|| instance.start(context)));
        let reason = match started {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(e.to_string()),
            Err(_) => Some("plugin panicked in start".to_string()),
        };
        if let Some(reason) = reason {
            self.state = UnitState::failed(reason.clone());
            return Err(PluginHostError::StartFailed { id, reason });
        }

        let context = &self.context;
        let registered = std::panic::catch_unwind(AssertUnwindSafe(|| {
            let mut registrar = ExtensionRegistrar::new(context, builder);
            instance
                .register_extensions(&mut registrar)
                .map(|()| registrar.into_registrations())
        }));

        match registered {
            Ok(Ok(registrations)) => {
                self.extensions = registrations;
                self.state = UnitState::Started;
                Ok(())
            }
            Ok(Err(e)) => {
                let reason = e.to_string();
                self.state = UnitState::failed(reason.clone());
                Err(PluginHostError::ExtensionRegistration { id, reason })
            }
            Err(_) => {
                let reason = "plugin panicked in register_extensions".to_string();
                self.state = UnitState::failed(reason.clone());
                Err(PluginHostError::ExtensionRegistration { id, reason })
            }
        }
    }

    /// Started → Stopped. Every other state is left untouched.
    ///
    /// The unit becomes `Stopped` even when the stop hook fails; the failure
    /// is returned.
    pub(crate) fn stop(&mut self) -> Result<(), PluginHostError> {
        if self.state != UnitState::Started {
            return Ok(());
        }

        self.extensions.clear();
        let outcome = match self.instance.as_mut() {
            Some(instance) => {
                let context = &mut self.context;
                match std::panic::catch_unwind(AssertUnwindSafe(|| instance.stop(context))) {
                    Ok(Ok(())) => Ok(()),
                    Ok(Err(e)) => Err(e.to_string()),
                    Err(_) => Err("plugin panicked in stop".to_string()),
                }
            }
            None => Ok(()),
        };
        self.context.clear_services();
        self.state = UnitState::Stopped;

        outcome.map_err(|reason| PluginHostError::StopFailed {
            id: self.id().to_string(),
            reason,
        })
    }

    /// Record a runtime fault: Started/Loaded → Failed
    pub(crate) fn mark_failed(&mut self, error: &str) -> Result<(), PluginHostError> {
        match self.state {
            UnitState::Loaded | UnitState::Started => {
                self.extensions.clear();
                self.state = UnitState::failed(error);
                Ok(())
            }
            _ => Err(self.invalid(UnitState::failed(error))),
        }
    }

    /// Release extensions, instance and namespace.
    ///
    /// A started unit is stopped first. A failed unit keeps its `Failed`
    /// state; every other state becomes `Unloaded`.
    pub(crate) fn unload(&mut self) -> Result<(), PluginHostError> {
        if self.state == UnitState::Discovered {
            return Err(self.invalid(UnitState::Unloaded));
        }
        let stopped = self.stop();

        self.extensions.clear();
        self.instance = None;
        self.context.clear_services();
        if let Some(namespace) = self.namespace.take() {
            let routes_alive = Arc::strong_count(&namespace) > 1;
            tracing::debug!(plugin = %self.id(), routes_alive, "Namespace released by unit");
        }
        if !matches!(self.state, UnitState::Failed { .. }) {
            self.state = UnitState::Unloaded;
        }

        stopped
    }
}

impl Drop for PluginUnit {
    fn drop(&mut self) {
        // Give a still-running plugin its stop hook before the namespace goes away
        if let Err(e) = self.stop() {
            tracing::warn!(plugin = %self.id(), error = %e, "Plugin stop on drop failed");
        }
    }
}

impl fmt::Debug for PluginUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginUnit")
            .field("id", &self.id())
            .field("state", &self.state)
            .field("extensions", &self.extensions.len())
            .field("holds_namespace", &self.holds_namespace())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugins::namespace::{NamespaceProvider, StaticNamespaceProvider};
    use harbor_plugin_api::{
        DeclarativeRoute, Extension, HandlerObject, NoDependencies, PluginError, PluginManifest,
    };
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Ident;

    impl Extension for Ident {
        fn identify(&self) -> String {
            "ident".into()
        }
        fn declarative_routes(&self) -> Result<Vec<DeclarativeRoute>, PluginError> {
            Ok(Vec::new())
        }
        fn handler_objects(&self) -> Result<Vec<Arc<dyn HandlerObject>>, PluginError> {
            Ok(Vec::new())
        }
    }

    struct Scripted {
        fail_start: bool,
        fail_stop: bool,
        stops: Arc<AtomicUsize>,
    }

    impl Plugin for Scripted {
        fn start(&mut self, _ctx: &mut PluginContext) -> Result<(), PluginError> {
            if self.fail_start {
                return Err(PluginError::custom("refusing to start"));
            }
            Ok(())
        }
        fn stop(&mut self, _ctx: &mut PluginContext) -> Result<(), PluginError> {
            self.stops.fetch_add(1, Ordering::SeqCst);
            if self.fail_stop {
                return Err(PluginError::custom("refusing to stop"));
            }
            Ok(())
        }
        fn register_extensions(
            &self,
            registrar: &mut ExtensionRegistrar<'_>,
        ) -> Result<(), PluginError> {
            registrar.register_extension(Ident);
            Ok(())
        }
    }

    fn unit(fail_start: bool, fail_stop: bool) -> (PluginUnit, Arc<AtomicUsize>) {
        let stops = Arc::new(AtomicUsize::new(0));
        let descriptor = PluginDescriptor::new(
            PluginManifest {
                id: "scripted".into(),
                ..Default::default()
            },
            PathBuf::from("/tmp/scripted"),
        );
        let namespace = StaticNamespaceProvider::new().create(&descriptor).unwrap();
        let instance = Box::new(Scripted {
            fail_start,
            fail_stop,
            stops: stops.clone(),
        });
        let context = PluginContext::new("scripted".into(), PathBuf::from("/tmp/scripted"));
        (
            PluginUnit::loaded(descriptor, namespace, instance, context),
            stops,
        )
    }

    #[test]
    fn test_start_registers_extensions() {
        let (mut unit, _) = unit(false, false);
        unit.start(&NoDependencies).unwrap();
        assert!(unit.is_started());
        assert_eq!(unit.registrations().len(), 1);
    }

    #[test]
    fn test_start_failure_marks_failed_and_keeps_namespace() {
        let (mut unit, _) = unit(true, false);
        let err = unit.start(&NoDependencies).unwrap_err();
        assert!(matches!(err, PluginHostError::StartFailed { .. }));
        assert!(matches!(unit.state(), UnitState::Failed { .. }));
        assert!(unit.holds_namespace());
        assert!(unit.registrations().is_empty());
    }

    #[test]
    fn test_stop_is_idempotent() {
        let (mut unit, stops) = unit(false, false);
        unit.start(&NoDependencies).unwrap();
        unit.stop().unwrap();
        unit.stop().unwrap();
        assert_eq!(*unit.state(), UnitState::Stopped);
        assert_eq!(stops.load(Ordering::SeqCst), 1);
        assert!(unit.registrations().is_empty());
    }

    #[test]
    fn test_stop_failure_still_stops() {
        let (mut unit, _) = unit(false, true);
        unit.start(&NoDependencies).unwrap();
        let err = unit.stop().unwrap_err();
        assert!(matches!(err, PluginHostError::StopFailed { .. }));
        assert_eq!(*unit.state(), UnitState::Stopped);
    }

    #[test]
    fn test_restart_after_stop_is_rejected() {
        let (mut unit, _) = unit(false, false);
        unit.start(&NoDependencies).unwrap();
        unit.stop().unwrap();
        let err = unit.start(&NoDependencies).unwrap_err();
        assert!(matches!(
            err,
            PluginHostError::InvalidTransition {
                from: UnitState::Stopped,
                to: UnitState::Started,
                ..
            }
        ));
        assert_eq!(*unit.state(), UnitState::Stopped);
    }

    #[test]
    fn test_unload_from_started_stops_then_releases() {
        let (mut unit, stops) = unit(false, false);
        unit.start(&NoDependencies).unwrap();
        unit.unload().unwrap();
        assert_eq!(*unit.state(), UnitState::Unloaded);
        assert!(!unit.holds_namespace());
        assert_eq!(stops.load(Ordering::SeqCst), 1);

        // Terminal: nothing leaves Unloaded
        unit.stop().unwrap();
        assert!(unit.start(&NoDependencies).is_err());
        assert_eq!(*unit.state(), UnitState::Unloaded);
    }

    #[test]
    fn test_unload_failed_unit_keeps_failed_state() {
        let (mut unit, _) = unit(true, false);
        let _ = unit.start(&NoDependencies);
        unit.unload().unwrap();
        assert!(matches!(unit.state(), UnitState::Failed { .. }));
        assert!(!unit.holds_namespace());
    }

    #[test]
    fn test_mark_failed_excludes_started_unit() {
        let (mut unit, _) = unit(false, false);
        unit.start(&NoDependencies).unwrap();
        unit.mark_failed("runtime fault").unwrap();
        assert!(!unit.is_started());
        assert!(unit.registrations().is_empty());
        assert!(unit.mark_failed("again").is_err());
    }

    #[test]
    fn test_drop_runs_stop_hook() {
        let (mut unit, stops) = unit(false, false);
        unit.start(&NoDependencies).unwrap();
        drop(unit);
        assert_eq!(stops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_state_display_and_terminal() {
        assert_eq!(UnitState::Started.to_string(), "started");
        assert!(UnitState::Unloaded.is_terminal());
        assert!(UnitState::failed("x").is_terminal());
        assert!(!UnitState::Stopped.is_terminal());
    }
}

//! Simple Plugin - the smallest useful harbor plugin
//!
//! Contributes one extension with an identity and no routes.
//!
//! ## Installing
//!
//! ```bash
//! cargo build --release
//! mkdir -p ~/.config/harbor/plugins/simple
//! cp plugin.toml ~/.config/harbor/plugins/simple/
//! cp target/release/libsimple_plugin.so ~/.config/harbor/plugins/simple/
//! ```

use std::sync::Arc;

use harbor_plugin_api::{
    DeclarativeRoute, Extension, ExtensionRegistrar, HandlerObject, Plugin, PluginContext,
    PluginError, export_plugin,
};

#[derive(Default)]
pub struct SimplePlugin;

/// Identity-only extension
pub struct SimpleExtension;

impl Extension for SimpleExtension {
    fn identify(&self) -> String {
        "A simple plugin with no dependency on Spring".to_string()
    }

    fn declarative_routes(&self) -> Result<Vec<DeclarativeRoute>, PluginError> {
        Ok(Vec::new())
    }

    fn handler_objects(&self) -> Result<Vec<Arc<dyn HandlerObject>>, PluginError> {
        Ok(Vec::new())
    }
}

impl Plugin for SimplePlugin {
    fn start(&mut self, ctx: &mut PluginContext) -> Result<(), PluginError> {
        ctx.log_info("Simple Plugin Started");
        Ok(())
    }

    fn stop(&mut self, ctx: &mut PluginContext) -> Result<(), PluginError> {
        ctx.log_info("Simple Plugin Stopped");
        Ok(())
    }

    fn register_extensions(
        &self,
        registrar: &mut ExtensionRegistrar<'_>,
    ) -> Result<(), PluginError> {
        registrar.register_extension(SimpleExtension);
        Ok(())
    }
}

export_plugin!(SimplePlugin);

#[cfg(test)]
mod tests {
    use super::*;
    use harbor_plugin_api::NoDependencies;

    #[test]
    fn test_registers_identity_only_extension() {
        let mut plugin = SimplePlugin;
        let mut ctx = PluginContext::new("simple".into(), std::path::PathBuf::from("/tmp"));
        plugin.start(&mut ctx).unwrap();

        let mut registrar = ExtensionRegistrar::new(&ctx, &NoDependencies);
        plugin.register_extensions(&mut registrar).unwrap();
        let registrations = registrar.into_registrations();
        assert_eq!(registrations.len(), 1);

        let extension = registrations[0].downcast::<dyn Extension>().unwrap();
        assert_eq!(
            extension.identify(),
            "A simple plugin with no dependency on Spring"
        );
        assert!(extension.declarative_routes().unwrap().is_empty());
        assert_eq!(extension.ordinal(), None);
    }
}

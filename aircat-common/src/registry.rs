//! Module registry
//!
//! Owns the fixed list of module descriptors and their opened handles.
//! Membership never changes after [`ModuleRegistry::load`]; only handles do.
//! Every call into a module is made sequentially, one module at a time.

use crate::config::ConfigStore;
use crate::http::Route;
use crate::module::{Facades, Module, ModuleContext, ModuleDescriptor};
use crate::{Error, Result};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// A descriptor and its handle (`None` if never opened or open failed)
pub struct LoadedModule {
    pub descriptor: ModuleDescriptor,
    handle: Option<Arc<dyn Module>>,
}

impl LoadedModule {
    pub fn id(&self) -> &'static str {
        self.descriptor.id
    }

    pub fn handle(&self) -> Option<&Arc<dyn Module>> {
        self.handle.as_ref()
    }

    pub fn is_open(&self) -> bool {
        self.handle.is_some()
    }
}

/// Ordered list of modules
pub struct ModuleRegistry {
    modules: Vec<LoadedModule>,
}

impl ModuleRegistry {
    /// Open every descriptor in order.
    ///
    /// A failing module is logged and left disabled; it never aborts the
    /// daemon and contributes no routes.
    pub fn load(descriptors: &[ModuleDescriptor], facades: &Facades, config: &ConfigStore) -> Self {
        let mut modules = Vec::with_capacity(descriptors.len());

        for descriptor in descriptors {
            let ctx = ModuleContext::new(facades, config.get_section(descriptor.id));

            let handle = match (descriptor.open)(&ctx) {
                Ok(handle) => {
                    info!("Opened module '{}' ({})", descriptor.id, descriptor.name);
                    Some(handle)
                }
                Err(e) => {
                    error!("Failed to open {} module: {}", descriptor.id, e);
                    None
                }
            };

            modules.push(LoadedModule {
                descriptor: *descriptor,
                handle,
            });
        }

        Self { modules }
    }

    /// All modules in load order
    pub fn iter(&self) -> impl Iterator<Item = &LoadedModule> {
        self.modules.iter()
    }

    /// Opened handle of a module
    pub fn get(&self, id: &str) -> Option<&Arc<dyn Module>> {
        self.modules
            .iter()
            .find(|m| m.id() == id)
            .and_then(|m| m.handle())
    }

    /// Whether a module with this id is registered (opened or not)
    pub fn contains(&self, id: &str) -> bool {
        self.modules.iter().any(|m| m.id() == id)
    }

    /// Bound URL tables of every opened module, keyed by module id
    pub fn routes(&self) -> Vec<(&'static str, Vec<Route>)> {
        self.modules
            .iter()
            .filter_map(|m| {
                m.handle
                    .as_ref()
                    .map(|h| (m.id(), Arc::clone(h).routes()))
            })
            .collect()
    }

    /// Reset every opened module to its built-in defaults
    pub fn default_all(&self) {
        for module in &self.modules {
            if let Some(handle) = &module.handle {
                if let Err(e) = handle.set_config(None) {
                    warn!("Failed to reset {} configuration: {}", module.id(), e);
                }
            }
        }
    }

    /// Push each module's section from the store
    pub fn reload_all(&self, store: &ConfigStore) {
        for module in &self.modules {
            if let Some(handle) = &module.handle {
                let section = store.get_section(module.id());
                if let Err(e) = handle.set_config(section.as_ref()) {
                    warn!("Failed to apply {} configuration: {}", module.id(), e);
                }
            }
        }
    }

    /// Apply one section to one module
    pub fn apply(&self, id: &str, section: &Value) -> Result<()> {
        let handle = self
            .get(id)
            .ok_or_else(|| Error::NotFound(format!("module '{}'", id)))?;
        handle.set_config(Some(section))
    }

    /// Current configuration of every opened module that has one
    pub fn configs(&self) -> Vec<(&'static str, Value)> {
        self.modules
            .iter()
            .filter_map(|m| {
                m.handle
                    .as_ref()
                    .and_then(|h| h.get_config())
                    .map(|cfg| (m.id(), cfg))
            })
            .collect()
    }

    /// Copy every opened module's configuration into the store.
    ///
    /// Sections of modules that failed to open are left untouched.
    pub fn collect_configs(&self, store: &mut ConfigStore) {
        for module in &self.modules {
            if let Some(handle) = &module.handle {
                store.set_section(module.id(), handle.get_config());
            }
        }
    }

    /// Save each module's configuration into the store, then close it.
    pub fn close_all(&mut self, store: &mut ConfigStore) {
        for module in &mut self.modules {
            if let Some(handle) = module.handle.take() {
                store.set_section(module.descriptor.id, handle.get_config());

                match handle.close() {
                    Ok(()) => debug!("Closed module '{}'", module.descriptor.id),
                    Err(e) => warn!("Failed to close {} module: {}", module.descriptor.id, e),
                }
            }
        }
    }
}

impl Drop for ModuleRegistry {
    fn drop(&mut self) {
        for module in &mut self.modules {
            if let Some(handle) = module.handle.take() {
                warn!("Module '{}' dropped without close_all", module.descriptor.id);
                if let Err(e) = handle.close() {
                    warn!("Failed to close {} module: {}", module.descriptor.id, e);
                }
            }
        }
    }
}

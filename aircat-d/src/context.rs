//! Application context
//!
//! [`Core`] holds the daemon-wide state shared by the HTTP layer: the
//! module registry, the configuration store and the HTTP layer's own
//! section. Locks are always taken in the order registry, store, httpd.

use crate::api;
use crate::config::{HttpdConfig, HTTPD_SECTION};
use aircat_common::{
    ConfigStore, Dispatcher, Error, Facades, ModuleDescriptor, ModuleRegistry, Result,
};
use serde_json::{Map, Value};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, error, info, warn};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Registry, configuration store and HTTP layer configuration
pub struct Core {
    registry: Mutex<ModuleRegistry>,
    store: Mutex<ConfigStore>,
    httpd: Mutex<HttpdConfig>,
}

impl Core {
    pub fn new(registry: ModuleRegistry, store: ConfigStore) -> Self {
        let httpd = HttpdConfig::from_section(store.get_section(HTTPD_SECTION).as_ref());
        Self {
            registry: Mutex::new(registry),
            store: Mutex::new(store),
            httpd: Mutex::new(httpd),
        }
    }

    pub fn httpd(&self) -> HttpdConfig {
        *lock(&self.httpd)
    }

    /// Reset the HTTP layer and every module to built-in defaults.
    /// The store is not touched.
    pub fn reset_defaults(&self) {
        let registry = lock(&self.registry);
        *lock(&self.httpd) = HttpdConfig::default();
        registry.default_all();
        info!("Configuration reset to defaults");
    }

    /// Re-read the file and push every section to its owner
    pub fn reload(&self) {
        let registry = lock(&self.registry);
        let mut store = lock(&self.store);
        store.load();
        *lock(&self.httpd) = HttpdConfig::from_section(store.get_section(HTTPD_SECTION).as_ref());
        registry.reload_all(&store);
        info!("Configuration reloaded from {}", store.path().display());
    }

    /// Collect the live configuration and write it to disk
    pub fn save(&self) -> Result<()> {
        let registry = lock(&self.registry);
        let mut store = lock(&self.store);
        store.set_section(HTTPD_SECTION, Some(lock(&self.httpd).to_section()));
        registry.collect_configs(&mut store);
        store.save().map_err(|e| {
            Error::Internal(format!("Cannot write {}: {}", store.path().display(), e))
        })?;
        info!("Configuration saved to {}", store.path().display());
        Ok(())
    }

    /// Live configuration as a JSON object, restricted to one section
    /// when `resource` is not empty
    pub fn snapshot(&self, resource: &str) -> Map<String, Value> {
        let registry = lock(&self.registry);
        let mut document = Map::new();

        if resource.is_empty() || resource == HTTPD_SECTION {
            document.insert(HTTPD_SECTION.to_string(), lock(&self.httpd).to_section());
        }

        for (id, section) in registry.configs() {
            if resource.is_empty() || resource == id {
                document.insert(id.to_string(), section);
            }
        }

        document
    }

    /// Apply the sections of `body` to their owners.
    ///
    /// With a non-empty `resource`, every other key is skipped. Keys that
    /// name no opened module are ignored.
    pub fn apply(&self, resource: &str, body: &Map<String, Value>) {
        let registry = lock(&self.registry);

        for (key, section) in body {
            if !resource.is_empty() && key != resource {
                continue;
            }

            if key == HTTPD_SECTION {
                *lock(&self.httpd) = HttpdConfig::from_section(Some(section));
            } else {
                match registry.apply(key, section) {
                    Ok(()) => {}
                    Err(Error::NotFound(_)) => {
                        debug!("Ignoring configuration for unknown module '{}'", key)
                    }
                    Err(e) => warn!("Failed to apply {} configuration: {}", key, e),
                }
            }
        }
    }

    /// Save module configurations, close every module, then write the file
    pub fn shutdown(&self) -> Result<()> {
        let mut registry = lock(&self.registry);
        let mut store = lock(&self.store);

        registry.close_all(&mut store);
        store.set_section(HTTPD_SECTION, Some(lock(&self.httpd).to_section()));
        store.save()
    }
}

/// Shared application context passed to all handlers
#[derive(Clone)]
pub struct AppContext {
    pub core: Arc<Core>,
    pub dispatcher: Arc<Dispatcher>,
    pub facades: Facades,
}

impl AppContext {
    /// Open every module and register the URL tables.
    ///
    /// Modules that fail to open are skipped; the daemon keeps running
    /// with the rest.
    pub fn build(store: ConfigStore, descriptors: &[ModuleDescriptor], facades: Facades) -> Self {
        let registry = ModuleRegistry::load(descriptors, &facades, &store);
        info!(
            "{} of {} modules opened",
            registry.iter().filter(|m| m.is_open()).count(),
            descriptors.len()
        );

        let mut dispatcher = Dispatcher::new();
        for (id, routes) in registry.routes() {
            dispatcher.add_urls(id, routes);
        }

        let core = Arc::new(Core::new(registry, store));
        dispatcher.add_urls(api::config::NAMESPACE, api::config::routes(Arc::clone(&core)));

        info!(
            "Serving namespaces: {}",
            dispatcher.namespaces().collect::<Vec<_>>().join(", ")
        );

        Self {
            core,
            dispatcher: Arc::new(dispatcher),
            facades,
        }
    }

    /// Close the modules and persist the configuration
    pub fn shutdown(&self) {
        if let Err(e) = self.core.shutdown() {
            warn!("Failed to save configuration on shutdown: {}", e);
        }
    }

    /// [`AppContext::shutdown`] on the blocking pool
    pub async fn close(&self) {
        let ctx = self.clone();
        if let Err(e) = tokio::task::spawn_blocking(move || ctx.shutdown()).await {
            error!("Module shutdown panicked: {}", e);
        }
    }
}

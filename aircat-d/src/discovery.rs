//! Service advertisement
//!
//! Network announcement is left to the host (avahi, systemd-resolved);
//! this implementation keeps the published set and logs changes so the
//! host side can be checked against it.

use aircat_common::discovery::Discovery;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Service {
    pub kind: String,
    pub port: u16,
}

#[derive(Debug, Default)]
pub struct LoggingDiscovery {
    services: Mutex<BTreeMap<String, Service>>,
}

impl LoggingDiscovery {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, Service>> {
        self.services.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Currently published services by name
    pub fn services(&self) -> Vec<(String, Service)> {
        self.lock()
            .iter()
            .map(|(name, service)| (name.clone(), service.clone()))
            .collect()
    }
}

impl Discovery for LoggingDiscovery {
    fn publish(&self, name: &str, kind: &str, port: u16) {
        info!("Publishing service '{}' ({}) on port {}", name, kind, port);
        self.lock().insert(
            name.to_string(),
            Service {
                kind: kind.to_string(),
                port,
            },
        );
    }

    fn unpublish(&self, name: &str) {
        if self.lock().remove(name).is_some() {
            info!("Withdrew service '{}'", name);
        }
    }

    fn poll(&self) {
        debug!("{} services published", self.lock().len());
    }
}

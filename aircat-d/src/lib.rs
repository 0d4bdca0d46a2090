//! # AirCat Daemon
//!
//! Hosts the modules, serves their URL tables over HTTP and provides the
//! concrete audio output, media and discovery facades.

pub mod api;
pub mod audio;
pub mod config;
pub mod context;
pub mod discovery;
pub mod modules;

pub use context::{AppContext, Core};

/// Name under which the HTTP service is advertised
pub const SERVICE_NAME: &str = "AirCat";

/// Service type of the HTTP API
pub const SERVICE_KIND: &str = "_http._tcp";

/// Build identification captured by build.rs
pub mod build_info {
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");
    pub const GIT_HASH: &str = env!("GIT_HASH");
    pub const BUILD_TIMESTAMP: &str = env!("BUILD_TIMESTAMP");
    pub const BUILD_PROFILE: &str = env!("BUILD_PROFILE");
}

#[cfg(test)]
pub(crate) mod testing {
    use crate::audio::{AudioOutput, LocalMedia};
    use crate::discovery::LoggingDiscovery;
    use aircat_common::Facades;
    use std::sync::Arc;

    /// Facades that never touch an audio device
    pub fn facades() -> Facades {
        Facades {
            output: Arc::new(AudioOutput::null()),
            media: Arc::new(LocalMedia),
            discovery: Arc::new(LoggingDiscovery::new()),
        }
    }
}

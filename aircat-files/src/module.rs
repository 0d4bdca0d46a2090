//! Module entry point: descriptor, open and the [`Module`] implementation

use crate::api::FILES_URLS;
use crate::config::FilesConfig;
use crate::engine::PlaybackEngine;
use crate::watcher::WATCH_INTERVAL;
use aircat_common::http::{bind, Route};
use aircat_common::{Error, Module, ModuleContext, ModuleDescriptor, Result};
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

/// Module id, also the URL namespace and configuration section key
pub const MODULE_ID: &str = "files";

pub const DESCRIPTOR: ModuleDescriptor = ModuleDescriptor {
    id: MODULE_ID,
    name: "File browser",
    description: "Browse through local and remote folder and play any music file.",
    open,
};

/// Opened file browser module
pub struct FilesModule {
    engine: PlaybackEngine,
}

impl FilesModule {
    /// Wrap an engine. The caller decides whether a watcher runs.
    pub fn new(engine: PlaybackEngine) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &PlaybackEngine {
        &self.engine
    }
}

fn open(ctx: &ModuleContext) -> Result<Arc<dyn Module>> {
    let config = FilesConfig::from_section(ctx.config.as_ref());
    info!("Music root: {}", config.path.display());

    let engine = PlaybackEngine::new(Arc::clone(&ctx.output), Arc::clone(&ctx.media), config);
    engine
        .spawn_watcher(WATCH_INTERVAL)
        .map_err(|e| Error::ModuleOpen {
            id: MODULE_ID.into(),
            reason: format!("cannot start watcher: {}", e),
        })?;

    Ok(Arc::new(FilesModule::new(engine)))
}

impl Module for FilesModule {
    fn close(&self) -> Result<()> {
        self.engine.shutdown();
        Ok(())
    }

    fn set_config(&self, config: Option<&Value>) -> Result<()> {
        self.engine.set_config(FilesConfig::from_section(config));
        Ok(())
    }

    fn get_config(&self) -> Option<Value> {
        Some(self.engine.config().to_section())
    }

    fn routes(self: Arc<Self>) -> Vec<Route> {
        bind(self, FILES_URLS)
    }
}

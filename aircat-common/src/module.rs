//! Module contract
//!
//! Modules are linked into the daemon at compile time. Each one exposes a
//! [`ModuleDescriptor`] whose `open` function produces the opened handle,
//! a [`Module`] trait object exclusively owned by the registry.

use crate::discovery::Discovery;
use crate::http::Route;
use crate::media::MediaBackend;
use crate::output::Output;
use crate::Result;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// External collaborators shared by every module
#[derive(Clone)]
pub struct Facades {
    pub output: Arc<dyn Output>,
    pub media: Arc<dyn MediaBackend>,
    pub discovery: Arc<dyn Discovery>,
}

/// Everything a module receives when it is opened
#[derive(Clone)]
pub struct ModuleContext {
    pub output: Arc<dyn Output>,
    pub media: Arc<dyn MediaBackend>,
    pub discovery: Arc<dyn Discovery>,
    /// The module's section of the configuration document, if any
    pub config: Option<Value>,
}

impl ModuleContext {
    pub fn new(facades: &Facades, config: Option<Value>) -> Self {
        Self {
            output: Arc::clone(&facades.output),
            media: Arc::clone(&facades.media),
            discovery: Arc::clone(&facades.discovery),
            config,
        }
    }
}

impl fmt::Debug for ModuleContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleContext")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Constructor of an opened module
pub type OpenFn = fn(&ModuleContext) -> Result<Arc<dyn Module>>;

/// Static description of a module
#[derive(Clone, Copy)]
pub struct ModuleDescriptor {
    /// Stable identifier, used as URL namespace and config section key
    pub id: &'static str,
    /// Display name
    pub name: &'static str,
    pub description: &'static str,
    pub open: OpenFn,
}

impl fmt::Debug for ModuleDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleDescriptor")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish()
    }
}

/// An opened module.
///
/// `close` is required; the remaining capabilities are optional and
/// default to "not supported".
pub trait Module: Send + Sync {
    /// Release every resource held by the module. Called exactly once.
    fn close(&self) -> Result<()>;

    /// Apply a configuration section. `None` restores built-in defaults.
    fn set_config(&self, _config: Option<&Value>) -> Result<()> {
        Ok(())
    }

    /// Current configuration section, `None` if the module has none
    fn get_config(&self) -> Option<Value> {
        None
    }

    /// Bound URL table
    fn routes(self: Arc<Self>) -> Vec<Route> {
        Vec::new()
    }
}

//! # AirCat Common Library
//!
//! Shared code for the AirCat daemon and its modules:
//! - Error type
//! - JSON configuration store
//! - Module contract and registry
//! - URL tables and the HTTP dispatcher
//! - Output, media and discovery facade traits

pub mod config;
pub mod discovery;
pub mod dispatcher;
pub mod error;
pub mod http;
pub mod media;
pub mod module;
pub mod output;
pub mod registry;

pub use config::ConfigStore;
pub use dispatcher::Dispatcher;
pub use error::{Error, Result};
pub use module::{Facades, Module, ModuleContext, ModuleDescriptor};
pub use registry::ModuleRegistry;

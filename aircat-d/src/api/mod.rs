//! HTTP API for the AirCat daemon

pub mod config;
pub mod handlers;
pub mod server;

pub use server::create_router;

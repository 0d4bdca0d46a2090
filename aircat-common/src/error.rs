//! Common error types for AirCat

use thiserror::Error;

/// Common result type for AirCat operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the daemon and its modules
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A module failed to open; the module stays disabled
    #[error("Module '{id}' failed to open: {reason}")]
    ModuleOpen { id: String, reason: String },

    /// Output device or stream error
    #[error("Output error: {0}")]
    Output(String),

    /// Media file could not be opened or decoded
    #[error("Media error: {0}")]
    Media(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

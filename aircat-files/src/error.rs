//! Error types for the file browser module

use aircat_common::http::{Response, StatusCode};
use thiserror::Error;

/// Playback engine and listing errors
#[derive(Error, Debug)]
pub enum Error {
    /// Index outside the playlist; the playlist is left unchanged
    #[error("Index {index} out of range (playlist has {len} entries)")]
    IndexOutOfRange { index: usize, len: usize },

    /// Nothing to resume and nothing to start from
    #[error("Playlist is empty")]
    EmptyPlaylist,

    /// Media file could not be opened, decoded or registered with the output
    #[error("Cannot open {path}: {reason}")]
    ResourceOpen { path: String, reason: String },

    /// Operation needs a current file
    #[error("Nothing is playing")]
    NothingPlaying,

    /// Relative path escapes the music root or is absolute
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Directory could not be read
    #[error("Cannot list directory: {0}")]
    Listing(#[source] std::io::Error),

    /// Seek rejected by the decoder
    #[error("Seek failed: {0}")]
    Seek(String),
}

impl Error {
    /// HTTP status reported to clients
    pub fn status(&self) -> StatusCode {
        match self {
            Error::IndexOutOfRange { .. }
            | Error::EmptyPlaylist
            | Error::NothingPlaying
            | Error::InvalidPath(_)
            | Error::Seek(_) => StatusCode::BAD_REQUEST,
            Error::ResourceOpen { .. } => StatusCode::NOT_ACCEPTABLE,
            Error::Listing(_) => StatusCode::NOT_FOUND,
        }
    }

    /// Text response carrying the error reason
    pub fn to_response(&self) -> Response {
        Response::text(self.status(), self.to_string())
    }
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, Error>;

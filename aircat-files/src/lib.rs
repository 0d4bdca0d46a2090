//! # AirCat file browser
//!
//! Plays files from a local music root through a playlist:
//! - Playback engine with an end-of-track watcher thread
//! - Gapless handoff between consecutive tracks
//! - Directory listing with tags and cover art
//! - URL table served under `/files`

pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod listing;
pub mod module;
pub mod path;
pub mod playlist;
pub mod status;

mod session;
mod watcher;

pub use config::FilesConfig;
pub use engine::{PlaybackEngine, PlaybackState};
pub use error::{Error, Result};
pub use module::{FilesModule, DESCRIPTOR};
pub use status::{FileInfo, Listing, Status};
pub use watcher::WATCH_INTERVAL;

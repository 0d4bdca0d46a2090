//! Decoder and tag facade
//!
//! Opening, decoding and tag parsing of media files live outside the
//! playback engine; the engine only sees these traits.

use crate::output::SampleSource;
use crate::Result;
use std::path::Path;
use std::sync::Arc;

/// Decoder status of an open media file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    /// More samples are available
    Playing,
    /// Every packet has been decoded
    Eof,
    /// Decoding failed and cannot continue
    Error,
}

/// Embedded cover art
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Picture {
    pub data: Vec<u8>,
    pub mime: Option<String>,
}

/// Descriptive metadata of a media file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tags {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub comment: Option<String>,
    pub genre: Option<String>,
    pub track: u32,
    pub year: u32,
    pub picture: Option<Picture>,
}

/// An open, decodable media file.
///
/// The output pulls samples through [`SampleSource::read`] while the
/// engine queries position and status from request threads, so
/// implementations synchronize internally.
pub trait MediaFile: SampleSource {
    /// Sample rate in Hz
    fn samplerate(&self) -> u32;

    /// Channel count
    fn channels(&self) -> u16;

    /// Current position in seconds
    fn position(&self) -> u64;

    /// Total length in seconds (0 if unknown)
    fn length(&self) -> u64;

    /// Decoder status
    fn status(&self) -> FileStatus;

    /// Seek to a position in seconds
    fn set_position(&self, secs: u64) -> Result<()>;

    /// This file as the source handed to the output
    fn into_source(self: Arc<Self>) -> Arc<dyn SampleSource>;
}

/// Factory for media files and tag parser
pub trait MediaBackend: Send + Sync {
    /// Open a media file for decoding
    fn open(&self, path: &Path) -> Result<Arc<dyn MediaFile>>;

    /// Parse descriptive metadata, optionally including embedded artwork
    fn parse_tags(&self, path: &Path, with_picture: bool) -> Result<Tags>;
}

//! Output facade
//!
//! The audio output owns the device and pulls samples from registered
//! streams on its own real-time thread. Modules only register, start,
//! pause and remove streams.

use crate::Result;
use std::fmt;
use std::sync::Arc;

/// Handle of a stream registered with an [`Output`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StreamId(pub u64);

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stream#{}", self.0)
    }
}

/// Something the output can pull interleaved f32 samples from.
///
/// Called from the audio thread: implementations must not block for an
/// unbounded time.
pub trait SampleSource: Send + Sync {
    /// Fill `buf` with interleaved samples, returning how many were written.
    /// Returning 0 means the source is exhausted.
    fn read(&self, buf: &mut [f32]) -> usize;
}

/// Audio output facade
pub trait Output: Send + Sync {
    /// Register a new stream. Streams start paused.
    fn add_stream(
        &self,
        samplerate: u32,
        channels: u16,
        source: Arc<dyn SampleSource>,
    ) -> Result<StreamId>;

    /// Start or resume pulling samples from a stream
    fn play_stream(&self, id: StreamId);

    /// Stop pulling samples from a stream, keeping its position
    fn pause_stream(&self, id: StreamId);

    /// Unregister a stream. The output drops its reference to the source.
    fn remove_stream(&self, id: StreamId);

    /// True once the stream's source has been exhausted and its buffered
    /// audio has been played out.
    fn is_drained(&self, id: StreamId) -> bool;
}

//! An open media file bound to an output stream

use crate::error::{Error, Result};
use aircat_common::media::{MediaBackend, MediaFile};
use aircat_common::output::{Output, StreamId};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Stream and media file pair.
///
/// Dropping a session unregisters the stream from the output before the
/// file is released, so the output never pulls from a closed file.
pub struct Session {
    stream: StreamId,
    file: Arc<dyn MediaFile>,
    output: Arc<dyn Output>,
}

impl Session {
    /// Open `path`, register it with the output and start pulling samples
    pub fn start(output: &Arc<dyn Output>, media: &dyn MediaBackend, path: &Path) -> Result<Self> {
        let open_error = |reason: String| Error::ResourceOpen {
            path: path.display().to_string(),
            reason,
        };

        let file = media.open(path).map_err(|e| open_error(e.to_string()))?;
        let stream = output
            .add_stream(file.samplerate(), file.channels(), Arc::clone(&file).into_source())
            .map_err(|e| open_error(e.to_string()))?;

        output.play_stream(stream);
        debug!("Started {} for {}", stream, path.display());

        Ok(Self {
            stream,
            file,
            output: Arc::clone(output),
        })
    }

    pub fn stream(&self) -> StreamId {
        self.stream
    }

    pub fn file(&self) -> &dyn MediaFile {
        self.file.as_ref()
    }

    pub fn pause(&self) {
        self.output.pause_stream(self.stream);
    }

    pub fn resume(&self) {
        self.output.play_stream(self.stream);
    }

    /// True once the output has played out everything it pulled
    pub fn is_drained(&self) -> bool {
        self.output.is_drained(self.stream)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.output.remove_stream(self.stream);
        debug!("Released {}", self.stream);
    }
}

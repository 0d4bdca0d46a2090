//! Concrete output and media facades
//!
//! - [`output::AudioOutput`]: cpal device fed by a stream mixer, with rubato
//!   rate conversion per stream
//! - [`LocalMedia`]: symphonia decoding and lofty tag parsing of local files

pub mod decoder;
pub mod mixer;
pub mod output;
pub mod resampler;
pub mod tags;

use aircat_common::media::{MediaBackend, MediaFile, Tags};
use aircat_common::output::Output;
use aircat_common::Result;
use std::path::Path;
use std::sync::Arc;
use tracing::warn;

pub use decoder::SymphoniaFile;
pub use output::AudioOutput;

/// Media backend for files on the local filesystem
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalMedia;

impl MediaBackend for LocalMedia {
    fn open(&self, path: &Path) -> Result<Arc<dyn MediaFile>> {
        Ok(Arc::new(SymphoniaFile::open(path)?))
    }

    fn parse_tags(&self, path: &Path, with_picture: bool) -> Result<Tags> {
        tags::read_tags(path, with_picture)
    }
}

/// Open the default audio device, falling back to an output that
/// accepts streams without playing them
pub fn open_output() -> Arc<dyn Output> {
    match AudioOutput::open() {
        Ok(output) => Arc::new(output),
        Err(e) => {
            warn!("No audio output available ({}), streams will not be played", e);
            Arc::new(AudioOutput::null())
        }
    }
}

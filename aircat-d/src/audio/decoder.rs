//! Streaming decoder using symphonia
//!
//! Packets are decoded on demand from the output thread: each
//! [`SampleSource::read`] drains the current packet's samples and
//! decodes the next packet when it runs out.

use aircat_common::media::{FileStatus, MediaFile};
use aircat_common::output::SampleSource;
use aircat_common::{Error, Result};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{Decoder, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader, SeekMode, SeekTo};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::units::Time;
use tracing::{debug, warn};

struct DecoderState {
    format: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    sample_buf: Option<SampleBuffer<f32>>,
    /// Interleaved samples of the last decoded packet
    pending: Vec<f32>,
    offset: usize,
    /// Frames handed to the output so far
    frames_read: u64,
    status: FileStatus,
}

impl DecoderState {
    /// Decode the next packet of our track into `pending`.
    /// Returns false at end of stream or on a fatal error.
    fn decode_next(&mut self) -> bool {
        loop {
            let packet = match self.format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(ref e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    debug!("Reached end of file");
                    self.status = FileStatus::Eof;
                    return false;
                }
                Err(e) => {
                    warn!("Error reading packet: {}", e);
                    self.status = FileStatus::Error;
                    return false;
                }
            };

            if packet.track_id() != self.track_id {
                continue;
            }

            match self.decoder.decode(&packet) {
                Ok(decoded) => {
                    let spec = *decoded.spec();
                    let frames = decoded.capacity();
                    let too_small = self
                        .sample_buf
                        .as_ref()
                        .map_or(true, |buf| buf.capacity() < frames * spec.channels.count());
                    if too_small {
                        self.sample_buf = Some(SampleBuffer::new(frames as u64, spec));
                    }

                    self.pending.clear();
                    if let Some(buf) = self.sample_buf.as_mut() {
                        buf.copy_interleaved_ref(decoded);
                        self.pending.extend_from_slice(buf.samples());
                    }
                    self.offset = 0;
                    return true;
                }
                Err(SymphoniaError::DecodeError(e)) => {
                    warn!("Decode error: {}", e);
                    continue;
                }
                Err(e) => {
                    warn!("Decoder failed: {}", e);
                    self.status = FileStatus::Error;
                    return false;
                }
            }
        }
    }
}

/// An open media file decoded by symphonia
pub struct SymphoniaFile {
    path: PathBuf,
    samplerate: u32,
    channels: u16,
    length: u64,
    state: Mutex<DecoderState>,
}

impl SymphoniaFile {
    /// Probe and open a file, hinting the format by extension
    pub fn open(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)
            .map_err(|e| Error::Media(format!("Failed to open file {}: {}", path.display(), e)))?;

        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext_str) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext_str);
        }

        let probed = symphonia::default::get_probe()
            .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
            .map_err(|e| Error::Media(format!("Failed to probe format: {}", e)))?;

        let format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| Error::Media("No audio track found".to_string()))?;

        let track_id = track.id;
        let codec_params = track.codec_params.clone();

        let samplerate = codec_params
            .sample_rate
            .ok_or_else(|| Error::Media("Sample rate not found".to_string()))?;

        let channels = codec_params
            .channels
            .map(|c| c.count() as u16)
            .ok_or_else(|| Error::Media("Channel count not found".to_string()))?;

        let length = codec_params
            .n_frames
            .map(|frames| frames / u64::from(samplerate))
            .unwrap_or(0);

        let decoder = symphonia::default::get_codecs()
            .make(&codec_params, &DecoderOptions::default())
            .map_err(|e| Error::Media(format!("Failed to create decoder: {}", e)))?;

        debug!(
            "Opened {}: sample_rate={}, channels={}, length={}s",
            path.display(),
            samplerate,
            channels,
            length
        );

        Ok(Self {
            path: path.to_path_buf(),
            samplerate,
            channels,
            length,
            state: Mutex::new(DecoderState {
                format,
                decoder,
                track_id,
                sample_buf: None,
                pending: Vec::new(),
                offset: 0,
                frames_read: 0,
                status: FileStatus::Playing,
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> MutexGuard<'_, DecoderState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SampleSource for SymphoniaFile {
    fn read(&self, buf: &mut [f32]) -> usize {
        let mut state = self.lock();
        let mut written = 0;

        while written < buf.len() {
            if state.offset >= state.pending.len() {
                if state.status != FileStatus::Playing || !state.decode_next() {
                    break;
                }
                continue;
            }

            let available = &state.pending[state.offset..];
            let n = available.len().min(buf.len() - written);
            buf[written..written + n].copy_from_slice(&available[..n]);
            state.offset += n;
            written += n;
        }

        state.frames_read += (written / usize::from(self.channels.max(1))) as u64;
        written
    }
}

impl MediaFile for SymphoniaFile {
    fn samplerate(&self) -> u32 {
        self.samplerate
    }

    fn channels(&self) -> u16 {
        self.channels
    }

    fn position(&self) -> u64 {
        self.lock().frames_read / u64::from(self.samplerate.max(1))
    }

    fn length(&self) -> u64 {
        self.length
    }

    fn status(&self) -> FileStatus {
        self.lock().status
    }

    fn set_position(&self, secs: u64) -> Result<()> {
        if self.length > 0 && secs > self.length {
            return Err(Error::InvalidInput(format!(
                "Position {}s beyond length {}s",
                secs, self.length
            )));
        }

        let mut state = self.lock();
        let track_id = state.track_id;

        state
            .format
            .seek(
                SeekMode::Coarse,
                SeekTo::Time {
                    time: Time::new(secs, 0.0),
                    track_id: Some(track_id),
                },
            )
            .map_err(|e| Error::Media(format!("Seek failed: {}", e)))?;

        state.decoder.reset();
        state.pending.clear();
        state.offset = 0;
        state.frames_read = secs * u64::from(self.samplerate);
        state.status = FileStatus::Playing;

        debug!("Seeked {} to {}s", self.path.display(), secs);
        Ok(())
    }

    fn into_source(self: Arc<Self>) -> Arc<dyn SampleSource> {
        self
    }
}

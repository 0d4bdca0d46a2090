//! Stream mixer
//!
//! Sums every playing stream into the device buffer. Streams at another
//! rate go through a [`RateConverter`] first; the mixer then maps each
//! frame to the device channel layout: mono is copied to every channel,
//! a multichannel source feeding a mono device is averaged, otherwise
//! channels map one to one and missing ones stay silent.

use super::resampler::RateConverter;
use aircat_common::output::{SampleSource, StreamId};
use aircat_common::Result;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Frames requested from a source per refill at the device rate
const READ_FRAMES: usize = 1024;

struct MixerStream {
    source: Arc<dyn SampleSource>,
    channels: usize,
    /// None when the source already runs at the device rate
    converter: Option<RateConverter>,
    playing: bool,
    /// Last refill produced nothing
    exhausted: bool,
    /// Interleaved frames at the device rate, source layout
    buffer: Vec<f32>,
    /// Read offset into `buffer`, in samples
    offset: usize,
}

impl MixerStream {
    fn is_drained(&self) -> bool {
        self.exhausted && self.offset >= self.buffer.len()
    }

    /// Pull the next block from the source. The source is asked again
    /// even after it ran dry, so a rewound file resumes.
    fn refill(&mut self) {
        self.buffer.clear();
        self.offset = 0;

        match self.converter.as_mut() {
            Some(converter) => converter.pull(&*self.source, &mut self.buffer),
            None => {
                let wanted = READ_FRAMES * self.channels;
                self.buffer.resize(wanted, 0.0);
                let read = self.source.read(&mut self.buffer).min(wanted);
                self.buffer.truncate(read - read % self.channels);
            }
        }

        self.exhausted = self.buffer.is_empty();
    }

    /// Add one device frame to `out`. Returns false when the source has
    /// nothing more right now.
    fn mix_frame(&mut self, out: &mut [f32]) -> bool {
        if self.offset >= self.buffer.len() {
            self.refill();
            if self.buffer.is_empty() {
                return false;
            }
        }

        let frame = &self.buffer[self.offset..self.offset + self.channels];
        let out_channels = out.len();
        for (c, slot) in out.iter_mut().enumerate() {
            *slot += map_channel(frame, c, out_channels);
        }

        self.offset += self.channels;
        true
    }
}

fn map_channel(frame: &[f32], channel: usize, out_channels: usize) -> f32 {
    match (frame.len(), out_channels) {
        (1, _) => frame[0],
        (n, 1) => frame.iter().sum::<f32>() / n as f32,
        (n, _) if channel < n => frame[channel],
        _ => 0.0,
    }
}

/// Set of streams mixed into one device buffer
pub struct Mixer {
    samplerate: u32,
    channels: u16,
    next_id: AtomicU64,
    streams: Mutex<HashMap<StreamId, MixerStream>>,
}

impl Mixer {
    pub fn new(samplerate: u32, channels: u16) -> Self {
        Self {
            samplerate: samplerate.max(1),
            channels: channels.max(1),
            next_id: AtomicU64::new(1),
            streams: Mutex::new(HashMap::new()),
        }
    }

    pub fn samplerate(&self) -> u32 {
        self.samplerate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<StreamId, MixerStream>> {
        self.streams.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a paused stream
    pub fn add(
        &self,
        samplerate: u32,
        channels: u16,
        source: Arc<dyn SampleSource>,
    ) -> Result<StreamId> {
        let channels = channels.max(1);
        let converter = if samplerate == self.samplerate {
            None
        } else {
            Some(RateConverter::new(samplerate, self.samplerate, channels)?)
        };

        let id = StreamId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let stream = MixerStream {
            source,
            channels: usize::from(channels),
            converter,
            playing: false,
            exhausted: false,
            buffer: Vec::new(),
            offset: 0,
        };
        self.lock().insert(id, stream);
        Ok(id)
    }

    pub fn set_playing(&self, id: StreamId, playing: bool) {
        if let Some(stream) = self.lock().get_mut(&id) {
            stream.playing = playing;
        }
    }

    pub fn remove(&self, id: StreamId) {
        self.lock().remove(&id);
    }

    /// Unknown streams count as drained
    pub fn is_drained(&self, id: StreamId) -> bool {
        self.lock().get(&id).map_or(true, MixerStream::is_drained)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Overwrite `out` (interleaved, device layout) with the mix of
    /// every playing stream
    pub fn mix(&self, out: &mut [f32]) {
        out.fill(0.0);
        let channels = usize::from(self.channels);

        let mut streams = self.lock();
        for stream in streams.values_mut().filter(|s| s.playing) {
            for frame in out.chunks_mut(channels) {
                if !stream.mix_frame(frame) {
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct VecSource {
        samples: Mutex<Vec<f32>>,
    }

    impl VecSource {
        fn new(samples: &[f32]) -> Arc<Self> {
            Arc::new(Self {
                samples: Mutex::new(samples.to_vec()),
            })
        }
    }

    impl SampleSource for VecSource {
        fn read(&self, buf: &mut [f32]) -> usize {
            let mut samples = self.samples.lock().unwrap();
            let n = buf.len().min(samples.len());
            buf[..n].copy_from_slice(&samples[..n]);
            samples.drain(..n);
            n
        }
    }

    fn assert_close(actual: &[f32], expected: &[f32]) {
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < 1e-6, "{:?} != {:?}", actual, expected);
        }
    }

    #[test]
    fn test_mono_to_stereo_passthrough() {
        let mixer = Mixer::new(44100, 2);
        let id = mixer.add(44100, 1, VecSource::new(&[0.1, 0.2, 0.3])).unwrap();
        mixer.set_playing(id, true);

        let mut out = [1.0f32; 8];
        mixer.mix(&mut out);

        assert_close(&out, &[0.1, 0.1, 0.2, 0.2, 0.3, 0.3, 0.0, 0.0]);
        assert!(mixer.is_drained(id));
    }

    #[test]
    fn test_paused_stream_is_silent() {
        let mixer = Mixer::new(44100, 2);
        let id = mixer.add(44100, 2, VecSource::new(&[0.5, 0.5])).unwrap();

        let mut out = [1.0f32; 4];
        mixer.mix(&mut out);
        assert_close(&out, &[0.0; 4]);
        assert!(!mixer.is_drained(id));
    }

    #[test]
    fn test_streams_are_summed() {
        let mixer = Mixer::new(44100, 1);
        let a = mixer.add(44100, 1, VecSource::new(&[0.25, 0.25])).unwrap();
        let b = mixer.add(44100, 1, VecSource::new(&[0.5])).unwrap();
        mixer.set_playing(a, true);
        mixer.set_playing(b, true);

        let mut out = [0.0f32; 3];
        mixer.mix(&mut out);
        assert_close(&out, &[0.75, 0.25, 0.0]);
    }

    #[test]
    fn test_stereo_to_mono_averages() {
        let mixer = Mixer::new(48000, 1);
        let id = mixer.add(48000, 2, VecSource::new(&[0.2, 0.4])).unwrap();
        mixer.set_playing(id, true);

        let mut out = [0.0f32; 2];
        mixer.mix(&mut out);
        assert_close(&out, &[0.3, 0.0]);
    }

    /// Amplitude of the `freq` component of `samples` (Goertzel)
    fn tone_amplitude(samples: &[f32], freq: f64, samplerate: f64) -> f64 {
        let coeff = 2.0 * (2.0 * std::f64::consts::PI * freq / samplerate).cos();
        let (mut s1, mut s2) = (0.0f64, 0.0f64);
        for &x in samples {
            let s0 = f64::from(x) + coeff * s1 - s2;
            s2 = s1;
            s1 = s0;
        }
        let power = s1 * s1 + s2 * s2 - coeff * s1 * s2;
        2.0 * power.max(0.0).sqrt() / samples.len() as f64
    }

    fn tone(freq: f64, samplerate: f64, frames: usize) -> Vec<f32> {
        (0..frames)
            .map(|i| (2.0 * std::f64::consts::PI * freq * i as f64 / samplerate).sin() as f32)
            .collect()
    }

    /// Mix `frames` device frames of a mono device, after `warmup` frames
    fn render(mixer: &Mixer, warmup: usize, frames: usize) -> Vec<f32> {
        let mut scratch = vec![0.0f32; warmup];
        mixer.mix(&mut scratch);
        let mut out = vec![0.0f32; frames];
        mixer.mix(&mut out);
        out
    }

    #[test]
    fn test_downsampling_rejects_ultrasonic_tone() {
        // 30 kHz does not fit under 22.05 kHz and would fold onto 14.1 kHz
        let mixer = Mixer::new(44100, 1);
        let id = mixer
            .add(96000, 1, VecSource::new(&tone(30000.0, 96000.0, 96000)))
            .unwrap();
        mixer.set_playing(id, true);

        let out = render(&mixer, 4410, 22050);
        let alias = tone_amplitude(&out, 14100.0, 44100.0);
        assert!(alias < 0.01, "alias amplitude at 14.1 kHz = {}", alias);
    }

    #[test]
    fn test_resampled_tone_keeps_level() {
        let mixer = Mixer::new(44100, 1);
        let id = mixer
            .add(48000, 1, VecSource::new(&tone(1000.0, 48000.0, 48000)))
            .unwrap();
        mixer.set_playing(id, true);

        let out = render(&mixer, 4410, 22050);
        let level = tone_amplitude(&out, 1000.0, 44100.0);
        assert!((0.9..1.1).contains(&level), "1 kHz amplitude = {}", level);
    }

    #[test]
    fn test_stream_resumes_after_source_refills() {
        let source = VecSource::new(&[0.5; 4]);
        let mixer = Mixer::new(44100, 1);
        let id = mixer.add(44100, 1, Arc::clone(&source) as Arc<dyn SampleSource>).unwrap();
        mixer.set_playing(id, true);

        let mut out = [0.0f32; 8];
        mixer.mix(&mut out);
        assert!(mixer.is_drained(id));

        // A seek on the underlying file makes samples available again
        source.samples.lock().unwrap().extend_from_slice(&[0.25; 8]);
        mixer.mix(&mut out);
        assert_close(&out, &[0.25; 8]);
        assert!(!mixer.is_drained(id));
    }

    #[test]
    fn test_resampled_stream_resumes_after_source_refills() {
        let source = VecSource::new(&tone(440.0, 22050.0, 2205));
        let mixer = Mixer::new(44100, 1);
        let id = mixer.add(22050, 1, Arc::clone(&source) as Arc<dyn SampleSource>).unwrap();
        mixer.set_playing(id, true);

        let mut out = vec![0.0f32; 8820];
        mixer.mix(&mut out);
        assert!(mixer.is_drained(id));

        source
            .samples
            .lock()
            .unwrap()
            .extend(tone(440.0, 22050.0, 2205));
        let mut out = vec![0.0f32; 2048];
        mixer.mix(&mut out);
        assert!(out.iter().any(|s| s.abs() > 0.1));
        assert!(!mixer.is_drained(id));
    }

    #[test]
    fn test_removed_stream_counts_as_drained() {
        let mixer = Mixer::new(44100, 2);
        let id = mixer.add(44100, 2, VecSource::new(&[0.0; 4])).unwrap();
        assert_eq!(mixer.len(), 1);

        mixer.remove(id);
        assert!(mixer.is_empty());
        assert!(mixer.is_drained(id));
    }
}

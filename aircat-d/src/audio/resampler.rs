//! Per-stream sample rate conversion using rubato
//!
//! A [`RateConverter`] pulls interleaved frames from a [`SampleSource`],
//! runs them through a band-limited sinc resampler in fixed input chunks
//! and hands back interleaved frames at the device rate.

use aircat_common::output::SampleSource;
use aircat_common::{Error, Result};
use rubato::{
    Resampler as RubatoResampler, SincFixedIn, SincInterpolationParameters,
    SincInterpolationType, WindowFunction,
};
use tracing::{debug, warn};

/// Source frames per resampler call
pub const CHUNK_FRAMES: usize = 1024;

/// Streaming converter from one source rate to the device rate
pub struct RateConverter {
    resampler: SincFixedIn<f32>,
    channels: usize,
    ratio: f64,
    /// Interleaved source samples waiting for a full chunk
    pending: Vec<f32>,
    /// Leading output frames still to discard (filter delay)
    skip: usize,
    /// Source and output frames since the last reset, used to trim the tail
    frames_in: u64,
    frames_out: u64,
    /// Tail already flushed and the source has stayed dry since
    flushed: bool,
}

impl RateConverter {
    pub fn new(input_rate: u32, output_rate: u32, channels: u16) -> Result<Self> {
        let ratio = f64::from(output_rate) / f64::from(input_rate);
        let params = SincInterpolationParameters {
            sinc_len: 256,
            f_cutoff: 0.95,
            interpolation: SincInterpolationType::Linear,
            oversampling_factor: 256,
            window: WindowFunction::BlackmanHarris2,
        };

        let resampler =
            SincFixedIn::<f32>::new(ratio, 1.0, params, CHUNK_FRAMES, usize::from(channels))
                .map_err(|e| Error::Output(format!("Failed to create resampler: {}", e)))?;

        debug!(
            "Resampling from {}Hz to {}Hz ({} channels)",
            input_rate, output_rate, channels
        );

        let skip = resampler.output_delay();
        Ok(Self {
            resampler,
            channels: usize::from(channels),
            ratio,
            pending: Vec::new(),
            skip,
            frames_in: 0,
            frames_out: 0,
            flushed: false,
        })
    }

    /// Append converted frames to `out`.
    ///
    /// Appends nothing once the source is dry and the tail has been
    /// flushed. A source that produces samples again afterwards starts a
    /// fresh conversion.
    pub fn pull(&mut self, source: &dyn SampleSource, out: &mut Vec<f32>) {
        let ch = self.channels;
        let needed = self.resampler.input_frames_next() * ch;

        while self.pending.len() < needed {
            let start = self.pending.len();
            self.pending.resize(needed, 0.0);
            let read = source.read(&mut self.pending[start..]).min(needed - start);
            let whole = read - read % ch;
            self.pending.truncate(start + whole);
            if whole == 0 {
                break;
            }
        }

        if self.pending.len() >= needed {
            let planar = deinterleave(&self.pending[..needed], ch);
            self.pending.drain(..needed);
            self.frames_in += (needed / ch) as u64;
            self.flushed = false;

            match self.resampler.process(&planar, None) {
                Ok(planar_out) => self.emit(planar_out, out),
                Err(e) => warn!("Resampling failed: {}", e),
            }
            return;
        }

        if self.flushed {
            return;
        }

        // Source is dry: push what is left plus the filter tail
        let result = if self.pending.is_empty() {
            self.resampler.process_partial(None::<&[Vec<f32>]>, None)
        } else {
            let planar = deinterleave(&self.pending, ch);
            self.frames_in += (self.pending.len() / ch) as u64;
            self.pending.clear();
            self.resampler.process_partial(Some(planar.as_slice()), None)
        };
        match result {
            Ok(planar_out) => self.emit(planar_out, out),
            Err(e) => warn!("Resampling failed: {}", e),
        }
        match self.resampler.process_partial(None::<&[Vec<f32>]>, None) {
            Ok(planar_out) => self.emit(planar_out, out),
            Err(e) => warn!("Resampling failed: {}", e),
        }

        self.resampler.reset();
        self.skip = self.resampler.output_delay();
        self.frames_in = 0;
        self.frames_out = 0;
        self.flushed = true;
    }

    /// Interleave into `out`, dropping the filter delay at the head and
    /// anything past the converted length at the tail
    fn emit(&mut self, planar: Vec<Vec<f32>>, out: &mut Vec<f32>) {
        let frames = planar.first().map_or(0, Vec::len);
        let limit = (self.frames_in as f64 * self.ratio).ceil() as u64;

        for frame in 0..frames {
            if self.skip > 0 {
                self.skip -= 1;
                continue;
            }
            if self.frames_out >= limit {
                break;
            }
            out.extend(planar.iter().map(|channel| channel[frame]));
            self.frames_out += 1;
        }
    }
}

/// Convert interleaved samples to planar format.
///
/// Input:  [L, R, L, R, ...]
/// Output: [[L, L, ...], [R, R, ...]]
fn deinterleave(samples: &[f32], channels: usize) -> Vec<Vec<f32>> {
    let frames = samples.len() / channels;
    let mut planar = vec![Vec::with_capacity(frames); channels];

    for frame in samples.chunks_exact(channels) {
        for (channel, sample) in planar.iter_mut().zip(frame) {
            channel.push(*sample);
        }
    }

    planar
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Ramp(Mutex<Vec<f32>>);

    impl SampleSource for Ramp {
        fn read(&self, buf: &mut [f32]) -> usize {
            let mut samples = self.0.lock().unwrap();
            let n = buf.len().min(samples.len());
            buf[..n].copy_from_slice(&samples[..n]);
            samples.drain(..n);
            n
        }
    }

    fn drain(converter: &mut RateConverter, source: &Ramp) -> Vec<f32> {
        let mut out = Vec::new();
        loop {
            let before = out.len();
            converter.pull(source, &mut out);
            if out.len() == before {
                return out;
            }
        }
    }

    #[test]
    fn test_deinterleave() {
        let planar = deinterleave(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], 2);
        assert_eq!(planar, vec![vec![1.0, 3.0, 5.0], vec![2.0, 4.0, 6.0]]);
    }

    #[test]
    fn test_output_length_follows_ratio() {
        let input_frames = 48000;
        let source = Ramp(Mutex::new(
            (0..input_frames * 2)
                .map(|i| ((i / 2) as f32 * 0.01).sin() * 0.5)
                .collect(),
        ));

        let mut converter = RateConverter::new(48000, 44100, 2).unwrap();
        let out = drain(&mut converter, &source);

        let frames = out.len() / 2;
        assert!(
            (44098..=44100).contains(&frames),
            "Expected ~44100 frames, got {}",
            frames
        );
    }

    #[test]
    fn test_restarts_after_source_refills() {
        let source = Ramp(Mutex::new(vec![0.25; 4000]));
        let mut converter = RateConverter::new(22050, 44100, 1).unwrap();

        let first = drain(&mut converter, &source);
        assert!(!first.is_empty());

        source.0.lock().unwrap().extend(std::iter::repeat(0.25).take(4000));
        let second = drain(&mut converter, &source);
        assert_eq!(second.len(), first.len());
    }
}

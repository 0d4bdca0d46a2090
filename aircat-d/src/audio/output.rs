//! Audio output using cpal
//!
//! The cpal stream is not `Send`, so it is created and owned by a
//! dedicated thread that lives as long as the output. The device
//! callback pulls from the shared [`Mixer`].

use super::mixer::Mixer;
use aircat_common::output::{Output, SampleSource, StreamId};
use aircat_common::{Error, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, FromSample, SampleFormat, SizedSample, Stream, StreamConfig};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info};

/// Rate and layout used when the device accepts them, and by the null output
pub const PREFERRED_SAMPLERATE: u32 = 44100;
pub const PREFERRED_CHANNELS: u16 = 2;

struct DeviceThread {
    name: String,
    stop_flag: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl Drop for DeviceThread {
    fn drop(&mut self) {
        self.stop_flag.store(true, Ordering::Release);
        if let Some(handle) = self.thread.take() {
            handle.thread().unpark();
            if handle.join().is_err() {
                error!("Audio output thread panicked");
            }
        }
    }
}

/// Mixer-backed [`Output`], optionally attached to a device
pub struct AudioOutput {
    mixer: Arc<Mixer>,
    device: Option<DeviceThread>,
}

impl AudioOutput {
    /// Open the default output device and start pulling from the mixer
    pub fn open() -> Result<Self> {
        let (ready_tx, ready_rx) = mpsc::channel::<Result<(Arc<Mixer>, String)>>();
        let stop_flag = Arc::new(AtomicBool::new(false));
        let stop = Arc::clone(&stop_flag);

        let thread = thread::Builder::new()
            .name("audio-output".to_string())
            .spawn(move || {
                let stream = match start_stream() {
                    Ok((stream, mixer, name)) => {
                        let _ = ready_tx.send(Ok((mixer, name)));
                        stream
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };

                while !stop.load(Ordering::Acquire) {
                    thread::park();
                }

                drop(stream);
                debug!("Audio stream closed");
            })?;

        let (mixer, name) = match ready_rx.recv() {
            Ok(Ok(ready)) => ready,
            Ok(Err(e)) => {
                let _ = thread.join();
                return Err(e);
            }
            Err(_) => {
                let _ = thread.join();
                return Err(Error::Output("Audio thread exited during startup".to_string()));
            }
        };

        info!(
            "Audio output on '{}' ({} Hz, {} channels)",
            name,
            mixer.samplerate(),
            mixer.channels()
        );

        Ok(Self {
            mixer,
            device: Some(DeviceThread {
                name,
                stop_flag,
                thread: Some(thread),
            }),
        })
    }

    /// Output without a device. Streams are accepted but never pulled.
    pub fn null() -> Self {
        Self {
            mixer: Arc::new(Mixer::new(PREFERRED_SAMPLERATE, PREFERRED_CHANNELS)),
            device: None,
        }
    }

    pub fn device_name(&self) -> Option<&str> {
        self.device.as_ref().map(|d| d.name.as_str())
    }

    /// Number of registered streams
    pub fn stream_count(&self) -> usize {
        self.mixer.len()
    }
}

impl Output for AudioOutput {
    fn add_stream(
        &self,
        samplerate: u32,
        channels: u16,
        source: Arc<dyn SampleSource>,
    ) -> Result<StreamId> {
        if samplerate == 0 || channels == 0 {
            return Err(Error::Output(format!(
                "Unsupported stream format: {} Hz, {} channels",
                samplerate, channels
            )));
        }

        let id = self.mixer.add(samplerate, channels, source)?;
        debug!("Added {} ({} Hz, {} channels)", id, samplerate, channels);
        Ok(id)
    }

    fn play_stream(&self, id: StreamId) {
        self.mixer.set_playing(id, true);
    }

    fn pause_stream(&self, id: StreamId) {
        self.mixer.set_playing(id, false);
    }

    fn remove_stream(&self, id: StreamId) {
        self.mixer.remove(id);
        debug!("Removed {}", id);
    }

    fn is_drained(&self, id: StreamId) -> bool {
        self.mixer.is_drained(id)
    }
}

// ============================================================================
// Device setup (runs on the audio thread)
// ============================================================================

fn start_stream() -> Result<(Stream, Arc<Mixer>, String)> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| Error::Output("No default output device found".to_string()))?;
    let name = device.name().unwrap_or_else(|_| "Unknown".to_string());

    let (config, sample_format) = get_best_config(&device)?;
    debug!(
        "Audio config: sample_rate={}, channels={}, format={:?}",
        config.sample_rate.0, config.channels, sample_format
    );

    let mixer = Arc::new(Mixer::new(config.sample_rate.0, config.channels));

    let stream = match sample_format {
        SampleFormat::F32 => build_stream::<f32>(&device, &config, Arc::clone(&mixer))?,
        SampleFormat::I16 => build_stream::<i16>(&device, &config, Arc::clone(&mixer))?,
        SampleFormat::U16 => build_stream::<u16>(&device, &config, Arc::clone(&mixer))?,
        other => {
            return Err(Error::Output(format!("Unsupported sample format: {:?}", other)));
        }
    };

    stream
        .play()
        .map_err(|e| Error::Output(format!("Failed to start stream: {}", e)))?;

    Ok((stream, mixer, name))
}

/// Prefer 44.1kHz stereo f32, else the device default
fn get_best_config(device: &Device) -> Result<(StreamConfig, SampleFormat)> {
    let mut supported_configs = device
        .supported_output_configs()
        .map_err(|e| Error::Output(format!("Failed to get device configs: {}", e)))?;

    let preferred = supported_configs.find(|config| {
        config.channels() == PREFERRED_CHANNELS
            && config.min_sample_rate().0 <= PREFERRED_SAMPLERATE
            && config.max_sample_rate().0 >= PREFERRED_SAMPLERATE
            && config.sample_format() == SampleFormat::F32
    });

    if let Some(supported_config) = preferred {
        let sample_format = supported_config.sample_format();
        let config = supported_config
            .with_sample_rate(cpal::SampleRate(PREFERRED_SAMPLERATE))
            .config();
        return Ok((config, sample_format));
    }

    let supported_config = device
        .default_output_config()
        .map_err(|e| Error::Output(format!("Failed to get default config: {}", e)))?;

    Ok((supported_config.config(), supported_config.sample_format()))
}

fn build_stream<T>(device: &Device, config: &StreamConfig, mixer: Arc<Mixer>) -> Result<Stream>
where
    T: SizedSample + FromSample<f32>,
{
    let mut scratch: Vec<f32> = Vec::new();

    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                scratch.resize(data.len(), 0.0);
                mixer.mix(&mut scratch);
                for (out, sample) in data.iter_mut().zip(&scratch) {
                    *out = T::from_sample(sample.clamp(-1.0, 1.0));
                }
            },
            |err| error!("Audio stream error: {}", err),
            None,
        )
        .map_err(|e| Error::Output(format!("Failed to build stream: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Silence(Mutex<usize>);

    impl SampleSource for Silence {
        fn read(&self, buf: &mut [f32]) -> usize {
            let mut left = self.0.lock().unwrap();
            let n = buf.len().min(*left);
            buf[..n].fill(0.0);
            *left -= n;
            n
        }
    }

    #[test]
    fn test_null_output_accepts_streams() {
        let output = AudioOutput::null();
        assert!(output.device_name().is_none());

        let id = output
            .add_stream(44100, 2, Arc::new(Silence(Mutex::new(16))))
            .unwrap();
        output.play_stream(id);
        assert_eq!(output.stream_count(), 1);
        assert!(!output.is_drained(id));

        output.remove_stream(id);
        assert_eq!(output.stream_count(), 0);
        assert!(output.is_drained(id));
    }

    #[test]
    fn test_rejects_empty_format() {
        let output = AudioOutput::null();
        assert!(output
            .add_stream(0, 2, Arc::new(Silence(Mutex::new(0))))
            .is_err());
    }

    #[test]
    fn test_accepts_other_rates() {
        let output = AudioOutput::null();
        let id = output
            .add_stream(48000, 2, Arc::new(Silence(Mutex::new(16))))
            .unwrap();
        assert_eq!(output.stream_count(), 1);
        output.remove_stream(id);
    }
}

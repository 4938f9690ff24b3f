//! Audio output using cpal
//!
//! Plays a fully prepared buffer on the default output device and blocks the
//! calling thread until the buffer has drained, the caller cancels, or the
//! stream reports an error. Must be driven from a dedicated (non-async) thread.

use crate::error::{Error, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, FromSample, SampleFormat, SizedSample, Stream, StreamConfig};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, error, info};

/// Poll interval of the blocking wait loop
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Time allowed for the device to flush its last buffer after the data ran out
const DRAIN_GRACE: Duration = Duration::from_millis(100);

/// Is there a default output device on this host
pub fn default_output_available() -> bool {
    let host = cpal::default_host();
    match host.default_output_device() {
        Some(device) => {
            let usable = device.default_output_config().is_ok();
            debug!(
                "Default output device: {} (usable: {})",
                device.name().unwrap_or_else(|_| "Unknown".to_string()),
                usable
            );
            usable
        }
        None => {
            debug!("No default output device on host {:?}", host.id());
            false
        }
    }
}

/// Default output device with its native stream configuration
pub struct OutputDevice {
    device: Device,
    config: StreamConfig,
    sample_format: SampleFormat,
}

impl OutputDevice {
    /// Open the host's default output device.
    ///
    /// # Errors
    /// - No default output device
    /// - Device does not report a default configuration
    pub fn open_default() -> Result<Self> {
        let host = cpal::default_host();

        let device = host
            .default_output_device()
            .ok_or_else(|| Error::AudioOutput("No default output device found".to_string()))?;

        let supported = device
            .default_output_config()
            .map_err(|e| Error::AudioOutput(format!("Failed to get default config: {}", e)))?;

        let sample_format = supported.sample_format();
        let config = supported.config();

        info!(
            "Using audio device: {}",
            device.name().unwrap_or_else(|_| "Unknown".to_string())
        );
        debug!(
            "Audio config: sample_rate={}, channels={}, format={:?}",
            config.sample_rate.0, config.channels, sample_format
        );

        Ok(Self {
            device,
            config,
            sample_format,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate.0
    }

    pub fn channels(&self) -> u16 {
        self.config.channels
    }

    /// Play interleaved samples (already at the device rate and channel count)
    ///
    /// Returns `Ok(())` when playback finished or `cancel` was raised.
    pub fn play_blocking(&self, samples: Vec<f32>, volume: f32, cancel: &AtomicBool) -> Result<()> {
        let finished = Arc::new(AtomicBool::new(false));
        let stream_error = Arc::new(Mutex::new(None::<String>));
        let volume = volume.clamp(0.0, 1.0);

        let stream = match self.sample_format {
            SampleFormat::F32 => self.build_stream::<f32>(samples, volume, &finished, &stream_error)?,
            SampleFormat::F64 => self.build_stream::<f64>(samples, volume, &finished, &stream_error)?,
            SampleFormat::I16 => self.build_stream::<i16>(samples, volume, &finished, &stream_error)?,
            SampleFormat::I32 => self.build_stream::<i32>(samples, volume, &finished, &stream_error)?,
            SampleFormat::U16 => self.build_stream::<u16>(samples, volume, &finished, &stream_error)?,
            SampleFormat::U8 => self.build_stream::<u8>(samples, volume, &finished, &stream_error)?,
            sample_format => {
                return Err(Error::AudioOutput(format!(
                    "Unsupported sample format: {:?}",
                    sample_format
                )));
            }
        };

        stream
            .play()
            .map_err(|e| Error::AudioOutput(format!("Failed to start stream: {}", e)))?;

        loop {
            std::thread::sleep(POLL_INTERVAL);

            if cancel.load(Ordering::SeqCst) {
                debug!("Playback cancelled");
                break;
            }

            if let Some(message) = stream_error.lock().ok().and_then(|mut slot| slot.take()) {
                return Err(Error::AudioOutput(message));
            }

            if finished.load(Ordering::SeqCst) {
                std::thread::sleep(DRAIN_GRACE);
                break;
            }
        }

        if let Err(e) = stream.pause() {
            debug!("Failed to pause stream: {}", e);
        }

        Ok(())
    }

    fn build_stream<T>(
        &self,
        samples: Vec<f32>,
        volume: f32,
        finished: &Arc<AtomicBool>,
        stream_error: &Arc<Mutex<Option<String>>>,
    ) -> Result<Stream>
    where
        T: SizedSample + FromSample<f32>,
    {
        let finished = Arc::clone(finished);
        let stream_error = Arc::clone(stream_error);
        let mut cursor = 0usize;

        self.device
            .build_output_stream(
                &self.config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                    for out in data.iter_mut() {
                        let value = match samples.get(cursor) {
                            Some(sample) => {
                                cursor += 1;
                                (sample * volume).clamp(-1.0, 1.0)
                            }
                            None => 0.0,
                        };
                        *out = <T as cpal::Sample>::from_sample(value);
                    }

                    if cursor >= samples.len() {
                        finished.store(true, Ordering::SeqCst);
                    }
                },
                move |err| {
                    error!("Audio stream error: {}", err);
                    if let Ok(mut slot) = stream_error.lock() {
                        slot.get_or_insert_with(|| format!("Audio stream error: {}", err));
                    }
                },
                None,
            )
            .map_err(|e| Error::AudioOutput(format!("Failed to build stream: {}", e)))
    }
}

//! In-process playback backend
//!
//! Decodes the asset with symphonia, converts it to the default device's
//! format with rubato, and plays it through cpal. The work runs on a dedicated
//! thread because cpal streams are not `Send` on every host. A timeout raises
//! the worker's cancel flag, which stops the stream within one poll interval.

use super::backend::{check_asset, PlaybackBackend, ProbeCache};
use super::result::PlaybackResult;
use crate::audio::{decode_file, default_output_available, OutputDevice, Resampler};
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tracing::{debug, warn};

pub const NATIVE_BACKEND_NAME: &str = "native";

/// Backend that plays through the default output device directly
#[derive(Debug, Default)]
pub struct NativeBackend {
    probe: ProbeCache,
}

impl NativeBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Decode, convert, and play `asset` on the calling thread
fn play_on_device(asset: &Path, volume: f32, cancel: &AtomicBool) -> Result<()> {
    let audio = decode_file(asset)?;

    if cancel.load(Ordering::SeqCst) {
        return Ok(());
    }

    let device = OutputDevice::open_default()?;
    let samples = Resampler::convert_for_output(&audio, device.sample_rate(), device.channels())?;

    debug!(
        "Playing {:?} of audio ({} samples at {}Hz)",
        audio.duration(),
        samples.len(),
        device.sample_rate()
    );

    device.play_blocking(samples, volume, cancel)
}

#[async_trait]
impl PlaybackBackend for NativeBackend {
    fn name(&self) -> &str {
        NATIVE_BACKEND_NAME
    }

    async fn probe(&self) -> bool {
        self.probe
            .get_or_probe(NATIVE_BACKEND_NAME, || async {
                match tokio::task::spawn_blocking(default_output_available).await {
                    Ok(available) => available,
                    Err(e) => {
                        warn!("Output device probe panicked: {}", e);
                        false
                    }
                }
            })
            .await
    }

    async fn play(&self, asset: &Path, volume: f32, timeout: Duration) -> PlaybackResult {
        let name = NATIVE_BACKEND_NAME;

        if let Some(result) = check_asset(name, asset).await {
            return result;
        }

        let started = Instant::now();
        let cancel = Arc::new(AtomicBool::new(false));
        let (tx, rx) = oneshot::channel();

        let worker_cancel = Arc::clone(&cancel);
        let worker_asset: PathBuf = asset.to_path_buf();
        let spawned = std::thread::Builder::new()
            .name("chime-native-playback".to_string())
            .spawn(move || {
                let outcome = play_on_device(&worker_asset, volume, &worker_cancel);
                // Receiver is gone after a timeout
                let _ = tx.send(outcome);
            });

        if let Err(e) = spawned {
            return PlaybackResult::failed(name, format!("Failed to start playback thread: {}", e))
                .with_duration(started.elapsed());
        }

        let result = match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(Ok(()))) => PlaybackResult::success(name),
            Ok(Ok(Err(Error::UnsupportedFormat(reason)))) => PlaybackResult::unsupported_format(
                name,
                format!("Unsupported audio format {}: {}", asset.display(), reason),
            ),
            Ok(Ok(Err(e))) => PlaybackResult::failed(name, format!("native playback failed: {}", e)),
            Ok(Err(_)) => PlaybackResult::failed(name, "native playback thread exited without a result"),
            Err(_) => {
                warn!(backend = name, "Playback exceeded {:?}, stopping stream", timeout);
                cancel.store(true, Ordering::SeqCst);
                PlaybackResult::timeout(name, timeout)
            }
        };

        result.with_duration(started.elapsed())
    }
}

//! Default notification tone generation
//!
//! Writes the bundled default sound: a short two-tone chime, mono 16-bit PCM
//! WAV, with linear fades at both ends to avoid clicks.

use crate::error::Result;
use hound::{SampleFormat, WavSpec, WavWriter};
use std::f32::consts::PI;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// Shape of the generated tone
#[derive(Debug, Clone, PartialEq)]
pub struct ToneSpec {
    pub duration: Duration,
    pub sample_rate: u32,
    /// Frequency of the first half (Hz)
    pub frequency1: f32,
    /// Frequency of the second half (Hz)
    pub frequency2: f32,
    /// Peak amplitude, 0.0 - 1.0
    pub volume: f32,
    /// Fade-in and fade-out length
    pub fade: Duration,
}

impl Default for ToneSpec {
    fn default() -> Self {
        Self {
            duration: Duration::from_millis(600),
            sample_rate: 44100,
            frequency1: 800.0,
            frequency2: 1000.0,
            volume: 0.4,
            fade: Duration::from_millis(50),
        }
    }
}

impl ToneSpec {
    /// Number of mono frames the tone occupies
    pub fn frame_count(&self) -> usize {
        (self.duration.as_secs_f64() * self.sample_rate as f64) as usize
    }

    /// Sample value at time `t` seconds, before 16-bit quantization
    pub fn sample_at(&self, t: f32) -> f32 {
        let duration = self.duration.as_secs_f32();
        let fade = self.fade.as_secs_f32();

        let frequency = if t < duration / 2.0 {
            self.frequency1
        } else {
            self.frequency2
        };

        let envelope = if fade > 0.0 && t < fade {
            t / fade
        } else if fade > 0.0 && t > duration - fade {
            ((duration - t) / fade).max(0.0)
        } else {
            1.0
        };

        self.volume * envelope * (2.0 * PI * frequency * t).sin()
    }
}

/// Write the tone described by `spec` to `path` (overwrites)
pub fn generate_notification_tone(path: &Path, spec: &ToneSpec) -> Result<()> {
    let wav_spec = WavSpec {
        channels: 1,
        sample_rate: spec.sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut writer = WavWriter::create(path, wav_spec)?;

    let frames = spec.frame_count();
    for i in 0..frames {
        let t = i as f32 / spec.sample_rate as f32;
        let sample = (spec.sample_at(t).clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
        writer.write_sample(sample)?;
    }

    writer.finalize()?;

    debug!(
        "Generated {} frames ({:?}, {}Hz -> {}Hz) at {}",
        frames,
        spec.duration,
        spec.frequency1,
        spec.frequency2,
        path.display()
    );
    Ok(())
}

/// Generate the default tone at `path` unless a file already exists there
///
/// Parent directories are created as needed. Returns `true` if a file was written.
pub fn ensure_default_tone(path: &Path) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    generate_notification_tone(path, &ToneSpec::default())?;
    info!("Generated default notification sound: {}", path.display());
    Ok(true)
}

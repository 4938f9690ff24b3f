//! WAV fixture generation
//!
//! Short deterministic files for exercising backends and the player without
//! shipping binary fixtures.

use hound::{WavSpec, WavWriter};
use std::f32::consts::PI;
use std::path::{Path, PathBuf};

/// Standard test sample rate (44.1 kHz)
const TEST_SAMPLE_RATE: u32 = 44100;

/// Generate a sine wave WAV file (16-bit PCM)
///
/// # Arguments
/// * `path` - Output file path
/// * `duration_ms` - Duration in milliseconds
/// * `frequency_hz` - Sine wave frequency in Hz
/// * `channels` - 1 for mono, 2 for stereo
pub fn generate_sine_wav<P: AsRef<Path>>(
    path: P,
    duration_ms: u64,
    frequency_hz: f32,
    channels: u16,
) -> Result<(), hound::Error> {
    let spec = WavSpec {
        channels,
        sample_rate: TEST_SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = WavWriter::create(path, spec)?;

    let total_frames = (TEST_SAMPLE_RATE as u64 * duration_ms) / 1000;
    let amplitude = 0.5 * i16::MAX as f32;

    for frame_idx in 0..total_frames {
        let t = frame_idx as f32 / TEST_SAMPLE_RATE as f32;
        let sample = ((2.0 * PI * frequency_hz * t).sin() * amplitude) as i16;

        for _ in 0..channels {
            writer.write_sample(sample)?;
        }
    }

    writer.finalize()?;
    Ok(())
}

/// Write a 100 ms mono fixture named `name` into `dir` and return its path
pub fn write_fixture(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    generate_sine_wav(&path, 100, 440.0, 1).expect("Failed to write WAV fixture");
    path
}

//! Sample rate and channel conversion using rubato
//!
//! Adapts a decoded asset to whatever the output device runs at.

use crate::audio::decoder::DecodedAudio;
use crate::error::{Error, Result};
use rubato::{FastFixedIn, PolynomialDegree, Resampler as RubatoResampler};
use tracing::debug;

/// Audio resampler using rubato for sample rate conversion.
pub struct Resampler;

impl Resampler {
    /// Resample interleaved audio from `input_rate` to `output_rate`.
    ///
    /// Returns a copy when the rates already match.
    pub fn resample(
        input: &[f32],
        input_rate: u32,
        output_rate: u32,
        channels: u16,
    ) -> Result<Vec<f32>> {
        if input_rate == output_rate {
            debug!("Sample rate already at {}Hz, skipping resample", output_rate);
            return Ok(input.to_vec());
        }

        if channels == 0 || input_rate == 0 || output_rate == 0 {
            return Err(Error::Decode(format!(
                "Cannot resample {} channels from {}Hz to {}Hz",
                channels, input_rate, output_rate
            )));
        }

        // De-interleave samples for rubato (which expects planar format)
        let planar_input = Self::deinterleave(input, channels);
        let input_frames = planar_input.first().map(Vec::len).unwrap_or(0);

        if input_frames == 0 {
            return Ok(Vec::new());
        }

        debug!(
            "Resampling {} frames from {}Hz to {}Hz ({} channels)",
            input_frames, input_rate, output_rate, channels
        );

        // Whole asset as a single chunk: notification sounds are short
        let mut resampler = FastFixedIn::<f32>::new(
            output_rate as f64 / input_rate as f64,
            1.0, // max_relative_ratio (no runtime changes)
            PolynomialDegree::Cubic,
            input_frames,
            channels as usize,
        )
        .map_err(|e| Error::Decode(format!("Failed to create resampler: {}", e)))?;

        let planar_output = resampler
            .process(&planar_input, None)
            .map_err(|e| Error::Decode(format!("Resampling failed: {}", e)))?;

        Ok(Self::interleave(planar_output))
    }

    /// Map interleaved audio from `from` channels to `to` channels.
    ///
    /// Mono is copied to every output channel; downmix to mono averages; other
    /// layouts keep the shared leading channels and pad the rest with silence.
    pub fn remap_channels(input: &[f32], from: u16, to: u16) -> Vec<f32> {
        if from == to || from == 0 || to == 0 {
            return input.to_vec();
        }

        let from = from as usize;
        let to = to as usize;
        let frames = input.len() / from;
        let mut output = Vec::with_capacity(frames * to);

        for frame in input.chunks_exact(from) {
            if from == 1 {
                output.extend(std::iter::repeat(frame[0]).take(to));
            } else if to == 1 {
                output.push(frame.iter().sum::<f32>() / from as f32);
            } else {
                for ch in 0..to {
                    output.push(frame.get(ch).copied().unwrap_or(0.0));
                }
            }
        }

        output
    }

    /// Convert a decoded asset to the device's rate and channel count
    pub fn convert_for_output(audio: &DecodedAudio, output_rate: u32, output_channels: u16) -> Result<Vec<f32>> {
        let resampled = Self::resample(&audio.samples, audio.sample_rate, output_rate, audio.channels)?;
        Ok(Self::remap_channels(&resampled, audio.channels, output_channels))
    }

    /// Convert interleaved samples to planar format.
    ///
    /// Input:  [L, R, L, R, L, R, ...]
    /// Output: [[L, L, L, ...], [R, R, R, ...]]
    fn deinterleave(samples: &[f32], channels: u16) -> Vec<Vec<f32>> {
        let num_channels = channels as usize;
        let num_frames = samples.len() / num_channels;

        let mut planar = vec![Vec::with_capacity(num_frames); num_channels];

        for frame in samples.chunks_exact(num_channels) {
            for (ch_idx, sample) in frame.iter().enumerate() {
                planar[ch_idx].push(*sample);
            }
        }

        planar
    }

    /// Convert planar samples to interleaved format.
    ///
    /// Input:  [[L, L, L, ...], [R, R, R, ...]]
    /// Output: [L, R, L, R, L, R, ...]
    fn interleave(planar: Vec<Vec<f32>>) -> Vec<f32> {
        if planar.is_empty() {
            return Vec::new();
        }

        let num_channels = planar.len();
        let num_frames = planar.iter().map(Vec::len).min().unwrap_or(0);
        let mut interleaved = Vec::with_capacity(num_frames * num_channels);

        for frame_idx in 0..num_frames {
            for channel in &planar {
                interleaved.push(channel[frame_idx]);
            }
        }

        interleaved
    }
}

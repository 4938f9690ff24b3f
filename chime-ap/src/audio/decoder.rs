//! Audio decoder using symphonia
//!
//! Decodes a whole (short) asset into interleaved f32 samples for the native
//! backend. Format or codec rejection is reported as
//! [`Error::UnsupportedFormat`] so it can surface as its own playback status.

use crate::error::{Error, Result};
use std::path::Path;
use std::time::Duration;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

/// Fully decoded asset
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    /// Interleaved samples in [-1.0, 1.0]
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl DecodedAudio {
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.samples.len() / self.channels as usize
        }
    }

    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.frames() as f64 / self.sample_rate as f64)
    }
}

/// Decode an entire file to interleaved f32 samples
///
/// # Errors
/// - [`Error::Io`]: file could not be opened
/// - [`Error::UnsupportedFormat`]: no demuxer/decoder accepts the file
/// - [`Error::Decode`]: the stream is corrupt or contains no audio
pub fn decode_file(path: &Path) -> Result<DecodedAudio> {
    debug!("Decoding {}", path.display());

    let file = std::fs::File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    // Hint the probe with the file extension
    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| classify(e, "probe format"))?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| Error::UnsupportedFormat("No audio track found".to_string()))?;

    let track_id = track.id;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| classify(e, "create decoder"))?;

    let mut samples = Vec::new();
    let mut sample_rate = track.codec_params.sample_rate.unwrap_or(0);
    let mut channels = track
        .codec_params
        .channels
        .map(|c| c.count() as u16)
        .unwrap_or(0);

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(classify(e, "read packet")),
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                sample_rate = spec.rate;
                channels = spec.channels.count() as u16;

                let mut buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                buf.copy_interleaved_ref(decoded);
                samples.extend_from_slice(buf.samples());
            }
            Err(SymphoniaError::DecodeError(e)) => {
                // Corrupt packet, skip it
                warn!("Skipping undecodable packet: {}", e);
            }
            Err(e) => return Err(classify(e, "decode packet")),
        }
    }

    if samples.is_empty() || channels == 0 || sample_rate == 0 {
        return Err(Error::Decode(format!(
            "No audio decoded from {}",
            path.display()
        )));
    }

    let audio = DecodedAudio {
        samples,
        sample_rate,
        channels,
    };

    debug!(
        "Decoded {} frames at {}Hz, {} channels ({:?})",
        audio.frames(),
        audio.sample_rate,
        audio.channels,
        audio.duration()
    );

    Ok(audio)
}

fn classify(error: SymphoniaError, step: &str) -> Error {
    match error {
        SymphoniaError::Unsupported(what) => {
            Error::UnsupportedFormat(format!("Failed to {}: unsupported {}", step, what))
        }
        SymphoniaError::IoError(e) => Error::Io(e),
        other => Error::Decode(format!("Failed to {}: {}", step, other)),
    }
}

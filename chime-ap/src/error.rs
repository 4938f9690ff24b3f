//! Error types for chime-ap
//!
//! Backend failures are reported as [`PlaybackResult`](crate::playback::PlaybackResult)
//! values, never as errors. `Error` covers caller contract violations
//! (out-of-range volume, zero timeout) and the internal steps of the native
//! audio pipeline, which the native backend converts into results.

use thiserror::Error;

/// Main error type for chime-ap
#[derive(Error, Debug)]
pub enum Error {
    /// Out-of-range volume, zero timeout or other invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Audio decoding errors
    #[error("Audio decode error: {0}")]
    Decode(String),

    /// The asset's container or codec is not supported by the decoder
    #[error("Unsupported audio format: {0}")]
    UnsupportedFormat(String),

    /// Audio output device errors
    #[error("Audio output error: {0}")]
    AudioOutput(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// WAV writing errors
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),
}

/// Convenience Result type using chime-ap Error
pub type Result<T> = std::result::Result<T, Error>;

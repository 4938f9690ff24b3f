//! Audio helpers for in-process playback
//!
//! Decode (symphonia), convert (rubato), and output (cpal) a short asset, plus
//! generation of the default notification tone (hound).

pub mod decoder;
pub mod output;
pub mod resampler;
pub mod tone;

pub use decoder::{decode_file, DecodedAudio};
pub use output::{default_output_available, OutputDevice};
pub use resampler::Resampler;
pub use tone::{ensure_default_tone, generate_notification_tone, ToneSpec};

//! # Chime Audio Player Library (chime-ap)
//!
//! Plays a short notification sound through the first working playback
//! mechanism on the host, falling back to the default sound when a custom
//! sound cannot be played.
//!
//! **Architecture:**
//! - [`playback::PlaybackBackend`]: one implementation per mechanism
//!   (command-line players, in-process cpal output)
//! - [`playback::BackendRegistry`]: probed, priority-ordered backend list
//! - [`playback::AudioPlayer`]: sequential attempts and the fallback policy
//! - [`audio`]: decode/resample/output helpers for the native backend and
//!   default tone generation

pub mod audio;
pub mod error;
pub mod playback;

pub use error::{Error, Result};
pub use playback::{AudioPlayer, PlaybackResult, PlaybackStatus, PlayerStatus};

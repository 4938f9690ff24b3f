//! Test helper modules for chime-ap integration tests
//!
//! Provides reusable test infrastructure components:
//! - MockBackend: instrumented backend with scripted outcomes
//! - audio_generator: WAV fixtures written with hound

#![allow(dead_code)]

pub mod audio_generator;
pub mod mock_backend;

pub use audio_generator::{generate_sine_wav, write_fixture};
pub use mock_backend::{MockBackend, MockOutcome};

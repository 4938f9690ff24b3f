//! # Chime Common Library
//!
//! Shared code for the chime workspace:
//! - Configuration loading (TOML file, environment overrides, built-in defaults)
//! - Platform directory resolution for config files and the default sound
//! - Common error type

pub mod config;
pub mod error;

pub use config::{CustomCommandConfig, LoggingConfig, PlaybackSettings, TomlConfig};
pub use error::{Error, Result};

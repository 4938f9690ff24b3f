//! Configuration loading and default path resolution
//!
//! Settings are layered, highest priority first:
//! 1. Command-line flags (applied by the binary)
//! 2. Environment variables (`CHIME_*`)
//! 3. TOML config file
//! 4. Built-in defaults (code constants)
//!
//! A missing config file is not an error: a warning is logged and defaults are used.
//! An explicitly requested file that is missing, a malformed TOML document or an
//! unparsable environment value is reported as [`Error::Config`].

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Environment variable overriding `playback.volume`
pub const ENV_VOLUME: &str = "CHIME_VOLUME";
/// Environment variable overriding `playback.timeout_seconds`
pub const ENV_TIMEOUT_SECONDS: &str = "CHIME_TIMEOUT_SECONDS";
/// Environment variable overriding `playback.custom_sound_path`
pub const ENV_CUSTOM_SOUND_PATH: &str = "CHIME_CUSTOM_SOUND_PATH";
/// Environment variable overriding `playback.enable_fallback`
pub const ENV_ENABLE_FALLBACK: &str = "CHIME_ENABLE_FALLBACK";
/// Environment variable overriding `playback.default_sound_path`
pub const ENV_DEFAULT_SOUND_PATH: &str = "CHIME_DEFAULT_SOUND_PATH";
/// Environment variable overriding `logging.level`
pub const ENV_LOG_LEVEL: &str = "CHIME_LOG_LEVEL";

/// Default playback volume (0.0 - 1.0)
pub const DEFAULT_VOLUME: f32 = 0.7;
/// Default per-attempt playback timeout in seconds
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
/// File name of the bundled notification sound
pub const DEFAULT_SOUND_FILE_NAME: &str = "notification.wav";

const APP_DIR_NAME: &str = "chime";
const CONFIG_FILE_NAME: &str = "config.toml";

/// Complete configuration document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Playback behaviour
    #[serde(default)]
    pub playback: PlaybackSettings,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Playback settings consumed by the audio player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackSettings {
    /// Linear playback volume, 0.0 (silent) to 1.0 (full)
    #[serde(default = "default_volume")]
    pub volume: f32,

    /// Upper bound for a single backend attempt, in seconds
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Sound played instead of the default when no per-call override is given
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_sound_path: Option<PathBuf>,

    /// Retry with the default sound when a custom sound fails on every backend
    #[serde(default = "default_true")]
    pub enable_fallback: bool,

    /// Location of the default notification sound
    ///
    /// If not specified, `<data_local_dir>/chime/notification.wav` is used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_sound_path: Option<PathBuf>,

    /// User-defined playback command, tried before every built-in backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_command: Option<CustomCommandConfig>,
}

/// User-defined playback command
///
/// `args` may contain the placeholders `{file}` (asset path) and `{volume}`
/// (0.0 - 1.0). When no argument mentions `{file}`, the asset path is appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomCommandConfig {
    /// Backend name reported in playback results
    #[serde(default = "default_custom_command_name")]
    pub name: String,

    /// Program to execute (looked up on PATH)
    pub program: String,

    /// Program arguments
    #[serde(default)]
    pub args: Vec<String>,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_volume() -> f32 {
    DEFAULT_VOLUME
}

fn default_timeout_seconds() -> u64 {
    DEFAULT_TIMEOUT_SECONDS
}

fn default_true() -> bool {
    true
}

fn default_custom_command_name() -> String {
    "custom".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            volume: DEFAULT_VOLUME,
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            custom_sound_path: None,
            enable_fallback: true,
            default_sound_path: None,
            custom_command: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl PlaybackSettings {
    /// Check that volume and timeout are within their allowed ranges
    pub fn validate(&self) -> Result<()> {
        validate_volume(self.volume)?;
        validate_timeout_seconds(self.timeout_seconds)?;

        if let Some(command) = &self.custom_command {
            if command.program.trim().is_empty() {
                return Err(Error::Config(
                    "custom_command.program must not be empty".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// Per-attempt timeout as a Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Default sound location: configured path, else the platform data directory
    pub fn resolved_default_sound_path(&self) -> PathBuf {
        self.default_sound_path
            .clone()
            .unwrap_or_else(default_sound_path)
    }
}

/// Volume must be a finite value within [0.0, 1.0]
pub fn validate_volume(volume: f32) -> Result<()> {
    if !volume.is_finite() || !(0.0..=1.0).contains(&volume) {
        return Err(Error::Config(format!(
            "volume must be between 0.0 and 1.0, got {}",
            volume
        )));
    }
    Ok(())
}

/// Timeout must be strictly positive
pub fn validate_timeout_seconds(timeout_seconds: u64) -> Result<()> {
    if timeout_seconds == 0 {
        return Err(Error::Config(
            "timeout_seconds must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

impl TomlConfig {
    /// Parse a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration from a specific file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;

        Self::from_toml_str(&content).map_err(|e| {
            Error::Config(format!("Failed to parse {}: {}", path.display(), e))
        })
    }

    /// Load the file layer only (no environment overrides)
    ///
    /// With `explicit` set the file must exist. Otherwise the platform
    /// candidates are searched and defaults are used when none exists.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            info!("Loading configuration from {}", path.display());
            return Self::from_file(path);
        }

        for candidate in config_file_candidates() {
            if candidate.exists() {
                info!("Loading configuration from {}", candidate.display());
                return Self::from_file(&candidate);
            }
            debug!("No config file at {}", candidate.display());
        }

        warn!("No config file found, using built-in defaults");
        Ok(Self::default())
    }

    /// Load the file layer and apply `CHIME_*` environment overrides
    pub fn load_with_env(explicit: Option<&Path>) -> Result<Self> {
        let mut config = Self::load(explicit)?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Apply `CHIME_*` environment variables on top of the current values
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Some(value) = env_value(ENV_VOLUME) {
            self.playback.volume = value.parse::<f32>().map_err(|e| {
                Error::Config(format!("{} must be a number, got '{}': {}", ENV_VOLUME, value, e))
            })?;
        }

        if let Some(value) = env_value(ENV_TIMEOUT_SECONDS) {
            self.playback.timeout_seconds = value.parse::<u64>().map_err(|e| {
                Error::Config(format!(
                    "{} must be a whole number of seconds, got '{}': {}",
                    ENV_TIMEOUT_SECONDS, value, e
                ))
            })?;
        }

        if let Some(value) = env_value(ENV_CUSTOM_SOUND_PATH) {
            self.playback.custom_sound_path = Some(PathBuf::from(value));
        }

        if let Some(value) = env_value(ENV_ENABLE_FALLBACK) {
            self.playback.enable_fallback = parse_bool(&value).ok_or_else(|| {
                Error::Config(format!("{} must be a boolean, got '{}'", ENV_ENABLE_FALLBACK, value))
            })?;
        }

        if let Some(value) = env_value(ENV_DEFAULT_SOUND_PATH) {
            self.playback.default_sound_path = Some(PathBuf::from(value));
        }

        if let Some(value) = env_value(ENV_LOG_LEVEL) {
            self.logging.level = value;
        }

        Ok(())
    }
}

/// Read an environment variable, treating empty values as unset
fn env_value(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Accepts 1/0, true/false, yes/no, on/off (case-insensitive)
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Config file locations searched when no explicit path is given, in priority order
pub fn config_file_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    if let Some(dir) = dirs::config_dir() {
        candidates.push(dir.join(APP_DIR_NAME).join(CONFIG_FILE_NAME));
    }

    if cfg!(target_os = "linux") {
        candidates.push(PathBuf::from("/etc").join(APP_DIR_NAME).join(CONFIG_FILE_NAME));
    }

    candidates
}

/// Per-user config file path (where `init-config` writes by default)
pub fn user_config_path() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|d| d.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
        .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))
}

/// OS-dependent default location of the notification sound
pub fn default_sound_path() -> PathBuf {
    let data_dir = if cfg!(target_os = "linux") {
        // ~/.local/share/chime
        dirs::data_local_dir()
            .map(|d| d.join(APP_DIR_NAME))
            .unwrap_or_else(|| PathBuf::from("/usr/share/chime"))
    } else if cfg!(target_os = "macos") {
        // ~/Library/Application Support/chime
        dirs::data_dir()
            .map(|d| d.join(APP_DIR_NAME))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/chime"))
    } else if cfg!(target_os = "windows") {
        // %LOCALAPPDATA%\chime
        dirs::data_local_dir()
            .map(|d| d.join(APP_DIR_NAME))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\chime"))
    } else {
        PathBuf::from("./chime_data")
    };

    data_dir.join(DEFAULT_SOUND_FILE_NAME)
}

/// Write a configuration file atomically (temp file + rename)
///
/// Parent directories are created as needed. On unix the file is readable by
/// the owner only.
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut temp_name = path.as_os_str().to_os_string();
    temp_name.push(".tmp");
    let temp_path = PathBuf::from(temp_name);

    std::fs::write(&temp_path, content)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&temp_path, std::fs::Permissions::from_mode(0o600))?;
    }

    if let Err(e) = std::fs::rename(&temp_path, path) {
        let _ = std::fs::remove_file(&temp_path);
        return Err(Error::Io(e));
    }

    info!("Wrote configuration to {}", path.display());
    Ok(())
}

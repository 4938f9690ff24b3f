//! Notification player
//!
//! Resolves the asset for a call, tries every registered backend in priority
//! order, and applies the fallback-to-default-sound policy.
//!
//! # Attempt sequence
//! 1. Primary asset: call override, else configured custom sound, else default.
//! 2. Each backend in order until one returns `Success`.
//! 3. If nothing succeeded, the primary asset was custom, and fallback is
//!    enabled: one more pass with the default asset. Success there is
//!    reported as `FallbackUsed`; failure there reports the primary failure.
//!
//! Attempts are bounded by `backends x 2`. Calls are serialized so only one
//! notification is audible at a time.

use super::registry::BackendRegistry;
use super::result::PlaybackResult;
use crate::error::{Error, Result};
use chime_common::PlaybackSettings;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Per-call playback parameters
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerOptions {
    /// Linear gain, 0.0 - 1.0
    pub volume: f32,
    /// Bound for each backend attempt
    pub timeout: Duration,
    pub enable_fallback: bool,
    /// Used when a call supplies no override
    pub custom_sound_path: Option<PathBuf>,
}

impl PlayerOptions {
    pub fn from_settings(settings: &PlaybackSettings) -> Self {
        Self {
            volume: settings.volume,
            timeout: settings.timeout(),
            enable_fallback: settings.enable_fallback,
            custom_sound_path: settings.custom_sound_path.clone(),
        }
    }

    /// Volume and timeout are caller contract, checked before any attempt
    pub fn validate(&self) -> Result<()> {
        if !self.volume.is_finite() || !(0.0..=1.0).contains(&self.volume) {
            return Err(Error::Config(format!(
                "volume must be between 0.0 and 1.0, got {}",
                self.volume
            )));
        }
        if self.timeout.is_zero() {
            return Err(Error::Config("timeout must be greater than zero".to_string()));
        }
        Ok(())
    }
}

impl Default for PlayerOptions {
    fn default() -> Self {
        Self::from_settings(&PlaybackSettings::default())
    }
}

/// Snapshot of the player's configuration and detected backends
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerStatus {
    pub backends_available: Vec<String>,
    pub default_asset_path: PathBuf,
    pub default_asset_exists: bool,
    pub configured_volume: f32,
    pub configured_timeout_seconds: f64,
    pub fallback_enabled: bool,
    pub custom_sound_path: Option<PathBuf>,
}

pub struct AudioPlayer {
    options: PlayerOptions,
    default_asset: PathBuf,
    registry: BackendRegistry,
    playback_lock: Mutex<()>,
}

impl AudioPlayer {
    /// Detect backends for this host and build a player
    ///
    /// Never fails for lack of backends; every call then reports it instead.
    pub async fn new(settings: &PlaybackSettings, default_asset: PathBuf) -> Self {
        let registry = BackendRegistry::detect(settings).await;
        Self::with_registry(PlayerOptions::from_settings(settings), default_asset, registry)
    }

    pub fn with_registry(
        options: PlayerOptions,
        default_asset: PathBuf,
        registry: BackendRegistry,
    ) -> Self {
        let default_asset = absolute_path(&default_asset);
        debug!(
            default_asset = %default_asset.display(),
            backends = ?registry.names(),
            "Audio player created"
        );

        Self {
            options,
            default_asset,
            registry,
            playback_lock: Mutex::new(()),
        }
    }

    pub fn options(&self) -> &PlayerOptions {
        &self.options
    }

    pub fn default_asset(&self) -> &Path {
        &self.default_asset
    }

    pub fn registry(&self) -> &BackendRegistry {
        &self.registry
    }

    /// Play a notification sound
    ///
    /// # Errors
    /// Only [`Error::Config`] for an out-of-range volume or zero timeout.
    /// Every playback failure is reported in the returned [`PlaybackResult`].
    pub async fn play_notification(&self, sound_override: Option<&Path>) -> Result<PlaybackResult> {
        self.options.validate()?;

        let _guard = self.playback_lock.lock().await;

        let primary = self.resolve_asset(sound_override);
        let is_custom = !same_asset(&primary, &self.default_asset).await;
        info!(asset = %primary.display(), custom = is_custom, "Playing notification");

        let result = self.attempt_all_backends(&primary).await;

        if result.is_success() {
            info!("{}", result.message);
            return Ok(result);
        }

        if !(is_custom && self.options.enable_fallback) {
            warn!(status = %result.status, "{}", result.message);
            return Ok(result);
        }

        info!(
            asset = %self.default_asset.display(),
            "Custom sound failed ({}), trying default sound",
            result.status
        );

        let fallback = self.attempt_all_backends(&self.default_asset).await;
        if fallback.is_success() {
            let relabeled = fallback.into_fallback(&result);
            info!("{}", relabeled.message);
            Ok(relabeled)
        } else {
            warn!(
                status = %result.status,
                fallback_status = %fallback.status,
                "Default sound also failed: {}",
                fallback.message
            );
            Ok(result)
        }
    }

    /// Play the default sound, ignoring any configured custom sound
    pub async fn test_playback(&self) -> Result<PlaybackResult> {
        self.play_notification(Some(&self.default_asset)).await
    }

    pub async fn status(&self) -> PlayerStatus {
        let default_asset_exists = tokio::fs::metadata(&self.default_asset)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false);

        PlayerStatus {
            backends_available: self.registry.names(),
            default_asset_path: self.default_asset.clone(),
            default_asset_exists,
            configured_volume: self.options.volume,
            configured_timeout_seconds: self.options.timeout.as_secs_f64(),
            fallback_enabled: self.options.enable_fallback,
            custom_sound_path: self.options.custom_sound_path.clone(),
        }
    }

    fn resolve_asset(&self, sound_override: Option<&Path>) -> PathBuf {
        sound_override
            .map(Path::to_path_buf)
            .or_else(|| self.options.custom_sound_path.clone())
            .unwrap_or_else(|| self.default_asset.clone())
    }

    /// One pass over the registry; first success wins, else the last result
    async fn attempt_all_backends(&self, asset: &Path) -> PlaybackResult {
        let mut last_result = None;

        for backend in self.registry.backends() {
            debug!(backend = backend.name(), asset = %asset.display(), "Attempting playback");

            let result = backend
                .play(asset, self.options.volume, self.options.timeout)
                .await;

            if result.is_success() {
                return result;
            }

            debug!(
                backend = backend.name(),
                status = %result.status,
                "Attempt failed: {}",
                result.message
            );
            last_result = Some(result);
        }

        last_result.unwrap_or_else(PlaybackResult::no_backends)
    }
}

/// Anchor a relative path at the current directory
fn absolute_path(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

/// Do both paths name the same file (symlinks and `..` resolved when they exist)
async fn same_asset(a: &Path, b: &Path) -> bool {
    match (tokio::fs::canonicalize(a).await, tokio::fs::canonicalize(b).await) {
        (Ok(a), Ok(b)) => a == b,
        _ => absolute_path(a) == absolute_path(b),
    }
}

//! Playback backend trait
//!
//! Every playback mechanism implements [`PlaybackBackend`]. Backends are
//! immutable after construction apart from their one-time probe result.
//!
//! # Contract
//! - `probe()` never fails the caller: internal errors report `false`, and the
//!   check is bounded by [`PROBE_TIMEOUT`].
//! - `play()` checks the asset first and returns `FileNotFound` without
//!   touching the mechanism when it is absent.
//! - `play()` enforces its own timeout and terminates the mechanism when it
//!   expires, reporting `Timeout`.
//! - Mechanism failures come back as `Failed` results carrying the diagnostic.

use super::result::PlaybackResult;
use async_trait::async_trait;
use std::future::Future;
use std::path::Path;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

/// Upper bound for a single availability probe
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// A platform mechanism capable of producing audible output from an asset
///
/// # Example
/// ```rust,ignore
/// use chime_ap::playback::{PlaybackBackend, PlaybackResult};
///
/// struct Beeper;
///
/// #[async_trait::async_trait]
/// impl PlaybackBackend for Beeper {
///     fn name(&self) -> &str { "beeper" }
///     async fn probe(&self) -> bool { true }
///     async fn play(&self, asset: &Path, volume: f32, timeout: Duration) -> PlaybackResult {
///         PlaybackResult::success(self.name())
///     }
/// }
/// ```
#[async_trait]
pub trait PlaybackBackend: Send + Sync {
    /// Stable backend name, reported in results and status
    fn name(&self) -> &str;

    /// Is this mechanism usable on this host (cached after the first call)
    async fn probe(&self) -> bool;

    /// Play `asset` at `volume` (0.0 - 1.0), giving up after `timeout`
    async fn play(&self, asset: &Path, volume: f32, timeout: Duration) -> PlaybackResult;
}

/// One-time availability cache
///
/// The first `get_or_probe` runs the check (bounded by [`PROBE_TIMEOUT`]);
/// every later call returns the stored answer.
#[derive(Debug, Default)]
pub struct ProbeCache {
    cell: OnceCell<bool>,
}

impl ProbeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached result, if the probe already ran
    pub fn get(&self) -> Option<bool> {
        self.cell.get().copied()
    }

    pub async fn get_or_probe<F, Fut>(&self, backend: &str, check: F) -> bool
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = bool>,
    {
        *self
            .cell
            .get_or_init(|| async move {
                let available = match tokio::time::timeout(PROBE_TIMEOUT, check()).await {
                    Ok(available) => available,
                    Err(_) => {
                        warn!(
                            backend = backend,
                            "Availability probe exceeded {:?}, treating as unavailable",
                            PROBE_TIMEOUT
                        );
                        false
                    }
                };
                debug!(backend = backend, available = available, "Backend availability probe");
                available
            })
            .await
    }
}

/// Verify the asset exists and is readable at attempt time
///
/// Returns the result to report when the attempt must not proceed. Never cached:
/// the filesystem may change between attempts.
pub async fn check_asset(backend: &str, asset: &Path) -> Option<PlaybackResult> {
    match tokio::fs::File::open(asset).await {
        Ok(file) => match file.metadata().await {
            Ok(metadata) if metadata.is_file() => None,
            Ok(_) => Some(PlaybackResult::file_not_found(backend, asset)),
            Err(e) => Some(PlaybackResult::failed(
                backend,
                format!("Cannot inspect audio file {}: {}", asset.display(), e),
            )),
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Some(PlaybackResult::file_not_found(backend, asset))
        }
        Err(e) => Some(PlaybackResult::failed(
            backend,
            format!("Cannot read audio file {}: {}", asset.display(), e),
        )),
    }
}

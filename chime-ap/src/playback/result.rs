//! Playback status taxonomy and result record

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// Message used when the registry holds no usable backend
pub const NO_BACKENDS_MESSAGE: &str = "no backends available: no playback mechanism was detected on this host";

/// Outcome of a playback attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackStatus {
    /// Sound played to completion
    Success,
    /// Mechanism-level error; the message carries the diagnostic
    Failed,
    /// Custom sound failed everywhere, default sound played instead
    FallbackUsed,
    /// Attempt exceeded its time bound and was terminated
    Timeout,
    /// Asset path did not exist at attempt time
    FileNotFound,
    /// Mechanism rejected the asset's encoding
    UnsupportedFormat,
}

impl PlaybackStatus {
    /// True when something audible was played
    pub fn is_success(self) -> bool {
        matches!(self, Self::Success | Self::FallbackUsed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
            Self::FallbackUsed => "fallback_used",
            Self::Timeout => "timeout",
            Self::FileNotFound => "file_not_found",
            Self::UnsupportedFormat => "unsupported_format",
        }
    }
}

impl fmt::Display for PlaybackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a playback operation
///
/// Produced once per attempt. The only later modification is the player's
/// fallback relabeling ([`PlaybackResult::into_fallback`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackResult {
    pub status: PlaybackStatus,
    /// Human-readable outcome, including any diagnostic from the mechanism
    pub message: String,
    /// Name of the backend that produced this result
    pub backend_used: Option<String>,
    /// True when the default sound was played after a custom sound failed
    pub fallback_used: bool,
    /// Wall time of the attempt
    pub duration_ms: Option<u64>,
}

impl PlaybackResult {
    fn new(status: PlaybackStatus, message: impl Into<String>, backend: Option<&str>) -> Self {
        Self {
            status,
            message: message.into(),
            backend_used: backend.map(str::to_string),
            fallback_used: false,
            duration_ms: None,
        }
    }

    pub fn success(backend: &str) -> Self {
        Self::new(
            PlaybackStatus::Success,
            format!("Audio played successfully via {}", backend),
            Some(backend),
        )
    }

    pub fn failed(backend: &str, message: impl Into<String>) -> Self {
        Self::new(PlaybackStatus::Failed, message, Some(backend))
    }

    pub fn timeout(backend: &str, timeout: Duration) -> Self {
        Self::new(
            PlaybackStatus::Timeout,
            format!(
                "{} playback timed out after {} and was stopped",
                backend,
                format_timeout(timeout)
            ),
            Some(backend),
        )
    }

    pub fn file_not_found(backend: &str, path: &Path) -> Self {
        Self::new(
            PlaybackStatus::FileNotFound,
            format!("Audio file not found: {}", path.display()),
            Some(backend),
        )
    }

    pub fn unsupported_format(backend: &str, message: impl Into<String>) -> Self {
        Self::new(PlaybackStatus::UnsupportedFormat, message, Some(backend))
    }

    /// Synthesized result for an empty registry
    pub fn no_backends() -> Self {
        Self::new(PlaybackStatus::Failed, NO_BACKENDS_MESSAGE, None)
    }

    /// Attach the attempt's wall time
    pub fn with_duration(mut self, elapsed: Duration) -> Self {
        self.duration_ms = Some(elapsed.as_millis().min(u64::MAX as u128) as u64);
        self
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Relabel a successful default-sound result after the custom sound failed
    ///
    /// The primary failure's message is kept in front for diagnostic context.
    pub fn into_fallback(mut self, primary: &PlaybackResult) -> Self {
        self.status = PlaybackStatus::FallbackUsed;
        self.fallback_used = true;
        self.message = format!(
            "{}; custom sound failed, played default sound instead: {}",
            primary.message, self.message
        );
        self
    }
}

/// "2 seconds", "1 second", "1500 ms"
fn format_timeout(timeout: Duration) -> String {
    if timeout.subsec_nanos() == 0 {
        match timeout.as_secs() {
            1 => "1 second".to_string(),
            secs => format!("{} seconds", secs),
        }
    } else {
        format!("{} ms", timeout.as_millis())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_statuses() {
        assert!(PlaybackStatus::Success.is_success());
        assert!(PlaybackStatus::FallbackUsed.is_success());
        assert!(!PlaybackStatus::Failed.is_success());
        assert!(!PlaybackStatus::Timeout.is_success());
        assert!(!PlaybackStatus::FileNotFound.is_success());
        assert!(!PlaybackStatus::UnsupportedFormat.is_success());
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_string(&PlaybackStatus::FileNotFound).unwrap();
        assert_eq!(json, "\"file_not_found\"");
        assert_eq!(PlaybackStatus::FallbackUsed.to_string(), "fallback_used");
    }

    #[test]
    fn test_no_backends_result() {
        let result = PlaybackResult::no_backends();
        assert_eq!(result.status, PlaybackStatus::Failed);
        assert!(result.message.contains("no backends available"));
        assert!(result.backend_used.is_none());
        assert!(!result.fallback_used);
    }

    #[test]
    fn test_timeout_message() {
        let result = PlaybackResult::timeout("aplay", Duration::from_secs(3));
        assert_eq!(result.status, PlaybackStatus::Timeout);
        assert!(result.message.contains("3 seconds"));

        let result = PlaybackResult::timeout("aplay", Duration::from_millis(250));
        assert!(result.message.contains("250 ms"));
    }

    #[test]
    fn test_into_fallback_keeps_primary_message_first() {
        let primary = PlaybackResult::file_not_found("afplay", Path::new("/missing.wav"));
        let fallback = PlaybackResult::success("paplay").into_fallback(&primary);

        assert_eq!(fallback.status, PlaybackStatus::FallbackUsed);
        assert!(fallback.fallback_used);
        assert!(fallback.message.starts_with("Audio file not found: /missing.wav"));
        assert_eq!(fallback.backend_used.as_deref(), Some("paplay"));
    }

    #[test]
    fn test_with_duration() {
        let result = PlaybackResult::success("native").with_duration(Duration::from_millis(640));
        assert_eq!(result.duration_ms, Some(640));
    }
}

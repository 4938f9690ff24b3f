//! Backend registry
//!
//! Ordered, probed list of usable backends. Built once per player and never
//! modified afterwards; order is attempt priority.

use super::backend::PlaybackBackend;
use super::command::{CommandBackend, CommandTool};
use super::native::NativeBackend;
use chime_common::PlaybackSettings;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Clone, Default)]
pub struct BackendRegistry {
    backends: Vec<Arc<dyn PlaybackBackend>>,
}

impl BackendRegistry {
    /// Use `backends` as-is, in the given order, without probing
    pub fn from_backends(backends: Vec<Arc<dyn PlaybackBackend>>) -> Self {
        Self { backends }
    }

    /// Probe each candidate once, in order, keeping the available ones
    ///
    /// An empty result is not an error: the player reports it per call.
    pub async fn probe_all(candidates: Vec<Arc<dyn PlaybackBackend>>) -> Self {
        let mut backends = Vec::with_capacity(candidates.len());

        for backend in candidates {
            if backend.probe().await {
                debug!(backend = backend.name(), "Backend available");
                backends.push(backend);
            } else {
                debug!(backend = backend.name(), "Backend unavailable");
            }
        }

        let registry = Self { backends };
        if registry.is_empty() {
            warn!("No playback backends available on this host");
        } else {
            info!("Playback backends available: {}", registry.names().join(", "));
        }
        registry
    }

    /// Every known backend variant in priority order
    ///
    /// A configured custom command comes first, then the platform players,
    /// then in-process output.
    pub fn candidates(settings: &PlaybackSettings) -> Vec<Arc<dyn PlaybackBackend>> {
        let mut candidates: Vec<Arc<dyn PlaybackBackend>> = Vec::new();

        if let Some(custom) = &settings.custom_command {
            candidates.push(Arc::new(CommandBackend::new(CommandTool::from_config(custom))));
        }

        for tool in CommandTool::builtin() {
            candidates.push(Arc::new(CommandBackend::new(tool)));
        }

        candidates.push(Arc::new(NativeBackend::new()));
        candidates
    }

    /// Probe every known backend variant for this host
    pub async fn detect(settings: &PlaybackSettings) -> Self {
        Self::probe_all(Self::candidates(settings)).await
    }

    pub fn backends(&self) -> &[Arc<dyn PlaybackBackend>] {
        &self.backends
    }

    pub fn names(&self) -> Vec<String> {
        self.backends.iter().map(|b| b.name().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }
}

impl std::fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendRegistry")
            .field("backends", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chime_common::CustomCommandConfig;

    #[test]
    fn test_candidate_order_without_custom_command() {
        let names: Vec<String> = BackendRegistry::candidates(&PlaybackSettings::default())
            .iter()
            .map(|b| b.name().to_string())
            .collect();

        assert_eq!(
            names,
            vec!["afplay", "powershell", "pw-play", "paplay", "aplay", "native"]
        );
    }

    #[test]
    fn test_custom_command_has_highest_priority() {
        let settings = PlaybackSettings {
            custom_command: Some(CustomCommandConfig {
                name: "mpv".to_string(),
                program: "mpv".to_string(),
                args: vec!["--really-quiet".to_string(), "{file}".to_string()],
            }),
            ..PlaybackSettings::default()
        };

        let candidates = BackendRegistry::candidates(&settings);
        assert_eq!(candidates.len(), 7);
        assert_eq!(candidates[0].name(), "mpv");
        assert_eq!(candidates[6].name(), "native");
    }

    #[test]
    fn test_from_backends_keeps_order() {
        let registry = BackendRegistry::from_backends(vec![
            Arc::new(NativeBackend::new()),
            Arc::new(CommandBackend::new(CommandTool::Aplay)),
        ]);

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.names(), vec!["native", "aplay"]);
    }

    #[tokio::test]
    async fn test_probe_all_of_nothing_is_empty() {
        let registry = BackendRegistry::probe_all(Vec::new()).await;
        assert!(registry.is_empty());
    }
}

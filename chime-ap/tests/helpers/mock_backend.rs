//! Instrumented backend double
//!
//! Behaves like a real backend (asset check first, own timeout enforcement)
//! but the "mechanism" is a scripted outcome after an optional delay. Every
//! call is counted so tests can assert which backends ran and in what order.

use async_trait::async_trait;
use chime_ap::playback::backend::check_asset;
use chime_ap::playback::{PlaybackBackend, PlaybackResult};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Scripted result of the simulated mechanism
#[derive(Debug, Clone)]
pub enum MockOutcome {
    Succeed,
    Fail(String),
    UnsupportedFormat(String),
}

pub struct MockBackend {
    name: String,
    available: bool,
    outcome: MockOutcome,
    per_asset: HashMap<PathBuf, MockOutcome>,
    delay: Duration,
    probe_calls: AtomicUsize,
    play_calls: AtomicUsize,
    mechanism_calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    played_assets: Mutex<Vec<PathBuf>>,
}

impl MockBackend {
    pub fn new(name: &str, outcome: MockOutcome) -> Self {
        Self {
            name: name.to_string(),
            available: true,
            outcome,
            per_asset: HashMap::new(),
            delay: Duration::ZERO,
            probe_calls: AtomicUsize::new(0),
            play_calls: AtomicUsize::new(0),
            mechanism_calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            played_assets: Mutex::new(Vec::new()),
        }
    }

    pub fn succeeding(name: &str) -> Self {
        Self::new(name, MockOutcome::Succeed)
    }

    pub fn failing(name: &str, diagnostic: &str) -> Self {
        Self::new(name, MockOutcome::Fail(diagnostic.to_string()))
    }

    /// Reports unavailable from `probe`
    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    /// Mechanism takes `delay` before producing its outcome
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Override the outcome for one specific asset
    pub fn with_outcome_for(mut self, asset: &Path, outcome: MockOutcome) -> Self {
        self.per_asset.insert(asset.to_path_buf(), outcome);
        self
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn probe_calls(&self) -> usize {
        self.probe_calls.load(Ordering::SeqCst)
    }

    pub fn play_calls(&self) -> usize {
        self.play_calls.load(Ordering::SeqCst)
    }

    /// Calls that got past the asset check and reached the mechanism
    pub fn mechanism_calls(&self) -> usize {
        self.mechanism_calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn played_assets(&self) -> Vec<PathBuf> {
        self.played_assets.lock().unwrap().clone()
    }

    pub fn calls_for(&self, asset: &Path) -> usize {
        self.played_assets
            .lock()
            .unwrap()
            .iter()
            .filter(|played| played.as_path() == asset)
            .count()
    }
}

#[async_trait]
impl PlaybackBackend for MockBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn probe(&self) -> bool {
        self.probe_calls.fetch_add(1, Ordering::SeqCst);
        self.available
    }

    async fn play(&self, asset: &Path, _volume: f32, timeout: Duration) -> PlaybackResult {
        self.play_calls.fetch_add(1, Ordering::SeqCst);
        self.played_assets.lock().unwrap().push(asset.to_path_buf());

        if let Some(result) = check_asset(&self.name, asset).await {
            return result;
        }

        self.mechanism_calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let completed = tokio::time::timeout(timeout, tokio::time::sleep(self.delay))
            .await
            .is_ok();

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if !completed {
            return PlaybackResult::timeout(&self.name, timeout);
        }

        let outcome = self.per_asset.get(asset).unwrap_or(&self.outcome);
        match outcome {
            MockOutcome::Succeed => PlaybackResult::success(&self.name),
            MockOutcome::Fail(diagnostic) => PlaybackResult::failed(
                &self.name,
                format!("{} failed: {}", self.name, diagnostic),
            ),
            MockOutcome::UnsupportedFormat(diagnostic) => {
                PlaybackResult::unsupported_format(&self.name, diagnostic.clone())
            }
        }
    }
}

//! Notification player integration tests
//!
//! Drives `AudioPlayer` against instrumented backend doubles to verify the
//! attempt order, short-circuiting, timeout handling, and the fallback policy.

mod helpers;

use chime_ap::playback::{
    AudioPlayer, BackendRegistry, PlaybackBackend, PlaybackStatus, PlayerOptions,
};
use chime_ap::Error;
use helpers::{write_fixture, MockBackend, MockOutcome};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;

fn registry(backends: &[&Arc<MockBackend>]) -> BackendRegistry {
    BackendRegistry::from_backends(
        backends
            .iter()
            .map(|b| Arc::clone(*b) as Arc<dyn PlaybackBackend>)
            .collect(),
    )
}

fn options(timeout: Duration, enable_fallback: bool) -> PlayerOptions {
    PlayerOptions {
        volume: 0.5,
        timeout,
        enable_fallback,
        custom_sound_path: None,
    }
}

struct Fixture {
    _dir: TempDir,
    default_asset: PathBuf,
    custom_asset: PathBuf,
}

fn fixture() -> Fixture {
    let dir = TempDir::new().unwrap();
    let default_asset = write_fixture(dir.path(), "default.wav");
    let custom_asset = write_fixture(dir.path(), "custom.wav");
    Fixture {
        _dir: dir,
        default_asset,
        custom_asset,
    }
}

#[tokio::test]
async fn test_empty_registry_reports_no_backends() {
    let fx = fixture();
    let player = AudioPlayer::with_registry(
        options(Duration::from_secs(1), true),
        fx.default_asset.clone(),
        BackendRegistry::default(),
    );

    let result = player
        .play_notification(Some(&fx.custom_asset))
        .await
        .unwrap();

    assert_eq!(result.status, PlaybackStatus::Failed);
    assert!(result.message.contains("no backends available"));
    assert_eq!(result.backend_used, None);
    assert!(!result.fallback_used);
}

#[tokio::test]
async fn test_missing_asset_never_reaches_mechanism() {
    let fx = fixture();
    let backend = MockBackend::succeeding("first").into_arc();
    let player = AudioPlayer::with_registry(
        options(Duration::from_secs(1), false),
        fx.default_asset.clone(),
        registry(&[&backend]),
    );

    let missing = fx.default_asset.with_file_name("missing.wav");
    let result = player.play_notification(Some(&missing)).await.unwrap();

    assert_eq!(result.status, PlaybackStatus::FileNotFound);
    assert!(result.message.contains("missing.wav"));
    assert_eq!(backend.play_calls(), 1);
    assert_eq!(backend.mechanism_calls(), 0);
}

#[tokio::test]
async fn test_first_success_short_circuits() {
    let fx = fixture();
    let first = MockBackend::succeeding("first").into_arc();
    let second = MockBackend::succeeding("second").into_arc();
    let player = AudioPlayer::with_registry(
        options(Duration::from_secs(1), true),
        fx.default_asset.clone(),
        registry(&[&first, &second]),
    );

    let result = player.play_notification(None).await.unwrap();

    assert_eq!(result.status, PlaybackStatus::Success);
    assert_eq!(result.backend_used.as_deref(), Some("first"));
    assert_eq!(first.play_calls(), 1);
    assert_eq!(second.play_calls(), 0);
}

#[tokio::test]
async fn test_failed_backend_falls_through_to_next() {
    let fx = fixture();
    let first = MockBackend::failing("first", "device busy").into_arc();
    let second = MockBackend::succeeding("second").into_arc();
    let player = AudioPlayer::with_registry(
        options(Duration::from_secs(1), true),
        fx.default_asset.clone(),
        registry(&[&first, &second]),
    );

    let result = player.play_notification(None).await.unwrap();

    assert_eq!(result.status, PlaybackStatus::Success);
    assert_eq!(result.backend_used.as_deref(), Some("second"));
    assert_eq!(first.play_calls(), 1);
    assert_eq!(second.play_calls(), 1);
}

#[tokio::test]
async fn test_timed_out_backend_moves_on_without_extra_wait() {
    let fx = fixture();
    let timeout = Duration::from_millis(200);
    let slow = MockBackend::succeeding("slow")
        .with_delay(Duration::from_secs(5))
        .into_arc();
    let fast = MockBackend::succeeding("fast").into_arc();
    let player = AudioPlayer::with_registry(
        options(timeout, true),
        fx.default_asset.clone(),
        registry(&[&slow, &fast]),
    );

    let started = Instant::now();
    let result = player.play_notification(None).await.unwrap();
    let elapsed = started.elapsed();

    assert_eq!(result.status, PlaybackStatus::Success);
    assert_eq!(result.backend_used.as_deref(), Some("fast"));
    assert!(elapsed >= timeout, "elapsed {:?} shorter than timeout", elapsed);
    assert!(
        elapsed < Duration::from_secs(2),
        "elapsed {:?} includes more than one timeout",
        elapsed
    );
}

#[tokio::test]
async fn test_all_backends_time_out_reports_timeout() {
    let fx = fixture();
    let slow = MockBackend::succeeding("slow")
        .with_delay(Duration::from_secs(5))
        .into_arc();
    let player = AudioPlayer::with_registry(
        options(Duration::from_millis(100), true),
        fx.default_asset.clone(),
        registry(&[&slow]),
    );

    let result = player.play_notification(None).await.unwrap();

    assert_eq!(result.status, PlaybackStatus::Timeout);
    assert_eq!(result.backend_used.as_deref(), Some("slow"));
}

#[tokio::test]
async fn test_last_failure_is_reported() {
    let fx = fixture();
    let first = MockBackend::failing("first", "first diagnostic").into_arc();
    let second = MockBackend::new(
        "second",
        MockOutcome::UnsupportedFormat("second rejected the encoding".to_string()),
    )
    .into_arc();
    let player = AudioPlayer::with_registry(
        options(Duration::from_secs(1), true),
        fx.default_asset.clone(),
        registry(&[&first, &second]),
    );

    let result = player.play_notification(None).await.unwrap();

    assert_eq!(result.status, PlaybackStatus::UnsupportedFormat);
    assert_eq!(result.backend_used.as_deref(), Some("second"));
    assert!(result.message.contains("second rejected the encoding"));
}

#[tokio::test]
async fn test_custom_failure_falls_back_to_default() {
    let fx = fixture();
    let first = MockBackend::failing("first", "cannot open device").into_arc();
    let second = MockBackend::failing("second", "codec missing")
        .with_outcome_for(&fx.default_asset, MockOutcome::Succeed)
        .into_arc();
    let player = AudioPlayer::with_registry(
        options(Duration::from_secs(1), true),
        fx.default_asset.clone(),
        registry(&[&first, &second]),
    );

    let result = player
        .play_notification(Some(&fx.custom_asset))
        .await
        .unwrap();

    assert_eq!(result.status, PlaybackStatus::FallbackUsed);
    assert!(result.fallback_used);
    assert!(result.is_success());
    assert_eq!(result.backend_used.as_deref(), Some("second"));
    assert!(
        result.message.contains("codec missing"),
        "message should carry the original failure: {}",
        result.message
    );

    assert_eq!(first.calls_for(&fx.custom_asset), 1);
    assert_eq!(second.calls_for(&fx.custom_asset), 1);
    assert_eq!(first.calls_for(&fx.default_asset), 1);
    assert_eq!(second.calls_for(&fx.default_asset), 1);
}

#[tokio::test]
async fn test_configured_custom_sound_falls_back() {
    let fx = fixture();
    let backend = MockBackend::failing("only", "bad file")
        .with_outcome_for(&fx.default_asset, MockOutcome::Succeed)
        .into_arc();
    let player = AudioPlayer::with_registry(
        PlayerOptions {
            custom_sound_path: Some(fx.custom_asset.clone()),
            ..options(Duration::from_secs(1), true)
        },
        fx.default_asset.clone(),
        registry(&[&backend]),
    );

    let result = player.play_notification(None).await.unwrap();

    assert_eq!(result.status, PlaybackStatus::FallbackUsed);
    assert_eq!(
        backend.played_assets(),
        vec![fx.custom_asset.clone(), fx.default_asset.clone()]
    );
}

#[tokio::test]
async fn test_fallback_disabled_keeps_primary_failure() {
    let fx = fixture();
    let backend = MockBackend::failing("only", "bad file")
        .with_outcome_for(&fx.default_asset, MockOutcome::Succeed)
        .into_arc();
    let player = AudioPlayer::with_registry(
        options(Duration::from_secs(1), false),
        fx.default_asset.clone(),
        registry(&[&backend]),
    );

    let result = player
        .play_notification(Some(&fx.custom_asset))
        .await
        .unwrap();

    assert_eq!(result.status, PlaybackStatus::Failed);
    assert!(!result.fallback_used);
    assert_eq!(backend.calls_for(&fx.default_asset), 0);
}

#[tokio::test]
async fn test_missing_custom_sound_falls_back() {
    let fx = fixture();
    let backend = MockBackend::succeeding("only").into_arc();
    let player = AudioPlayer::with_registry(
        options(Duration::from_secs(1), true),
        fx.default_asset.clone(),
        registry(&[&backend]),
    );

    let missing = fx.custom_asset.with_file_name("gone.wav");
    let result = player.play_notification(Some(&missing)).await.unwrap();

    assert_eq!(result.status, PlaybackStatus::FallbackUsed);
    assert!(result.message.contains("gone.wav"));
    assert_eq!(backend.mechanism_calls(), 1);
}

#[tokio::test]
async fn test_failed_fallback_returns_primary_result() {
    let fx = fixture();
    let slow_on_custom = MockBackend::failing("only", "default is broken too")
        .with_delay(Duration::from_secs(5))
        .into_arc();
    let player = AudioPlayer::with_registry(
        options(Duration::from_millis(100), true),
        fx.default_asset.clone(),
        registry(&[&slow_on_custom]),
    );

    let result = player
        .play_notification(Some(&fx.custom_asset))
        .await
        .unwrap();

    // Both passes time out; the custom-sound failure is what gets reported
    assert_eq!(result.status, PlaybackStatus::Timeout);
    assert!(!result.fallback_used);
    assert_eq!(slow_on_custom.calls_for(&fx.custom_asset), 1);
    assert_eq!(slow_on_custom.calls_for(&fx.default_asset), 1);
}

#[tokio::test]
async fn test_default_sound_failure_does_not_retry() {
    let fx = fixture();
    let backend = MockBackend::failing("only", "no device").into_arc();
    let player = AudioPlayer::with_registry(
        options(Duration::from_secs(1), true),
        fx.default_asset.clone(),
        registry(&[&backend]),
    );

    let result = player.play_notification(None).await.unwrap();

    assert_eq!(result.status, PlaybackStatus::Failed);
    assert!(result.message.contains("no device"));
    assert_eq!(backend.play_calls(), 1);
}

#[tokio::test]
async fn test_override_equal_to_default_is_not_custom() {
    let fx = fixture();
    let backend = MockBackend::failing("only", "no device").into_arc();
    let player = AudioPlayer::with_registry(
        options(Duration::from_secs(1), true),
        fx.default_asset.clone(),
        registry(&[&backend]),
    );

    let result = player
        .play_notification(Some(&fx.default_asset))
        .await
        .unwrap();

    assert_eq!(result.status, PlaybackStatus::Failed);
    assert_eq!(backend.play_calls(), 1);
}

#[tokio::test]
async fn test_override_naming_default_by_another_path_is_not_custom() {
    let fx = fixture();
    let parent = fx.default_asset.parent().unwrap();
    std::fs::create_dir(parent.join("nested")).unwrap();
    let detour = parent.join("nested").join("..").join("default.wav");

    let backend = MockBackend::failing("only", "no device").into_arc();
    let player = AudioPlayer::with_registry(
        options(Duration::from_secs(1), true),
        fx.default_asset.clone(),
        registry(&[&backend]),
    );

    let result = player.play_notification(Some(&detour)).await.unwrap();

    assert_eq!(result.status, PlaybackStatus::Failed);
    assert!(!result.fallback_used);
    assert_eq!(backend.play_calls(), 1);
}

#[tokio::test]
async fn test_repeated_calls_are_independent() {
    let fx = fixture();
    let backend = MockBackend::succeeding("only").into_arc();
    let probed = BackendRegistry::probe_all(vec![
        Arc::clone(&backend) as Arc<dyn PlaybackBackend>
    ])
    .await;
    let player = AudioPlayer::with_registry(
        options(Duration::from_secs(1), true),
        fx.default_asset.clone(),
        probed,
    );

    let first = player.play_notification(None).await.unwrap();
    let second = player.play_notification(None).await.unwrap();

    assert_eq!(first.status, PlaybackStatus::Success);
    assert_eq!(second.status, PlaybackStatus::Success);
    assert_eq!(first.backend_used, second.backend_used);
    assert_eq!(backend.probe_calls(), 1);
    assert_eq!(backend.play_calls(), 2);
    assert_eq!(player.registry().names(), vec!["only"]);
}

#[tokio::test]
async fn test_probe_all_drops_unavailable_backends() {
    let missing = MockBackend::succeeding("missing").unavailable().into_arc();
    let present = MockBackend::succeeding("present").into_arc();

    let registry = BackendRegistry::probe_all(vec![
        Arc::clone(&missing) as Arc<dyn PlaybackBackend>,
        Arc::clone(&present) as Arc<dyn PlaybackBackend>,
    ])
    .await;

    assert_eq!(registry.names(), vec!["present"]);
    assert_eq!(missing.probe_calls(), 1);
    assert_eq!(present.probe_calls(), 1);
}

#[tokio::test]
async fn test_concurrent_calls_are_serialized() {
    let fx = fixture();
    let backend = MockBackend::succeeding("only")
        .with_delay(Duration::from_millis(100))
        .into_arc();
    let player = Arc::new(AudioPlayer::with_registry(
        options(Duration::from_secs(1), true),
        fx.default_asset.clone(),
        registry(&[&backend]),
    ));

    let a = {
        let player = Arc::clone(&player);
        tokio::spawn(async move { player.play_notification(None).await })
    };
    let b = {
        let player = Arc::clone(&player);
        tokio::spawn(async move { player.play_notification(None).await })
    };

    let (a, b) = (a.await.unwrap().unwrap(), b.await.unwrap().unwrap());

    assert!(a.is_success() && b.is_success());
    assert_eq!(backend.play_calls(), 2);
    assert_eq!(backend.max_in_flight(), 1);
}

#[tokio::test]
async fn test_invalid_volume_is_a_contract_error() {
    let fx = fixture();
    let backend = MockBackend::succeeding("only").into_arc();
    let player = AudioPlayer::with_registry(
        PlayerOptions {
            volume: 1.5,
            ..options(Duration::from_secs(1), true)
        },
        fx.default_asset.clone(),
        registry(&[&backend]),
    );

    let result = player.play_notification(None).await;

    assert!(matches!(result, Err(Error::Config(_))));
    assert_eq!(backend.play_calls(), 0);
}

#[tokio::test]
async fn test_zero_timeout_is_a_contract_error() {
    let fx = fixture();
    let player = AudioPlayer::with_registry(
        options(Duration::ZERO, true),
        fx.default_asset.clone(),
        BackendRegistry::default(),
    );

    assert!(matches!(
        player.play_notification(None).await,
        Err(Error::Config(_))
    ));
}

#[tokio::test]
async fn test_status_snapshot() {
    let fx = fixture();
    let backend = MockBackend::succeeding("only").into_arc();
    let player = AudioPlayer::with_registry(
        PlayerOptions {
            volume: 0.3,
            timeout: Duration::from_millis(1500),
            enable_fallback: false,
            custom_sound_path: Some(fx.custom_asset.clone()),
        },
        fx.default_asset.clone(),
        registry(&[&backend]),
    );

    let status = player.status().await;

    assert_eq!(status.backends_available, vec!["only"]);
    assert_eq!(status.default_asset_path, fx.default_asset);
    assert!(status.default_asset_exists);
    assert_eq!(status.configured_volume, 0.3);
    assert_eq!(status.configured_timeout_seconds, 1.5);
    assert!(!status.fallback_enabled);
    assert_eq!(status.custom_sound_path.as_deref(), Some(fx.custom_asset.as_path()));

    let json = serde_json::to_value(&status).unwrap();
    assert_eq!(json["backends_available"][0], "only");
}

#[tokio::test]
async fn test_status_reports_missing_default_asset() {
    let player = AudioPlayer::with_registry(
        options(Duration::from_secs(1), true),
        Path::new("/nonexistent/chime/notification.wav").to_path_buf(),
        BackendRegistry::default(),
    );

    let status = player.status().await;

    assert!(!status.default_asset_exists);
    assert!(status.backends_available.is_empty());
}

#[tokio::test]
async fn test_test_playback_uses_default_asset() {
    let fx = fixture();
    let backend = MockBackend::succeeding("only").into_arc();
    let player = AudioPlayer::with_registry(
        PlayerOptions {
            custom_sound_path: Some(fx.custom_asset.clone()),
            ..options(Duration::from_secs(1), true)
        },
        fx.default_asset.clone(),
        registry(&[&backend]),
    );

    let result = player.test_playback().await.unwrap();

    assert_eq!(result.status, PlaybackStatus::Success);
    assert_eq!(backend.played_assets(), vec![fx.default_asset.clone()]);
}

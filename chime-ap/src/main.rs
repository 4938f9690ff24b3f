//! Notification sound player (chime-ap) - Main entry point
//!
//! Loads configuration (flags > environment > TOML file > defaults), detects
//! the playback backends available on this host, and runs one command.
//! Command output is JSON on stdout; logs go to stderr.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use chime_ap::audio::{ensure_default_tone, generate_notification_tone, ToneSpec};
use chime_ap::{AudioPlayer, PlaybackResult};
use chime_common::config::{user_config_path, write_toml_config, ENV_LOG_LEVEL};
use chime_common::TomlConfig;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter, Registry};

/// Command-line arguments for chime-ap
#[derive(Parser, Debug)]
#[command(name = "chime-ap")]
#[command(about = "Play a notification sound through the first working audio backend")]
#[command(version)]
struct Args {
    /// Configuration file (default: platform config dir, then /etc/chime)
    #[arg(short, long, global = true, env = "CHIME_CONFIG")]
    config: Option<PathBuf>,

    /// Playback volume, 0.0 - 1.0
    #[arg(long, global = true)]
    volume: Option<f32>,

    /// Per-backend timeout in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Do not fall back to the default sound when a custom sound fails
    #[arg(long, global = true)]
    no_fallback: bool,

    /// Log level (overridden by RUST_LOG)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Play a notification sound
    Play {
        /// Sound to play instead of the configured one
        #[arg(short, long)]
        sound: Option<PathBuf>,
    },
    /// Show detected backends and effective configuration
    Status,
    /// Play the default sound
    Test,
    /// Write the default notification sound
    GenerateSound {
        /// Destination (default: configured default sound path)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Write a configuration file with the effective settings
    InitConfig {
        /// Destination (default: user config path)
        #[arg(short, long)]
        path: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    // Config loading logs too, so start from the flag/env level and refine
    // once the file has been read
    let startup_level = args
        .log_level
        .clone()
        .or_else(|| std::env::var(ENV_LOG_LEVEL).ok().filter(|v| !v.trim().is_empty()))
        .unwrap_or_else(|| "info".to_string());
    let log_filter = init_tracing(&startup_level);

    let mut config = TomlConfig::load_with_env(args.config.as_deref())
        .context("Failed to load configuration")?;
    apply_cli_overrides(&mut config, &args);

    if config.logging.level != startup_level {
        if let Err(e) = log_filter.reload(log_filter_for(&config.logging.level)) {
            warn!("Failed to apply log level '{}': {}", config.logging.level, e);
        }
    }

    info!(
        "chime-ap {} (git {}, built {}, {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    config
        .playback
        .validate()
        .context("Invalid playback configuration")?;

    let default_asset = config.playback.resolved_default_sound_path();

    match args.command {
        Command::GenerateSound { output, force } => {
            let path = output.unwrap_or(default_asset);
            if path.exists() && !force {
                bail!("{} already exists (use --force to overwrite)", path.display());
            }
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)
                        .with_context(|| format!("Failed to create {}", parent.display()))?;
                }
            }
            generate_notification_tone(&path, &ToneSpec::default())
                .with_context(|| format!("Failed to write {}", path.display()))?;
            print_json(&serde_json::json!({ "generated": path }))?;
            Ok(ExitCode::SUCCESS)
        }
        Command::InitConfig { path, force } => {
            let path = match path {
                Some(path) => path,
                None => user_config_path().context("Cannot determine config path")?,
            };
            if path.exists() && !force {
                bail!("{} already exists (use --force to overwrite)", path.display());
            }
            write_toml_config(&config, &path)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            print_json(&serde_json::json!({ "written": path }))?;
            Ok(ExitCode::SUCCESS)
        }
        command => {
            if let Err(e) = ensure_default_tone(&default_asset) {
                warn!(
                    "Default sound unavailable at {}: {}",
                    default_asset.display(),
                    e
                );
            }

            let player = AudioPlayer::new(&config.playback, default_asset).await;

            match command {
                Command::Play { sound } => {
                    let result = player
                        .play_notification(sound.as_deref())
                        .await
                        .context("Playback rejected")?;
                    report(&result)
                }
                Command::Test => {
                    let result = player.test_playback().await.context("Playback rejected")?;
                    report(&result)
                }
                _ => {
                    print_json(&player.status().await)?;
                    Ok(ExitCode::SUCCESS)
                }
            }
        }
    }
}

fn apply_cli_overrides(config: &mut TomlConfig, args: &Args) {
    if let Some(volume) = args.volume {
        config.playback.volume = volume;
    }
    if let Some(timeout) = args.timeout {
        config.playback.timeout_seconds = timeout;
    }
    if args.no_fallback {
        config.playback.enable_fallback = false;
    }
    if let Some(level) = &args.log_level {
        config.logging.level = level.clone();
    }
}

/// Logs go to stderr; stdout carries command output only
///
/// Returns a handle for swapping the filter after the config file is loaded.
fn init_tracing(level: &str) -> reload::Handle<EnvFilter, Registry> {
    let (filter, handle) = reload::Layer::new(log_filter_for(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    handle
}

/// RUST_LOG wins over the configured level
fn log_filter_for(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("chime_ap={level},chime_common={level}", level = level).into()
    })
}

fn report(result: &PlaybackResult) -> Result<ExitCode> {
    print_json(result)?;
    Ok(if result.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", text);
    Ok(())
}

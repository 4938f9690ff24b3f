//! Command-line player backends
//!
//! Shells out to a platform audio utility (`afplay`, `pw-play`, `paplay`,
//! `aplay`, PowerShell's `SoundPlayer`) or a user-configured command.
//!
//! The child runs with stdout discarded and stderr captured. Its exit is raced
//! against the attempt timeout; on expiry the child is killed and reaped before
//! `Timeout` is reported. On unix the child leads its own process group and the
//! whole group is killed, so helpers started by a wrapper script go with it.

use super::backend::{check_asset, PlaybackBackend, ProbeCache};
use super::result::PlaybackResult;
use async_trait::async_trait;
use chime_common::CustomCommandConfig;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tracing::{debug, warn};

/// How long to wait for a finished child's stderr to drain
const STDERR_DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Maximum diagnostic text carried into a result message
const MAX_DIAGNOSTIC_CHARS: usize = 500;

/// Placeholder replaced by the asset path in custom command arguments
pub const FILE_PLACEHOLDER: &str = "{file}";
/// Placeholder replaced by the volume (0.00 - 1.00) in custom command arguments
pub const VOLUME_PLACEHOLDER: &str = "{volume}";

/// Supported command-line players
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandTool {
    /// macOS `afplay`
    Afplay,
    /// Windows PowerShell `System.Media.SoundPlayer` (WAV only)
    PowerShell,
    /// PipeWire `pw-play`
    PwPlay,
    /// PulseAudio `paplay`
    Paplay,
    /// ALSA `aplay`
    Aplay,
    /// User-configured command
    Custom {
        name: String,
        program: String,
        args: Vec<String>,
    },
}

impl CommandTool {
    /// Built-in tools in priority order
    pub fn builtin() -> [CommandTool; 5] {
        [
            CommandTool::Afplay,
            CommandTool::PowerShell,
            CommandTool::PwPlay,
            CommandTool::Paplay,
            CommandTool::Aplay,
        ]
    }

    /// Build a custom tool from configuration
    ///
    /// An empty argument list plays the file as the only argument.
    pub fn from_config(config: &CustomCommandConfig) -> Self {
        let args = if config.args.is_empty() {
            vec![FILE_PLACEHOLDER.to_string()]
        } else {
            config.args.clone()
        };

        CommandTool::Custom {
            name: config.name.clone(),
            program: config.program.clone(),
            args,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            CommandTool::Afplay => "afplay",
            CommandTool::PowerShell => "powershell",
            CommandTool::PwPlay => "pw-play",
            CommandTool::Paplay => "paplay",
            CommandTool::Aplay => "aplay",
            CommandTool::Custom { name, .. } => name,
        }
    }

    pub fn program(&self) -> &str {
        match self {
            CommandTool::Afplay => "afplay",
            CommandTool::PowerShell => "powershell",
            CommandTool::PwPlay => "pw-play",
            CommandTool::Paplay => "paplay",
            CommandTool::Aplay => "aplay",
            CommandTool::Custom { program, .. } => program,
        }
    }

    /// Whether this tool can exist on the current platform at all
    pub fn supported_on_this_platform(&self) -> bool {
        match self {
            CommandTool::Afplay => cfg!(target_os = "macos"),
            CommandTool::PowerShell => cfg!(windows),
            CommandTool::PwPlay | CommandTool::Paplay | CommandTool::Aplay => {
                cfg!(unix) && !cfg!(target_os = "macos")
            }
            CommandTool::Custom { .. } => true,
        }
    }

    /// Arguments for playing `asset` at `volume`
    pub fn build_args(&self, asset: &Path, volume: f32) -> Vec<OsString> {
        let mut args: Vec<OsString> = Vec::new();

        match self {
            CommandTool::Afplay => {
                if (volume - 1.0).abs() > f32::EPSILON {
                    args.push("-v".into());
                    args.push(format!("{}", volume).into());
                }
                args.push(asset.as_os_str().to_os_string());
            }
            CommandTool::PowerShell => {
                // Single quotes are escaped by doubling inside a PowerShell literal
                let literal = asset.display().to_string().replace('\'', "''");
                args.push("-NoProfile".into());
                args.push("-NonInteractive".into());
                args.push("-Command".into());
                args.push(
                    format!(
                        "(New-Object System.Media.SoundPlayer '{}').PlaySync()",
                        literal
                    )
                    .into(),
                );
            }
            CommandTool::PwPlay => {
                args.push(format!("--volume={:.3}", volume).into());
                args.push(asset.as_os_str().to_os_string());
            }
            CommandTool::Paplay => {
                // 65536 is 100% in PulseAudio's linear scale
                let pa_volume = (volume * 65536.0).round() as u32;
                args.push(format!("--volume={}", pa_volume).into());
                args.push(asset.as_os_str().to_os_string());
            }
            CommandTool::Aplay => {
                args.push("-q".into());
                args.push(asset.as_os_str().to_os_string());
            }
            CommandTool::Custom { args: template, .. } => {
                let mut saw_file = false;
                let volume_text = format!("{:.2}", volume);
                for arg in template {
                    if arg == FILE_PLACEHOLDER {
                        saw_file = true;
                        args.push(asset.as_os_str().to_os_string());
                    } else {
                        if arg.contains(FILE_PLACEHOLDER) {
                            saw_file = true;
                        }
                        let expanded = arg
                            .replace(FILE_PLACEHOLDER, &asset.display().to_string())
                            .replace(VOLUME_PLACEHOLDER, &volume_text);
                        args.push(expanded.into());
                    }
                }
                if !saw_file {
                    args.push(asset.as_os_str().to_os_string());
                }
            }
        }

        args
    }

    /// Diagnostics that mean the tool rejected the file's encoding
    fn format_rejection_markers(&self) -> &'static [&'static str] {
        match self {
            CommandTool::Afplay => &["('typ?')", "('fmt?')", "('wht?')"],
            CommandTool::PowerShell => &["wave header is corrupt", "not a valid wave file"],
            CommandTool::PwPlay => &["format not recognised", "unsupported format"],
            CommandTool::Paplay => &["failed to open audio file", "unsupported sample format"],
            CommandTool::Aplay => &["can't play", "non available", "unsupported"],
            CommandTool::Custom { .. } => &[],
        }
    }

    /// True if `stderr` contains one of this tool's format-rejection diagnostics
    pub fn is_format_rejection(&self, stderr: &str) -> bool {
        let lowered = stderr.to_lowercase();
        self.format_rejection_markers()
            .iter()
            .any(|marker| lowered.contains(marker))
    }
}

/// Backend that plays audio through an external command
pub struct CommandBackend {
    tool: CommandTool,
    probe: ProbeCache,
}

impl CommandBackend {
    pub fn new(tool: CommandTool) -> Self {
        Self {
            tool,
            probe: ProbeCache::new(),
        }
    }

    pub fn tool(&self) -> &CommandTool {
        &self.tool
    }

    fn describe_failure(&self, status: ExitStatus, stderr: &str) -> PlaybackResult {
        let name = self.tool.name();
        let diagnostic = truncate_diagnostic(stderr.trim());

        if self.tool.is_format_rejection(&diagnostic) {
            return PlaybackResult::unsupported_format(
                name,
                format!("{} rejected the audio format ({}): {}", name, status, diagnostic),
            );
        }

        if diagnostic.is_empty() {
            PlaybackResult::failed(
                name,
                format!("{} failed ({}) without diagnostic output", name, status),
            )
        } else {
            PlaybackResult::failed(name, format!("{} failed ({}): {}", name, status, diagnostic))
        }
    }
}

#[async_trait]
impl PlaybackBackend for CommandBackend {
    fn name(&self) -> &str {
        self.tool.name()
    }

    async fn probe(&self) -> bool {
        let tool = &self.tool;
        self.probe
            .get_or_probe(tool.name(), || async move {
                if !tool.supported_on_this_platform() {
                    return false;
                }
                // PATH may include slow or hung mounts
                let program = tool.program().to_string();
                match tokio::task::spawn_blocking(move || find_program(&program)).await {
                    Ok(Some(path)) => {
                        debug!(backend = tool.name(), path = %path.display(), "Located player");
                        true
                    }
                    Ok(None) => false,
                    Err(e) => {
                        warn!(backend = tool.name(), error = %e, "Player lookup failed");
                        false
                    }
                }
            })
            .await
    }

    async fn play(&self, asset: &Path, volume: f32, timeout: Duration) -> PlaybackResult {
        let name = self.tool.name();

        if let Some(result) = check_asset(name, asset).await {
            return result;
        }

        let started = Instant::now();
        let program = self.tool.program();
        let args = self.tool.build_args(asset, volume);

        debug!(backend = name, program = program, args = ?args, "Spawning player");

        let mut command = Command::new(program);
        command
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        command.process_group(0);

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                return PlaybackResult::failed(name, format!("Failed to start {}: {}", program, e))
                    .with_duration(started.elapsed());
            }
        };

        let stderr_reader = child.stderr.take().map(|mut stderr| {
            tokio::spawn(async move {
                let mut buf = Vec::new();
                let _ = stderr.read_to_end(&mut buf).await;
                buf
            })
        });

        let result = match tokio::time::timeout(timeout, child.wait()).await {
            Ok(Ok(status)) => {
                let stderr = match stderr_reader {
                    Some(mut reader) => {
                        match tokio::time::timeout(STDERR_DRAIN_TIMEOUT, &mut reader).await {
                            Ok(Ok(buf)) => String::from_utf8_lossy(&buf).into_owned(),
                            Ok(Err(_)) => String::new(),
                            Err(_) => {
                                // A leftover descendant still holds the pipe open
                                reader.abort();
                                String::new()
                            }
                        }
                    }
                    None => String::new(),
                };

                if status.success() {
                    PlaybackResult::success(name)
                } else {
                    self.describe_failure(status, &stderr)
                }
            }
            Ok(Err(e)) => {
                if let Some(reader) = stderr_reader {
                    reader.abort();
                }
                PlaybackResult::failed(name, format!("Failed waiting for {}: {}", program, e))
            }
            Err(_) => {
                warn!(backend = name, "Playback exceeded {:?}, killing player", timeout);
                terminate(name, &mut child).await;
                if let Some(reader) = stderr_reader {
                    reader.abort();
                }
                PlaybackResult::timeout(name, timeout)
            }
        };

        result.with_duration(started.elapsed())
    }
}

/// Kill a timed-out player along with its process group, then reap it
async fn terminate(backend: &str, child: &mut Child) {
    #[cfg(unix)]
    if let Some(pid) = child.id() {
        // The child was spawned as a group leader, so its pid is the group id
        let rc = unsafe { libc::kill(-(pid as libc::pid_t), libc::SIGKILL) };
        if rc != 0 {
            debug!(
                backend = backend,
                error = %std::io::Error::last_os_error(),
                "Failed to signal player process group"
            );
        }
    }

    if let Err(e) = child.kill().await {
        warn!(backend = backend, error = %e, "Failed to kill timed-out player");
    }
}

/// Locate `program` the way the shell would
///
/// Paths containing a separator are checked directly; bare names are searched
/// on `PATH` (with `PATHEXT` extensions on Windows).
pub fn find_program(program: &str) -> Option<PathBuf> {
    let candidate = Path::new(program);
    if candidate.components().count() > 1 {
        return is_executable(candidate).then(|| candidate.to_path_buf());
    }

    let path_var = std::env::var_os("PATH")?;
    let extensions: Vec<String> = if cfg!(windows) {
        std::env::var("PATHEXT")
            .unwrap_or_else(|_| ".EXE;.CMD;.BAT;.COM".to_string())
            .split(';')
            .filter(|ext| !ext.is_empty())
            .map(str::to_string)
            .collect()
    } else {
        Vec::new()
    };

    for dir in std::env::split_paths(&path_var) {
        let direct = dir.join(program);
        if is_executable(&direct) {
            return Some(direct);
        }
        for ext in &extensions {
            let with_ext = dir.join(format!("{}{}", program, ext));
            if is_executable(&with_ext) {
                return Some(with_ext);
            }
        }
    }

    None
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

fn truncate_diagnostic(text: &str) -> String {
    if text.chars().count() <= MAX_DIAGNOSTIC_CHARS {
        text.to_string()
    } else {
        let mut truncated: String = text.chars().take(MAX_DIAGNOSTIC_CHARS).collect();
        truncated.push_str("...");
        truncated
    }
}

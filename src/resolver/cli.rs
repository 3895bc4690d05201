//! CLI-based media resolver using the external yt-dlp binary

use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use super::progress;
use super::{MediaResolver, ProgressSink, ResolveJob, ResolveOutcome, ResolverCapabilities};
use crate::config::Quality;
use crate::error::Error;
use crate::types::{MediaKind, ProgressUpdate};

/// Number of trailing stderr lines kept for the failure message
const ERROR_TAIL_LINES: usize = 8;

/// CLI-based resolver that shells out to yt-dlp
///
/// The binary is run with `--newline` so each progress update arrives as a
/// separate stdout line, and with `--print after_move:filepath` so the final
/// file location can be reported back to the host.
///
/// # Examples
///
/// ```no_run
/// use media_dl::resolver::CliResolver;
/// use std::path::PathBuf;
///
/// // Create with explicit path
/// let resolver = CliResolver::new(PathBuf::from("/usr/bin/yt-dlp"));
///
/// // Or auto-discover from PATH
/// let resolver = CliResolver::from_path()
///     .expect("yt-dlp not found in PATH");
/// ```
pub struct CliResolver {
    binary_path: PathBuf,
}

impl CliResolver {
    /// Create a new CLI resolver with an explicit binary path
    pub fn new(binary_path: PathBuf) -> Self {
        Self { binary_path }
    }

    /// Attempt to find yt-dlp in PATH
    ///
    /// Uses the `which` crate to search the system PATH.
    pub fn from_path() -> Option<Self> {
        which::which("yt-dlp").ok().map(Self::new)
    }

    /// Build the argument list for a job
    fn build_args(job: &ResolveJob) -> crate::Result<Vec<String>> {
        let mut args: Vec<String> = vec![
            "--newline".into(),
            "--ignore-config".into(),
            "--no-cache-dir".into(),
        ];

        match job.kind {
            MediaKind::Video => {
                let format = match job.quality {
                    Quality::Best => "bestvideo[ext=mp4]+bestaudio[ext=m4a]/best[ext=mp4]/best",
                    Quality::Medium => {
                        "bestvideo[height<=720][ext=mp4]+bestaudio[ext=m4a]/best[height<=720]/best"
                    }
                    Quality::Low => {
                        "bestvideo[height<=480][ext=mp4]+bestaudio[ext=m4a]/best[height<=480]/best"
                    }
                };
                args.extend(["-f".into(), format.into()]);
                args.extend(["--merge-output-format".into(), "mp4".into()]);
            }
            MediaKind::Audio => {
                let audio_quality = match job.quality {
                    Quality::Best => "0",
                    Quality::Medium => "5",
                    Quality::Low => "9",
                };
                args.extend(["-f".into(), "bestaudio/best".into()]);
                args.extend(["-x".into(), "--audio-format".into(), "mp3".into()]);
                args.extend(["--audio-quality".into(), audio_quality.into()]);
            }
            MediaKind::Image => {
                return Err(Error::NotSupported(
                    "image downloads are fetched over HTTP, not via the resolver".into(),
                ));
            }
        }

        // Final path reporting and destination
        args.extend(["--print".into(), "after_move:filepath".into()]);
        args.extend(["-o".into(), "%(title)s.%(ext)s".into()]);
        args.extend(["-P".into(), job.output_dir.to_string_lossy().into_owned()]);

        // URL last
        args.push(job.url.clone());

        Ok(args)
    }
}

/// Whether a stdout line is the `--print after_move:filepath` output
///
/// The printed path names a file that already exists on disk (yt-dlp prints
/// it after the move), which distinguishes it from prose that merely mentions
/// a filename, such as "Deleting original file x.webm (pass -k to keep)".
fn is_final_path_line(line: &str) -> bool {
    !line.is_empty() && !line.starts_with('[') && Path::new(line).is_file()
}

#[async_trait]
impl MediaResolver for CliResolver {
    async fn resolve(
        &self,
        job: ResolveJob,
        progress: ProgressSink,
        cancel: CancellationToken,
    ) -> crate::Result<ResolveOutcome> {
        let args = Self::build_args(&job)?;

        tracing::debug!(
            binary = %self.binary_path.display(),
            url = %job.url,
            kind = %job.kind,
            "Spawning resolver binary"
        );

        let mut child = Command::new(&self.binary_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                Error::ExternalTool(format!(
                    "Failed to execute {}: {}",
                    self.binary_path.display(),
                    e
                ))
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::Other("resolver stdout was not captured".into()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| Error::Other("resolver stderr was not captured".into()))?;

        let mut stdout_lines = BufReader::new(stdout).lines();
        let mut stderr_lines = BufReader::new(stderr).lines();
        let mut stdout_done = false;
        let mut stderr_done = false;
        let mut final_path: Option<PathBuf> = None;
        let mut error_tail: VecDeque<String> = VecDeque::new();

        while !(stdout_done && stderr_done) {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!(url = %job.url, "Cancellation requested, killing resolver process");
                    child.kill().await.ok();
                    let _ = child.wait().await;
                    return Ok(ResolveOutcome::Cancelled);
                }

                line = stdout_lines.next_line(), if !stdout_done => {
                    match line {
                        Ok(Some(line)) => {
                            let line = line.trim();
                            if let Some(percent) = progress::parse_percent(line) {
                                progress
                                    .send(ProgressUpdate {
                                        percent: Some(percent),
                                        message: line.to_string(),
                                    })
                                    .ok();
                            } else if is_final_path_line(line) {
                                // Output of --print after_move:filepath
                                final_path = Some(PathBuf::from(line));
                            } else if progress::is_log_worthy(line) {
                                progress.send(ProgressUpdate::message(line)).ok();
                            }
                        }
                        Ok(None) => stdout_done = true,
                        Err(e) => {
                            tracing::warn!(error = %e, "Failed to read resolver stdout");
                            stdout_done = true;
                        }
                    }
                }

                line = stderr_lines.next_line(), if !stderr_done => {
                    match line {
                        Ok(Some(line)) => {
                            let line = line.trim();
                            if !line.is_empty() {
                                if error_tail.len() == ERROR_TAIL_LINES {
                                    error_tail.pop_front();
                                }
                                error_tail.push_back(line.to_string());
                                progress.send(ProgressUpdate::message(line)).ok();
                            }
                        }
                        Ok(None) => stderr_done = true,
                        Err(e) => {
                            tracing::warn!(error = %e, "Failed to read resolver stderr");
                            stderr_done = true;
                        }
                    }
                }
            }
        }

        let status = child.wait().await?;
        if status.success() {
            Ok(ResolveOutcome::Completed(final_path))
        } else {
            let detail = if error_tail.is_empty() {
                format!("resolver exited with {status}")
            } else {
                error_tail.into_iter().collect::<Vec<_>>().join("; ")
            };
            Err(Error::ExternalTool(format!("yt-dlp failed: {detail}")))
        }
    }

    fn capabilities(&self) -> ResolverCapabilities {
        ResolverCapabilities {
            video: true,
            audio: true,
        }
    }

    fn name(&self) -> &'static str {
        "cli-yt-dlp"
    }
}

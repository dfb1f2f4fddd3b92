//! [`MediaSource`] backed by the yt-dlp command-line tool.
//!
//! - `args` builds argument vectors
//! - `parse` reads metadata, progress lines and error text

pub mod args;
pub mod parse;

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use kartoshka_core::MediaInfo;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tokio::process::Command;

use crate::source::{DownloadRequest, MediaSource, SourceError, SourceEvent};
use parse::{is_progress_line, parse_info, parse_progress_line, translate_error};

/// Overrides the yt-dlp executable.
pub const ENV_YTDLP: &str = "KARTOSHKA_YTDLP";

/// Passed to yt-dlp as `--ffmpeg-location` when set.
pub const ENV_FFMPEG: &str = "KARTOSHKA_FFMPEG";

const DEFAULT_PROGRAM: &str = "yt-dlp";

/// yt-dlp is silent while ffmpeg merges or converts. A line is reported
/// after this long without output so the controller sees the run is alive.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct YtDlpSource {
    program: PathBuf,
    ffmpeg_location: Option<PathBuf>,
    heartbeat: Duration,
}

impl YtDlpSource {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            ffmpeg_location: None,
            heartbeat: HEARTBEAT_INTERVAL,
        }
    }

    #[must_use]
    pub const fn with_heartbeat(mut self, interval: Duration) -> Self {
        self.heartbeat = interval;
        self
    }

    #[must_use]
    pub fn with_ffmpeg(mut self, location: impl Into<PathBuf>) -> Self {
        self.ffmpeg_location = Some(location.into());
        self
    }

    /// Locate yt-dlp via `KARTOSHKA_YTDLP`, then `PATH`.
    ///
    /// Falls back to the bare program name so that a missing tool surfaces
    /// as a spawn error when it is first used.
    pub fn from_env() -> Self {
        let program = std::env::var_os(ENV_YTDLP)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .or_else(|| which::which(DEFAULT_PROGRAM).ok())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_PROGRAM));
        tracing::debug!(program = %program.display(), "Using yt-dlp");

        let source = Self::new(program);
        match std::env::var_os(ENV_FFMPEG).filter(|v| !v.is_empty()) {
            Some(ffmpeg) => source.with_ffmpeg(ffmpeg),
            None => source,
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    fn command(&self, args: &[String]) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .env("PYTHONUNBUFFERED", "1");
        cmd
    }

    fn spawn_error(&self, err: &std::io::Error) -> SourceError {
        if err.kind() == std::io::ErrorKind::NotFound {
            SourceError::NotInstalled(format!(
                "yt-dlp not found ({}). Install yt-dlp or set {ENV_YTDLP}.",
                self.program.display()
            ))
        } else {
            SourceError::Tool(format!("Failed to start yt-dlp: {err}"))
        }
    }
}

#[async_trait]
impl MediaSource for YtDlpSource {
    async fn resolve(&self, url: &str) -> Result<MediaInfo, SourceError> {
        let output = self
            .command(&args::info_args(url))
            .output()
            .await
            .map_err(|e| self.spawn_error(&e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::debug!(status = %output.status, %stderr, "yt-dlp metadata lookup failed");
            return Err(translate_error(&stderr, SourceError::Resolution));
        }

        parse_info(url, &String::from_utf8_lossy(&output.stdout))
    }

    async fn download(
        &self,
        request: &DownloadRequest,
        on_event: &mut (dyn FnMut(SourceEvent) + Send),
    ) -> Result<(), SourceError> {
        let args = args::download_args(request, self.ffmpeg_location.as_deref());
        tracing::debug!(?args, "Starting yt-dlp download");

        let mut child = self.command(&args).spawn().map_err(|e| self.spawn_error(&e))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| SourceError::Tool("Missing yt-dlp stdout".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| SourceError::Tool("Missing yt-dlp stderr".to_string()))?;

        let mut stderr_reader = BufReader::new(stderr);
        let stderr_task = tokio::spawn(async move {
            let mut buf = Vec::new();
            let _ = stderr_reader.read_to_end(&mut buf).await;
            buf
        });

        pump_output(stdout, self.heartbeat, on_event).await?;

        let status = child
            .wait()
            .await
            .map_err(|e| SourceError::Transfer(format!("Failed to wait for yt-dlp: {e}")))?;
        let stderr_buf = stderr_task.await.unwrap_or_default();

        if status.success() {
            return Ok(());
        }

        let stderr_text = String::from_utf8_lossy(&stderr_buf);
        tracing::debug!(%status, stderr = %stderr_text, "yt-dlp download failed");
        Err(translate_error(&stderr_text, SourceError::Transfer))
    }
}

/// Forward yt-dlp's stdout as progress events and output lines.
///
/// Reports a heartbeat line after every `heartbeat` without output.
async fn pump_output<R>(
    stdout: R,
    heartbeat: Duration,
    on_event: &mut (dyn FnMut(SourceEvent) + Send),
) -> Result<(), SourceError>
where
    R: AsyncRead + Unpin,
{
    // Read raw bytes so a stray non-UTF-8 title cannot end the stream.
    let mut reader = BufReader::new(stdout);
    let mut buf = Vec::new();
    let mut quiet = Duration::ZERO;
    loop {
        // A timed-out read keeps its partial line in `buf`.
        let read = match tokio::time::timeout(heartbeat, reader.read_until(b'\n', &mut buf)).await {
            Ok(read) => read
                .map_err(|e| SourceError::Transfer(format!("Failed to read yt-dlp output: {e}")))?,
            Err(_) => {
                quiet += heartbeat;
                on_event(SourceEvent::Output(format!(
                    "yt-dlp is still working (no output for {}s)",
                    quiet.as_secs()
                )));
                continue;
            }
        };
        quiet = Duration::ZERO;
        if read == 0 {
            break;
        }

        {
            let text = String::from_utf8_lossy(&buf);
            let line = text.trim_end();
            if is_progress_line(line) {
                if let Some(event) = parse_progress_line(line) {
                    on_event(SourceEvent::Progress(event));
                }
            } else if !line.trim().is_empty() {
                on_event(SourceEvent::Output(line.to_string()));
            }
        }
        buf.clear();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    async fn pump(
        script: Vec<(Duration, &'static str)>,
        heartbeat: Duration,
    ) -> Vec<SourceEvent> {
        let (mut writer, reader) = tokio::io::duplex(256);
        let feeder = tokio::spawn(async move {
            for (delay, text) in script {
                tokio::time::sleep(delay).await;
                writer.write_all(text.as_bytes()).await.unwrap();
            }
        });

        let mut events = Vec::new();
        let mut collect = |event: SourceEvent| events.push(event);
        pump_output(reader, heartbeat, &mut collect).await.unwrap();
        feeder.await.unwrap();
        events
    }

    #[tokio::test]
    async fn test_quiet_tool_reports_heartbeat() {
        let events = pump(
            vec![
                (Duration::ZERO, "kartoshka-progress:50|100|NA|10|1\n"),
                (Duration::from_millis(250), "[Merger] Merging formats\n"),
            ],
            Duration::from_millis(100),
        )
        .await;

        assert!(matches!(events.first(), Some(SourceEvent::Progress(_))));
        let heartbeats = events
            .iter()
            .filter(|e| matches!(e, SourceEvent::Output(l) if l.starts_with("yt-dlp is still working")))
            .count();
        assert!(heartbeats >= 1, "{events:?}");
        assert_eq!(
            events.last(),
            Some(&SourceEvent::Output("[Merger] Merging formats".to_string()))
        );
    }

    #[tokio::test]
    async fn test_line_split_across_quiet_period_is_kept_whole() {
        let events = pump(
            vec![
                (Duration::ZERO, "[ExtractAudio] Dest"),
                (Duration::from_millis(150), "ination: a.mp3\n"),
            ],
            Duration::from_millis(100),
        )
        .await;

        assert_eq!(
            events.last(),
            Some(&SourceEvent::Output("[ExtractAudio] Destination: a.mp3".to_string()))
        );
    }

    #[tokio::test]
    async fn test_busy_tool_reports_no_heartbeat() {
        let events = pump(
            vec![(Duration::ZERO, "one\n"), (Duration::ZERO, "\ntwo\n")],
            Duration::from_secs(5),
        )
        .await;

        assert_eq!(
            events,
            vec![
                SourceEvent::Output("one".to_string()),
                SourceEvent::Output("two".to_string())
            ]
        );
    }
}

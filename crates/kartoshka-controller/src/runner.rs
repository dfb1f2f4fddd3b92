//! Spawning the dispatcher.
//!
//! [`BackendPort`] is the seam between the controller session and real
//! processes. [`ProcessBackend`] implements it over `tokio::process`.

use std::io;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use kartoshka_core::OperationError;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::decoder::ProcessExit;
use crate::encoder::Invocation;

/// Buffered result of a one-shot run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    pub stdout: String,
    pub exit: ProcessExit,
}

/// Runs dispatcher invocations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BackendPort: Send + Sync {
    /// Run to completion and return everything it printed.
    ///
    /// Exceeding `timeout` kills the process and yields
    /// [`OperationError::Timeout`]. Firing `cancel` kills it too.
    async fn run_once(
        &self,
        invocation: &Invocation,
        timeout: Duration,
        cancel: CancellationToken,
    ) -> Result<ProcessOutput, OperationError>;

    /// Run while forwarding each stdout line as it arrives.
    ///
    /// The process is killed when `cancel` fires or when no line arrives for
    /// `stall_timeout`.
    async fn run_streaming(
        &self,
        invocation: &Invocation,
        lines: mpsc::Sender<String>,
        cancel: CancellationToken,
        stall_timeout: Option<Duration>,
    ) -> Result<ProcessExit, OperationError>;
}

/// [`BackendPort`] over real child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessBackend;

impl ProcessBackend {
    pub const fn new() -> Self {
        Self
    }

    fn spawn(invocation: &Invocation) -> Result<Child, OperationError> {
        tracing::debug!(
            program = %invocation.program.display(),
            command = %invocation.kind,
            "Spawning backend"
        );
        Command::new(&invocation.program)
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| spawn_error(invocation, &e))
    }
}

fn spawn_error(invocation: &Invocation, err: &io::Error) -> OperationError {
    if err.kind() == io::ErrorKind::NotFound {
        OperationError::fault(format!(
            "Backend application not found: {}",
            invocation.program.display()
        ))
    } else {
        OperationError::fault(format!("Failed to start backend: {err}"))
    }
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

fn collect_stderr<R>(stderr: Option<R>) -> tokio::task::JoinHandle<Vec<u8>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = Vec::new();
        if let Some(stderr) = stderr {
            let _ = BufReader::new(stderr).read_to_end(&mut buf).await;
        }
        buf
    })
}

/// Result of waiting for one line.
enum NextLine {
    Line,
    Eof,
    Stalled,
}

async fn next_line<R>(
    reader: &mut BufReader<R>,
    buf: &mut Vec<u8>,
    stall_timeout: Option<Duration>,
) -> io::Result<NextLine>
where
    R: AsyncRead + Unpin,
{
    let read = match stall_timeout {
        Some(limit) => match tokio::time::timeout(limit, reader.read_until(b'\n', buf)).await {
            Ok(read) => read?,
            Err(_) => return Ok(NextLine::Stalled),
        },
        None => reader.read_until(b'\n', buf).await?,
    };
    Ok(if read == 0 { NextLine::Eof } else { NextLine::Line })
}

#[async_trait]
impl BackendPort for ProcessBackend {
    async fn run_once(
        &self,
        invocation: &Invocation,
        timeout: Duration,
        cancel: CancellationToken,
    ) -> Result<ProcessOutput, OperationError> {
        let child = Self::spawn(invocation)?;

        // Dropping the wait future drops the child, which kills it.
        let waited = tokio::select! {
            () = cancel.cancelled() => {
                tracing::info!(command = %invocation.kind, "Download cancelled, killing backend");
                return Err(OperationError::fault("Download cancelled"));
            }
            waited = tokio::time::timeout(timeout, child.wait_with_output()) => waited,
        };
        let output = waited
            .map_err(|_| {
                tracing::warn!(command = %invocation.kind, ?timeout, "Backend timed out");
                OperationError::timeout(invocation.describe(), timeout.as_secs())
            })?
            .map_err(|e| OperationError::fault(format!("Failed to read backend output: {e}")))?;

        Ok(ProcessOutput {
            stdout: lossy(&output.stdout),
            exit: ProcessExit {
                code: output.status.code(),
                stderr: lossy(&output.stderr),
            },
        })
    }

    async fn run_streaming(
        &self,
        invocation: &Invocation,
        lines: mpsc::Sender<String>,
        cancel: CancellationToken,
        stall_timeout: Option<Duration>,
    ) -> Result<ProcessExit, OperationError> {
        let mut child = Self::spawn(invocation)?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| OperationError::fault("Missing backend stdout"))?;
        let stderr_task = collect_stderr(child.stderr.take());

        let mut reader = BufReader::new(stdout);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            let next = tokio::select! {
                () = cancel.cancelled() => {
                    tracing::info!("Download cancelled, killing backend");
                    let _ = child.kill().await;
                    return Err(OperationError::fault("Download cancelled"));
                }
                next = next_line(&mut reader, &mut buf, stall_timeout) => next,
            };

            match next {
                Ok(NextLine::Line) => {
                    let line = lossy(&buf);
                    if lines.send(line.trim_end().to_string()).await.is_err() {
                        tracing::debug!("Line receiver dropped");
                    }
                }
                Ok(NextLine::Eof) => break,
                Ok(NextLine::Stalled) => {
                    let limit = stall_timeout.unwrap_or_default();
                    tracing::warn!(?limit, "Backend stopped producing output, killing it");
                    let _ = child.kill().await;
                    return Err(OperationError::timeout(
                        invocation.describe(),
                        limit.as_secs(),
                    ));
                }
                Err(e) => {
                    let _ = child.kill().await;
                    return Err(OperationError::fault(format!(
                        "Failed to read backend output: {e}"
                    )));
                }
            }
        }
        drop(lines);

        let status = tokio::select! {
            () = cancel.cancelled() => {
                let _ = child.kill().await;
                return Err(OperationError::fault("Download cancelled"));
            }
            status = child.wait() => status
                .map_err(|e| OperationError::fault(format!("Failed to wait for backend: {e}")))?,
        };
        let stderr = stderr_task.await.unwrap_or_default();

        Ok(ProcessExit {
            code: status.code(),
            stderr: lossy(&stderr),
        })
    }
}

//! Runs one command against a [`MediaSource`] and reports through a
//! [`RecordWriter`].
//!
//! Per-command state machines:
//!
//! ```text
//! info:              Start -> Resolving -> Succeeded | Failed
//! download:          Start -> Downloading -> Completed | Failed
//! download_playlist: Start -> DownloadingItem* -> Completed | Failed
//! ```
//!
//! Nothing is retried here. Retries belong to the downloading tool.

use std::io::{self, Write};
use std::path::Path;

use kartoshka_core::{
    BatchReport, Command, DownloadOptions, FailureKind, PlaylistSelection, ProgressEvent, Record,
    TerminalRecord, ensure_directory,
};

use crate::gate::{ProgressGate, StreamFold, span_progress};
use crate::sink::RecordWriter;
use crate::source::{DownloadRequest, MediaSource, SourceError, SourceEvent};

const DOWNLOAD_COMPLETE: &str = "Download completed successfully";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    Start,
    Resolving,
    Downloading,
    DownloadingItem { index: usize, total: usize },
    Succeeded,
    Completed,
    Failed,
}

impl DispatchState {
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Completed | Self::Failed)
    }
}

/// Tracks and logs state transitions of one invocation.
#[derive(Debug)]
struct StateTracker {
    state: DispatchState,
}

impl StateTracker {
    const fn new() -> Self {
        Self {
            state: DispatchState::Start,
        }
    }

    fn advance(&mut self, next: DispatchState) {
        if self.state.is_terminal() {
            tracing::warn!(from = ?self.state, to = ?next, "Ignoring transition out of a terminal state");
            return;
        }
        tracing::debug!(from = ?self.state, to = ?next, "Dispatcher state change");
        self.state = next;
    }
}

pub struct Dispatcher<S> {
    source: S,
}

impl<S: MediaSource> Dispatcher<S> {
    pub const fn new(source: S) -> Self {
        Self { source }
    }

    /// Run `command` to completion, writing exactly one terminal record.
    ///
    /// Only I/O errors on the output stream are returned. Everything else is
    /// reported in-band.
    pub async fn run<W: Write + Send>(
        &self,
        command: &Command,
        out: &mut RecordWriter<W>,
    ) -> io::Result<DispatchState> {
        let mut tracker = StateTracker::new();
        tracing::info!(command = %command.kind(), url = command.url(), "Dispatching");

        match command {
            Command::Info { url } => self.run_info(url, out, &mut tracker).await?,
            Command::Download { url, options } => {
                self.run_download(url, options, out, &mut tracker).await?;
            }
            Command::DownloadPlaylist {
                options, selection, ..
            } => self.run_playlist(options, selection, out, &mut tracker).await?,
        }

        Ok(tracker.state)
    }

    async fn run_info<W: Write + Send>(
        &self,
        url: &str,
        out: &mut RecordWriter<W>,
        tracker: &mut StateTracker,
    ) -> io::Result<()> {
        tracker.advance(DispatchState::Resolving);

        match self.source.resolve(url).await {
            Ok(info) => {
                out.write(&Record::Media(info))?;
                tracker.advance(DispatchState::Succeeded);
            }
            Err(e) => {
                tracing::warn!(error = %e, "Could not resolve URL");
                out.failure(e.kind(), e.to_string())?;
                tracker.advance(DispatchState::Failed);
            }
        }
        Ok(())
    }

    async fn run_download<W: Write + Send>(
        &self,
        url: &str,
        options: &DownloadOptions,
        out: &mut RecordWriter<W>,
        tracker: &mut StateTracker,
    ) -> io::Result<()> {
        if !prepare_destination(&options.destination, out, tracker)? {
            return Ok(());
        }

        tracker.advance(DispatchState::Downloading);
        let request = request_for(url, options);
        let mut gate = ProgressGate::default();
        let result = self
            .transfer(&request, out, &mut gate, |event| event)
            .await;

        match result {
            Ok(()) => {
                if let Some(done) = gate.finish() {
                    out.write(&Record::Progress(done))?;
                }
                out.write(&Record::Outcome(TerminalRecord::success(DOWNLOAD_COMPLETE)))?;
                tracker.advance(DispatchState::Completed);
            }
            Err(e) => {
                tracing::warn!(error = %e, "Download failed");
                out.failure(e.kind(), e.to_string())?;
                tracker.advance(DispatchState::Failed);
            }
        }
        Ok(())
    }

    async fn run_playlist<W: Write + Send>(
        &self,
        options: &DownloadOptions,
        selection: &PlaylistSelection,
        out: &mut RecordWriter<W>,
        tracker: &mut StateTracker,
    ) -> io::Result<()> {
        let items: Vec<_> = selection.selected().collect();
        let mut report = BatchReport::new(items.len());

        if !items.is_empty() && !prepare_destination(&options.destination, out, tracker)? {
            return Ok(());
        }

        // Item progress is folded into one overall percentage so that the
        // stream stays non-decreasing across items.
        let mut gate = ProgressGate::default();
        let total = items.len();

        for (index, video) in items.into_iter().enumerate() {
            tracker.advance(DispatchState::DownloadingItem { index, total });
            tracing::info!(index, total, id = %video.id, "Downloading playlist item");

            let request = request_for(&video.download_url(), options);
            let overall = move |event: ProgressEvent| span_progress(event, index, total);
            let result = self.transfer(&request, out, &mut gate, overall).await;

            match result {
                Ok(()) => report.record_success(video.display_title()),
                Err(SourceError::NotInstalled(message)) if report.summary().succeeded == 0 => {
                    // Every remaining item would fail the same way.
                    out.failure(FailureKind::Fault, message)?;
                    tracker.advance(DispatchState::Failed);
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!(id = %video.id, error = %e, "Playlist item failed");
                    report.record_failure(&video.id, video.display_title(), e.to_string());
                }
            }
        }

        let terminal = report.into_terminal();
        let next = if terminal.is_success() {
            DispatchState::Completed
        } else {
            DispatchState::Failed
        };
        out.write(&Record::Outcome(terminal))?;
        tracker.advance(next);
        Ok(())
    }

    /// Run one transfer, forwarding gated progress and tool output.
    ///
    /// Stream restarts are folded first, then `map` places the result.
    async fn transfer<W, F>(
        &self,
        request: &DownloadRequest,
        out: &mut RecordWriter<W>,
        gate: &mut ProgressGate,
        map: F,
    ) -> Result<(), SourceError>
    where
        W: Write + Send,
        F: Fn(ProgressEvent) -> ProgressEvent + Send,
    {
        let mut fold = StreamFold::new(request.expected_streams());
        let mut on_event = move |event: SourceEvent| {
            let written = match event {
                SourceEvent::Progress(progress) => match gate.admit(map(fold.fold(progress))) {
                    Some(admitted) => out.write(&Record::Progress(admitted)),
                    None => Ok(()),
                },
                SourceEvent::Output(line) => out.diagnostic(&line),
            };
            if let Err(e) = written {
                tracing::warn!(error = %e, "Failed to write to stdout");
            }
        };
        self.source.download(request, &mut on_event).await
    }
}

fn request_for(url: &str, options: &DownloadOptions) -> DownloadRequest {
    DownloadRequest {
        url: url.to_string(),
        quality: options.quality.clone(),
        format: options.format,
        destination: options.destination.clone(),
    }
}

/// Create the destination. Writes a transfer failure and returns `false`
/// when it cannot be used.
fn prepare_destination<W: Write>(
    destination: &Path,
    out: &mut RecordWriter<W>,
    tracker: &mut StateTracker,
) -> io::Result<bool> {
    match ensure_directory(destination) {
        Ok(()) => Ok(true),
        Err(e) => {
            tracing::warn!(path = %destination.display(), error = %e, "Destination unusable");
            out.failure(FailureKind::Transfer, e.to_string())?;
            tracker.advance(DispatchState::Failed);
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(DispatchState::Failed.is_terminal());
        assert!(!DispatchState::DownloadingItem { index: 0, total: 1 }.is_terminal());
    }

    #[test]
    fn test_tracker_stays_terminal() {
        let mut tracker = StateTracker::new();
        tracker.advance(DispatchState::Resolving);
        tracker.advance(DispatchState::Failed);
        tracker.advance(DispatchState::Succeeded);
        assert_eq!(tracker.state, DispatchState::Failed);
    }
}

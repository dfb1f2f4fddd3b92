//! Controller session: launches dispatcher runs off the UI loop and reports
//! back through a channel of [`UiEvent`]s.
//!
//! Workers never touch UI state. They compute a result and post it. Only one
//! download may be in flight. A second request is rejected before anything
//! is spawned. Metadata lookups run regardless.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use kartoshka_core::youtube::is_youtube_url;
use kartoshka_core::{
    BatchSummary, Command, DownloadOptions, MediaInfo, OperationError, PlaylistDescriptor,
    PlaylistSelection, ProgressEvent, Settings,
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::decoder::{Completion, LineDecoder, StreamItem, decode_buffered, resolve_outcome};
use crate::encoder::{CommandEncoder, Invocation};
use crate::runner::BackendPort;

/// Capacity of the per-run line channel.
const LINE_BUFFER: usize = 64;

/// Messages from workers to the UI loop.
#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    InfoLoaded(MediaInfo),
    InfoFailed(OperationError),
    Progress(ProgressEvent),
    Diagnostic(String),
    DownloadFinished(Result<DownloadDone, OperationError>),
}

/// A finished download or playlist batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadDone {
    pub message: String,
    pub summary: Option<BatchSummary>,
}

/// How a download's output is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DownloadMode {
    /// Forward progress line by line.
    #[default]
    Streaming,
    /// Wait for exit under the download timeout, then decode everything.
    OneShot,
}

/// Time limits applied to dispatcher runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub info: Duration,
    pub download: Duration,
    /// `None` disables stall detection.
    pub stall: Option<Duration>,
}

impl Timeouts {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            info: settings.effective_info_timeout(),
            download: settings.effective_download_timeout(),
            stall: Some(settings.effective_stall_timeout()),
        }
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

/// Marks the download slot as taken until dropped.
struct SlotGuard {
    slot: Arc<AtomicBool>,
}

impl SlotGuard {
    fn acquire(slot: &Arc<AtomicBool>) -> Option<Self> {
        slot.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self {
                slot: Arc::clone(slot),
            })
    }
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        self.slot.store(false, Ordering::Release);
    }
}

pub struct Controller {
    backend: Arc<dyn BackendPort>,
    encoder: CommandEncoder,
    timeouts: Timeouts,
    events: mpsc::UnboundedSender<UiEvent>,
    slot: Arc<AtomicBool>,
    cancel: Mutex<CancellationToken>,
}

impl Controller {
    /// Create a controller and the receiving end of its event channel.
    pub fn new(
        backend: Arc<dyn BackendPort>,
        encoder: CommandEncoder,
        timeouts: Timeouts,
    ) -> (Self, mpsc::UnboundedReceiver<UiEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let controller = Self {
            backend,
            encoder,
            timeouts,
            events,
            slot: Arc::new(AtomicBool::new(false)),
            cancel: Mutex::new(CancellationToken::new()),
        };
        (controller, receiver)
    }

    pub fn is_downloading(&self) -> bool {
        self.slot.load(Ordering::Acquire)
    }

    pub const fn timeouts(&self) -> Timeouts {
        self.timeouts
    }

    /// Look up video or playlist metadata. Posts `InfoLoaded` or
    /// `InfoFailed`.
    pub fn request_info(&self, url: &str) -> Result<JoinHandle<()>, OperationError> {
        let url = checked_url(url)?;
        let invocation = self.encoder.encode(&Command::Info { url })?;
        let backend = Arc::clone(&self.backend);
        let events = self.events.clone();
        let timeout = self.timeouts.info;

        Ok(tokio::spawn(async move {
            // Lookups are not cancellable.
            let cancel = CancellationToken::new();
            let event = match run_one_shot(backend.as_ref(), &invocation, timeout, cancel, &events)
                .await
            {
                Ok(Completion::Media(info)) => UiEvent::InfoLoaded(info),
                Ok(Completion::Done { .. }) => UiEvent::InfoFailed(OperationError::fault(
                    "Backend sent a download result instead of media information",
                )),
                Err(e) => UiEvent::InfoFailed(e),
            };
            post(&events, event);
        }))
    }

    /// Download one video. Posts progress and then `DownloadFinished`.
    pub fn start_download(
        &self,
        url: &str,
        options: DownloadOptions,
        mode: DownloadMode,
    ) -> Result<JoinHandle<()>, OperationError> {
        let url = checked_url(url)?;
        self.launch(&Command::Download { url, options }, mode)
    }

    /// Download the selected entries of a playlist, streaming progress.
    pub fn start_playlist_download(
        &self,
        url: &str,
        options: DownloadOptions,
        selection: PlaylistSelection,
    ) -> Result<JoinHandle<()>, OperationError> {
        let url = checked_url(url)?;
        if selection.selected().next().is_none() {
            return Err(OperationError::invalid_request(
                "No videos selected for download",
            ));
        }
        self.launch(
            &Command::DownloadPlaylist {
                url,
                options,
                selection,
            },
            DownloadMode::Streaming,
        )
    }

    /// Download only the video a video-from-playlist URL pointed at.
    pub fn download_current_video(
        &self,
        playlist: &PlaylistDescriptor,
        options: DownloadOptions,
    ) -> Result<JoinHandle<()>, OperationError> {
        let current = playlist.current_video().ok_or_else(|| {
            OperationError::invalid_request("Current video not found in playlist")
        })?;
        self.start_download(&current.download_url(), options, DownloadMode::OneShot)
    }

    /// Kill the in-flight download, if any. Works in both download modes.
    pub fn cancel(&self) -> bool {
        if !self.is_downloading() {
            return false;
        }
        self.cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .cancel();
        true
    }

    fn launch(
        &self,
        command: &Command,
        mode: DownloadMode,
    ) -> Result<JoinHandle<()>, OperationError> {
        let guard = SlotGuard::acquire(&self.slot).ok_or_else(|| {
            tracing::info!(command = %command.kind(), "Rejecting download while another is running");
            OperationError::ConcurrencyRejected
        })?;
        let invocation = self.encoder.encode(command)?;

        let cancel = CancellationToken::new();
        *self.cancel.lock().unwrap_or_else(PoisonError::into_inner) = cancel.clone();

        let backend = Arc::clone(&self.backend);
        let events = self.events.clone();
        let timeouts = self.timeouts;
        tracing::info!(command = %invocation.kind, ?mode, "Starting download");

        Ok(tokio::spawn(async move {
            let result = match mode {
                DownloadMode::Streaming => {
                    run_streamed(backend.as_ref(), &invocation, cancel, timeouts.stall, &events)
                        .await
                }
                DownloadMode::OneShot => {
                    run_one_shot(
                        backend.as_ref(),
                        &invocation,
                        timeouts.download,
                        cancel,
                        &events,
                    )
                    .await
                }
            }
            .and_then(into_done);

            if let Err(e) = &result {
                tracing::warn!(error = %e, "Download did not complete");
            }
            // Free the slot first so the UI can start another download as
            // soon as it sees the event.
            drop(guard);
            post(&events, UiEvent::DownloadFinished(result));
        }))
    }
}

fn checked_url(url: &str) -> Result<String, OperationError> {
    let url = url.trim();
    if url.is_empty() {
        return Err(OperationError::invalid_request("Please enter a URL"));
    }
    if !is_youtube_url(url) {
        tracing::warn!(url, "URL does not look like a YouTube link, sending anyway");
    }
    Ok(url.to_string())
}

fn into_done(completion: Completion) -> Result<DownloadDone, OperationError> {
    match completion {
        Completion::Done { message, summary } => Ok(DownloadDone { message, summary }),
        Completion::Media(_) => Err(OperationError::fault(
            "Backend sent media information instead of a result",
        )),
    }
}

fn post(events: &mpsc::UnboundedSender<UiEvent>, event: UiEvent) {
    if events.send(event).is_err() {
        tracing::debug!("UI event receiver dropped");
    }
}

fn forward(events: &mpsc::UnboundedSender<UiEvent>, item: StreamItem) {
    match item {
        StreamItem::Progress(progress) => post(events, UiEvent::Progress(progress)),
        StreamItem::Diagnostic(text) => post(events, UiEvent::Diagnostic(text)),
        StreamItem::Media(_) | StreamItem::Outcome(_) => {}
    }
}

async fn run_one_shot(
    backend: &dyn BackendPort,
    invocation: &Invocation,
    timeout: Duration,
    cancel: CancellationToken,
    events: &mpsc::UnboundedSender<UiEvent>,
) -> Result<Completion, OperationError> {
    let output = backend.run_once(invocation, timeout, cancel).await?;
    let (decoder, items) = decode_buffered(&output.stdout);
    for item in items {
        if let StreamItem::Diagnostic(_) = item {
            forward(events, item);
        }
    }
    resolve_outcome(invocation.kind, &decoder, &output.exit)
}

async fn run_streamed(
    backend: &dyn BackendPort,
    invocation: &Invocation,
    cancel: CancellationToken,
    stall: Option<Duration>,
    events: &mpsc::UnboundedSender<UiEvent>,
) -> Result<Completion, OperationError> {
    let (lines_tx, mut lines_rx) = mpsc::channel::<String>(LINE_BUFFER);
    let mut decoder = LineDecoder::new();

    let run = backend.run_streaming(invocation, lines_tx, cancel, stall);
    let read = async {
        while let Some(line) = lines_rx.recv().await {
            if let Some(item) = decoder.feed(&line) {
                forward(events, item);
            }
        }
    };
    let (exit, ()) = tokio::join!(run, read);

    resolve_outcome(invocation.kind, &decoder, &exit?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::ProcessExit;
    use crate::runner::{MockBackendPort, ProcessOutput};
    use kartoshka_core::{CommandKind, OutputFormat, Quality, VideoDescriptor};

    const URL: &str = "https://www.youtube.com/watch?v=abc";
    const SUCCESS: &str = r#"{"success":true,"message":"Download completed successfully"}"#;

    fn controller(backend: MockBackendPort) -> (Controller, mpsc::UnboundedReceiver<UiEvent>) {
        Controller::new(
            Arc::new(backend),
            CommandEncoder::new("kartoshka-backend"),
            Timeouts::default(),
        )
    }

    fn options() -> DownloadOptions {
        DownloadOptions::new(Quality::Best, OutputFormat::Mp4, "/tmp/kartoshka-test")
    }

    fn exit_ok() -> ProcessExit {
        ProcessExit {
            code: Some(0),
            stderr: String::new(),
        }
    }

    async fn next_finished(
        events: &mut mpsc::UnboundedReceiver<UiEvent>,
    ) -> Result<DownloadDone, OperationError> {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                match events.recv().await {
                    Some(UiEvent::DownloadFinished(result)) => return result,
                    Some(_) => {}
                    None => panic!("event channel closed"),
                }
            }
        })
        .await
        .expect("no DownloadFinished event")
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_second_download_rejected_without_spawning() {
        let (release_tx, release_rx) = std::sync::mpsc::channel::<()>();
        let release_rx = Mutex::new(release_rx);

        let mut backend = MockBackendPort::new();
        backend
            .expect_run_streaming()
            .times(1)
            .returning(move |_, lines, _, _| {
                let _ = release_rx.lock().unwrap().recv();
                let _ = lines.try_send(SUCCESS.to_string());
                Ok(exit_ok())
            });
        // Metadata lookups are not blocked by the running download.
        backend
            .expect_run_once()
            .times(1)
            .withf(|invocation, _, _| invocation.kind == CommandKind::Info)
            .returning(|_, _, _| {
                Ok(ProcessOutput {
                    stdout: r#"{"id":"x","title":"Other"}"#.to_string(),
                    exit: exit_ok(),
                })
            });
        let (controller, mut events) = controller(backend);

        let first = controller
            .start_download(URL, options(), DownloadMode::Streaming)
            .unwrap();
        assert!(controller.is_downloading());

        let second = controller.start_download(URL, options(), DownloadMode::OneShot);
        assert_eq!(second.unwrap_err(), OperationError::ConcurrencyRejected);
        let playlist = controller.start_playlist_download(
            URL,
            options(),
            PlaylistSelection::new(vec![VideoDescriptor::new("a", "A")]),
        );
        assert_eq!(playlist.unwrap_err(), OperationError::ConcurrencyRejected);

        controller.request_info(URL).unwrap().await.unwrap();
        assert!(matches!(events.recv().await, Some(UiEvent::InfoLoaded(_))));

        release_tx.send(()).unwrap();
        first.await.unwrap();
        let done = next_finished(&mut events).await.unwrap();
        assert_eq!(done.message, "Download completed successfully");
        assert!(!controller.is_downloading());
    }

    #[tokio::test]
    async fn test_slot_is_free_when_finished_event_arrives() {
        let mut backend = MockBackendPort::new();
        backend
            .expect_run_once()
            .times(2)
            .returning(|invocation, timeout, _| {
                Err(OperationError::timeout(invocation.describe(), timeout.as_secs()))
            });
        let (controller, mut events) = controller(backend);

        controller
            .start_download(URL, options(), DownloadMode::OneShot)
            .unwrap();
        let result = next_finished(&mut events).await;
        assert!(result.unwrap_err().is_timeout());
        assert!(!controller.is_downloading());

        controller
            .start_download(URL, options(), DownloadMode::OneShot)
            .unwrap()
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_one_shot_download_uses_download_timeout() {
        let mut backend = MockBackendPort::new();
        backend
            .expect_run_once()
            .times(1)
            .withf(|invocation, timeout, _| {
                invocation.kind == CommandKind::Download
                    && *timeout == Duration::from_secs(300)
                    && invocation
                        .args
                        .contains(&"https://www.youtube.com/watch?v=b2".to_string())
            })
            .returning(|_, _, _| {
                Ok(ProcessOutput {
                    stdout: format!("[download] 100%\n{SUCCESS}\n"),
                    exit: exit_ok(),
                })
            });
        let (controller, mut events) = controller(backend);
        let playlist = PlaylistDescriptor {
            videos: vec![VideoDescriptor::new("a1", "A"), VideoDescriptor::new("b2", "B")],
            is_from_single_video: true,
            current_video_id: Some("b2".to_string()),
            ..PlaylistDescriptor::default()
        };

        controller
            .download_current_video(&playlist, options())
            .unwrap()
            .await
            .unwrap();

        assert_eq!(
            events.recv().await,
            Some(UiEvent::Diagnostic("[download] 100%".to_string()))
        );
        assert!(next_finished(&mut events).await.is_ok());
    }

    #[tokio::test]
    async fn test_invalid_requests_spawn_nothing() {
        let mut backend = MockBackendPort::new();
        backend.expect_run_once().never();
        backend.expect_run_streaming().never();
        let (controller, _events) = controller(backend);

        let empty = controller.start_playlist_download(
            URL,
            options(),
            PlaylistSelection::default(),
        );
        assert!(matches!(empty, Err(OperationError::InvalidRequest { .. })));

        let no_current = controller.download_current_video(&PlaylistDescriptor::default(), options());
        assert!(matches!(no_current, Err(OperationError::InvalidRequest { .. })));

        assert!(controller.request_info("   ").is_err());
        assert!(!controller.is_downloading());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_cancel_kills_streaming_download() {
        let mut backend = MockBackendPort::new();
        backend
            .expect_run_streaming()
            .times(1)
            .returning(|_, _, cancel, _| {
                while !cancel.is_cancelled() {
                    std::thread::sleep(Duration::from_millis(5));
                }
                Err(OperationError::fault("Download cancelled"))
            });
        let (controller, mut events) = controller(backend);

        assert!(!controller.cancel());
        controller
            .start_download(URL, options(), DownloadMode::Streaming)
            .unwrap();
        assert!(controller.cancel());

        let result = next_finished(&mut events).await;
        assert!(matches!(result, Err(OperationError::ProcessFault { .. })));
        assert!(!controller.is_downloading());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_cancel_kills_one_shot_download() {
        let mut backend = MockBackendPort::new();
        backend
            .expect_run_once()
            .times(1)
            .returning(|_, _, cancel| {
                let started = std::time::Instant::now();
                while started.elapsed() < Duration::from_millis(800) {
                    if cancel.is_cancelled() {
                        return Err(OperationError::fault("Download cancelled"));
                    }
                    std::thread::sleep(Duration::from_millis(5));
                }
                Ok(ProcessOutput {
                    stdout: SUCCESS.to_string(),
                    exit: exit_ok(),
                })
            });
        let (controller, mut events) = controller(backend);

        let started = std::time::Instant::now();
        controller
            .start_download(URL, options(), DownloadMode::OneShot)
            .unwrap();
        assert!(controller.cancel());

        let result = next_finished(&mut events).await;
        assert!(matches!(result, Err(OperationError::ProcessFault { .. })), "{result:?}");
        assert!(started.elapsed() < Duration::from_millis(800));
        assert!(!controller.is_downloading());
    }

    #[tokio::test]
    async fn test_streamed_progress_is_forwarded_in_order() {
        let mut backend = MockBackendPort::new();
        backend
            .expect_run_streaming()
            .times(1)
            .returning(|_, lines, _, _| {
                for line in [
                    r#"{"type":"progress","percent":10,"speed":1048576,"eta":9}"#,
                    "[youtube] abc: Downloading webpage",
                    r#"{"type":"progress","percent":4,"speed":0,"eta":0}"#,
                    r#"{"success":true,"message":"Downloaded 2 of 2 videos","total":2,"succeeded":2,"failed":0}"#,
                ] {
                    let _ = lines.try_send(line.to_string());
                }
                Ok(exit_ok())
            });
        let (controller, mut events) = controller(backend);

        controller
            .start_playlist_download(
                "https://www.youtube.com/playlist?list=PL1",
                options(),
                PlaylistSelection::new(vec![VideoDescriptor::new("a", "A")]),
            )
            .unwrap()
            .await
            .unwrap();

        let mut percents = Vec::new();
        let mut diagnostics = Vec::new();
        let finished = loop {
            match events.recv().await {
                Some(UiEvent::Progress(p)) => percents.push(p.percent),
                Some(UiEvent::Diagnostic(d)) => diagnostics.push(d),
                Some(UiEvent::DownloadFinished(r)) => break r,
                other => panic!("unexpected event {other:?}"),
            }
        };

        assert_eq!(percents, vec![10.0, 10.0]);
        assert_eq!(diagnostics, vec!["[youtube] abc: Downloading webpage"]);
        assert_eq!(finished.unwrap().summary.map(|s| s.succeeded), Some(2));
    }
}

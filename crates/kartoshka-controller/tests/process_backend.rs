//! `ProcessBackend` and `Controller` against fake dispatcher scripts.

#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use kartoshka_controller::{
    BackendPort, CommandEncoder, Completion, Controller, DownloadMode, Invocation, ProcessBackend,
    Timeouts, UiEvent, decode_buffered, resolve_outcome,
};
use kartoshka_core::{CommandKind, DownloadOptions, MediaInfo, OperationError, OutputFormat, Quality};
use tempfile::TempDir;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

// ============================================================================
// Helpers
// ============================================================================

fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Run a script through `/bin/sh` so a freshly written file is never
/// executed directly.
fn sh(script: &Path, kind: CommandKind) -> Invocation {
    Invocation {
        program: PathBuf::from("/bin/sh"),
        args: vec![script.to_string_lossy().into_owned()],
        kind,
    }
}

async fn one_shot(invocation: &Invocation) -> Result<Completion, OperationError> {
    let output = ProcessBackend::new()
        .run_once(invocation, Duration::from_secs(10), CancellationToken::new())
        .await?;
    let (decoder, _) = decode_buffered(&output.stdout);
    resolve_outcome(invocation.kind, &decoder, &output.exit)
}

// ============================================================================
// run_once
// ============================================================================

#[tokio::test]
async fn run_once_info_success() {
    let temp = TempDir::new().unwrap();
    let script = write_script(
        temp.path(),
        "info.sh",
        r#"echo '{"id":"abc","title":"Song","duration":212,"formats":[{"resolution":"1280x720"}]}'"#,
    );

    let completion = one_shot(&sh(&script, CommandKind::Info)).await.unwrap();

    let Completion::Media(MediaInfo::Video(video)) = completion else {
        panic!("expected a video");
    };
    assert_eq!(video.duration, 212);
}

#[tokio::test]
async fn run_once_failure_body_maps_to_resolution_failure() {
    let temp = TempDir::new().unwrap();
    let script = write_script(
        temp.path(),
        "fail.sh",
        "echo 'some log line'\necho '{\"error\":\"Video unavailable\"}'\nexit 1",
    );

    let err = one_shot(&sh(&script, CommandKind::Info)).await.unwrap_err();
    assert_eq!(err, OperationError::resolution("Video unavailable"));
}

#[tokio::test]
async fn run_once_crash_without_record_is_fault_from_stderr() {
    let temp = TempDir::new().unwrap();
    let script = write_script(temp.path(), "crash.sh", "echo 'thread main panicked' >&2\nexit 101");

    let err = one_shot(&sh(&script, CommandKind::Download)).await.unwrap_err();
    assert_eq!(err, OperationError::fault("thread main panicked"));
}

#[tokio::test]
async fn run_once_timeout_is_distinct() {
    let temp = TempDir::new().unwrap();
    let script = write_script(temp.path(), "slow.sh", "sleep 5");

    let err = ProcessBackend::new()
        .run_once(
            &sh(&script, CommandKind::Info),
            Duration::from_millis(200),
            CancellationToken::new(),
        )
        .await
        .unwrap_err();
    assert!(err.is_timeout(), "{err:?}");
}

#[tokio::test]
async fn run_once_cancel_kills_process() {
    let temp = TempDir::new().unwrap();
    let script = write_script(temp.path(), "slow.sh", "sleep 5");
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let started = std::time::Instant::now();
    let err = ProcessBackend::new()
        .run_once(&sh(&script, CommandKind::Download), Duration::from_secs(10), cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, OperationError::ProcessFault { .. }), "{err:?}");
    assert!(started.elapsed() < Duration::from_secs(4));
}

#[tokio::test]
async fn missing_backend_is_reported() {
    let invocation = Invocation {
        program: PathBuf::from("/nonexistent/kartoshka-backend"),
        args: Vec::new(),
        kind: CommandKind::Info,
    };

    let err = ProcessBackend::new()
        .run_once(&invocation, Duration::from_secs(1), CancellationToken::new())
        .await
        .unwrap_err();
    assert!(err.user_message().contains("Backend application not found"));
}

// ============================================================================
// run_streaming
// ============================================================================

#[tokio::test]
async fn run_streaming_forwards_lines_in_order() {
    let temp = TempDir::new().unwrap();
    let script = write_script(
        temp.path(),
        "stream.sh",
        "echo '{\"type\":\"progress\",\"percent\":50,\"speed\":0,\"eta\":0}'\n\
         printf 'caf\\351\\n'\n\
         echo '{\"success\":true,\"message\":\"ok\"}'",
    );
    let (tx, mut rx) = mpsc::channel(16);

    let exit = ProcessBackend::new()
        .run_streaming(
            &sh(&script, CommandKind::Download),
            tx,
            CancellationToken::new(),
            Some(Duration::from_secs(5)),
        )
        .await
        .unwrap();

    let mut lines = Vec::new();
    while let Some(line) = rx.recv().await {
        lines.push(line);
    }
    assert!(exit.success());
    assert_eq!(lines.len(), 3);
    assert!(lines[0].contains("progress"));
    assert!(lines[1].starts_with("caf"));
    assert!(lines[2].contains("success"));
}

#[tokio::test]
async fn run_streaming_stall_kills_process() {
    let temp = TempDir::new().unwrap();
    let script = write_script(temp.path(), "stall.sh", "echo 'started'\nsleep 5");
    let (tx, _rx) = mpsc::channel(16);

    let err = ProcessBackend::new()
        .run_streaming(
            &sh(&script, CommandKind::Download),
            tx,
            CancellationToken::new(),
            Some(Duration::from_millis(300)),
        )
        .await
        .unwrap_err();
    assert!(err.is_timeout(), "{err:?}");
}

#[tokio::test]
async fn run_streaming_cancel_is_fault() {
    let temp = TempDir::new().unwrap();
    let script = write_script(temp.path(), "forever.sh", "sleep 5");
    let (tx, _rx) = mpsc::channel(16);
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let err = ProcessBackend::new()
        .run_streaming(&sh(&script, CommandKind::Download), tx, cancel, None)
        .await
        .unwrap_err();
    assert!(matches!(err, OperationError::ProcessFault { .. }));
}

// ============================================================================
// Controller end to end
// ============================================================================

#[tokio::test]
async fn controller_streams_download_through_real_process() {
    let temp = TempDir::new().unwrap();
    let backend = write_script(
        temp.path(),
        "kartoshka-backend",
        "echo '{\"type\":\"progress\",\"percent\":30,\"speed\":0,\"eta\":0}'\n\
         echo '{\"type\":\"progress\",\"percent\":20,\"speed\":0,\"eta\":0}'\n\
         echo '{\"success\":true,\"message\":\"Download completed successfully\"}'",
    );
    // Let the write settle before the file is executed.
    tokio::time::sleep(Duration::from_millis(20)).await;

    let (controller, mut events) = Controller::new(
        Arc::new(ProcessBackend::new()),
        CommandEncoder::new(&backend),
        Timeouts::default(),
    );
    let options = DownloadOptions::new(Quality::Best, OutputFormat::Mp3, temp.path());

    controller
        .start_download("https://youtu.be/abc", options, DownloadMode::Streaming)
        .unwrap();

    let mut percents = Vec::new();
    let finished = tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            match events.recv().await {
                Some(UiEvent::Progress(p)) => percents.push(p.percent),
                Some(UiEvent::DownloadFinished(result)) => break result,
                Some(_) => {}
                None => panic!("event channel closed"),
            }
        }
    })
    .await
    .unwrap();

    assert_eq!(finished.unwrap().message, "Download completed successfully");
    assert_eq!(percents, vec![30.0, 30.0]);
    assert!(!controller.is_downloading());
}

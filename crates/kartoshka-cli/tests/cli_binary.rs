//! The `kartoshka` binary against a fake backend script.

#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::thread;
use std::time::Duration;

use tempfile::TempDir;

const KARTOSHKA: &str = env!("CARGO_BIN_EXE_kartoshka");

fn fake_backend(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("kartoshka-backend");
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn run(backend: &Path, download_dir: &Path, args: &[&str]) -> Output {
    for _ in 0..5 {
        let output = Command::new(KARTOSHKA)
            .arg("--backend")
            .arg(backend)
            .arg("--dir")
            .arg(download_dir)
            .args(args)
            .env_remove("RUST_LOG")
            .env_remove("KARTOSHKA_QUALITY")
            .env_remove("KARTOSHKA_FORMAT")
            .output()
            .unwrap();
        // A freshly written script may still be busy for another forked test.
        if !String::from_utf8_lossy(&output.stderr).contains("Text file busy") {
            return output;
        }
        thread::sleep(Duration::from_millis(50));
    }
    panic!("backend script stayed busy");
}

#[test]
fn info_prints_formatted_duration() {
    let temp = TempDir::new().unwrap();
    let backend = fake_backend(
        temp.path(),
        r#"echo '{"id":"abc","title":"Song","uploader":"Artist","duration":212,"view_count":1500,"formats":[{"resolution":"1280x720"},{"resolution":"audio only"}]}'"#,
    );

    let output = run(&backend, temp.path(), &["info", "https://youtu.be/abc"]);

    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Title:     Song"), "{stdout}");
    assert!(stdout.contains("Duration:  3:32"));
    assert!(stdout.contains("Views:     1,500"));
    assert!(stdout.contains("Qualities: 1280x720\n"));
}

#[test]
fn info_failure_prints_error_and_exits_nonzero() {
    let temp = TempDir::new().unwrap();
    let backend = fake_backend(
        temp.path(),
        "echo '{\"success\":false,\"error\":\"This video is private.\",\"kind\":\"resolution\"}'\nexit 1",
    );

    let output = run(&backend, temp.path(), &["info", "https://youtu.be/abc"]);

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Could not load video: This video is private."), "{stderr}");
}

#[test]
fn download_prints_success_message() {
    let temp = TempDir::new().unwrap();
    let backend = fake_backend(
        temp.path(),
        "echo '{\"type\":\"progress\",\"percent\":50,\"speed\":0,\"eta\":0}'\n\
         echo '{\"success\":true,\"message\":\"Download completed successfully\"}'",
    );

    let output = run(
        &backend,
        temp.path(),
        &["download", "https://youtu.be/abc", "-f", "mp3"],
    );

    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Download completed successfully"), "{stdout}");
}

#[test]
fn bad_format_is_argument_error() {
    let temp = TempDir::new().unwrap();
    let backend = fake_backend(temp.path(), "exit 0");

    let output = run(
        &backend,
        temp.path(),
        &["download", "https://youtu.be/abc", "-f", "avi"],
    );

    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn missing_backend_is_config_error() {
    let temp = TempDir::new().unwrap();
    let missing = temp.path().join("nope");

    let output = run(&missing, temp.path(), &["info", "https://youtu.be/abc"]);

    assert_eq!(output.status.code(), Some(78));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Backend application not found"));
}

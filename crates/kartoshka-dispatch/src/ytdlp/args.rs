//! Argument vectors for yt-dlp.

use std::path::Path;

use kartoshka_core::{OutputFormat, Quality};

use crate::source::DownloadRequest;

/// Marker yt-dlp prefixes to every progress line we ask it for.
pub const PROGRESS_MARKER: &str = "kartoshka-progress:";

/// Fields are `downloaded|total|total_estimate|speed|eta`, `NA` when unknown.
pub const PROGRESS_TEMPLATE: &str = "download:kartoshka-progress:%(progress.downloaded_bytes)s|%(progress.total_bytes)s|%(progress.total_bytes_estimate)s|%(progress.speed)s|%(progress.eta)s";

pub const OUTPUT_TEMPLATE: &str = "%(title)s.%(ext)s";

const BEST_MP4: &str = "bestvideo[ext=mp4]+bestaudio[ext=m4a]/bestvideo+bestaudio/best";
const WORST: &str = "worstvideo+worstaudio/worst";
const BEST_AUDIO: &str = "bestaudio/best";

/// Arguments for a metadata lookup.
pub fn info_args(url: &str) -> Vec<String> {
    vec![
        "--dump-single-json".to_string(),
        "--flat-playlist".to_string(),
        "--no-warnings".to_string(),
        "--".to_string(),
        url.to_string(),
    ]
}

/// yt-dlp `-f` selector for a quality/format pair.
pub fn format_selector(quality: &Quality, format: OutputFormat) -> String {
    if format.is_audio() {
        return BEST_AUDIO.to_string();
    }
    match quality {
        Quality::Best => BEST_MP4.to_string(),
        Quality::Worst => WORST.to_string(),
        Quality::Resolution(_) => quality.height().map_or_else(
            || BEST_MP4.to_string(),
            |h| format!("bestvideo[height<={h}]+bestaudio/best[height<={h}]"),
        ),
    }
}

/// Arguments for a single-video transfer.
pub fn download_args(request: &DownloadRequest, ffmpeg_location: Option<&Path>) -> Vec<String> {
    let mut args = vec![
        "-f".to_string(),
        format_selector(&request.quality, request.format),
    ];

    match request.format {
        OutputFormat::Mp3 => args.extend(
            ["-x", "--audio-format", "mp3", "--audio-quality", "0"].map(String::from),
        ),
        OutputFormat::Mp4 => args.extend(["--merge-output-format", "mp4"].map(String::from)),
    }

    if let Some(ffmpeg) = ffmpeg_location {
        args.push("--ffmpeg-location".to_string());
        args.push(ffmpeg.to_string_lossy().into_owned());
    }

    let output = request.destination.join(OUTPUT_TEMPLATE);
    args.extend([
        "-o".to_string(),
        output.to_string_lossy().into_owned(),
        "--no-playlist".to_string(),
        "--newline".to_string(),
        "--progress-template".to_string(),
        PROGRESS_TEMPLATE.to_string(),
        "--".to_string(),
        request.url.clone(),
    ]);
    args
}

//! Parsing yt-dlp output: metadata JSON, progress lines and error text.

use kartoshka_core::youtube::{extract_video_id, is_video_in_playlist};
use kartoshka_core::{
    AUDIO_ONLY, FormatDescriptor, MediaInfo, PlaylistDescriptor, ProgressEvent, VideoDescriptor,
};
use serde::Deserialize;

use super::args::PROGRESS_MARKER;
use crate::source::SourceError;

/// Longest stderr excerpt used as an error message.
const MAX_ERROR_CHARS: usize = 300;

// ============================================================================
// Metadata
// ============================================================================

#[derive(Deserialize, Default)]
#[serde(default)]
struct RawInfo {
    #[serde(rename = "_type")]
    kind: Option<String>,
    id: Option<String>,
    title: Option<String>,
    uploader: Option<String>,
    channel: Option<String>,
    duration: Option<f64>,
    view_count: Option<f64>,
    webpage_url: Option<String>,
    url: Option<String>,
    playlist_count: Option<u64>,
    formats: Option<Vec<RawFormat>>,
    entries: Option<Vec<Option<RawInfo>>>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct RawFormat {
    format_id: Option<String>,
    ext: Option<String>,
    resolution: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    vcodec: Option<String>,
    filesize: Option<f64>,
    filesize_approx: Option<f64>,
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn whole(value: Option<f64>) -> u64 {
    value
        .filter(|v| v.is_finite() && *v > 0.0)
        .map_or(0, |v| v as u64)
}

impl RawFormat {
    fn into_descriptor(self) -> FormatDescriptor {
        let audio_only = self.vcodec.as_deref() == Some("none");
        let resolution = if audio_only {
            AUDIO_ONLY.to_string()
        } else {
            match (self.resolution, self.width, self.height) {
                (Some(label), _, _) if !label.is_empty() => label,
                (_, Some(w), Some(h)) => format!("{w}x{h}"),
                (_, None, Some(h)) => format!("{h}p"),
                _ => String::new(),
            }
        };
        let size = whole(self.filesize.or(self.filesize_approx));

        FormatDescriptor {
            resolution,
            format_id: self.format_id,
            ext: self.ext,
            height: if audio_only { None } else { self.height },
            filesize: (size > 0).then_some(size),
        }
    }
}

impl RawInfo {
    fn uploader(&mut self) -> String {
        self.uploader
            .take()
            .or_else(|| self.channel.take())
            .unwrap_or_default()
    }

    fn into_video(mut self, fallback_url: Option<&str>) -> VideoDescriptor {
        let uploader = self.uploader();
        let url = self
            .webpage_url
            .or(self.url)
            .or_else(|| fallback_url.map(str::to_string))
            .unwrap_or_default();

        VideoDescriptor {
            id: self.id.unwrap_or_default(),
            title: self.title.unwrap_or_default(),
            url,
            uploader,
            duration: whole(self.duration),
            view_count: whole(self.view_count),
            formats: self
                .formats
                .unwrap_or_default()
                .into_iter()
                .map(RawFormat::into_descriptor)
                .collect(),
            selected: true,
        }
    }
}

/// Convert `--dump-single-json --flat-playlist` output into media info.
pub fn parse_info(url: &str, json: &str) -> Result<MediaInfo, SourceError> {
    let mut raw: RawInfo = serde_json::from_str(json).map_err(|e| {
        SourceError::Resolution(format!("Could not read metadata from yt-dlp: {e}"))
    })?;

    if raw.kind.as_deref() != Some("playlist") {
        return Ok(MediaInfo::Video(raw.into_video(Some(url))));
    }

    let uploader = raw.uploader();
    let videos: Vec<VideoDescriptor> = raw
        .entries
        .take()
        .unwrap_or_default()
        .into_iter()
        .flatten()
        .map(|entry| {
            let mut video = entry.into_video(None);
            if video.url.is_empty() {
                video.url = video.download_url();
            }
            video
        })
        .collect();

    let from_single_video = is_video_in_playlist(url);
    let current_video_id = if from_single_video {
        extract_video_id(url).map(str::to_string)
    } else {
        None
    };

    Ok(MediaInfo::Playlist(PlaylistDescriptor {
        title: raw.title.unwrap_or_default(),
        uploader,
        playlist_count: raw.playlist_count.unwrap_or(videos.len() as u64),
        videos,
        is_from_single_video: from_single_video,
        current_video_id,
    }))
}

// ============================================================================
// Progress
// ============================================================================

pub fn is_progress_line(line: &str) -> bool {
    line.trim_start().starts_with(PROGRESS_MARKER)
}

fn field(raw: Option<&str>) -> Option<f64> {
    raw.map(str::trim)
        .filter(|v| !v.is_empty() && *v != "NA" && *v != "None")
        .and_then(|v| v.parse::<f64>().ok())
        .filter(|v| v.is_finite() && *v >= 0.0)
}

/// Parse one templated progress line.
///
/// Returns `None` for lines without a usable total, which yt-dlp emits
/// before it knows the stream size.
pub fn parse_progress_line(line: &str) -> Option<ProgressEvent> {
    let payload = line.trim().strip_prefix(PROGRESS_MARKER)?;
    let mut parts = payload.split('|');
    let downloaded = field(parts.next()).unwrap_or(0.0);
    let total = field(parts.next());
    let estimate = field(parts.next());
    let speed = field(parts.next()).unwrap_or(0.0);
    let eta = field(parts.next()).unwrap_or(0.0);

    let total = total.or(estimate).filter(|t| *t > 0.0)?;
    let bytes = |v: f64| whole(Some(v));
    ProgressEvent::from_bytes(bytes(downloaded), bytes(total), speed, bytes(eta))
}

// ============================================================================
// Errors
// ============================================================================

const RESOLUTION_PATTERNS: &[(&str, &str)] = &[
    ("private video", "This video is private."),
    ("sign in to confirm your age", "Video is age-restricted and requires login."),
    ("sign in to confirm", "Video requires login."),
    ("login required", "Video requires login."),
    ("members-only", "Video is available to channel members only."),
    ("copyright", "Video blocked due to copyright."),
    ("not available in your country", "Video restricted in your region."),
    ("geo restriction", "Video restricted in your region."),
    ("unsupported url", "Unsupported URL. Check that the link is correct."),
    ("is not a valid url", "Not a valid URL."),
    ("http error 404", "Video not found (404)."),
    ("http error 403", "Access denied (403). The video may be private or region-restricted."),
    ("video unavailable", "Video unavailable or removed."),
    ("no video formats", "No video formats found for this link."),
    ("requested format is not available", "Requested quality is not available for this video."),
];

const TRANSFER_PATTERNS: &[(&str, &str)] = &[
    ("http error 429", "Server returned error 429 (too many requests). Try again later."),
    ("timed out", "Connection timed out. Check your internet and try again."),
    ("connection reset", "Connection was reset. Try again."),
    ("unable to download webpage", "Failed to access the page. Check the link and your connection."),
    ("getaddrinfo failed", "Network error. Check your internet connection."),
    ("name or service not known", "Network error. Check your internet connection."),
    ("ffprobe and ffmpeg not found", "FFmpeg not found. Install FFmpeg to convert this format."),
    ("ffmpeg not found", "FFmpeg not found. Install FFmpeg to convert this format."),
    ("no space left on device", "Not enough disk space."),
    ("permission denied", "Cannot write to the destination folder."),
];

/// Turn yt-dlp stderr into a classified, readable error.
///
/// Known phrases map to fixed messages. Otherwise the last `ERROR:` line (or
/// a trimmed excerpt of stderr) is passed to `fallback`.
pub fn translate_error(stderr: &str, fallback: fn(String) -> SourceError) -> SourceError {
    let lower = stderr.to_lowercase();

    if let Some((_, message)) = RESOLUTION_PATTERNS.iter().find(|(p, _)| lower.contains(p)) {
        return SourceError::Resolution((*message).to_string());
    }
    if let Some((_, message)) = TRANSFER_PATTERNS.iter().find(|(p, _)| lower.contains(p)) {
        return SourceError::Transfer((*message).to_string());
    }

    let last_error_line = stderr
        .lines()
        .rev()
        .map(str::trim)
        .find(|l| l.to_lowercase().starts_with("error:"))
        .map(|l| l.get("error:".len()..).unwrap_or_default().trim());

    let message = match last_error_line {
        Some(line) if !line.is_empty() => line.to_string(),
        _ => {
            let trimmed = stderr.trim();
            if trimmed.is_empty() {
                "yt-dlp failed without an error message".to_string()
            } else {
                trimmed.chars().take(MAX_ERROR_CHARS).collect()
            }
        }
    };

    fallback(message)
}

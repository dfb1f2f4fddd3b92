//! Terminal output: media summaries and the download progress bar.

use std::fmt::Write as _;

use indicatif::{ProgressBar, ProgressStyle};
use kartoshka_core::display::{
    MAX_TITLE_CHARS, format_duration, format_eta, format_speed, format_views, sorted_resolutions,
    truncate_title,
};
use kartoshka_core::{MediaInfo, PlaylistDescriptor, ProgressEvent, VideoDescriptor};

// ============================================================================
// Summaries
// ============================================================================

pub fn video_summary(video: &VideoDescriptor) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Title:     {}",
        truncate_title(video.display_title(), MAX_TITLE_CHARS)
    );
    let _ = writeln!(out, "Duration:  {}", format_duration(video.duration));
    let _ = writeln!(out, "Uploader:  {}", or_unknown(&video.uploader));
    let _ = writeln!(out, "Views:     {}", format_views(video.view_count));

    let qualities = sorted_resolutions(&video.formats);
    if !qualities.is_empty() {
        let _ = writeln!(out, "Qualities: {}", qualities.join(", "));
    }
    out
}

pub fn playlist_summary(playlist: &PlaylistDescriptor) -> String {
    let mut out = String::new();
    let banner = if playlist.is_from_single_video {
        "[VIDEO FROM PLAYLIST DETECTED]"
    } else {
        "[PLAYLIST DETECTED]"
    };
    let _ = writeln!(out, "{banner}");
    let _ = writeln!(
        out,
        "Playlist:  {}",
        truncate_title(&playlist.title, MAX_TITLE_CHARS)
    );
    let _ = writeln!(out, "Uploader:  {}", or_unknown(&playlist.uploader));
    let _ = writeln!(out, "Videos:    {}", playlist.videos.len());
    let _ = writeln!(out);

    let current = playlist.current_video_id.as_deref();
    for (i, video) in playlist.videos.iter().enumerate() {
        let marker = if current == Some(video.id.as_str()) { '>' } else { ' ' };
        let _ = write!(
            out,
            "{marker}{:>4}. {} ({})",
            i + 1,
            truncate_title(video.display_title(), MAX_TITLE_CHARS),
            format_duration(video.duration)
        );
        if !video.uploader.is_empty() {
            let _ = write!(out, " - {}", video.uploader);
        }
        let _ = writeln!(out);
    }
    out
}

pub fn media_summary(info: &MediaInfo) -> String {
    match info {
        MediaInfo::Video(video) => video_summary(video),
        MediaInfo::Playlist(playlist) => playlist_summary(playlist),
    }
}

fn or_unknown(value: &str) -> &str {
    if value.trim().is_empty() {
        "Unknown"
    } else {
        value
    }
}

// ============================================================================
// Progress
// ============================================================================

/// Percent-based progress bar on stderr.
pub struct ProgressRenderer {
    bar: ProgressBar,
}

impl ProgressRenderer {
    pub fn new(message: &str) -> Self {
        let bar = ProgressBar::new(100);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos:>3}% {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▓░"),
        );
        bar.set_message(message.to_string());
        Self { bar }
    }

    /// Spinner for work without a percentage.
    pub fn spinner(message: &str) -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_message(message.to_string());
        bar.enable_steady_tick(std::time::Duration::from_millis(120));
        Self { bar }
    }

    pub fn update(&self, progress: &ProgressEvent) {
        self.bar.set_position(percent_position(progress.percent));
        self.bar.set_message(progress_suffix(progress));
    }

    /// Print a line above the bar.
    pub fn println(&self, line: &str) {
        self.bar.println(line);
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn percent_position(percent: f64) -> u64 {
    percent.clamp(0.0, 100.0).round() as u64
}

fn progress_suffix(progress: &ProgressEvent) -> String {
    [format_speed(progress.speed), format_eta(progress.eta)]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("  ")
}

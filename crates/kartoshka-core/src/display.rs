//! Formatting helpers for presenting media metadata and progress.

use crate::domain::FormatDescriptor;

/// Maximum title length shown before truncation.
pub const MAX_TITLE_CHARS: usize = 80;

const UNKNOWN: &str = "Unknown";

/// `212` -> `"3:32"`, `3725` -> `"62:05"`, `0` -> `"Unknown"`.
pub fn format_duration(seconds: u64) -> String {
    if seconds == 0 {
        return UNKNOWN.to_string();
    }
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

/// `1234567` -> `"1,234,567"`, `0` -> `"Unknown"`.
pub fn format_views(views: u64) -> String {
    if views == 0 {
        return UNKNOWN.to_string();
    }
    let digits = views.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Cut a title to `max` characters, appending `...` when shortened.
pub fn truncate_title(title: &str, max: usize) -> String {
    if title.is_empty() {
        return UNKNOWN.to_string();
    }
    if title.chars().count() <= max {
        return title.to_string();
    }
    let mut cut: String = title.chars().take(max).collect();
    cut.push_str("...");
    cut
}

/// Bytes per second as `"x.x MB/s"`, empty when unknown.
pub fn format_speed(bytes_per_sec: f64) -> String {
    if bytes_per_sec.is_finite() && bytes_per_sec > 0.0 {
        format!("{:.1} MB/s", bytes_per_sec / 1024.0 / 1024.0)
    } else {
        String::new()
    }
}

/// `"ETA: 12s"`, empty when unknown.
pub fn format_eta(eta: u64) -> String {
    if eta == 0 {
        String::new()
    } else {
        format!("ETA: {eta}s")
    }
}

/// Distinct video resolutions, tallest first, audio-only excluded.
///
/// Labels without a parseable height sort last, keeping first-seen order.
pub fn sorted_resolutions(formats: &[FormatDescriptor]) -> Vec<String> {
    let mut seen: Vec<(&str, u32)> = Vec::new();
    for format in formats {
        let label = format.resolution.trim();
        if label.is_empty() || format.is_audio_only() || seen.iter().any(|(l, _)| *l == label) {
            continue;
        }
        seen.push((label, format.pixel_height().unwrap_or(0)));
    }
    seen.sort_by(|a, b| b.1.cmp(&a.1));
    seen.into_iter().map(|(label, _)| label.to_string()).collect()
}

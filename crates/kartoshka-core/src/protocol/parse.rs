//! Parsing dispatcher output lines into [`Record`]s.

use serde::Deserialize;
use serde::de::IgnoredAny;
use serde_json::Value;

use super::ProtocolError;
use super::record::{BatchSummary, FailureKind, ProgressEvent, Record, TerminalRecord};
use crate::domain::{MediaInfo, PlaylistDescriptor, VideoDescriptor};

/// Message used when a success record omits one.
const DEFAULT_SUCCESS_MESSAGE: &str = "Download completed";

// ============================================================================
// Line classification
// ============================================================================

/// A single line of dispatcher output after classification.
#[derive(Debug, Clone, PartialEq)]
pub enum Line {
    /// Empty or whitespace-only.
    Blank,
    Record(Record),
    /// Anything else, kept verbatim (without the line terminator).
    Diagnostic(String),
}

/// Classify one output line.
///
/// Lines that are not JSON, or are JSON without a recognizable record shape,
/// come back as [`Line::Diagnostic`] so the caller can surface them.
pub fn classify_line(line: &str) -> Line {
    let line = line.trim_end_matches(['\r', '\n']);
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Line::Blank;
    }
    if !trimmed.starts_with('{') {
        return Line::Diagnostic(line.to_string());
    }
    match parse_line(trimmed) {
        Ok(record) => Line::Record(record),
        Err(e) => {
            tracing::debug!(error = %e, "Treating unparseable JSON line as diagnostic");
            Line::Diagnostic(line.to_string())
        }
    }
}

// ============================================================================
// Parsing
// ============================================================================

/// Raw JSON envelope for parsing.
#[derive(Deserialize)]
struct RawEnvelope {
    #[serde(rename = "type")]
    tag: Option<String>,
    // Outcome fields
    success: Option<bool>,
    message: Option<String>,
    error: Option<String>,
    kind: Option<String>,
    total: Option<usize>,
    succeeded: Option<usize>,
    failed: Option<usize>,
    // Progress fields
    percent: Option<f64>,
    speed: Option<f64>,
    eta: Option<f64>,
    // Media markers
    title: Option<IgnoredAny>,
    formats: Option<IgnoredAny>,
}

/// Parse a single line of dispatcher output into a [`Record`].
///
/// Recognized shapes, checked in order:
///
/// - `"type": "progress"` and `"type": "playlist"`
/// - `"success"` present: a terminal outcome
/// - `"error"` present without `"success"`: a failure without a kind
/// - `"title"` or `"formats"` present: a video descriptor
pub fn parse_line(line: &str) -> Result<Record, ProtocolError> {
    let value: Value = serde_json::from_str(line)?;
    if !value.is_object() {
        return Err(ProtocolError::NotAnObject);
    }
    let envelope = RawEnvelope::deserialize(&value)?;

    if let Some(tag) = envelope.tag.as_deref() {
        return match tag {
            "progress" => parse_progress(&envelope).map(Record::Progress),
            "playlist" => {
                let playlist = PlaylistDescriptor::deserialize(&value)?;
                Ok(Record::Media(MediaInfo::Playlist(playlist)))
            }
            "video" => parse_video(&value),
            other => Err(ProtocolError::UnknownType(other.to_string())),
        };
    }

    if let Some(success) = envelope.success {
        return Ok(Record::Outcome(parse_outcome(success, envelope)?));
    }

    if let Some(error) = envelope.error {
        return Ok(Record::Outcome(TerminalRecord::Failure {
            error: non_empty(error, "error")?,
            kind: envelope.kind.as_deref().and_then(FailureKind::from_wire),
        }));
    }

    if envelope.title.is_some() || envelope.formats.is_some() {
        return parse_video(&value);
    }

    Err(ProtocolError::Unrecognized)
}

fn parse_video(value: &Value) -> Result<Record, ProtocolError> {
    let video = VideoDescriptor::deserialize(value)?;
    Ok(Record::Media(MediaInfo::Video(video)))
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn parse_progress(envelope: &RawEnvelope) -> Result<ProgressEvent, ProtocolError> {
    let percent = envelope
        .percent
        .ok_or(ProtocolError::MissingField("percent"))?;
    if !percent.is_finite() || !(0.0..=100.0).contains(&percent) {
        return Err(ProtocolError::invalid_field(
            "percent",
            format!("{percent} is outside 0..=100"),
        ));
    }

    let speed = envelope.speed.unwrap_or(0.0);
    if !speed.is_finite() || speed < 0.0 {
        return Err(ProtocolError::invalid_field(
            "speed",
            format!("{speed} is negative"),
        ));
    }

    let eta = envelope.eta.unwrap_or(0.0);
    if !eta.is_finite() || eta < 0.0 {
        return Err(ProtocolError::invalid_field("eta", format!("{eta} is negative")));
    }

    Ok(ProgressEvent {
        percent,
        speed,
        eta: eta as u64,
    })
}

fn parse_outcome(success: bool, envelope: RawEnvelope) -> Result<TerminalRecord, ProtocolError> {
    if success {
        let summary = match (envelope.total, envelope.succeeded, envelope.failed) {
            (Some(total), Some(succeeded), failed) => Some(BatchSummary {
                total,
                succeeded,
                failed: failed.unwrap_or_else(|| total.saturating_sub(succeeded)),
            }),
            _ => None,
        };
        let message = envelope
            .message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_SUCCESS_MESSAGE.to_string());
        return Ok(TerminalRecord::Success { message, summary });
    }

    // Accept error or message as the explanation
    let error = envelope
        .error
        .or(envelope.message)
        .ok_or(ProtocolError::MissingField("error"))?;

    Ok(TerminalRecord::Failure {
        error: non_empty(error, "error")?,
        kind: envelope.kind.as_deref().and_then(FailureKind::from_wire),
    })
}

fn non_empty(text: String, field: &'static str) -> Result<String, ProtocolError> {
    if text.trim().is_empty() {
        Err(ProtocolError::invalid_field(field, "must not be empty"))
    } else {
        Ok(text)
    }
}

// ============================================================================
// Tests
// ============================================================================

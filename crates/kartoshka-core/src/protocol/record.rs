//! Records the dispatcher writes to stdout.

use serde::{Deserialize, Serialize, Serializer};

use super::ProtocolError;
use crate::domain::{MediaInfo, PlaylistDescriptor, VideoDescriptor};

// ============================================================================
// Progress
// ============================================================================

/// Interim progress of a transfer.
///
/// Constructors sanitize their inputs: percent is clamped to `0..=100`,
/// speed is non-negative and non-finite values become 0.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ProgressEvent {
    pub percent: f64,
    /// Bytes per second.
    pub speed: f64,
    /// Seconds remaining, 0 when unknown.
    pub eta: u64,
}

impl ProgressEvent {
    pub fn new(percent: f64, speed: f64, eta: u64) -> Self {
        Self {
            percent: clamp_percent(percent),
            speed: if speed.is_finite() && speed > 0.0 { speed } else { 0.0 },
            eta,
        }
    }

    /// Build an event from byte counts. Returns `None` when the total is
    /// unknown.
    #[allow(clippy::cast_precision_loss)]
    pub fn from_bytes(downloaded: u64, total: u64, speed: f64, eta: u64) -> Option<Self> {
        if total == 0 {
            return None;
        }
        let percent = downloaded as f64 / total as f64 * 100.0;
        Some(Self::new(percent, speed, eta))
    }

    pub fn is_complete(&self) -> bool {
        self.percent >= 100.0
    }

    /// Copy of this event with percent raised to at least `floor`.
    #[must_use]
    pub fn at_least(self, floor: f64) -> Self {
        Self {
            percent: self.percent.max(clamp_percent(floor)),
            ..self
        }
    }
}

fn clamp_percent(percent: f64) -> f64 {
    if percent.is_nan() {
        0.0
    } else {
        percent.clamp(0.0, 100.0)
    }
}

// ============================================================================
// Terminal outcome
// ============================================================================

/// Classification carried by failure records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The URL could not be resolved to media.
    Resolution,
    /// Resolution succeeded but fetching or converting failed.
    Transfer,
    /// The dispatcher itself misbehaved.
    Fault,
    /// The command line was malformed.
    InvalidRequest,
}

impl FailureKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Resolution => "resolution",
            Self::Transfer => "transfer",
            Self::Fault => "fault",
            Self::InvalidRequest => "invalid_request",
        }
    }

    pub fn from_wire(value: &str) -> Option<Self> {
        match value {
            "resolution" => Some(Self::Resolution),
            "transfer" => Some(Self::Transfer),
            "fault" => Some(Self::Fault),
            "invalid_request" => Some(Self::InvalidRequest),
            _ => None,
        }
    }
}

/// Counts reported alongside a playlist batch result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// The final success or failure record of an invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalRecord {
    Success {
        message: String,
        summary: Option<BatchSummary>,
    },
    Failure {
        /// Never empty.
        error: String,
        kind: Option<FailureKind>,
    },
}

impl TerminalRecord {
    pub fn success(message: impl Into<String>) -> Self {
        Self::Success {
            message: message.into(),
            summary: None,
        }
    }

    pub fn batch_success(message: impl Into<String>, summary: BatchSummary) -> Self {
        Self::Success {
            message: message.into(),
            summary: Some(summary),
        }
    }

    /// Failure record. An empty error string is replaced so that a failure
    /// always carries a message.
    pub fn failure(kind: FailureKind, error: impl Into<String>) -> Self {
        Self::Failure {
            error: non_empty_error(error.into()),
            kind: Some(kind),
        }
    }

    /// Failure decoded from a record that did not say what kind it was.
    pub fn unclassified_failure(error: impl Into<String>) -> Self {
        Self::Failure {
            error: non_empty_error(error.into()),
            kind: None,
        }
    }

    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// The message or error text, whichever is populated.
    pub fn text(&self) -> &str {
        match self {
            Self::Success { message, .. } => message,
            Self::Failure { error, .. } => error,
        }
    }
}

fn non_empty_error(error: String) -> String {
    if error.trim().is_empty() {
        "Unknown error".to_string()
    } else {
        error
    }
}

// ============================================================================
// Record
// ============================================================================

/// One JSON line of dispatcher output.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Progress(ProgressEvent),
    /// Terminal result of `info`.
    Media(MediaInfo),
    Outcome(TerminalRecord),
}

impl Record {
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::Progress(_))
    }

    /// Serialize as a single line without the trailing newline.
    pub fn to_line(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }
}

impl From<ProgressEvent> for Record {
    fn from(event: ProgressEvent) -> Self {
        Self::Progress(event)
    }
}

impl From<MediaInfo> for Record {
    fn from(info: MediaInfo) -> Self {
        Self::Media(info)
    }
}

impl From<TerminalRecord> for Record {
    fn from(outcome: TerminalRecord) -> Self {
        Self::Outcome(outcome)
    }
}

/// Borrowed wire shape of a record.
#[derive(Serialize)]
#[serde(untagged)]
enum WireRecord<'a> {
    Progress {
        #[serde(rename = "type")]
        tag: &'static str,
        percent: f64,
        speed: f64,
        eta: u64,
    },
    Video(&'a VideoDescriptor),
    Playlist {
        #[serde(rename = "type")]
        tag: &'static str,
        #[serde(flatten)]
        playlist: &'a PlaylistDescriptor,
    },
    Success {
        success: bool,
        message: &'a str,
        #[serde(flatten)]
        summary: Option<&'a BatchSummary>,
    },
    Failure {
        success: bool,
        error: &'a str,
        #[serde(skip_serializing_if = "Option::is_none")]
        kind: Option<FailureKind>,
    },
}

impl<'a> From<&'a Record> for WireRecord<'a> {
    fn from(record: &'a Record) -> Self {
        match record {
            Record::Progress(event) => Self::Progress {
                tag: "progress",
                percent: event.percent,
                speed: event.speed,
                eta: event.eta,
            },
            Record::Media(MediaInfo::Video(video)) => Self::Video(video),
            Record::Media(MediaInfo::Playlist(playlist)) => Self::Playlist {
                tag: "playlist",
                playlist,
            },
            Record::Outcome(TerminalRecord::Success { message, summary }) => Self::Success {
                success: true,
                message,
                summary: summary.as_ref(),
            },
            Record::Outcome(TerminalRecord::Failure { error, kind }) => Self::Failure {
                success: false,
                error,
                kind: *kind,
            },
        }
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        WireRecord::from(self).serialize(serializer)
    }
}

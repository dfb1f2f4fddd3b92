//! Controller-side reading of dispatcher output.
//!
//! Lines are classified by [`classify_line`]. The decoder adds the stream
//! rules on top: nothing after the terminal record and no percentage going
//! backwards. [`resolve_outcome`] then folds the terminal record, the exit
//! status and stderr into one result.

use kartoshka_core::{
    BatchSummary, CommandKind, Line, MediaInfo, OperationError, ProgressEvent, Record,
    TerminalRecord, classify_line,
};

/// One decoded line worth showing to the user.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamItem {
    Progress(ProgressEvent),
    Media(MediaInfo),
    Outcome(TerminalRecord),
    /// Verbatim non-protocol output.
    Diagnostic(String),
}

/// Successful end of an operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    Media(MediaInfo),
    Done {
        message: String,
        summary: Option<BatchSummary>,
    },
}

/// Stateful line decoder for one invocation.
#[derive(Debug, Default)]
pub struct LineDecoder {
    terminal: Option<Record>,
    high_water: f64,
    last_diagnostic: Option<String>,
    ignored: usize,
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode one line. Returns `None` for blank lines and for records that
    /// arrive after the terminal record.
    pub fn feed(&mut self, line: &str) -> Option<StreamItem> {
        match classify_line(line) {
            Line::Blank => None,
            Line::Diagnostic(text) => {
                self.last_diagnostic = Some(text.clone());
                Some(StreamItem::Diagnostic(text))
            }
            Line::Record(record) => self.accept(record),
        }
    }

    /// Decode a whole buffered output block.
    pub fn feed_all(&mut self, text: &str) -> Vec<StreamItem> {
        text.lines().filter_map(|line| self.feed(line)).collect()
    }

    fn accept(&mut self, record: Record) -> Option<StreamItem> {
        if self.terminal.is_some() {
            self.ignored += 1;
            tracing::warn!(?record, "Ignoring record after the terminal record");
            return None;
        }

        match record {
            Record::Progress(event) => {
                let event = event.at_least(self.high_water);
                self.high_water = event.percent;
                Some(StreamItem::Progress(event))
            }
            Record::Media(info) => {
                self.terminal = Some(Record::Media(info.clone()));
                Some(StreamItem::Media(info))
            }
            Record::Outcome(outcome) => {
                self.terminal = Some(Record::Outcome(outcome.clone()));
                Some(StreamItem::Outcome(outcome))
            }
        }
    }

    pub const fn terminal(&self) -> Option<&Record> {
        self.terminal.as_ref()
    }

    pub fn last_diagnostic(&self) -> Option<&str> {
        self.last_diagnostic.as_deref()
    }

    /// Records dropped because they followed the terminal record.
    pub const fn ignored(&self) -> usize {
        self.ignored
    }

    /// Highest percentage seen so far.
    pub const fn high_water(&self) -> f64 {
        self.high_water
    }
}

/// Decode buffered one-shot output.
pub fn decode_buffered(stdout: &str) -> (LineDecoder, Vec<StreamItem>) {
    let mut decoder = LineDecoder::new();
    let items = decoder.feed_all(stdout);
    (decoder, items)
}

/// How the dispatcher process ended.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessExit {
    /// `None` when the process was killed by a signal.
    pub code: Option<i32>,
    pub stderr: String,
}

impl ProcessExit {
    pub const fn success(&self) -> bool {
        matches!(self.code, Some(0))
    }

    fn status_text(&self) -> String {
        self.code.map_or_else(
            || "Backend was terminated by a signal".to_string(),
            |code| format!("Backend exited with status {code}"),
        )
    }
}

/// Combine the terminal record, exit status and stderr into one result.
///
/// The record body decides first. The exit status only matters when it
/// contradicts a success record or when no record was written at all.
pub fn resolve_outcome(
    command: CommandKind,
    decoder: &LineDecoder,
    exit: &ProcessExit,
) -> Result<Completion, OperationError> {
    match decoder.terminal() {
        Some(Record::Outcome(TerminalRecord::Failure { error, kind })) => {
            Err(OperationError::from_failure(command, *kind, error.clone()))
        }
        Some(Record::Media(_) | Record::Outcome(TerminalRecord::Success { .. }))
            if !exit.success() =>
        {
            Err(OperationError::fault(format!(
                "{} after reporting success",
                exit.status_text()
            )))
        }
        Some(Record::Media(info)) => {
            if command == CommandKind::Info {
                Ok(Completion::Media(info.clone()))
            } else {
                Err(OperationError::fault(
                    "Backend sent media information instead of a result",
                ))
            }
        }
        Some(Record::Outcome(TerminalRecord::Success { message, summary })) => {
            Ok(Completion::Done {
                message: message.clone(),
                summary: *summary,
            })
        }
        Some(Record::Progress(_)) | None => Err(missing_result(decoder, exit)),
    }
}

fn missing_result(decoder: &LineDecoder, exit: &ProcessExit) -> OperationError {
    let stderr_line = exit
        .stderr
        .lines()
        .rev()
        .map(str::trim)
        .find(|l| !l.is_empty());

    let message = stderr_line
        .or_else(|| decoder.last_diagnostic())
        .map_or_else(
            || {
                if exit.success() {
                    "Backend exited without reporting a result".to_string()
                } else {
                    exit.status_text()
                }
            },
            ToString::to_string,
        );
    OperationError::fault(message)
}

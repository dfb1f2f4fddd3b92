//! Playlist batch accounting.
//!
//! A batch succeeds when at least one item succeeded. It fails only when
//! every item failed or nothing was selected.

use crate::protocol::{BatchSummary, FailureKind, TerminalRecord};

/// One item that did not download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchItemFailure {
    pub id: String,
    pub title: String,
    pub error: String,
}

/// Running tally of a playlist download.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    total: usize,
    succeeded: Vec<String>,
    failures: Vec<BatchItemFailure>,
}

impl BatchReport {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            ..Self::default()
        }
    }

    pub fn record_success(&mut self, title: impl Into<String>) {
        self.succeeded.push(title.into());
    }

    pub fn record_failure(
        &mut self,
        id: impl Into<String>,
        title: impl Into<String>,
        error: impl Into<String>,
    ) {
        self.failures.push(BatchItemFailure {
            id: id.into(),
            title: title.into(),
            error: error.into(),
        });
    }

    pub fn failures(&self) -> &[BatchItemFailure] {
        &self.failures
    }

    pub fn summary(&self) -> BatchSummary {
        BatchSummary {
            total: self.total,
            succeeded: self.succeeded.len(),
            failed: self.failures.len(),
        }
    }

    /// The single terminal record for the batch.
    pub fn into_terminal(self) -> TerminalRecord {
        let summary = self.summary();

        if self.total == 0 {
            return TerminalRecord::failure(
                FailureKind::InvalidRequest,
                "No videos selected for download",
            );
        }

        if summary.succeeded == 0 {
            let last = self
                .failures
                .last()
                .map_or("unknown error", |f| f.error.as_str());
            let error = if summary.failed == 1 {
                format!("Download failed: {last}")
            } else {
                format!("All {} videos failed to download (last error: {last})", summary.failed)
            };
            return TerminalRecord::failure(FailureKind::Transfer, error);
        }

        let mut message = format!("Downloaded {} of {} videos", summary.succeeded, summary.total);
        if !self.failures.is_empty() {
            let titles: Vec<&str> = self.failures.iter().map(|f| f.title.as_str()).collect();
            message.push_str(&format!("; failed: {}", titles.join(", ")));
        }
        TerminalRecord::batch_success(message, summary)
    }
}

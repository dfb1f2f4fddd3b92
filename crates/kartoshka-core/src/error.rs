//! Failure taxonomy seen by the controller.
//!
//! Every way an operation can end badly maps to exactly one variant, whether
//! it was reported in a failure record, inferred from the exit status or
//! detected by the controller itself.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::protocol::{CommandKind, FailureKind};

/// Error type for controller operations.
#[derive(Clone, Debug, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum OperationError {
    /// The URL could not be resolved to media.
    #[error("Resolution failed: {message}")]
    ResolutionFailure { message: String },

    /// Resolution worked but the download or conversion did not.
    #[error("Transfer failed: {message}")]
    TransferFailure { message: String },

    /// The dispatcher did not finish in time and was killed.
    #[error("{operation} timed out after {seconds}s")]
    Timeout { operation: String, seconds: u64 },

    /// The dispatcher crashed, was killed, or broke the protocol.
    #[error("Backend fault: {message}")]
    ProcessFault { message: String },

    /// A download was requested while another one is in flight.
    #[error("A download is already in progress")]
    ConcurrencyRejected,

    /// Rejected before anything was spawned.
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },
}

impl OperationError {
    pub fn resolution(message: impl Into<String>) -> Self {
        Self::ResolutionFailure {
            message: message.into(),
        }
    }

    pub fn transfer(message: impl Into<String>) -> Self {
        Self::TransferFailure {
            message: message.into(),
        }
    }

    pub fn timeout(operation: impl Into<String>, seconds: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            seconds,
        }
    }

    pub fn fault(message: impl Into<String>) -> Self {
        Self::ProcessFault {
            message: message.into(),
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Classify a failure record.
    ///
    /// An explicit kind wins. Without one, `info` failures are resolution
    /// failures and download failures are transfer failures.
    pub fn from_failure(
        command: CommandKind,
        kind: Option<FailureKind>,
        error: impl Into<String>,
    ) -> Self {
        let error = error.into();
        match kind {
            Some(FailureKind::Resolution) => Self::resolution(error),
            Some(FailureKind::Transfer) => Self::transfer(error),
            Some(FailureKind::Fault) => Self::fault(error),
            Some(FailureKind::InvalidRequest) => Self::invalid_request(error),
            None if command == CommandKind::Info => Self::resolution(error),
            None => Self::transfer(error),
        }
    }

    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    pub const fn is_rejected(&self) -> bool {
        matches!(self, Self::ConcurrencyRejected)
    }

    /// Convert to a user-friendly message.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::ResolutionFailure { message } => format!("Could not load video: {message}"),
            Self::TransferFailure { message } => format!("Download failed: {message}"),
            Self::Timeout { operation, seconds } => {
                format!("Timeout: {operation} took longer than {seconds} seconds")
            }
            Self::ProcessFault { message } => format!("Backend error: {message}"),
            Self::ConcurrencyRejected => {
                "A download is already in progress. Wait for it to finish.".to_string()
            }
            Self::InvalidRequest { message } => message.clone(),
        }
    }
}

/// Convenience result type for controller operations.
pub type OperationResult<T> = Result<T, OperationError>;

//! CLI error type and its exit codes.

use kartoshka_controller::LocateError;
use kartoshka_core::{OperationError, OptionError, PathError, SettingsError};
use thiserror::Error;

use crate::selection::SelectionError;

#[derive(Debug, Error)]
pub enum CliError {
    /// A backend operation failed.
    #[error("{}", .0.user_message())]
    Operation(OperationError),

    #[error("Invalid arguments: {0}")]
    Arguments(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(String),
}

impl CliError {
    /// Map error to an exit code.
    ///
    /// - 1: the operation failed
    /// - 2: invalid arguments
    /// - 71: the backend could not run (`EX_OSERR`)
    /// - 74: local IO error (`EX_IOERR`)
    /// - 78: configuration error (`EX_CONFIG`)
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Operation(OperationError::InvalidRequest { .. }) | Self::Arguments(_) => 2,
            Self::Operation(OperationError::ProcessFault { .. }) => 71,
            Self::Operation(_) => 1,
            Self::Io(_) => 74,
            Self::Config(_) => 78,
        }
    }
}

impl From<OperationError> for CliError {
    fn from(err: OperationError) -> Self {
        Self::Operation(err)
    }
}

impl From<LocateError> for CliError {
    fn from(err: LocateError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<SettingsError> for CliError {
    fn from(err: SettingsError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<PathError> for CliError {
    fn from(err: PathError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<OptionError> for CliError {
    fn from(err: OptionError) -> Self {
        Self::Arguments(err.to_string())
    }
}

impl From<SelectionError> for CliError {
    fn from(err: SelectionError) -> Self {
        Self::Arguments(err.to_string())
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

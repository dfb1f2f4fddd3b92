//! Core domain types and wire protocol shared by the kartoshka controller and
//! dispatcher.
//!
//! - `domain` - media descriptors and download options
//! - `protocol` - commands, records and line parsing for the process boundary
//! - `error` - the user-facing failure taxonomy
//! - `batch` - playlist batch accounting and its terminal-record policy
//! - `settings` / `paths` - configuration and filesystem helpers
//! - `display` / `youtube` - presentation and URL helpers

#![deny(unused_crate_dependencies)]

pub mod batch;
pub mod display;
pub mod domain;
pub mod error;
pub mod paths;
pub mod protocol;
pub mod settings;
pub mod youtube;

// Re-export commonly used types for convenience
pub use batch::{BatchItemFailure, BatchReport};
pub use domain::{
    AUDIO_ONLY, FormatDescriptor, MediaInfo, OptionError, OutputFormat, PlaylistDescriptor,
    Quality, VideoDescriptor, resolution_height,
};
pub use error::OperationError;
pub use paths::{PathError, default_download_dir, ensure_directory, verify_writable};
pub use protocol::{
    BatchSummary, Command, CommandKind, CommandParts, DownloadOptions, FailureKind, Line,
    PlaylistSelection, ProgressEvent, ProtocolError, Record, TerminalRecord, classify_line,
    parse_line,
};
pub use settings::{Settings, SettingsError, validate_settings};

//! Port for whatever resolves URLs and performs transfers.

use std::path::PathBuf;

use async_trait::async_trait;
use kartoshka_core::{FailureKind, MediaInfo, OutputFormat, ProgressEvent, Quality};
use thiserror::Error;

/// Errors reported by a media source.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// The URL does not lead to downloadable media.
    #[error("{0}")]
    Resolution(String),

    /// Fetching, merging or converting failed.
    #[error("{0}")]
    Transfer(String),

    /// The tool is not installed where it was looked for.
    #[error("{0}")]
    NotInstalled(String),

    /// The tool could not be started or misbehaved.
    #[error("{0}")]
    Tool(String),
}

impl SourceError {
    pub const fn kind(&self) -> FailureKind {
        match self {
            Self::Resolution(_) => FailureKind::Resolution,
            Self::Transfer(_) => FailureKind::Transfer,
            Self::NotInstalled(_) | Self::Tool(_) => FailureKind::Fault,
        }
    }
}

/// One transfer to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub url: String,
    pub quality: Quality,
    pub format: OutputFormat,
    pub destination: PathBuf,
}

impl DownloadRequest {
    /// How many streams the tool fetches: audio alone, or video then audio.
    pub const fn expected_streams(&self) -> usize {
        if self.format.is_audio() { 1 } else { 2 }
    }
}

/// What a source reports while a transfer runs.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceEvent {
    Progress(ProgressEvent),
    /// Free-form tool output.
    Output(String),
}

#[async_trait]
pub trait MediaSource: Send + Sync {
    async fn resolve(&self, url: &str) -> Result<MediaInfo, SourceError>;

    async fn download(
        &self,
        request: &DownloadRequest,
        on_event: &mut (dyn FnMut(SourceEvent) + Send),
    ) -> Result<(), SourceError>;
}

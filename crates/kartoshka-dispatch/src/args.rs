//! Command-line arguments of the dispatcher.
//!
//! Values are kept loosely typed here and validated by
//! [`Command::from_parts`](kartoshka_core::Command::from_parts), so that
//! every validation failure can be reported as a failure record.

use std::path::PathBuf;

use clap::Parser;
use kartoshka_core::CommandParts;
use kartoshka_core::protocol::DEFAULT_DESTINATION;

#[derive(Parser, Debug)]
#[command(name = "kartoshka-backend")]
#[command(about = "Run one info or download command and report over JSON lines")]
#[command(version)]
pub struct BackendArgs {
    /// info, download or download_playlist
    #[arg(long)]
    pub command: String,

    /// Video or playlist URL
    #[arg(long)]
    pub url: Option<String>,

    /// best, worst or a resolution such as 1920x1080
    #[arg(long, default_value = "best")]
    pub quality: String,

    /// mp4 or mp3
    #[arg(long, default_value = "mp4")]
    pub format: String,

    /// Destination directory
    #[arg(long, default_value = DEFAULT_DESTINATION)]
    pub path: PathBuf,

    /// JSON selection for download_playlist: {"videos": [...]}
    #[arg(long = "playlist-data")]
    pub playlist_data: Option<String>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

impl BackendArgs {
    pub fn into_parts(self) -> CommandParts {
        CommandParts {
            command: self.command,
            url: self.url,
            quality: Some(self.quality),
            format: Some(self.format),
            path: Some(self.path),
            playlist_data: self.playlist_data,
        }
    }
}

//! Root CLI structure and global options.

use std::path::PathBuf;

use clap::Parser;
use kartoshka_core::settings::{ENV_BACKEND, ENV_DOWNLOAD_DIR};

use crate::commands::Commands;

/// Download YouTube videos and playlists as MP4 or MP3.
#[derive(Debug, Parser)]
#[command(name = "kartoshka")]
#[command(about = "Download YouTube videos and playlists")]
#[command(version)]
pub struct Cli {
    /// Path to the kartoshka-backend executable
    #[arg(long, global = true, env = ENV_BACKEND)]
    pub backend: Option<PathBuf>,

    /// Directory downloads are saved to
    #[arg(long, global = true, env = ENV_DOWNLOAD_DIR)]
    pub dir: Option<PathBuf>,

    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

//! Subcommands.

use clap::Subcommand;

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Show information about a video or playlist
    Info {
        /// Video or playlist URL
        url: String,
    },

    /// Download a single video
    Download {
        /// Video URL
        url: String,
        /// Quality: best, worst, or a resolution such as 1920x1080
        #[arg(short, long)]
        quality: Option<String>,
        /// Output format: mp4 or mp3
        #[arg(short, long)]
        format: Option<String>,
        /// Wait for the whole download instead of streaming progress
        #[arg(long)]
        one_shot: bool,
    },

    /// Download videos from a playlist
    Playlist {
        /// Playlist URL, or a video URL that belongs to a playlist
        url: String,
        /// Quality: best, worst, or a resolution such as 1920x1080
        #[arg(short, long)]
        quality: Option<String>,
        /// Output format: mp4 or mp3
        #[arg(short, long)]
        format: Option<String>,
        /// Entries to download, 1-based (e.g. "1,3-5")
        #[arg(long, conflicts_with = "current")]
        select: Option<String>,
        /// Download only the video the URL points at
        #[arg(long)]
        current: bool,
    },
}

//! Commands and their command-line framing.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::ProtocolError;
use crate::domain::{OutputFormat, PlaylistDescriptor, Quality, VideoDescriptor};

/// Destination used when none is given.
pub const DEFAULT_DESTINATION: &str = ".";

/// The three commands the dispatcher understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    Info,
    Download,
    DownloadPlaylist,
}

impl CommandKind {
    pub const ALL: [Self; 3] = [Self::Info, Self::Download, Self::DownloadPlaylist];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Download => "download",
            Self::DownloadPlaylist => "download_playlist",
        }
    }

    pub const fn is_download(self) -> bool {
        !matches!(self, Self::Info)
    }
}

impl FromStr for CommandKind {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ProtocolError::UnknownCommand(s.to_string()))
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options shared by both download commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadOptions {
    pub quality: Quality,
    pub format: OutputFormat,
    pub destination: PathBuf,
}

impl DownloadOptions {
    pub fn new(quality: Quality, format: OutputFormat, destination: impl Into<PathBuf>) -> Self {
        Self {
            quality,
            format,
            destination: destination.into(),
        }
    }
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self::new(Quality::Best, OutputFormat::Mp4, DEFAULT_DESTINATION)
    }
}

// ============================================================================
// Playlist selection
// ============================================================================

/// The videos chosen for a playlist download, in download order.
///
/// Transported as a single JSON argument: `{"videos": [...]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistSelection {
    pub videos: Vec<VideoDescriptor>,
}

impl PlaylistSelection {
    pub const fn new(videos: Vec<VideoDescriptor>) -> Self {
        Self { videos }
    }

    /// The currently selected entries of a playlist.
    pub fn from_playlist(playlist: &PlaylistDescriptor) -> Self {
        Self::new(playlist.selected_videos())
    }

    pub fn encode(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn decode(data: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(data).map_err(|e| ProtocolError::InvalidPlaylistData(e.to_string()))
    }

    /// Entries still flagged as selected, in order.
    pub fn selected(&self) -> impl Iterator<Item = &VideoDescriptor> {
        self.videos.iter().filter(|v| v.selected)
    }

    pub fn ids(&self) -> Vec<&str> {
        self.videos.iter().map(|v| v.id.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.videos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.videos.is_empty()
    }
}

// ============================================================================
// Commands
// ============================================================================

/// One unit of work for the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Info {
        url: String,
    },
    Download {
        url: String,
        options: DownloadOptions,
    },
    DownloadPlaylist {
        url: String,
        options: DownloadOptions,
        selection: PlaylistSelection,
    },
}

/// Loosely typed command-line values, validated by [`Command::from_parts`].
#[derive(Debug, Clone, Default)]
pub struct CommandParts {
    pub command: String,
    pub url: Option<String>,
    pub quality: Option<String>,
    pub format: Option<String>,
    pub path: Option<PathBuf>,
    pub playlist_data: Option<String>,
}

impl Command {
    pub const fn kind(&self) -> CommandKind {
        match self {
            Self::Info { .. } => CommandKind::Info,
            Self::Download { .. } => CommandKind::Download,
            Self::DownloadPlaylist { .. } => CommandKind::DownloadPlaylist,
        }
    }

    pub fn url(&self) -> &str {
        match self {
            Self::Info { url } | Self::Download { url, .. } | Self::DownloadPlaylist { url, .. } => {
                url
            }
        }
    }

    pub const fn options(&self) -> Option<&DownloadOptions> {
        match self {
            Self::Info { .. } => None,
            Self::Download { options, .. } | Self::DownloadPlaylist { options, .. } => {
                Some(options)
            }
        }
    }

    /// Argument vector for the dispatcher, without the program name.
    pub fn to_args(&self) -> Result<Vec<String>, ProtocolError> {
        let mut args = vec![
            "--command".to_string(),
            self.kind().as_str().to_string(),
            "--url".to_string(),
            self.url().to_string(),
        ];

        if let Some(options) = self.options() {
            args.extend([
                "--quality".to_string(),
                options.quality.to_string(),
                "--format".to_string(),
                options.format.to_string(),
                "--path".to_string(),
                options.destination.to_string_lossy().into_owned(),
            ]);
        }

        if let Self::DownloadPlaylist { selection, .. } = self {
            args.push("--playlist-data".to_string());
            args.push(selection.encode()?);
        }

        Ok(args)
    }

    /// Validate raw command-line values into a command.
    pub fn from_parts(parts: CommandParts) -> Result<Self, ProtocolError> {
        let kind: CommandKind = parts.command.parse()?;
        let url = parts
            .url
            .filter(|u| !u.trim().is_empty())
            .ok_or(ProtocolError::MissingArgument("--url"))?;

        if kind == CommandKind::Info {
            return Ok(Self::Info { url });
        }

        let quality = match parts.quality.as_deref() {
            Some(q) => q
                .parse()
                .map_err(|e| ProtocolError::invalid_argument("--quality", e))?,
            None => Quality::Best,
        };
        let format = match parts.format.as_deref() {
            Some(f) => f
                .parse()
                .map_err(|e| ProtocolError::invalid_argument("--format", e))?,
            None => OutputFormat::Mp4,
        };
        let destination = parts
            .path
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DESTINATION));
        let options = DownloadOptions::new(quality, format, destination);

        if kind == CommandKind::Download {
            return Ok(Self::Download { url, options });
        }

        let data = parts
            .playlist_data
            .ok_or(ProtocolError::MissingArgument("--playlist-data"))?;
        let selection = PlaylistSelection::decode(&data)?;

        Ok(Self::DownloadPlaylist {
            url,
            options,
            selection,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parts(command: &str) -> CommandParts {
        CommandParts {
            command: command.to_string(),
            url: Some("https://www.youtube.com/watch?v=abc".to_string()),
            ..CommandParts::default()
        }
    }

    fn flag<'a>(args: &'a [String], name: &str) -> Option<&'a str> {
        args.iter()
            .position(|a| a == name)
            .and_then(|i| args.get(i + 1))
            .map(String::as_str)
    }

    #[test]
    fn test_command_kind_round_trip() {
        for kind in CommandKind::ALL {
            assert_eq!(kind.as_str().parse::<CommandKind>().unwrap(), kind);
        }
        assert!(matches!(
            "upload".parse::<CommandKind>(),
            Err(ProtocolError::UnknownCommand(_))
        ));
    }

    #[test]
    fn test_info_args_have_no_download_flags() {
        let args = Command::Info {
            url: "u".to_string(),
        }
        .to_args()
        .unwrap();
        assert_eq!(args, vec!["--command", "info", "--url", "u"]);
    }

    #[test]
    fn test_download_args() {
        let command = Command::Download {
            url: "u".to_string(),
            options: DownloadOptions::new(
                Quality::Resolution("1280x720".to_string()),
                OutputFormat::Mp3,
                "/tmp/out",
            ),
        };
        let args = command.to_args().unwrap();
        assert_eq!(flag(&args, "--command"), Some("download"));
        assert_eq!(flag(&args, "--quality"), Some("1280x720"));
        assert_eq!(flag(&args, "--format"), Some("mp3"));
        assert_eq!(flag(&args, "--path"), Some("/tmp/out"));
        assert_eq!(flag(&args, "--playlist-data"), None);
    }

    #[test]
    fn test_playlist_selection_survives_framing() {
        let mut second = VideoDescriptor::new("b\"2", "Quote \"title\" & more");
        second.url = "https://www.youtube.com/watch?v=b2&list=PL1".to_string();
        let selection = PlaylistSelection::new(vec![
            VideoDescriptor::new("a1", "First"),
            second,
            VideoDescriptor::new("c3", "Ünïcödé"),
        ]);
        let command = Command::DownloadPlaylist {
            url: "u".to_string(),
            options: DownloadOptions::default(),
            selection: selection.clone(),
        };

        let args = command.to_args().unwrap();
        let decoded = PlaylistSelection::decode(flag(&args, "--playlist-data").unwrap()).unwrap();
        assert_eq!(decoded.ids(), selection.ids());
        assert_eq!(decoded, selection);
    }

    #[test]
    fn test_from_parts_defaults() {
        let command = Command::from_parts(parts("download")).unwrap();
        assert_eq!(command.options(), Some(&DownloadOptions::default()));
    }

    #[test]
    fn test_from_parts_requires_url() {
        let mut raw = parts("info");
        raw.url = Some("  ".to_string());
        assert!(matches!(
            Command::from_parts(raw),
            Err(ProtocolError::MissingArgument("--url"))
        ));
    }

    #[test]
    fn test_from_parts_rejects_bad_format() {
        let mut raw = parts("download");
        raw.format = Some("avi".to_string());
        assert!(matches!(
            Command::from_parts(raw),
            Err(ProtocolError::InvalidArgument { name: "--format", .. })
        ));
    }

    #[test]
    fn test_from_parts_playlist_requires_data() {
        assert!(matches!(
            Command::from_parts(parts("download_playlist")),
            Err(ProtocolError::MissingArgument("--playlist-data"))
        ));

        let mut raw = parts("download_playlist");
        raw.playlist_data = Some("{not json".to_string());
        assert!(matches!(
            Command::from_parts(raw),
            Err(ProtocolError::InvalidPlaylistData(_))
        ));
    }

    #[test]
    fn test_selected_skips_unselected() {
        let mut skipped = VideoDescriptor::new("b", "B");
        skipped.selected = false;
        let selection = PlaylistSelection::new(vec![VideoDescriptor::new("a", "A"), skipped]);
        let ids: Vec<_> = selection.selected().map(|v| v.id.as_str()).collect();
        assert_eq!(ids, vec!["a"]);
    }
}

//! Turns a [`Command`] into a process invocation.

use std::path::{Path, PathBuf};

use kartoshka_core::{Command, CommandKind, OperationError};

/// Everything needed to spawn the dispatcher once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub kind: CommandKind,
}

impl Invocation {
    /// Short description for logs and timeout messages.
    pub fn describe(&self) -> &'static str {
        match self.kind {
            CommandKind::Info => "Loading video information",
            CommandKind::Download => "Download",
            CommandKind::DownloadPlaylist => "Playlist download",
        }
    }
}

/// Binds commands to the dispatcher program.
#[derive(Debug, Clone)]
pub struct CommandEncoder {
    program: PathBuf,
}

impl CommandEncoder {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Build the invocation for `command`.
    ///
    /// The playlist selection travels as one JSON argument. Nothing beyond
    /// the platform's own argument passing escapes it.
    pub fn encode(&self, command: &Command) -> Result<Invocation, OperationError> {
        let args = command
            .to_args()
            .map_err(|e| OperationError::invalid_request(e.to_string()))?;

        Ok(Invocation {
            program: self.program.clone(),
            args,
            kind: command.kind(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kartoshka_core::{
        DownloadOptions, OutputFormat, PlaylistSelection, Quality, VideoDescriptor,
    };

    #[test]
    fn test_encode_info() {
        let encoder = CommandEncoder::new("/opt/kartoshka-backend");
        let invocation = encoder
            .encode(&Command::Info {
                url: "https://youtu.be/abc".to_string(),
            })
            .unwrap();

        assert_eq!(invocation.program, PathBuf::from("/opt/kartoshka-backend"));
        assert_eq!(invocation.kind, CommandKind::Info);
        assert_eq!(
            invocation.args,
            vec!["--command", "info", "--url", "https://youtu.be/abc"]
        );
    }

    #[test]
    fn test_encode_playlist_passes_selection_as_one_argument() {
        let encoder = CommandEncoder::new("backend");
        let mut skipped = VideoDescriptor::new("b2", "It's \"quoted\"");
        skipped.selected = false;
        let command = Command::DownloadPlaylist {
            url: "https://www.youtube.com/playlist?list=PL1".to_string(),
            options: DownloadOptions::new(Quality::Worst, OutputFormat::Mp3, "/tmp/out dir"),
            selection: PlaylistSelection::new(vec![VideoDescriptor::new("a1", "One"), skipped]),
        };

        let invocation = encoder.encode(&command).unwrap();
        let position = invocation
            .args
            .iter()
            .position(|a| a == "--playlist-data")
            .unwrap();
        let data = &invocation.args[position + 1];

        let decoded = PlaylistSelection::decode(data).unwrap();
        assert_eq!(decoded.ids(), vec!["a1", "b2"]);
        assert_eq!(decoded.selected().count(), 1);
        assert_eq!(decoded.videos[1].title, "It's \"quoted\"");
        assert!(invocation.args.contains(&"/tmp/out dir".to_string()));
        assert_eq!(invocation.describe(), "Playlist download");
    }
}

//! Line-oriented JSON protocol between the controller and the dispatcher.
//!
//! The controller invokes the dispatcher with named flags (see [`Command`]).
//! The dispatcher answers on stdout with one JSON object per line:
//!
//! ```json
//! {"type": "progress", "percent": 42.5, "speed": 1048576.0, "eta": 12}
//! {"title": "Song", "duration": 212, "uploader": "Artist", "view_count": 1234, "formats": [...]}
//! {"type": "playlist", "title": "Mix", "playlist_count": 3, "videos": [...]}
//! {"success": true, "message": "Download completed"}
//! {"success": false, "error": "Video unavailable", "kind": "resolution"}
//! ```
//!
//! Exactly one terminal record (media descriptor or success/failure) ends an
//! invocation. Anything that is not a recognizable JSON record is a
//! diagnostic line and is surfaced verbatim.

mod command;
mod error;
mod parse;
mod record;

pub use command::{
    Command, CommandKind, CommandParts, DEFAULT_DESTINATION, DownloadOptions, PlaylistSelection,
};
pub use error::ProtocolError;
pub use parse::{Line, classify_line, parse_line};
pub use record::{BatchSummary, FailureKind, ProgressEvent, Record, TerminalRecord};

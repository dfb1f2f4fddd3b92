//! UI-owned state. Only the loop that owns a [`ViewState`] mutates it, by
//! applying [`UiEvent`]s in arrival order.

use kartoshka_core::display::{format_eta, format_speed};
use kartoshka_core::{MediaInfo, ProgressEvent};

use crate::session::UiEvent;

/// Diagnostic lines kept for display.
pub const MAX_LOG_LINES: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ButtonState {
    #[default]
    Ready,
    Downloading,
}

/// Something the frontend should tell the user once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Success(String),
    Error(String),
}

#[derive(Debug, Clone, Default)]
pub struct ViewState {
    pub media: Option<MediaInfo>,
    pub progress: Option<ProgressEvent>,
    pub status: String,
    pub button: ButtonState,
    pub log: Vec<String>,
}

impl ViewState {
    pub fn new() -> Self {
        Self {
            status: "Ready".to_string(),
            ..Self::default()
        }
    }

    pub fn begin_info(&mut self) {
        self.media = None;
        self.status = "Loading video information...".to_string();
    }

    pub fn begin_download(&mut self) {
        self.button = ButtonState::Downloading;
        self.progress = Some(ProgressEvent::default());
        self.status = "Downloading...".to_string();
    }

    /// Apply one worker event.
    pub fn apply(&mut self, event: UiEvent) -> Option<Notice> {
        match event {
            UiEvent::InfoLoaded(info) => {
                self.status = match &info {
                    MediaInfo::Video(_) => "Video information loaded".to_string(),
                    MediaInfo::Playlist(p) => format!("Playlist loaded: {} videos", p.videos.len()),
                };
                self.media = Some(info);
                None
            }
            UiEvent::InfoFailed(e) => {
                self.status = "Error loading information".to_string();
                Some(Notice::Error(e.user_message()))
            }
            UiEvent::Progress(progress) => {
                self.status = progress_status(&progress);
                self.progress = Some(progress);
                None
            }
            UiEvent::Diagnostic(line) => {
                if self.log.len() == MAX_LOG_LINES {
                    self.log.remove(0);
                }
                self.log.push(line);
                None
            }
            UiEvent::DownloadFinished(Ok(done)) => {
                self.button = ButtonState::Ready;
                self.progress = Some(ProgressEvent::new(100.0, 0.0, 0));
                self.status = "Download completed!".to_string();
                Some(Notice::Success(done.message))
            }
            UiEvent::DownloadFinished(Err(e)) => {
                self.button = ButtonState::Ready;
                self.progress = None;
                self.status = "Download failed".to_string();
                Some(Notice::Error(e.user_message()))
            }
        }
    }
}

fn progress_status(progress: &ProgressEvent) -> String {
    let mut status = format!("Downloading... {:.1}%", progress.percent);
    for part in [format_speed(progress.speed), format_eta(progress.eta)] {
        if !part.is_empty() {
            status.push_str(" | ");
            status.push_str(&part);
        }
    }
    status
}

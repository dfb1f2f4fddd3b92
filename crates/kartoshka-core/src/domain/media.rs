//! Video, playlist and format descriptors.
//!
//! These travel across the process boundary in both directions: the
//! dispatcher emits them as `info` results, and the controller sends a subset
//! of them back as a playlist selection.

use serde::{Deserialize, Serialize};

use super::serde_lenient::{non_negative_u64, string_or_empty};

/// Resolution label the downloading tool uses for audio-only formats.
pub const AUDIO_ONLY: &str = "audio only";

const WATCH_URL_PREFIX: &str = "https://www.youtube.com/watch?v=";

/// Parse a pixel height out of a resolution label.
///
/// Accepts `"1920x1080"`, `"720p"` and bare `"720"`. Returns `None` for
/// anything else, including [`AUDIO_ONLY`].
pub fn resolution_height(label: &str) -> Option<u32> {
    let label = label.trim();
    if let Some((_, height)) = label.split_once('x') {
        return height.trim().parse().ok();
    }
    label.strip_suffix('p').unwrap_or(label).parse().ok()
}

// ============================================================================
// Formats
// ============================================================================

/// One downloadable format of a video.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatDescriptor {
    /// `"1920x1080"` or [`AUDIO_ONLY`].
    #[serde(default, deserialize_with = "string_or_empty")]
    pub resolution: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ext: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filesize: Option<u64>,
}

impl FormatDescriptor {
    pub fn new(resolution: impl Into<String>) -> Self {
        Self {
            resolution: resolution.into(),
            ..Self::default()
        }
    }

    pub fn is_audio_only(&self) -> bool {
        self.resolution == AUDIO_ONLY
    }

    /// Pixel height, preferring the explicit field over the label.
    pub fn pixel_height(&self) -> Option<u32> {
        self.height.or_else(|| resolution_height(&self.resolution))
    }
}

// ============================================================================
// Videos
// ============================================================================

const fn default_selected() -> bool {
    true
}

/// Metadata for a single video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoDescriptor {
    #[serde(default, deserialize_with = "string_or_empty")]
    pub id: String,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub title: String,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub url: String,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub uploader: String,
    /// Seconds. 0 when unknown.
    #[serde(default, deserialize_with = "non_negative_u64")]
    pub duration: u64,
    #[serde(default, deserialize_with = "non_negative_u64")]
    pub view_count: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub formats: Vec<FormatDescriptor>,
    #[serde(default = "default_selected")]
    pub selected: bool,
}

impl VideoDescriptor {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            url: String::new(),
            uploader: String::new(),
            duration: 0,
            view_count: 0,
            formats: Vec::new(),
            selected: true,
        }
    }

    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    #[must_use]
    pub const fn with_duration(mut self, seconds: u64) -> Self {
        self.duration = seconds;
        self
    }

    /// The URL to hand to the downloading tool.
    ///
    /// Flat playlist entries often carry only an id, so a watch URL is
    /// synthesized from it when `url` is empty.
    pub fn download_url(&self) -> String {
        if self.url.is_empty() {
            format!("{WATCH_URL_PREFIX}{}", self.id)
        } else {
            self.url.clone()
        }
    }

    /// Title for messages, never empty.
    pub fn display_title(&self) -> &str {
        if self.title.trim().is_empty() {
            if self.id.is_empty() { "Unknown" } else { &self.id }
        } else {
            &self.title
        }
    }
}

// ============================================================================
// Playlists
// ============================================================================

/// Metadata for a playlist, or for a single video opened from a playlist URL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistDescriptor {
    #[serde(default, deserialize_with = "string_or_empty")]
    pub title: String,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub uploader: String,
    #[serde(default, deserialize_with = "non_negative_u64")]
    pub playlist_count: u64,
    #[serde(default)]
    pub videos: Vec<VideoDescriptor>,
    #[serde(default)]
    pub is_from_single_video: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_video_id: Option<String>,
}

impl PlaylistDescriptor {
    /// The entry matching `current_video_id`, if any.
    pub fn current_video(&self) -> Option<&VideoDescriptor> {
        let id = self.current_video_id.as_deref()?;
        self.videos.iter().find(|v| v.id == id)
    }

    /// Selected entries in playlist order.
    pub fn selected_videos(&self) -> Vec<VideoDescriptor> {
        self.videos.iter().filter(|v| v.selected).cloned().collect()
    }

    pub fn selected_count(&self) -> usize {
        self.videos.iter().filter(|v| v.selected).count()
    }

    pub fn select_all(&mut self) {
        self.set_all(true);
    }

    pub fn deselect_all(&mut self) {
        self.set_all(false);
    }

    /// Flip the selection of entry `index`. Returns `false` if out of range.
    pub fn toggle(&mut self, index: usize) -> bool {
        self.videos.get_mut(index).is_some_and(|video| {
            video.selected = !video.selected;
            true
        })
    }

    /// Select exactly the given zero-based indices.
    ///
    /// Returns the indices that were out of range.
    pub fn select_only(&mut self, indices: &[usize]) -> Vec<usize> {
        self.deselect_all();
        indices
            .iter()
            .copied()
            .filter(|&index| match self.videos.get_mut(index) {
                Some(video) => {
                    video.selected = true;
                    false
                }
                None => true,
            })
            .collect()
    }

    fn set_all(&mut self, selected: bool) {
        for video in &mut self.videos {
            video.selected = selected;
        }
    }
}

// ============================================================================
// Resolution result
// ============================================================================

/// Result of resolving a URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaInfo {
    Video(VideoDescriptor),
    Playlist(PlaylistDescriptor),
}

impl MediaInfo {
    pub fn title(&self) -> &str {
        match self {
            Self::Video(video) => video.display_title(),
            Self::Playlist(playlist) => &playlist.title,
        }
    }

    pub const fn is_playlist(&self) -> bool {
        matches!(self, Self::Playlist(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn playlist() -> PlaylistDescriptor {
        PlaylistDescriptor {
            title: "Mix".to_string(),
            uploader: "Someone".to_string(),
            playlist_count: 3,
            videos: vec![
                VideoDescriptor::new("a1", "First"),
                VideoDescriptor::new("b2", "Second"),
                VideoDescriptor::new("c3", "Third"),
            ],
            is_from_single_video: true,
            current_video_id: Some("b2".to_string()),
        }
    }

    #[test]
    fn test_resolution_height_variants() {
        assert_eq!(resolution_height("1920x1080"), Some(1080));
        assert_eq!(resolution_height("720p"), Some(720));
        assert_eq!(resolution_height("480"), Some(480));
        assert_eq!(resolution_height(AUDIO_ONLY), None);
        assert_eq!(resolution_height(""), None);
    }

    #[test]
    fn test_video_defaults_selected_when_missing() {
        let video: VideoDescriptor =
            serde_json::from_str(r#"{"id":"x","title":"T","duration":212.0}"#).unwrap();
        assert!(video.selected);
        assert_eq!(video.duration, 212);
        assert!(video.uploader.is_empty());
    }

    #[test]
    fn test_download_url_synthesized_from_id() {
        let video = VideoDescriptor::new("dQw4w9WgXcQ", "Song");
        assert_eq!(
            video.download_url(),
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ"
        );

        let video = video.with_url("https://youtu.be/dQw4w9WgXcQ");
        assert_eq!(video.download_url(), "https://youtu.be/dQw4w9WgXcQ");
    }

    #[test]
    fn test_current_video_lookup() {
        let list = playlist();
        assert_eq!(list.current_video().map(|v| v.title.as_str()), Some("Second"));

        let mut list = list;
        list.current_video_id = Some("zz".to_string());
        assert!(list.current_video().is_none());
    }

    #[test]
    fn test_selection_helpers() {
        let mut list = playlist();
        assert_eq!(list.selected_count(), 3);

        list.deselect_all();
        assert!(list.selected_videos().is_empty());

        assert!(list.toggle(2));
        assert!(!list.toggle(9));
        let ids: Vec<_> = list.selected_videos().into_iter().map(|v| v.id).collect();
        assert_eq!(ids, vec!["c3"]);

        let missing = list.select_only(&[0, 1, 7]);
        assert_eq!(missing, vec![7]);
        assert_eq!(list.selected_count(), 2);

        list.select_all();
        assert_eq!(list.selected_count(), 3);
    }

    #[test]
    fn test_display_title_fallbacks() {
        assert_eq!(VideoDescriptor::new("id9", "  ").display_title(), "id9");
        assert_eq!(VideoDescriptor::new("", "").display_title(), "Unknown");
    }
}

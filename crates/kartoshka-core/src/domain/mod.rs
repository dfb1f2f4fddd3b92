//! Domain types for media metadata and download options.

mod media;
mod options;
mod serde_lenient;

pub use media::{
    AUDIO_ONLY, FormatDescriptor, MediaInfo, PlaylistDescriptor, VideoDescriptor,
    resolution_height,
};
pub use options::{OptionError, OutputFormat, Quality};

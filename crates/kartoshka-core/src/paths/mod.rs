//! Filesystem locations and directory checks.

mod ensure;
mod error;

use std::path::PathBuf;

pub use ensure::{ensure_directory, verify_writable};
pub use error::PathError;

/// Folder created under the platform download directory.
pub const DOWNLOAD_SUBDIR: &str = "Kartoshka";

/// Default destination: `<platform downloads>/Kartoshka`.
///
/// Falls back to `~/Downloads/Kartoshka` when the platform reports no
/// download directory.
pub fn default_download_dir() -> Result<PathBuf, PathError> {
    dirs::download_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join("Downloads")))
        .map(|dir| dir.join(DOWNLOAD_SUBDIR))
        .ok_or(PathError::NoDownloadDir)
}

//! Finding the dispatcher executable.

use std::env;
use std::path::{Path, PathBuf};

use kartoshka_core::OperationError;
use thiserror::Error;

/// File name of the dispatcher binary on this platform.
pub const BACKEND_BIN: &str = "kartoshka-backend";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LocateError {
    #[error("Backend application not found at {0}")]
    Missing(PathBuf),

    #[error("Backend application not found")]
    NotFound,
}

impl From<LocateError> for OperationError {
    fn from(err: LocateError) -> Self {
        Self::fault(err.to_string())
    }
}

fn backend_file_name() -> String {
    format!("{BACKEND_BIN}{}", env::consts::EXE_SUFFIX)
}

/// Locate the dispatcher.
///
/// Order: the explicit path, a `kartoshka-backend` next to the running
/// executable, then `PATH`.
pub fn locate_backend(explicit: Option<&Path>) -> Result<PathBuf, LocateError> {
    if let Some(path) = explicit {
        return if path.is_file() {
            Ok(path.to_path_buf())
        } else {
            Err(LocateError::Missing(path.to_path_buf()))
        };
    }

    if let Some(sibling) = env::current_exe()
        .ok()
        .and_then(|exe| sibling_backend(&exe))
    {
        tracing::debug!(path = %sibling.display(), "Using backend next to executable");
        return Ok(sibling);
    }

    which::which(BACKEND_BIN).map_err(|_| LocateError::NotFound)
}

fn sibling_backend(exe: &Path) -> Option<PathBuf> {
    let candidate = exe.parent()?.join(backend_file_name());
    candidate.is_file().then_some(candidate)
}

//! Controller settings and validation.
//!
//! All fields are optional so that CLI flags, environment variables and
//! defaults can be layered. Readers go through the `effective_*` accessors.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::{OutputFormat, Quality};
use crate::paths::{PathError, default_download_dir};

/// Default timeout for metadata lookups.
pub const DEFAULT_INFO_TIMEOUT_SECS: u64 = 30;

/// Default timeout for one-shot downloads.
pub const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 300;

/// Default silence allowed on a streaming download before it is killed.
pub const DEFAULT_STALL_TIMEOUT_SECS: u64 = 120;

/// Lower bound for the stall timeout. The dispatcher reports a heartbeat
/// line every 30 s while the tool is quiet.
pub const MIN_STALL_TIMEOUT_SECS: u64 = 45;

/// Upper bound for any configured timeout (one day).
pub const MAX_TIMEOUT_SECS: u64 = 24 * 60 * 60;

pub const ENV_BACKEND: &str = "KARTOSHKA_BACKEND";
pub const ENV_DOWNLOAD_DIR: &str = "KARTOSHKA_DOWNLOAD_DIR";
pub const ENV_QUALITY: &str = "KARTOSHKA_QUALITY";
pub const ENV_FORMAT: &str = "KARTOSHKA_FORMAT";
pub const ENV_INFO_TIMEOUT: &str = "KARTOSHKA_INFO_TIMEOUT_SECS";
pub const ENV_DOWNLOAD_TIMEOUT: &str = "KARTOSHKA_DOWNLOAD_TIMEOUT_SECS";
pub const ENV_STALL_TIMEOUT: &str = "KARTOSHKA_STALL_TIMEOUT_SECS";

/// Controller settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Explicit path to the dispatcher binary.
    pub backend_path: Option<PathBuf>,

    /// Where downloads land.
    pub download_dir: Option<PathBuf>,

    /// Quality token (`best`, `worst`, `1920x1080`, ...).
    pub default_quality: Option<String>,

    /// `mp4` or `mp3`.
    pub default_format: Option<String>,

    pub info_timeout_secs: Option<u64>,
    pub download_timeout_secs: Option<u64>,
    pub stall_timeout_secs: Option<u64>,
}

impl Settings {
    /// Create settings with every default filled in, except paths.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self {
            backend_path: None,
            download_dir: None,
            default_quality: Some("best".to_string()),
            default_format: Some("mp4".to_string()),
            info_timeout_secs: Some(DEFAULT_INFO_TIMEOUT_SECS),
            download_timeout_secs: Some(DEFAULT_DOWNLOAD_TIMEOUT_SECS),
            stall_timeout_secs: Some(DEFAULT_STALL_TIMEOUT_SECS),
        }
    }

    /// Read `KARTOSHKA_*` variables from the process environment.
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through an arbitrary variable lookup.
    ///
    /// Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let number = |key: &'static str| -> Result<Option<u64>, SettingsError> {
            get(key)
                .map(|raw| {
                    raw.trim()
                        .parse::<u64>()
                        .map_err(|_| SettingsError::InvalidNumber { var: key, value: raw })
                })
                .transpose()
        };

        Ok(Self {
            backend_path: get(ENV_BACKEND).map(PathBuf::from),
            download_dir: get(ENV_DOWNLOAD_DIR).map(PathBuf::from),
            default_quality: get(ENV_QUALITY),
            default_format: get(ENV_FORMAT),
            info_timeout_secs: number(ENV_INFO_TIMEOUT)?,
            download_timeout_secs: number(ENV_DOWNLOAD_TIMEOUT)?,
            stall_timeout_secs: number(ENV_STALL_TIMEOUT)?,
        })
    }

    /// Overlay every field that is set in `other`.
    pub fn merge(&mut self, other: &Self) {
        if let Some(ref path) = other.backend_path {
            self.backend_path = Some(path.clone());
        }
        if let Some(ref dir) = other.download_dir {
            self.download_dir = Some(dir.clone());
        }
        if let Some(ref quality) = other.default_quality {
            self.default_quality = Some(quality.clone());
        }
        if let Some(ref format) = other.default_format {
            self.default_format = Some(format.clone());
        }
        if other.info_timeout_secs.is_some() {
            self.info_timeout_secs = other.info_timeout_secs;
        }
        if other.download_timeout_secs.is_some() {
            self.download_timeout_secs = other.download_timeout_secs;
        }
        if other.stall_timeout_secs.is_some() {
            self.stall_timeout_secs = other.stall_timeout_secs;
        }
    }

    #[must_use]
    pub fn effective_info_timeout(&self) -> Duration {
        Duration::from_secs(self.info_timeout_secs.unwrap_or(DEFAULT_INFO_TIMEOUT_SECS))
    }

    #[must_use]
    pub fn effective_download_timeout(&self) -> Duration {
        Duration::from_secs(
            self.download_timeout_secs
                .unwrap_or(DEFAULT_DOWNLOAD_TIMEOUT_SECS),
        )
    }

    #[must_use]
    pub fn effective_stall_timeout(&self) -> Duration {
        Duration::from_secs(self.stall_timeout_secs.unwrap_or(DEFAULT_STALL_TIMEOUT_SECS))
    }

    pub fn effective_quality(&self) -> Result<Quality, SettingsError> {
        self.default_quality
            .as_deref()
            .map_or(Ok(Quality::Best), |q| {
                q.parse().map_err(|_| SettingsError::InvalidQuality)
            })
    }

    pub fn effective_format(&self) -> Result<OutputFormat, SettingsError> {
        self.default_format
            .as_deref()
            .map_or(Ok(OutputFormat::Mp4), |f| {
                f.parse()
                    .map_err(|_| SettingsError::InvalidFormat(f.to_string()))
            })
    }

    pub fn effective_download_dir(&self) -> Result<PathBuf, PathError> {
        match self.download_dir {
            Some(ref dir) => Ok(dir.clone()),
            None => default_download_dir(),
        }
    }
}

/// Settings validation error.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum SettingsError {
    #[error("{name} must be between 1 and 86400 seconds, got {value}")]
    InvalidTimeout { name: &'static str, value: u64 },

    #[error("stall timeout must be at least {MIN_STALL_TIMEOUT_SECS} seconds, got {0}")]
    StallTimeoutTooShort(u64),

    #[error("{var} must be a whole number of seconds, got '{value}'")]
    InvalidNumber { var: &'static str, value: String },

    #[error("Unsupported format '{0}' (expected mp4 or mp3)")]
    InvalidFormat(String),

    #[error("Quality cannot be empty")]
    InvalidQuality,

    #[error("Download directory cannot be empty")]
    EmptyDownloadDir,
}

/// Validate settings values.
pub fn validate_settings(settings: &Settings) -> Result<(), SettingsError> {
    let timeouts = [
        ("info timeout", settings.info_timeout_secs),
        ("download timeout", settings.download_timeout_secs),
        ("stall timeout", settings.stall_timeout_secs),
    ];
    for (name, value) in timeouts {
        if let Some(value) = value {
            if !(1..=MAX_TIMEOUT_SECS).contains(&value) {
                return Err(SettingsError::InvalidTimeout { name, value });
            }
        }
    }

    if let Some(stall) = settings.stall_timeout_secs {
        if stall < MIN_STALL_TIMEOUT_SECS {
            return Err(SettingsError::StallTimeoutTooShort(stall));
        }
    }

    settings.effective_format()?;
    settings.effective_quality()?;

    if settings
        .download_dir
        .as_ref()
        .is_some_and(|p| p.as_os_str().is_empty())
    {
        return Err(SettingsError::EmptyDownloadDir);
    }

    Ok(())
}

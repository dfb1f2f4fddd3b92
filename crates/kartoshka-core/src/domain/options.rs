//! Quality selectors and output formats.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use super::media::resolution_height;

/// Errors from parsing user-supplied download options.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OptionError {
    #[error("Quality must not be empty")]
    EmptyQuality,

    #[error("Unsupported format '{0}' (expected mp4 or mp3)")]
    UnsupportedFormat(String),
}

/// Requested video quality.
///
/// `best` and `worst` are keywords. Anything else is kept verbatim as a
/// resolution label such as `"1920x1080"` or `"720p"`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Quality {
    #[default]
    Best,
    Worst,
    Resolution(String),
}

impl Quality {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Best => "best",
            Self::Worst => "worst",
            Self::Resolution(label) => label,
        }
    }

    /// Target height for a resolution label, `None` for keywords or labels
    /// without a parseable height.
    pub fn height(&self) -> Option<u32> {
        match self {
            Self::Resolution(label) => resolution_height(label),
            Self::Best | Self::Worst => None,
        }
    }
}

impl FromStr for Quality {
    type Err = OptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim();
        if token.is_empty() {
            Err(OptionError::EmptyQuality)
        } else if token.eq_ignore_ascii_case("best") {
            Ok(Self::Best)
        } else if token.eq_ignore_ascii_case("worst") {
            Ok(Self::Worst)
        } else {
            Ok(Self::Resolution(token.to_string()))
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Container the downloaded media ends up in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    #[default]
    Mp4,
    Mp3,
}

impl OutputFormat {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mp4 => "mp4",
            Self::Mp3 => "mp3",
        }
    }

    pub const fn is_audio(self) -> bool {
        matches!(self, Self::Mp3)
    }
}

impl FromStr for OutputFormat {
    type Err = OptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mp4" => Ok(Self::Mp4),
            "mp3" => Ok(Self::Mp3),
            _ => Err(OptionError::UnsupportedFormat(s.trim().to_string())),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

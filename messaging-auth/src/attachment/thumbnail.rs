//! Thumbnail size classes.

use std::fmt;
use std::str::FromStr;

/// Thumbnail dimensions the attachment host can render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThumbnailSize {
    Small,
    Medium,
    Large,
}

impl ThumbnailSize {
    /// The `<W>x<H>` value of the `thumbnail` query parameter.
    pub fn dimensions(&self) -> &'static str {
        match self {
            ThumbnailSize::Small => "100x100",
            ThumbnailSize::Medium => "200x200",
            ThumbnailSize::Large => "400x400",
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct ThumbnailSizeParseError;

impl fmt::Display for ThumbnailSizeParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "expected one of: small, medium, large")
    }
}

impl std::error::Error for ThumbnailSizeParseError {}

impl FromStr for ThumbnailSize {
    type Err = ThumbnailSizeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "small" => Ok(ThumbnailSize::Small),
            "medium" => Ok(ThumbnailSize::Medium),
            "large" => Ok(ThumbnailSize::Large),
            _ => Err(ThumbnailSizeParseError),
        }
    }
}

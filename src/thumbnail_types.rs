use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Rendition sizes Immich serves for an asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThumbnailSize {
    #[default]
    Thumbnail, // grid tile, ~250px
    Preview, // lightbox, ~1440px
}

impl ThumbnailSize {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThumbnailSize::Thumbnail => "thumbnail",
            ThumbnailSize::Preview => "preview",
        }
    }
}

impl FromStr for ThumbnailSize {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "thumbnail" => Ok(ThumbnailSize::Thumbnail),
            "preview" => Ok(ThumbnailSize::Preview),
            _ => Err(()),
        }
    }
}

impl fmt::Display for ThumbnailSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Thumbnails above this size are recompressed before being served.
pub const MAX_THUMBNAIL_BYTES: usize = 5 * 1024 * 1024;

/// JPEG qualities tried in order when shrinking an oversized thumbnail.
pub const RECOMPRESS_QUALITIES: [u8; 4] = [85, 75, 65, 55];

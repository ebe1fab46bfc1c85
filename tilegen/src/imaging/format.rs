//! Output tile formats.

use std::fmt;
use std::str::FromStr;

use image::ImageFormat;

/// Encoding used for every tile of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TileFormat {
    /// Lossless PNG with alpha (default)
    #[default]
    Png,
    /// Baseline JPEG; transparency is flattened to black
    Jpg,
    /// Lossless WebP with alpha
    Webp,
    /// AVIF with alpha
    Avif,
}

impl TileFormat {
    /// All supported formats.
    pub const ALL: [TileFormat; 4] = [
        TileFormat::Png,
        TileFormat::Jpg,
        TileFormat::Webp,
        TileFormat::Avif,
    ];

    /// File extension used in the output layout, without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            TileFormat::Png => "png",
            TileFormat::Jpg => "jpg",
            TileFormat::Webp => "webp",
            TileFormat::Avif => "avif",
        }
    }

    /// Whether the encoding keeps an alpha channel.
    pub fn supports_alpha(&self) -> bool {
        !matches!(self, TileFormat::Jpg)
    }

    /// Matching `image` crate encoder.
    pub fn image_format(&self) -> ImageFormat {
        match self {
            TileFormat::Png => ImageFormat::Png,
            TileFormat::Jpg => ImageFormat::Jpeg,
            TileFormat::Webp => ImageFormat::WebP,
            TileFormat::Avif => ImageFormat::Avif,
        }
    }
}

impl fmt::Display for TileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for TileFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "png" => Ok(TileFormat::Png),
            "jpg" | "jpeg" => Ok(TileFormat::Jpg),
            "webp" => Ok(TileFormat::Webp),
            "avif" => Ok(TileFormat::Avif),
            other => Err(format!(
                "unknown tile format '{}' (expected png, jpg, webp or avif)",
                other
            )),
        }
    }
}

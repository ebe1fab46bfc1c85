//! Image processing abstractions for tile rendering.
//!
//! Workers never touch pixels directly; they drive an [`ImageProcessor`]
//! through four steps per tile and hand the encoded bytes to a store.
//!
//! ```text
//! source ──extract_region──► window ──resample──► scaled
//!                                                   │
//!        encoded ◄──encode── tile ◄──composite_on_canvas
//! ```
//!
//! # Available Processors
//!
//! - [`RasterProcessor`] - Decodes the source once with the `image` crate and
//!   serves every worker from the same read-only buffer
//!
//! Tests substitute their own processor to observe which regions were
//! requested without doing any pixel work.

mod format;
mod raster;

pub use format::TileFormat;
pub use raster::RasterProcessor;

use std::path::{Path, PathBuf};

use image::ImageReader;

use crate::pyramid::{Dimensions, SourceWindow};

/// Errors raised by image processing operations.
#[derive(Debug, thiserror::Error)]
pub enum ImagingError {
    /// The source image could not be read or has no pixels.
    #[error("Invalid image {}: {reason}", .path.display())]
    InvalidImage { path: PathBuf, reason: String },

    /// A requested region lies outside the source image.
    #[error(
        "Region {}x{}+{}+{} is outside the {}×{} source",
        .window.width, .window.height, .window.x, .window.y, .width, .height
    )]
    RegionOutOfBounds {
        window: SourceWindow,
        width: u32,
        height: u32,
    },

    /// Encoding a tile failed.
    #[error("Failed to encode {format} tile: {reason}")]
    Encode { format: TileFormat, reason: String },

    /// Any other processing failure.
    #[error("Image processing failed: {0}")]
    Processing(String),
}

/// Pixel operations needed to render one tile.
///
/// Implementations must be thread-safe (`Send + Sync`): one instance is
/// shared by every worker of a run. The source image is read-only for the
/// lifetime of the processor.
pub trait ImageProcessor: Send + Sync + 'static {
    /// Intermediate image handed between steps.
    type Image: Send;

    /// Copies `window` out of the source image.
    fn extract_region(&self, window: SourceWindow) -> Result<Self::Image, ImagingError>;

    /// Scales `image` to exactly `width`×`height` without smoothing.
    ///
    /// Sampling must be nearest-neighbour so adjacent tiles line up without
    /// blurring across tile boundaries.
    fn resample(
        &self,
        image: Self::Image,
        width: u32,
        height: u32,
    ) -> Result<Self::Image, ImagingError>;

    /// Places `image` on a transparent `canvas_size`×`canvas_size` canvas.
    ///
    /// Offsets may be negative or push the image past the canvas edge; the
    /// overhang is clipped.
    fn composite_on_canvas(
        &self,
        image: Self::Image,
        canvas_size: u32,
        offset_x: i64,
        offset_y: i64,
    ) -> Result<Self::Image, ImagingError>;

    /// A fully transparent `size`×`size` image.
    fn blank_canvas(&self, size: u32) -> Self::Image;

    /// Encodes `image` in the given tile format.
    fn encode(&self, image: &Self::Image, format: TileFormat) -> Result<Vec<u8>, ImagingError>;
}

/// Reads the dimensions of an image without decoding its pixels.
///
/// # Errors
///
/// Returns [`ImagingError::InvalidImage`] if the file cannot be opened, its
/// format is not recognised, or either dimension is zero.
pub fn probe(path: &Path) -> Result<Dimensions, ImagingError> {
    let invalid = |reason: String| ImagingError::InvalidImage {
        path: path.to_path_buf(),
        reason,
    };

    let reader = ImageReader::open(path)
        .map_err(|e| invalid(e.to_string()))?
        .with_guessed_format()
        .map_err(|e| invalid(e.to_string()))?;
    let (width, height) = reader
        .into_dimensions()
        .map_err(|e| invalid(e.to_string()))?;

    if width == 0 || height == 0 {
        return Err(invalid(format!("empty image ({}×{})", width, height)));
    }

    Ok(Dimensions::new(width, height))
}

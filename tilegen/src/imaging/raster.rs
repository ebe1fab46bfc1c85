//! Raster processor backed by the `image` crate.

use std::io::Cursor;
use std::path::Path;

use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageReader, RgbaImage};
use tracing::debug;

use super::{ImageProcessor, ImagingError, TileFormat};
use crate::pyramid::{Dimensions, SourceWindow};

/// Renders tiles from a fully decoded RGBA source image.
///
/// The source is decoded once when the processor is opened; every worker
/// then reads from the same buffer, which is never written after decoding.
///
/// # Example
///
/// ```
/// use image::{Rgba, RgbaImage};
/// use tilegen::imaging::{ImageProcessor, RasterProcessor};
/// use tilegen::pyramid::SourceWindow;
///
/// let processor = RasterProcessor::from_image(RgbaImage::from_pixel(8, 8, Rgba([9, 9, 9, 255])));
/// let window = SourceWindow { x: 2, y: 2, width: 4, height: 4 };
/// let region = processor.extract_region(window).unwrap();
/// assert_eq!(region.dimensions(), (4, 4));
/// ```
#[derive(Debug, Clone)]
pub struct RasterProcessor {
    source: RgbaImage,
}

impl RasterProcessor {
    /// Decodes the image at `path`.
    ///
    /// Decoder allocation limits are lifted so very large sources load.
    pub fn open(path: &Path) -> Result<Self, ImagingError> {
        let invalid = |reason: String| ImagingError::InvalidImage {
            path: path.to_path_buf(),
            reason,
        };

        let mut reader = ImageReader::open(path)
            .map_err(|e| invalid(e.to_string()))?
            .with_guessed_format()
            .map_err(|e| invalid(e.to_string()))?;
        reader.no_limits();

        let decoded = reader.decode().map_err(|e| invalid(e.to_string()))?;
        debug!(
            path = %path.display(),
            width = decoded.width(),
            height = decoded.height(),
            "Decoded source image"
        );

        Ok(Self::from_image(decoded.into_rgba8()))
    }

    /// Wraps an already decoded image.
    pub fn from_image(source: RgbaImage) -> Self {
        Self { source }
    }

    pub fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.source.width(), self.source.height())
    }
}

impl ImageProcessor for RasterProcessor {
    type Image = RgbaImage;

    fn extract_region(&self, window: SourceWindow) -> Result<RgbaImage, ImagingError> {
        let right = u64::from(window.x) + u64::from(window.width);
        let bottom = u64::from(window.y) + u64::from(window.height);
        if window.width == 0
            || window.height == 0
            || right > u64::from(self.source.width())
            || bottom > u64::from(self.source.height())
        {
            return Err(ImagingError::RegionOutOfBounds {
                window,
                width: self.source.width(),
                height: self.source.height(),
            });
        }

        Ok(imageops::crop_imm(
            &self.source,
            window.x,
            window.y,
            window.width,
            window.height,
        )
        .to_image())
    }

    fn resample(
        &self,
        image: RgbaImage,
        width: u32,
        height: u32,
    ) -> Result<RgbaImage, ImagingError> {
        if width == 0 || height == 0 {
            return Err(ImagingError::Processing(format!(
                "cannot resample to {}×{}",
                width, height
            )));
        }
        if image.dimensions() == (width, height) {
            return Ok(image);
        }
        Ok(imageops::resize(&image, width, height, FilterType::Nearest))
    }

    fn composite_on_canvas(
        &self,
        image: RgbaImage,
        canvas_size: u32,
        offset_x: i64,
        offset_y: i64,
    ) -> Result<RgbaImage, ImagingError> {
        let mut canvas = self.blank_canvas(canvas_size);
        imageops::replace(&mut canvas, &image, offset_x, offset_y);
        Ok(canvas)
    }

    fn blank_canvas(&self, size: u32) -> RgbaImage {
        RgbaImage::new(size, size)
    }

    fn encode(&self, image: &RgbaImage, format: TileFormat) -> Result<Vec<u8>, ImagingError> {
        let mut buffer = Cursor::new(Vec::new());
        let result = if format.supports_alpha() {
            image.write_to(&mut buffer, format.image_format())
        } else {
            DynamicImage::ImageRgba8(image.clone())
                .into_rgb8()
                .write_to(&mut buffer, format.image_format())
        };
        result.map_err(|e| ImagingError::Encode {
            format,
            reason: e.to_string(),
        })?;
        Ok(buffer.into_inner())
    }
}

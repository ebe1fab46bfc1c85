//! Tile pyramid planning.
//!
//! Pure functions that turn an image size and tiling parameters into the
//! number of zoom levels and the complete list of tiles to generate.
//!
//! # Geometry
//!
//! Level `max_zoom` is the finest level: one tile edge covers
//! `tile_size / max_magnification` source pixels. Every level above it
//! doubles the coverage until, at level 0, the whole image fits in a single
//! tile.
//!
//! ```text
//! z = 0          z = 1              z = 2
//! ┌───────┐      ┌───┬───┐          ┌─┬─┬─┬─┐
//! │       │      │   │   │          ├─┼─┼─┼─┤
//! │       │      ├───┼───┤          ├─┼─┼─┼─┤
//! └───────┘      └───┴───┘          └─┴─┴─┴─┘
//! coverage 1024  coverage 512       coverage 256
//! ```
//!
//! # Example
//!
//! ```
//! use tilegen::pyramid::PyramidConfig;
//!
//! let pyramid = PyramidConfig::new(256, 1, 1000, 600).unwrap();
//! assert_eq!(pyramid.max_zoom(), 2);
//! assert_eq!(pyramid.grid_size(2), (4, 3));
//! assert_eq!(pyramid.tasks().len(), 17);
//! ```

mod types;
mod window;

pub use types::{Dimensions, PyramidError, RenderPlan, SourceWindow, TileTask};

/// Calculates the deepest zoom level for an image.
///
/// This is `ceil(log2(max(width, height) * max_magnification / tile_size))`,
/// evaluated exactly as the smallest `z` for which
/// `tile_size * 2^z >= max(width, height) * max_magnification`. Images that
/// already fit in one tile get level 0.
///
/// # Errors
///
/// Returns an error if any argument is zero.
pub fn calculate_max_zoom(
    max_magnification: u32,
    tile_size: u32,
    width: u32,
    height: u32,
) -> Result<u32, PyramidError> {
    if width == 0 || height == 0 {
        return Err(PyramidError::InvalidDimensions { width, height });
    }
    if tile_size == 0 {
        return Err(PyramidError::InvalidTileSize(tile_size));
    }
    if max_magnification == 0 {
        return Err(PyramidError::InvalidMagnification(max_magnification));
    }

    let target = u128::from(width.max(height)) * u128::from(max_magnification);
    let mut span = u128::from(tile_size);
    let mut zoom = 0;
    while span < target {
        span *= 2;
        zoom += 1;
    }
    Ok(zoom)
}

/// Source pixels covered by one tile edge at level `z`.
///
/// Arguments are assumed to have been validated by
/// [`calculate_max_zoom`].
#[inline]
pub fn coverage(tile_size: u32, max_magnification: u32, max_zoom: u32, z: u32) -> f64 {
    let levels_below = max_zoom as i32 - z as i32;
    f64::from(tile_size) / f64::from(max_magnification) * 2.0_f64.powi(levels_below)
}

/// Columns and rows of the tile grid at level `z`.
fn grid_at(width: u32, height: u32, coverage: f64) -> (u32, u32) {
    let cols = (f64::from(width) / coverage).ceil() as u32;
    let rows = (f64::from(height) / coverage).ceil() as u32;
    (cols, rows)
}

/// Builds the ordered list of every tile in the pyramid.
///
/// Tiles are emitted level by level (0 first), then column by column, then
/// row by row. Edge tiles whose source window is narrower than a full tile
/// are included; trimming them is the worker's concern.
pub fn build_tasks(
    width: u32,
    height: u32,
    max_zoom: u32,
    tile_size: u32,
    max_magnification: u32,
) -> Vec<TileTask> {
    let mut tasks = Vec::new();
    for z in 0..=max_zoom {
        let coverage = coverage(tile_size, max_magnification, max_zoom, z);
        let (cols, rows) = grid_at(width, height, coverage);
        tasks.reserve(cols as usize * rows as usize);
        for x in 0..cols {
            for y in 0..rows {
                tasks.push(TileTask { z, x, y });
            }
        }
    }
    tasks
}

/// Immutable description of one pyramid.
///
/// Built once per run from the source image size and the tiling options,
/// then shared read-only with every worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PyramidConfig {
    tile_size: u32,
    max_magnification: u32,
    image_width: u32,
    image_height: u32,
    max_zoom: u32,
}

impl PyramidConfig {
    /// Creates a pyramid description, deriving the deepest zoom level.
    ///
    /// # Arguments
    ///
    /// * `tile_size` - Tile edge in pixels
    /// * `max_magnification` - Source pixel density multiplier at the deepest level
    /// * `image_width` - Source image width in pixels
    /// * `image_height` - Source image height in pixels
    pub fn new(
        tile_size: u32,
        max_magnification: u32,
        image_width: u32,
        image_height: u32,
    ) -> Result<Self, PyramidError> {
        let max_zoom =
            calculate_max_zoom(max_magnification, tile_size, image_width, image_height)?;
        Ok(Self {
            tile_size,
            max_magnification,
            image_width,
            image_height,
            max_zoom,
        })
    }

    /// Creates a pyramid description from probed image dimensions.
    pub fn for_image(
        tile_size: u32,
        max_magnification: u32,
        dimensions: Dimensions,
    ) -> Result<Self, PyramidError> {
        Self::new(
            tile_size,
            max_magnification,
            dimensions.width,
            dimensions.height,
        )
    }

    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    pub fn max_magnification(&self) -> u32 {
        self.max_magnification
    }

    pub fn image_width(&self) -> u32 {
        self.image_width
    }

    pub fn image_height(&self) -> u32 {
        self.image_height
    }

    pub fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.image_width, self.image_height)
    }

    /// Deepest (most magnified) zoom level.
    pub fn max_zoom(&self) -> u32 {
        self.max_zoom
    }

    /// Source pixels covered by one tile edge at level `z`.
    pub fn coverage(&self, z: u32) -> f64 {
        coverage(self.tile_size, self.max_magnification, self.max_zoom, z)
    }

    /// `(columns, rows)` of the tile grid at level `z`.
    pub fn grid_size(&self, z: u32) -> (u32, u32) {
        grid_at(self.image_width, self.image_height, self.coverage(z))
    }

    /// Total number of tiles across all levels, without building the list.
    pub fn task_count(&self) -> usize {
        (0..=self.max_zoom)
            .map(|z| {
                let (cols, rows) = self.grid_size(z);
                cols as usize * rows as usize
            })
            .sum()
    }

    /// Every tile of the pyramid in planning order.
    pub fn tasks(&self) -> Vec<TileTask> {
        build_tasks(
            self.image_width,
            self.image_height,
            self.max_zoom,
            self.tile_size,
            self.max_magnification,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    #[test]
    fn test_max_zoom_landscape_image() {
        // ceil(log2(1000 / 256)) = ceil(1.97) = 2
        assert_eq!(calculate_max_zoom(1, 256, 1000, 600), Ok(2));
    }

    #[test]
    fn test_max_zoom_exact_fit_is_zero() {
        assert_eq!(calculate_max_zoom(1, 256, 256, 256), Ok(0));
    }

    #[test]
    fn test_max_zoom_smaller_than_tile_is_zero() {
        assert_eq!(calculate_max_zoom(1, 256, 100, 40), Ok(0));
    }

    #[test]
    fn test_max_zoom_exact_power_of_two() {
        assert_eq!(calculate_max_zoom(1, 256, 512, 10), Ok(1));
        assert_eq!(calculate_max_zoom(1, 256, 513, 10), Ok(2));
    }

    #[test]
    fn test_max_zoom_magnification_adds_levels() {
        assert_eq!(calculate_max_zoom(2, 256, 1000, 600), Ok(3));
        assert_eq!(calculate_max_zoom(4, 256, 1000, 600), Ok(4));
        // Non power-of-two magnification: 1000 * 3 / 256 = 11.7 -> 4
        assert_eq!(calculate_max_zoom(3, 256, 1000, 600), Ok(4));
    }

    #[test]
    fn test_max_zoom_uses_longest_edge() {
        assert_eq!(
            calculate_max_zoom(1, 256, 600, 1000),
            calculate_max_zoom(1, 256, 1000, 600)
        );
    }

    #[test]
    fn test_max_zoom_rejects_zero_dimensions() {
        assert_eq!(
            calculate_max_zoom(1, 256, 0, 600),
            Err(PyramidError::InvalidDimensions {
                width: 0,
                height: 600
            })
        );
        assert!(matches!(
            calculate_max_zoom(1, 256, 600, 0),
            Err(PyramidError::InvalidDimensions { .. })
        ));
    }

    #[test]
    fn test_max_zoom_rejects_zero_tile_size_and_magnification() {
        assert_eq!(
            calculate_max_zoom(1, 0, 10, 10),
            Err(PyramidError::InvalidTileSize(0))
        );
        assert_eq!(
            calculate_max_zoom(0, 256, 10, 10),
            Err(PyramidError::InvalidMagnification(0))
        );
    }

    #[test]
    fn test_max_zoom_huge_image_does_not_overflow() {
        assert_eq!(calculate_max_zoom(u32::MAX, 1, u32::MAX, 1), Ok(64));
    }

    #[test]
    fn test_coverage_halves_per_level() {
        let pyramid = PyramidConfig::new(256, 1, 1000, 600).unwrap();
        assert_eq!(pyramid.coverage(2), 256.0);
        assert_eq!(pyramid.coverage(1), 512.0);
        assert_eq!(pyramid.coverage(0), 1024.0);
    }

    #[test]
    fn test_coverage_with_magnification() {
        let pyramid = PyramidConfig::new(256, 2, 1000, 600).unwrap();
        assert_eq!(pyramid.max_zoom(), 3);
        assert_eq!(pyramid.coverage(3), 128.0);
        assert_eq!(pyramid.coverage(0), 1024.0);
    }

    #[test]
    fn test_landscape_scenario() {
        let pyramid = PyramidConfig::new(256, 1, 1000, 600).unwrap();
        assert_eq!(pyramid.grid_size(0), (1, 1));
        assert_eq!(pyramid.grid_size(1), (2, 2));
        assert_eq!(pyramid.grid_size(2), (4, 3));

        let tasks = pyramid.tasks();
        assert_eq!(tasks.len(), 1 + 4 + 12);
        assert_eq!(tasks.iter().filter(|t| t.z == 2).count(), 12);
        assert_eq!(pyramid.task_count(), tasks.len());
    }

    #[test]
    fn test_single_tile_scenario() {
        let pyramid = PyramidConfig::new(256, 1, 256, 256).unwrap();
        assert_eq!(pyramid.max_zoom(), 0);
        assert_eq!(pyramid.coverage(0), 256.0);
        assert_eq!(pyramid.tasks(), vec![TileTask::new(0, 0, 0)]);
    }

    #[test]
    fn test_build_tasks_order_is_level_column_row() {
        let tasks = build_tasks(1000, 600, 2, 256, 1);
        assert_eq!(
            tasks[..5].to_vec(),
            vec![
                TileTask::new(0, 0, 0),
                TileTask::new(1, 0, 0),
                TileTask::new(1, 0, 1),
                TileTask::new(1, 1, 0),
                TileTask::new(1, 1, 1),
            ]
        );
        assert_eq!(tasks[5], TileTask::new(2, 0, 0));
        assert_eq!(tasks[6], TileTask::new(2, 0, 1));
        assert_eq!(tasks.last(), Some(&TileTask::new(2, 3, 2)));

        let mut sorted = tasks.clone();
        sorted.sort();
        assert_eq!(sorted, tasks);
    }

    #[test]
    fn test_build_tasks_is_stable() {
        assert_eq!(build_tasks(777, 333, 3, 128, 1), build_tasks(777, 333, 3, 128, 1));
    }

    #[test]
    fn test_for_image_matches_new() {
        let a = PyramidConfig::for_image(256, 1, Dimensions::new(1000, 600)).unwrap();
        let b = PyramidConfig::new(256, 1, 1000, 600).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.dimensions(), Dimensions::new(1000, 600));
    }

    proptest! {
        #[test]
        fn prop_max_zoom_is_minimal(
            width in 1u32..20_000,
            height in 1u32..20_000,
            tile_size in 1u32..1024,
            mag in 1u32..8,
        ) {
            let pyramid = PyramidConfig::new(tile_size, mag, width, height).unwrap();
            let z = pyramid.max_zoom();

            // The whole image fits in one tile at level 0...
            prop_assert_eq!(pyramid.grid_size(0), (1, 1));
            let target = u128::from(width.max(height)) * u128::from(mag);
            prop_assert!(u128::from(tile_size) << z >= target);

            // ...and one level fewer would not be enough.
            if z > 0 {
                prop_assert!(u128::from(tile_size) << (z - 1) < target);
            }
        }

        #[test]
        fn prop_unit_magnification_coverage_bounds(
            width in 1u32..20_000,
            height in 1u32..20_000,
            tile_size in 1u32..1024,
        ) {
            let pyramid = PyramidConfig::new(tile_size, 1, width, height).unwrap();
            let z = pyramid.max_zoom();
            prop_assert!(pyramid.coverage(z) <= f64::from(tile_size));
            if z > 0 {
                prop_assert!(pyramid.coverage(z - 1) > f64::from(tile_size));
            }
        }

        #[test]
        fn prop_tasks_are_unique_and_complete(
            width in 1u32..5_000,
            height in 1u32..5_000,
            tile_size in 16u32..512,
            mag in 1u32..4,
        ) {
            let pyramid = PyramidConfig::new(tile_size, mag, width, height).unwrap();
            let tasks = pyramid.tasks();

            let expected: usize = (0..=pyramid.max_zoom())
                .map(|z| {
                    let (cols, rows) = pyramid.grid_size(z);
                    cols as usize * rows as usize
                })
                .sum();
            prop_assert_eq!(tasks.len(), expected);
            prop_assert_eq!(pyramid.task_count(), expected);

            let unique: HashSet<_> = tasks.iter().copied().collect();
            prop_assert_eq!(unique.len(), tasks.len());

            let deepest = pyramid.max_zoom();
            let (cols, rows) = pyramid.grid_size(deepest);
            let covered = |cells: u32| f64::from(cells) * pyramid.coverage(deepest) + 1e-6;
            prop_assert!(covered(cols) >= f64::from(width));
            prop_assert!(covered(rows) >= f64::from(height));

            for task in &tasks {
                let (cols, rows) = pyramid.grid_size(task.z);
                prop_assert!(task.x < cols && task.y < rows);
            }
        }
    }
}

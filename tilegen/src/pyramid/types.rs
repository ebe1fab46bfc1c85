//! Value types shared by the planner and the dispatch engine.

use std::fmt;

/// Errors raised while planning a tile pyramid.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PyramidError {
    /// Source image has a zero width or height.
    #[error("Invalid image dimensions {width}×{height}")]
    InvalidDimensions { width: u32, height: u32 },

    /// Tile edge length must be at least one pixel.
    #[error("Invalid tile size: {0} (must be at least 1)")]
    InvalidTileSize(u32),

    /// Magnification must be at least 1.
    #[error("Invalid maximum magnification: {0} (must be at least 1)")]
    InvalidMagnification(u32),
}

/// Width and height of a source image in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}×{}", self.width, self.height)
    }
}

/// One tile of the pyramid, addressed by zoom level, column and row.
///
/// Tasks are plain values: two tasks are the same tile exactly when their
/// `(z, x, y)` triples match. Ordering is level-major, then column, then row,
/// which is also the order [`build_tasks`](super::build_tasks) emits them in.
///
/// # Example
///
/// ```
/// use tilegen::pyramid::TileTask;
///
/// let task = TileTask::new(2, 3, 1);
/// assert_eq!(task.to_string(), "2/3/1");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileTask {
    /// Zoom level (0 = coarsest)
    pub z: u32,
    /// Column
    pub x: u32,
    /// Row
    pub y: u32,
}

impl TileTask {
    pub fn new(z: u32, x: u32, y: u32) -> Self {
        Self { z, x, y }
    }
}

impl fmt::Display for TileTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.z, self.x, self.y)
    }
}

/// Region of the source image, in source pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceWindow {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// What a worker has to do for one tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderPlan {
    /// The tile has no source pixels; write the shared transparent tile.
    Blank,

    /// Extract `window`, scale it to `scaled_width`×`scaled_height` and
    /// place it on a blank tile at (`offset_x`, `offset_y`).
    Render {
        window: SourceWindow,
        scaled_width: u32,
        scaled_height: u32,
        offset_x: i64,
        offset_y: i64,
    },
}

impl RenderPlan {
    pub fn is_blank(&self) -> bool {
        matches!(self, RenderPlan::Blank)
    }
}

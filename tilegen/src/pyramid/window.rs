//! Per-tile source windows.
//!
//! Maps one tile onto the source image: which pixels to extract, how large
//! they become once scaled to tile resolution, and where they land on the
//! tile canvas. Windows are clamped to the image bounds, so edge tiles get a
//! smaller window and a canvas that is only partly covered.

use super::{PyramidConfig, RenderPlan, SourceWindow, TileTask};

/// Rounds halves towards positive infinity (`-0.5 → 0`, `0.5 → 1`).
#[inline]
fn round_half_up(value: f64) -> f64 {
    (value + 0.5).floor()
}

impl PyramidConfig {
    /// Computes what a worker must do to produce `task`.
    ///
    /// Returns [`RenderPlan::Blank`] when the clamped window is empty, which
    /// happens for tiles whose grid cell starts at (or rounds onto) the
    /// image's right or bottom edge.
    pub fn render_plan(&self, task: TileTask) -> RenderPlan {
        let coverage = self.coverage(task.z);
        let tile_x = f64::from(task.x);
        let tile_y = f64::from(task.y);

        let sx = round_half_up(tile_x * coverage).max(0.0);
        let sy = round_half_up(tile_y * coverage).max(0.0);
        let ex = round_half_up((tile_x + 1.0) * coverage).min(f64::from(self.image_width()));
        let ey = round_half_up((tile_y + 1.0) * coverage).min(f64::from(self.image_height()));

        let sw = ex - sx;
        let sh = ey - sy;
        if sw <= 0.0 || sh <= 0.0 {
            return RenderPlan::Blank;
        }

        let tile_size = f64::from(self.tile_size());
        // A sliver narrower than one tile pixel still gets one pixel.
        let scaled_width = (round_half_up(sw / coverage * tile_size) as u32).max(1);
        let scaled_height = (round_half_up(sh / coverage * tile_size) as u32).max(1);

        let offset_x = round_half_up((sx - tile_x * coverage) / coverage * tile_size) as i64;
        let offset_y = round_half_up((sy - tile_y * coverage) / coverage * tile_size) as i64;

        RenderPlan::Render {
            window: SourceWindow {
                x: sx as u32,
                y: sy as u32,
                width: sw as u32,
                height: sh as u32,
            },
            scaled_width,
            scaled_height,
            offset_x,
            offset_y,
        }
    }
}

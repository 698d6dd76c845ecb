//! Transform helper between normalized heatmap space and screen pixels.

use crate::data_types::BucketCoord;
use crate::utils::PixelsExt;
use gpui::*;

/// Maps the normalized unit square onto `bounds`; normalized y grows upwards.
#[derive(Clone, Debug)]
pub struct HeatmapTransform {
    pub bounds: Bounds<Pixels>,
}

impl HeatmapTransform {
    pub fn new(bounds: Bounds<Pixels>) -> Self {
        Self { bounds }
    }

    pub fn x_to_screen(&self, nx: f64) -> Pixels {
        self.bounds.origin.x + px(nx as f32 * self.bounds.size.width.as_f32())
    }

    pub fn y_to_screen(&self, ny: f64) -> Pixels {
        self.bounds.origin.y + px((1.0 - ny as f32) * self.bounds.size.height.as_f32())
    }

    pub fn normalized_to_screen(&self, nx: f64, ny: f64) -> Point<Pixels> {
        Point::new(self.x_to_screen(nx), self.y_to_screen(ny))
    }

    pub fn screen_to_normalized(&self, point: Point<Pixels>) -> (f64, f64) {
        let w = self.bounds.size.width.as_f32();
        let h = self.bounds.size.height.as_f32();
        if w <= 0.0 || h <= 0.0 {
            return (0.0, 0.0);
        }
        let nx = (point.x - self.bounds.origin.x).as_f32() / w;
        let ny = 1.0 - (point.y - self.bounds.origin.y).as_f32() / h;
        (nx as f64, ny as f64)
    }

    /// Screen rectangle spanning `[x0, x1] x [y0, y1]` in normalized space.
    pub fn rect(&self, x0: f64, x1: f64, y0: f64, y1: f64) -> Bounds<Pixels> {
        let top_left = self.normalized_to_screen(x0.min(x1), y0.max(y1));
        let bottom_right = self.normalized_to_screen(x0.max(x1), y0.min(y1));
        Bounds::from_corners(top_left, bottom_right)
    }

    /// 2D bucket under `point`, found by binary search over the boundaries.
    pub fn bucket_at(
        &self,
        point: Point<Pixels>,
        x_bounds: &[f64],
        y_bounds: &[f64],
    ) -> Option<BucketCoord> {
        let (nx, ny) = self.screen_to_normalized(point);
        Some(BucketCoord::planar(
            locate(x_bounds, nx)?,
            locate(y_bounds, ny)?,
        ))
    }
}

/// Index `i` with `bounds[i] <= v <= bounds[i + 1]`.
fn locate(bounds: &[f64], v: f64) -> Option<u32> {
    let (first, last) = (*bounds.first()?, *bounds.last()?);
    if bounds.len() < 2 || v < first || v > last {
        return None;
    }
    let idx = bounds.partition_point(|b| *b <= v);
    Some(idx.saturating_sub(1).min(bounds.len() - 2) as u32)
}

//! 2D direct paint: no persistent buffers, each frame walks the model.

use crate::data_types::{Axis, FillStyle};
use crate::gradient::ColorGradient;
use crate::model::HeatmapModel;
use crate::normalizer::BoundaryProvider;
use crate::transform::HeatmapTransform;
use crate::utils::{to_hsla, PixelsExt};
use gpui::*;
use tracing::trace;

/// Surface that accepts filled rectangles.
pub trait QuadPainter {
    fn paint_rect(&mut self, bounds: Bounds<Pixels>, color: Hsla);
}

impl QuadPainter for Window {
    fn paint_rect(&mut self, bounds: Bounds<Pixels>, color: Hsla) {
        self.paint_quad(gpui::fill(bounds, color));
    }
}

pub struct Paint2d<'a> {
    pub fill: FillStyle,
    pub gradient: Option<&'a dyn ColorGradient>,
    pub boundaries: &'a dyn BoundaryProvider,
}

impl<'a> Paint2d<'a> {
    pub fn new(
        fill: FillStyle,
        gradient: Option<&'a dyn ColorGradient>,
        boundaries: &'a dyn BoundaryProvider,
    ) -> Self {
        Self {
            fill,
            gradient,
            boundaries,
        }
    }

    /// Paints every visible bucket of `model` and returns how many were
    /// painted. Frames with a missing collaborator paint nothing, and so do
    /// 3D models.
    pub fn paint(
        &self,
        painter: &mut dyn QuadPainter,
        transform: &HeatmapTransform,
        model: &HeatmapModel,
    ) -> usize {
        let Some(divisions) = model.divisions() else {
            return 0;
        };
        if divisions.is_3d() {
            trace!(?divisions, "skip 2D paint: volume data draws through buffers");
            return 0;
        }
        if matches!(self.fill, FillStyle::None) {
            return 0;
        }
        if matches!(self.fill, FillStyle::Gradient) && self.gradient.is_none() {
            trace!("skip 2D paint: no color gradient");
            return 0;
        }
        let (Some(xb), Some(yb)) = (
            self.boundaries.boundaries(Axis::X, divisions.x),
            self.boundaries.boundaries(Axis::Y, divisions.y),
        ) else {
            trace!("skip 2D paint: boundaries unavailable");
            return 0;
        };

        let origin = transform.bounds.origin;
        let size = transform.bounds.size;
        let mut painted = 0;

        for (coord, value) in model.visible_buckets() {
            let (xi, yi) = (coord.x as usize, coord.y as usize);
            let (Some(x0), Some(x1), Some(y0), Some(y1)) =
                (xb.get(xi), xb.get(xi + 1), yb.get(yi), yb.get(yi + 1))
            else {
                continue;
            };
            let rect = transform.rect(*x0, *x1, *y0, *y1);

            // Culling
            if rect.origin.x > origin.x + size.width
                || rect.origin.x + rect.size.width < origin.x
                || rect.origin.y > origin.y + size.height
                || rect.origin.y + rect.size.height < origin.y
                || rect.size.width.as_f32() <= 0.0
            {
                continue;
            }

            let color = match (self.fill, self.gradient) {
                (FillStyle::Solid(c), _) => c,
                (FillStyle::Gradient, Some(g)) => g.color_at(model.normalized_value(value)),
                _ => continue,
            };
            painter.paint_rect(rect, to_hsla(color));
            painted += 1;
        }
        painted
    }
}

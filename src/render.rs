//! Draw planning for published snapshots (render-thread side).

use crate::buffers::{draw_range, DrawRange, EdgeColors, HeatmapBuffers, IndexFormat, Primitive};
use crate::snapshot::HeatmapSnapshot;
use gpui::Rgba;
use std::sync::Arc;
use tracing::trace;

/// One indexed draw over a sub-range of the layer's buffers.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DrawCall {
    pub primitive: Primitive,
    pub range: DrawRange,
    pub index_format: IndexFormat,
    /// Constant color when the primitive has no color array.
    pub constant_color: Option<Rgba>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DrawPlan {
    pub generation: u64,
    pub fill: Option<DrawCall>,
    pub edges: Option<DrawCall>,
}

impl DrawPlan {
    pub fn is_empty(&self) -> bool {
        self.fill.is_none() && self.edges.is_none()
    }
}

/// Draw calls for this frame, or `None` when the layer cannot draw yet
/// (no data, or buffers missing because a collaborator was not configured).
pub fn plan_draw(snapshot: &HeatmapSnapshot) -> Option<DrawPlan> {
    if !snapshot.model.has_data() {
        trace!(generation = snapshot.generation, "skip draw: no data");
        return None;
    }
    let Some(buffers) = snapshot.buffers.as_deref() else {
        trace!(generation = snapshot.generation, "skip draw: no buffers");
        return None;
    };
    let fill = buffers.fill_indices.as_ref().and_then(|indices| {
        let primitive = buffers.fill_primitive();
        Some(DrawCall {
            primitive,
            range: draw_range(primitive, buffers, &snapshot.model)?,
            index_format: indices.format(),
            constant_color: None,
        })
    });

    let edges = buffers.edge_indices.as_ref().and_then(|indices| {
        let primitive = Primitive::CubeEdge;
        let constant_color = match &buffers.edge_colors {
            Some(EdgeColors::Solid(c)) => Some(*c),
            _ => None,
        };
        Some(DrawCall {
            primitive,
            range: draw_range(primitive, buffers, &snapshot.model)?,
            index_format: indices.format(),
            constant_color,
        })
    });

    Some(DrawPlan {
        generation: snapshot.generation,
        fill,
        edges,
    })
}

/// Render-side record of which buffers are resident on the GPU.
#[derive(Clone, Debug, Default)]
pub struct UploadTracker {
    uploaded: Option<(u64, Arc<HeatmapBuffers>)>,
}

impl UploadTracker {
    /// True when `snapshot` carries buffers other than the uploaded ones.
    /// Snapshots that only moved the filter share buffers and need no upload.
    pub fn needs_upload(&self, snapshot: &HeatmapSnapshot) -> bool {
        match (&snapshot.buffers, &self.uploaded) {
            (Some(next), Some((_, current))) => !Arc::ptr_eq(next, current),
            (Some(_), None) => true,
            (None, _) => false,
        }
    }

    pub fn mark_uploaded(&mut self, snapshot: &HeatmapSnapshot) {
        self.uploaded = snapshot
            .buffers
            .as_ref()
            .map(|b| (snapshot.generation, b.clone()));
    }

    pub fn uploaded_generation(&self) -> Option<u64> {
        self.uploaded.as_ref().map(|(g, _)| *g)
    }
}

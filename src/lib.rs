//! gpui_heatmap: bucketed 2D/3D heatmap layers for GPUI
//!
//! A layer's data lives in a [`HeatmapModel`]; an [`UpdatePipeline`] worker
//! sorts it, bakes GPU-ready [`HeatmapBuffers`] and publishes immutable
//! [`HeatmapSnapshot`]s that the render side turns into draw calls.

pub mod buffers;
pub mod data_types;
pub mod error;
pub mod gradient;
pub mod model;
pub mod normalizer;
pub mod paint2d;
pub mod pipeline;
#[cfg(feature = "polars")]
pub mod polars_source;
pub mod render;
pub mod snapshot;
pub mod sort_filter;
pub mod stats;
pub mod transform;
pub mod utils;

pub use buffers::{BufferBuilder, DrawRange, HeatmapBuffers, IndexBuffer, Primitive};
pub use data_types::{
    BucketCoord, Divisions, HeatmapConfig, IndexInterval, IntervalPolicy, RawGrid, SortedBuckets,
    ValueFilter, VisibilityMask, SENTINEL,
};
pub use error::{HeatmapError, InvalidDataReason, Result};
pub use gradient::{ColorGradient, LinearGradient};
pub use model::{HeatmapData, HeatmapModel};
pub use normalizer::{AxisNormalizer, BoundaryProvider, NormalizerKind};
pub use paint2d::{Paint2d, QuadPainter};
pub use pipeline::{LayerCollaborators, LayerHandle, LayerId, LayerObserver, UpdatePipeline};
pub use render::{plan_draw, DrawPlan, UploadTracker};
pub use snapshot::HeatmapSnapshot;
pub use transform::HeatmapTransform;

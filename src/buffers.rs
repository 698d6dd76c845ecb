//! GPU buffer construction for the 3D path.
//!
//! A build walks the buckets that occupy buffer slots (see
//! [`HeatmapModel::buffered_buckets`]) and emits flat vertex positions, an
//! index array per primitive, and optional per-vertex colors. Masked buckets
//! take no slots, so in sorted mode a filter change only moves the draw
//! sub-range computed by [`draw_range`].

use crate::data_types::{
    Axis, BucketCoord, BucketStyle, Divisions, EdgeStyle, FillStyle, GradientSource,
    HeatmapConfig,
};
use crate::gradient::{push_color, ColorGradient};
use crate::model::HeatmapModel;
use crate::normalizer::BoundaryProvider;
use glam::Vec3;
use gpui::Rgba;
use std::time::Instant;
use tracing::{debug, trace};

/// Largest vertex count addressed with 16-bit indices.
pub const U16_INDEX_MAX_VERTICES: usize = 32_767;

pub const CUBE_VERTEX_COUNT: usize = 8;

/// Two outward-facing triangles per face; corner `k` sits at
/// `(k & 1, (k >> 1) & 1, (k >> 2) & 1)`.
pub const CUBE_FILL_INDICES: [u32; 36] = [
    0, 2, 3, 0, 3, 1, // -z
    4, 5, 7, 4, 7, 6, // +z
    0, 4, 6, 0, 6, 2, // -x
    1, 3, 7, 1, 7, 5, // +x
    0, 1, 5, 0, 5, 4, // -y
    2, 6, 7, 2, 7, 3, // +y
];

pub const CUBE_EDGE_INDICES: [u32; 24] = [
    0, 1, 2, 3, 4, 5, 6, 7, // along x
    0, 2, 1, 3, 4, 6, 5, 7, // along y
    0, 4, 1, 5, 2, 6, 3, 7, // along z
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Primitive {
    Point,
    CubeFill,
    CubeEdge,
}

impl Primitive {
    /// Primitive carrying the bucket fill for `style`.
    pub fn fill_for(style: BucketStyle) -> Self {
        match style {
            BucketStyle::Point => Self::Point,
            BucketStyle::Cube => Self::CubeFill,
        }
    }

    pub fn vertex_stride(self) -> usize {
        match self {
            Self::Point => 1,
            Self::CubeFill | Self::CubeEdge => CUBE_VERTEX_COUNT,
        }
    }

    pub fn index_stride(self) -> usize {
        match self {
            Self::Point => 1,
            Self::CubeFill => CUBE_FILL_INDICES.len(),
            Self::CubeEdge => CUBE_EDGE_INDICES.len(),
        }
    }

    fn pattern(self) -> &'static [u32] {
        match self {
            Self::Point => &[0],
            Self::CubeFill => &CUBE_FILL_INDICES,
            Self::CubeEdge => &CUBE_EDGE_INDICES,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IndexFormat {
    Uint16,
    Uint32,
}

/// Index array whose width is fixed when the buffers are built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IndexBuffer {
    U16(Vec<u16>),
    U32(Vec<u32>),
}

impl IndexBuffer {
    /// Repeats `primitive`'s index pattern for `buckets` consecutive buckets.
    pub fn for_primitive(primitive: Primitive, buckets: usize, vertex_count: usize) -> Self {
        let pattern = primitive.pattern();
        let stride = primitive.vertex_stride();
        let len = buckets * pattern.len();
        if vertex_count <= U16_INDEX_MAX_VERTICES {
            let mut out = Vec::with_capacity(len);
            for b in 0..buckets {
                let base = (b * stride) as u16;
                out.extend(pattern.iter().map(|p| base + *p as u16));
            }
            Self::U16(out)
        } else {
            let mut out = Vec::with_capacity(len);
            for b in 0..buckets {
                let base = (b * stride) as u32;
                out.extend(pattern.iter().map(|p| base + *p));
            }
            Self::U32(out)
        }
    }

    pub fn format(&self) -> IndexFormat {
        match self {
            Self::U16(_) => IndexFormat::Uint16,
            Self::U32(_) => IndexFormat::Uint32,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::U16(v) => v.len(),
            Self::U32(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, i: usize) -> Option<u32> {
        match self {
            Self::U16(v) => v.get(i).map(|x| *x as u32),
            Self::U32(v) => v.get(i).copied(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::U16(v) => bytemuck::cast_slice(v),
            Self::U32(v) => bytemuck::cast_slice(v),
        }
    }
}

/// Per-vertex colors, 3 (RGB) or 4 (RGBA) floats each.
#[derive(Clone, Debug, PartialEq)]
pub struct ColorArray {
    pub stride: usize,
    pub data: Vec<f32>,
}

impl ColorArray {
    fn with_capacity(stride: usize, vertices: usize) -> Self {
        Self {
            stride,
            data: Vec::with_capacity(stride * vertices),
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.data.len() / self.stride
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.data)
    }
}

/// How edges get their color at draw time.
#[derive(Clone, Debug, PartialEq)]
pub enum EdgeColors {
    /// Constant color passed to the draw call.
    Solid(Rgba),
    PerVertex(ColorArray),
}

#[derive(Clone, Debug, PartialEq)]
pub struct HeatmapBuffers {
    pub style: BucketStyle,
    /// Built from sorted data; draw ranges follow the filter interval.
    pub sorted: bool,
    pub bucket_count: usize,
    /// `float[3]` per vertex.
    pub positions: Vec<f32>,
    /// Point indices (point style) or triangle indices (cube style).
    pub fill_indices: Option<IndexBuffer>,
    pub fill_colors: Option<ColorArray>,
    pub edge_indices: Option<IndexBuffer>,
    pub edge_colors: Option<EdgeColors>,
}

impl HeatmapBuffers {
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    pub fn fill_primitive(&self) -> Primitive {
        Primitive::fill_for(self.style)
    }

    /// Width chosen when the index arrays were built; `None` without indices.
    pub fn index_format(&self) -> Option<IndexFormat> {
        self.fill_indices
            .as_ref()
            .or(self.edge_indices.as_ref())
            .map(IndexBuffer::format)
    }

    pub fn position_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.positions)
    }
}

/// Contiguous index sub-range handed to a draw call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DrawRange {
    pub offset: usize,
    pub count: usize,
}

/// Index sub-range of `primitive` to draw for the model's current filter.
///
/// Sorted buffers draw `(left - masked_before_left) * stride` onwards for
/// `(right - left + 1 - masked_within) * stride` indices. Raw buffers were
/// filtered at build time and are drawn whole. `None` when nothing is drawn.
pub fn draw_range(
    primitive: Primitive,
    buffers: &HeatmapBuffers,
    model: &HeatmapModel,
) -> Option<DrawRange> {
    let stride = primitive.index_stride();
    let range = if buffers.sorted {
        let iv = model.filtered_interval()?;
        let counts = model.mask_counts();
        DrawRange {
            offset: (iv.left - counts.masked_before_left) * stride,
            count: (iv.count() - counts.masked_within) * stride,
        }
    } else {
        DrawRange {
            offset: 0,
            count: buffers.bucket_count * stride,
        }
    };
    (range.count > 0).then_some(range)
}

/// Per-axis boundary positions for one build.
struct AxisBoundaries {
    x: Vec<f64>,
    y: Vec<f64>,
    z: Vec<f64>,
}

impl AxisBoundaries {
    fn resolve(provider: &dyn BoundaryProvider, divisions: Divisions) -> Option<Self> {
        Some(Self {
            x: provider.boundaries(Axis::X, divisions.x)?,
            y: provider.boundaries(Axis::Y, divisions.y)?,
            z: provider.boundaries(Axis::Z, divisions.z)?,
        })
    }

    /// Normalized center and half-extent of a bucket.
    fn bucket_box(&self, coord: BucketCoord) -> Option<(Vec3, Vec3)> {
        let span = |b: &[f64], i: u32| -> Option<(f32, f32)> {
            let i = i as usize;
            let (lo, hi) = (*b.get(i)?, *b.get(i + 1)?);
            Some((((hi + lo) / 2.0) as f32, ((hi - lo) / 2.0) as f32))
        };
        let (cx, hx) = span(&self.x, coord.x)?;
        let (cy, hy) = span(&self.y, coord.y)?;
        let (cz, hz) = span(&self.z, coord.z)?;
        Some((Vec3::new(cx, cy, cz), Vec3::new(hx, hy, hz)))
    }
}

fn cube_corner(k: usize) -> Vec3 {
    let sign = |bit: usize| if (k >> bit) & 1 == 1 { 1.0 } else { -1.0 };
    Vec3::new(sign(0), sign(1), sign(2))
}

/// Builds [`HeatmapBuffers`] from a model.
pub struct BufferBuilder<'a> {
    pub config: &'a HeatmapConfig,
    pub gradient: Option<&'a dyn ColorGradient>,
    pub boundaries: &'a dyn BoundaryProvider,
}

impl<'a> BufferBuilder<'a> {
    pub fn new(
        config: &'a HeatmapConfig,
        gradient: Option<&'a dyn ColorGradient>,
        boundaries: &'a dyn BoundaryProvider,
    ) -> Self {
        Self {
            config,
            gradient,
            boundaries,
        }
    }

    fn needs_gradient(&self) -> bool {
        matches!(self.config.fill, FillStyle::Gradient)
            || (self.config.bucket_style == BucketStyle::Cube
                && matches!(self.config.edges, EdgeStyle::Gradient(_)))
    }

    /// `None` when the model has no data or a collaborator is missing.
    pub fn build(&self, model: &HeatmapModel) -> Option<HeatmapBuffers> {
        let start = Instant::now();
        let divisions = model.divisions()?;
        if self.needs_gradient() && self.gradient.is_none() {
            trace!("buffer build skipped: no color gradient");
            return None;
        }
        let Some(bounds) = AxisBoundaries::resolve(self.boundaries, divisions) else {
            trace!("buffer build skipped: boundaries unavailable");
            return None;
        };

        let buckets: Vec<(BucketCoord, f64)> = model.buffered_buckets().collect();
        let n = buckets.len();
        let style = self.config.bucket_style;
        let fill_primitive = Primitive::fill_for(style);
        let vertex_stride = fill_primitive.vertex_stride();
        let vertex_count = n * vertex_stride;
        let color_stride = self.config.color_stride();
        let scene = &self.config.scene;

        let fill_enabled = !matches!(self.config.fill, FillStyle::None);
        let edge_style = match style {
            BucketStyle::Point => EdgeStyle::None,
            BucketStyle::Cube => self.config.edges,
        };

        let mut positions = Vec::with_capacity(vertex_count * 3);
        let mut fill_colors =
            fill_enabled.then(|| ColorArray::with_capacity(color_stride, vertex_count));
        let mut edge_colors = match edge_style {
            EdgeStyle::Gradient(_) => Some(ColorArray::with_capacity(color_stride, vertex_count)),
            _ => None,
        };

        for (coord, value) in &buckets {
            let (center_n, half_n) = bounds.bucket_box(*coord)?;
            let t = model.normalized_value(*value);

            let fill_color = match self.config.fill {
                FillStyle::Gradient => self.gradient.map(|g| g.color_at(t)),
                FillStyle::Solid(c) => Some(c),
                FillStyle::None => None,
            };

            for k in 0..vertex_stride {
                let corner_n = match style {
                    BucketStyle::Point => center_n,
                    BucketStyle::Cube => center_n + half_n * cube_corner(k),
                };
                let p = scene.project(corner_n);
                positions.extend_from_slice(&[p.x, p.y, p.z]);

                if let (Some(colors), Some(color)) = (fill_colors.as_mut(), fill_color) {
                    push_color(&mut colors.data, color, color_stride);
                }
                if let (Some(colors), EdgeStyle::Gradient(source), Some(gradient)) =
                    (edge_colors.as_mut(), edge_style, self.gradient)
                {
                    let s = match source {
                        GradientSource::Value => t,
                        GradientSource::Axis(Axis::X) => corner_n.x as f64,
                        GradientSource::Axis(Axis::Y) => corner_n.y as f64,
                        GradientSource::Axis(Axis::Z) => corner_n.z as f64,
                    };
                    push_color(&mut colors.data, gradient.color_at(s), color_stride);
                }
            }
        }

        let fill_indices =
            fill_enabled.then(|| IndexBuffer::for_primitive(fill_primitive, n, vertex_count));
        let edge_indices = (!matches!(edge_style, EdgeStyle::None))
            .then(|| IndexBuffer::for_primitive(Primitive::CubeEdge, n, vertex_count));
        let edge_colors = match edge_style {
            EdgeStyle::Solid(c) => Some(EdgeColors::Solid(c)),
            EdgeStyle::Gradient(_) => edge_colors.map(EdgeColors::PerVertex),
            EdgeStyle::None => None,
        };

        debug!(
            buckets = n,
            vertices = vertex_count,
            wide_indices = vertex_count > U16_INDEX_MAX_VERTICES,
            elapsed_us = start.elapsed().as_micros() as u64,
            "heatmap buffers built"
        );

        Some(HeatmapBuffers {
            style,
            sorted: model.is_sorted(),
            bucket_count: n,
            positions,
            fill_indices,
            fill_colors,
            edge_indices,
            edge_colors,
        })
    }
}

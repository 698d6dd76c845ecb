use gpui::Rgba;
use gpui_heatmap::buffers::{
    draw_range, BufferBuilder, DrawRange, EdgeColors, HeatmapBuffers, IndexBuffer, IndexFormat,
    Primitive,
};
use gpui_heatmap::data_types::{
    Axis, BucketCoord, BucketStyle, Divisions, EdgeStyle, FillStyle, GradientSource,
    HeatmapConfig, RawGrid, ValueFilter, VisibilityMask,
};
use gpui_heatmap::error::{HeatmapError, InvalidDataReason};
use gpui_heatmap::gradient::{ColorGradient, LinearGradient};
use gpui_heatmap::model::HeatmapModel;
use gpui_heatmap::normalizer::FixedBoundaries;
use gpui_heatmap::render::{plan_draw, UploadTracker};
use gpui_heatmap::snapshot::{HeatmapSnapshot, SnapshotCell};
use std::sync::Arc;

fn rgba(r: f32, g: f32, b: f32) -> Rgba {
    Rgba { r, g, b, a: 1.0 }
}

fn gradient() -> LinearGradient {
    LinearGradient::two_color(rgba(0.0, 0.0, 1.0), rgba(1.0, 0.0, 0.0))
}

fn sorted_row(values: &[f64]) -> HeatmapModel {
    let coords = (0..values.len() as u32)
        .map(|x| BucketCoord::planar(x, 0))
        .collect();
    let mut model = HeatmapModel::default();
    model
        .set_sorted_data(Divisions::new_2d(values.len(), 1), coords, values.to_vec())
        .unwrap();
    model
}

fn raw_row(n: usize) -> HeatmapModel {
    let mut model = HeatmapModel::default();
    let values = (0..n).map(|i| i as f64).collect();
    model.set_raw_data(RawGrid::from_flat(Divisions::new_2d(n, 1), values).unwrap());
    model
}

#[test]
fn test_cube_buffer_sizes() {
    let config = HeatmapConfig::default();
    let g = gradient();
    let model = sorted_row(&[1.0, 2.0, 3.0, 4.0, 5.0]);
    let buffers = BufferBuilder::new(&config, Some(&g as &dyn ColorGradient), model.spatial())
        .build(&model)
        .unwrap();

    let n = 5;
    assert_eq!(buffers.bucket_count, n);
    assert_eq!(buffers.positions.len(), n * 8 * 3);
    assert_eq!(buffers.vertex_count(), n * 8);
    assert_eq!(buffers.fill_indices.as_ref().unwrap().len(), n * 36);
    assert_eq!(buffers.fill_colors.as_ref().unwrap().data.len(), n * 8 * 3);
    assert!(buffers.edge_indices.is_none());
    assert!(buffers.sorted);
    assert_eq!(buffers.position_bytes().len(), n * 8 * 3 * 4);
}

#[test]
fn test_cube_corners_span_bucket() {
    let config = HeatmapConfig::default();
    let g = gradient();
    let mut model = HeatmapModel::default();
    model.set_raw_data(RawGrid::from_rows(vec![vec![1.0]]).unwrap());
    let buffers = BufferBuilder::new(&config, Some(&g as &dyn ColorGradient), model.spatial())
        .build(&model)
        .unwrap();

    assert_eq!(&buffers.positions[0..3], &[0.0, 0.0, 0.0]);
    assert_eq!(&buffers.positions[21..24], &[1.0, 1.0, 1.0]);

    // A single cube only references its own eight vertices.
    let indices = buffers.fill_indices.unwrap();
    assert!((0..indices.len()).all(|i| indices.get(i).unwrap() < 8));
}

#[test]
fn test_index_width_threshold() {
    let config = HeatmapConfig::default();
    let g = gradient();

    // 4095 cubes = 32760 vertices.
    let narrow = raw_row(4095);
    let buffers = BufferBuilder::new(&config, Some(&g as &dyn ColorGradient), narrow.spatial())
        .build(&narrow)
        .unwrap();
    assert_eq!(buffers.index_format(), Some(IndexFormat::Uint16));
    assert!(matches!(buffers.fill_indices, Some(IndexBuffer::U16(_))));

    // 4096 cubes = 32768 vertices.
    let wide = raw_row(4096);
    let buffers = BufferBuilder::new(&config, Some(&g as &dyn ColorGradient), wide.spatial())
        .build(&wide)
        .unwrap();
    assert_eq!(buffers.index_format(), Some(IndexFormat::Uint32));
    let indices = buffers.fill_indices.unwrap();
    assert!(matches!(indices, IndexBuffer::U32(_)));
    assert_eq!(indices.get(indices.len() - 1), Some(4095 * 8 + 3));
    assert_eq!(indices.as_bytes().len(), 4096 * 36 * 4);
}

#[test]
fn test_index_buffer_pattern() {
    let points = IndexBuffer::for_primitive(Primitive::Point, 4, 4);
    assert_eq!(points, IndexBuffer::U16(vec![0, 1, 2, 3]));

    let edges = IndexBuffer::for_primitive(Primitive::CubeEdge, 2, 16);
    assert_eq!(edges.len(), 48);
    assert_eq!(edges.get(24), Some(8));
}

#[test]
fn test_point_style_ignores_edges() {
    let config = HeatmapConfig {
        bucket_style: BucketStyle::Point,
        edges: EdgeStyle::Solid(rgba(1.0, 1.0, 1.0)),
        alpha: true,
        ..Default::default()
    };
    let g = gradient();
    let model = sorted_row(&[1.0, 2.0, 3.0]);
    let buffers = BufferBuilder::new(&config, Some(&g as &dyn ColorGradient), model.spatial())
        .build(&model)
        .unwrap();

    assert_eq!(buffers.positions.len(), 3 * 3);
    assert_eq!(buffers.fill_primitive(), Primitive::Point);
    assert_eq!(buffers.fill_indices.as_ref().unwrap().len(), 3);
    assert_eq!(buffers.fill_colors.as_ref().unwrap().stride, 4);
    assert_eq!(buffers.fill_colors.as_ref().unwrap().vertex_count(), 3);
    assert!(buffers.edge_indices.is_none());
    assert!(buffers.edge_colors.is_none());
}

#[test]
fn test_edge_styles() {
    let g = gradient();
    let model = sorted_row(&[1.0, 2.0]);

    let solid = HeatmapConfig {
        fill: FillStyle::None,
        edges: EdgeStyle::Solid(rgba(0.5, 0.5, 0.5)),
        ..Default::default()
    };
    // Neither fill nor edges need a gradient here.
    let buffers = BufferBuilder::new(&solid, None, model.spatial())
        .build(&model)
        .unwrap();
    assert!(buffers.fill_indices.is_none());
    assert!(buffers.fill_colors.is_none());
    assert_eq!(buffers.edge_indices.as_ref().unwrap().len(), 2 * 24);
    assert_eq!(buffers.edge_colors, Some(EdgeColors::Solid(rgba(0.5, 0.5, 0.5))));

    let graded = HeatmapConfig {
        fill: FillStyle::Solid(rgba(0.0, 1.0, 0.0)),
        edges: EdgeStyle::Gradient(GradientSource::Value),
        ..Default::default()
    };
    let buffers = BufferBuilder::new(&graded, Some(&g as &dyn ColorGradient), model.spatial())
        .build(&model)
        .unwrap();
    match buffers.edge_colors {
        Some(EdgeColors::PerVertex(colors)) => assert_eq!(colors.vertex_count(), 16),
        other => panic!("expected per-vertex edge colors, got {other:?}"),
    }
    // Solid fill repeats the same color on every vertex.
    let fill = buffers.fill_colors.unwrap();
    assert!(fill.data.chunks(3).all(|c| c == [0.0, 1.0, 0.0]));
}

#[test]
fn test_build_skips_without_collaborators() {
    let config = HeatmapConfig::default();
    let model = sorted_row(&[1.0, 2.0]);
    assert!(BufferBuilder::new(&config, None, model.spatial())
        .build(&model)
        .is_none());

    let g = gradient();
    let bad_bounds = FixedBoundaries {
        x: vec![0.0, 1.0],
        y: vec![0.0, 1.0],
        z: vec![0.0, 1.0],
    };
    assert!(BufferBuilder::new(&config, Some(&g as &dyn ColorGradient), &bad_bounds)
        .build(&model)
        .is_none());

    let empty = HeatmapModel::default();
    assert!(BufferBuilder::new(&config, Some(&g as &dyn ColorGradient), empty.spatial())
        .build(&empty)
        .is_none());
}

#[test]
fn test_draw_range_skips_masked_buckets() {
    let config = HeatmapConfig::default();
    let g = gradient();
    let mut model = sorted_row(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    model.set_mask(Some(VisibilityMask::planar(vec![vec![
        true, false, true, false, false, true,
    ]])));
    let buffers = BufferBuilder::new(&config, Some(&g as &dyn ColorGradient), model.spatial())
        .build(&model)
        .unwrap();
    assert_eq!(buffers.bucket_count, 3);

    model.set_value_filter(Some(ValueFilter::new(3.0, 5.0)));
    let range = draw_range(Primitive::CubeFill, &buffers, &model).unwrap();
    assert_eq!(range, DrawRange { offset: 36, count: 72 });
    assert_eq!(range.count / 36, model.visible_count());

    model.set_value_filter(Some(ValueFilter::new(2.5, 3.5)));
    assert_eq!(draw_range(Primitive::CubeFill, &buffers, &model), None);
}

#[test]
fn test_raw_buffers_bake_in_filter() {
    let config = HeatmapConfig::default();
    let g = gradient();
    let mut model = raw_row(10);
    model.set_value_filter(Some(ValueFilter::new(2.0, 5.0)));
    let buffers = BufferBuilder::new(&config, Some(&g as &dyn ColorGradient), model.spatial())
        .build(&model)
        .unwrap();
    assert!(!buffers.sorted);
    assert_eq!(buffers.bucket_count, 4);
    assert_eq!(
        draw_range(Primitive::CubeFill, &buffers, &model),
        Some(DrawRange { offset: 0, count: 4 * 36 })
    );
}

#[test]
fn test_plan_draw_and_upload_tracking() {
    let config = Arc::new(HeatmapConfig {
        edges: EdgeStyle::Solid(rgba(1.0, 1.0, 1.0)),
        ..Default::default()
    });
    let g = gradient();
    let mut model = sorted_row(&[1.0, 2.0, 3.0]);
    let buffers = Arc::new(
        BufferBuilder::new(&config, Some(&g as &dyn ColorGradient), model.spatial())
            .build(&model)
            .unwrap(),
    );

    let cell = SnapshotCell::new(HeatmapSnapshot::empty(model.clone(), config.clone()));
    assert!(plan_draw(&cell.load()).is_none());

    let generation = cell.publish(HeatmapSnapshot {
        generation: 0,
        model: model.clone(),
        config: config.clone(),
        buffers: Some(buffers.clone()),
    });
    assert_eq!(generation, 1);

    let snapshot = cell.load();
    let plan = plan_draw(&snapshot).unwrap();
    assert_eq!(plan.generation, 1);
    let fill = plan.fill.unwrap();
    assert_eq!(fill.range, DrawRange { offset: 0, count: 3 * 36 });
    assert_eq!(fill.index_format, IndexFormat::Uint16);
    let edges = plan.edges.unwrap();
    assert_eq!(edges.range.count, 3 * 24);
    assert_eq!(edges.constant_color, Some(rgba(1.0, 1.0, 1.0)));

    let mut tracker = UploadTracker::default();
    assert!(tracker.needs_upload(&snapshot));
    tracker.mark_uploaded(&snapshot);
    assert_eq!(tracker.uploaded_generation(), Some(1));

    // A filter-only change shares the buffers: no upload.
    model.set_value_filter(Some(ValueFilter::new(2.0, 2.0)));
    cell.publish(HeatmapSnapshot {
        generation: 0,
        model,
        config,
        buffers: Some(buffers),
    });
    let snapshot = cell.load();
    assert_eq!(snapshot.generation, 2);
    assert!(!tracker.needs_upload(&snapshot));
    let plan = plan_draw(&snapshot).unwrap();
    assert_eq!(plan.fill.unwrap().range, DrawRange { offset: 36, count: 36 });
}

fn cube_2x2x2() -> RawGrid {
    // Value at (x, y, z) is 1 + x + 2y + 4z.
    RawGrid::from_slices(vec![
        vec![vec![1.0, 2.0], vec![3.0, 4.0]],
        vec![vec![5.0, 6.0], vec![7.0, 8.0]],
    ])
    .unwrap()
}

fn vertex(buffers: &HeatmapBuffers, bucket: usize, corner: usize) -> [f32; 3] {
    let i = (bucket * 8 + corner) * 3;
    [buffers.positions[i], buffers.positions[i + 1], buffers.positions[i + 2]]
}

#[test]
fn test_volume_buffers_span_slices() {
    let config = HeatmapConfig::default();
    let g = gradient();
    let mut model = HeatmapModel::default();
    model.set_raw_data(cube_2x2x2());
    model.presort();
    assert_eq!(model.divisions(), Some(Divisions::new_3d(2, 2, 2)));

    let buffers = BufferBuilder::new(&config, Some(&g as &dyn ColorGradient), model.spatial())
        .build(&model)
        .unwrap();
    assert_eq!(buffers.bucket_count, 8);
    assert_eq!(buffers.vertex_count(), 64);

    // Bucket 0 is (0,0,0); bucket 4 is (0,0,1); bucket 7 is (1,1,1).
    assert_eq!(vertex(&buffers, 0, 0), [0.0, 0.0, 0.0]);
    assert_eq!(vertex(&buffers, 0, 7), [0.5, 0.5, 0.5]);
    assert_eq!(vertex(&buffers, 4, 0), [0.0, 0.0, 0.5]);
    assert_eq!(vertex(&buffers, 4, 7), [0.5, 0.5, 1.0]);
    assert_eq!(vertex(&buffers, 7, 7), [1.0, 1.0, 1.0]);

    // The upper slice holds values 5..=8.
    model.set_value_filter(Some(ValueFilter::new(5.0, 8.0)));
    assert_eq!(
        draw_range(Primitive::CubeFill, &buffers, &model),
        Some(DrawRange { offset: 4 * 36, count: 4 * 36 })
    );
}

#[test]
fn test_volume_mask_hides_slice_column() {
    let config = HeatmapConfig::default();
    let g = gradient();
    let mut model = HeatmapModel::default();
    model.set_raw_data(cube_2x2x2());
    model.presort();
    let mask = VisibilityMask::from_fn(2, 2, 2, |c| c.x == 0 && c.z == 1);
    assert_eq!(mask.masked_count(), 2);
    model.set_mask(Some(mask));
    assert!(model.is_masked(BucketCoord::new(0, 1, 1)));

    let buffers = BufferBuilder::new(&config, Some(&g as &dyn ColorGradient), model.spatial())
        .build(&model)
        .unwrap();
    assert_eq!(buffers.bucket_count, 6);

    // Values 5 and 7 are masked; 6 and 8 remain, right after the lower slice.
    model.set_value_filter(Some(ValueFilter::new(5.0, 8.0)));
    assert_eq!(
        draw_range(Primitive::CubeFill, &buffers, &model),
        Some(DrawRange { offset: 4 * 36, count: 2 * 36 })
    );
}

#[test]
fn test_ragged_slices_are_rejected() {
    let err = RawGrid::from_slices(vec![
        vec![vec![1.0, 2.0], vec![3.0, 4.0]],
        vec![vec![5.0, 6.0]],
    ])
    .unwrap_err();
    assert!(matches!(
        err,
        HeatmapError::InvalidData(InvalidDataReason::RaggedGrid { row: 2, len: 1, expected: 2 })
    ));

    let err = RawGrid::from_slices(vec![vec![vec![1.0, 2.0], vec![3.0]]]).unwrap_err();
    assert!(matches!(
        err,
        HeatmapError::InvalidData(InvalidDataReason::RaggedGrid { row: 1, len: 1, expected: 2 })
    ));
}

#[test]
fn test_edge_gradient_along_z() {
    let config = HeatmapConfig {
        edges: EdgeStyle::Gradient(GradientSource::Axis(Axis::Z)),
        ..Default::default()
    };
    let g = gradient();
    let mut model = HeatmapModel::default();
    model.set_raw_data(RawGrid::from_slices(vec![vec![vec![1.0]]]).unwrap());
    let buffers = BufferBuilder::new(&config, Some(&g as &dyn ColorGradient), model.spatial())
        .build(&model)
        .unwrap();

    let Some(EdgeColors::PerVertex(colors)) = buffers.edge_colors else {
        panic!("expected per-vertex edge colors");
    };
    assert_eq!(colors.vertex_count(), 8);
    for k in 0..8 {
        let rgb = &colors.data[k * 3..k * 3 + 3];
        if k & 4 == 0 {
            // Bottom corner, z = 0.
            assert_eq!(rgb, &[0.0, 0.0, 1.0]);
        } else {
            assert_eq!(rgb, &[1.0, 0.0, 0.0]);
        }
    }
}

#[test]
fn test_index_format_follows_built_indices() {
    let edges_only = HeatmapConfig {
        fill: FillStyle::None,
        edges: EdgeStyle::Solid(rgba(1.0, 1.0, 1.0)),
        ..Default::default()
    };
    let model = sorted_row(&[1.0, 2.0]);
    let buffers = BufferBuilder::new(&edges_only, None, model.spatial())
        .build(&model)
        .unwrap();
    assert!(buffers.fill_indices.is_none());
    assert_eq!(buffers.index_format(), Some(IndexFormat::Uint16));

    // The width comes from the index variant, not the vertex count.
    let wide = HeatmapBuffers {
        fill_indices: Some(IndexBuffer::U32(vec![0, 1])),
        edge_indices: None,
        ..buffers.clone()
    };
    assert_eq!(wide.index_format(), Some(IndexFormat::Uint32));

    let bare = HeatmapBuffers {
        fill_indices: None,
        edge_indices: None,
        ..buffers
    };
    assert_eq!(bare.index_format(), None);
}

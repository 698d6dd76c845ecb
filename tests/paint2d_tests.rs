use gpui::{px, Bounds, Hsla, Pixels, Point, Rgba, Size};
use gpui_heatmap::data_types::{FillStyle, RawGrid, ValueFilter, VisibilityMask, SENTINEL};
use gpui_heatmap::gradient::{ColorGradient, LinearGradient};
use gpui_heatmap::model::HeatmapModel;
use gpui_heatmap::normalizer::FixedBoundaries;
use gpui_heatmap::paint2d::{Paint2d, QuadPainter};
use gpui_heatmap::transform::HeatmapTransform;

#[derive(Default)]
struct RecordingPainter {
    rects: Vec<(Bounds<Pixels>, Hsla)>,
}

impl QuadPainter for RecordingPainter {
    fn paint_rect(&mut self, bounds: Bounds<Pixels>, color: Hsla) {
        self.rects.push((bounds, color));
    }
}

fn transform() -> HeatmapTransform {
    HeatmapTransform::new(Bounds::new(
        Point::new(px(0.0), px(0.0)),
        Size::new(px(100.0), px(100.0)),
    ))
}

fn model_2x2() -> HeatmapModel {
    let mut model = HeatmapModel::default();
    model.set_raw_data(RawGrid::from_rows(vec![vec![1.0, 2.0], vec![3.0, SENTINEL]]).unwrap());
    model
}

const RED: Rgba = Rgba {
    r: 1.0,
    g: 0.0,
    b: 0.0,
    a: 1.0,
};

#[test]
fn test_paint_visible_buckets() {
    let mut model = model_2x2();
    let spatial = model.spatial().clone();
    let paint = Paint2d::new(FillStyle::Solid(RED), None, &spatial);
    let mut painter = RecordingPainter::default();

    assert_eq!(paint.paint(&mut painter, &transform(), &model), 3);
    assert_eq!(painter.rects.len(), 3);

    // Bucket (0, 0) sits bottom-left: normalized y grows upwards.
    let rect = &painter.rects[0].0;
    assert_eq!(rect.origin.x, px(0.0));
    assert_eq!(rect.origin.y, px(50.0));
    assert_eq!(rect.size.width, px(50.0));
    assert_eq!(rect.size.height, px(50.0));

    model.set_value_filter(Some(ValueFilter::new(2.0, 3.0)));
    let mut painter = RecordingPainter::default();
    assert_eq!(paint.paint(&mut painter, &transform(), &model), 2);

    model.set_mask(Some(VisibilityMask::planar(vec![vec![false, true]])));
    let mut painter = RecordingPainter::default();
    assert_eq!(paint.paint(&mut painter, &transform(), &model), 1);
}

#[test]
fn test_paint_sorted_matches_raw() {
    let raw = model_2x2();
    let mut sorted = model_2x2();
    sorted.presort();

    let spatial = raw.spatial().clone();
    let g = LinearGradient::two_color(Rgba::default(), RED);
    let paint = Paint2d::new(
        FillStyle::Gradient,
        Some(&g as &dyn ColorGradient),
        &spatial,
    );

    let mut a = RecordingPainter::default();
    let mut b = RecordingPainter::default();
    assert_eq!(paint.paint(&mut a, &transform(), &raw), 3);
    assert_eq!(paint.paint(&mut b, &transform(), &sorted), 3);

    let mut ra: Vec<_> = a.rects.iter().map(|(r, _)| (r.origin.x, r.origin.y)).collect();
    let mut rb: Vec<_> = b.rects.iter().map(|(r, _)| (r.origin.x, r.origin.y)).collect();
    let key = |p: &(Pixels, Pixels)| (f32::from(p.0) as i32, f32::from(p.1) as i32);
    ra.sort_by_key(key);
    rb.sort_by_key(key);
    assert_eq!(ra, rb);
}

#[test]
fn test_paint_skips_without_prerequisites() {
    let model = model_2x2();
    let spatial = model.spatial().clone();
    let mut painter = RecordingPainter::default();

    let no_gradient = Paint2d::new(FillStyle::Gradient, None, &spatial);
    assert_eq!(no_gradient.paint(&mut painter, &transform(), &model), 0);

    let no_fill = Paint2d::new(FillStyle::None, None, &spatial);
    assert_eq!(no_fill.paint(&mut painter, &transform(), &model), 0);

    let bad_bounds = FixedBoundaries::default();
    let no_bounds = Paint2d::new(FillStyle::Solid(RED), None, &bad_bounds);
    assert_eq!(no_bounds.paint(&mut painter, &transform(), &model), 0);

    let empty = HeatmapModel::default();
    let paint = Paint2d::new(FillStyle::Solid(RED), None, &spatial);
    assert_eq!(paint.paint(&mut painter, &transform(), &empty), 0);
    assert!(painter.rects.is_empty());
}

#[test]
fn test_non_uniform_boundaries() {
    let model = model_2x2();
    let bounds = FixedBoundaries {
        x: vec![0.0, 0.2, 1.0],
        y: vec![0.0, 0.5, 1.0],
        z: vec![0.0, 1.0],
    };
    let paint = Paint2d::new(FillStyle::Solid(RED), None, &bounds);
    let mut painter = RecordingPainter::default();
    assert_eq!(paint.paint(&mut painter, &transform(), &model), 3);
    assert_eq!(painter.rects[0].0.size.width, px(20.0));
    assert_eq!(painter.rects[1].0.size.width, px(80.0));
}

#[test]
fn test_volume_model_is_not_painted() {
    let mut model = HeatmapModel::default();
    model.set_raw_data(
        RawGrid::from_slices(vec![
            vec![vec![1.0, 2.0], vec![3.0, 4.0]],
            vec![vec![5.0, 6.0], vec![7.0, 8.0]],
        ])
        .unwrap(),
    );
    let spatial = model.spatial().clone();
    let paint = Paint2d::new(FillStyle::Solid(RED), None, &spatial);
    let mut painter = RecordingPainter::default();

    assert_eq!(paint.paint(&mut painter, &transform(), &model), 0);
    assert!(painter.rects.is_empty());
}

use gpui::Rgba;

/// Maps a normalized scalar to a color.
pub trait ColorGradient: Send + Sync {
    fn color_at(&self, t: f64) -> Rgba;
}

/// Piecewise-linear gradient between sorted color stops.
#[derive(Clone, Debug)]
pub struct LinearGradient {
    stops: Vec<(f64, Rgba)>,
}

fn lerp(a: Rgba, b: Rgba, t: f32) -> Rgba {
    Rgba {
        r: a.r + (b.r - a.r) * t,
        g: a.g + (b.g - a.g) * t,
        b: a.b + (b.b - a.b) * t,
        a: a.a + (b.a - a.a) * t,
    }
}

impl LinearGradient {
    pub fn new(mut stops: Vec<(f64, Rgba)>) -> Self {
        stops.retain(|(pos, _)| pos.is_finite());
        stops.sort_by(|a, b| a.0.total_cmp(&b.0));
        Self { stops }
    }

    pub fn two_color(from: Rgba, to: Rgba) -> Self {
        Self::new(vec![(0.0, from), (1.0, to)])
    }
}

impl ColorGradient for LinearGradient {
    fn color_at(&self, t: f64) -> Rgba {
        let t = if t.is_nan() { 0.0 } else { t };
        let Some(first) = self.stops.first() else {
            return Rgba::default();
        };
        if t <= first.0 {
            return first.1;
        }
        let idx = self.stops.partition_point(|(pos, _)| *pos <= t);
        if idx >= self.stops.len() {
            return self.stops[self.stops.len() - 1].1;
        }
        let (p0, c0) = self.stops[idx - 1];
        let (p1, c1) = self.stops[idx];
        let span = p1 - p0;
        if span <= f64::EPSILON {
            return c1;
        }
        lerp(c0, c1, ((t - p0) / span) as f32)
    }
}

/// Pushes `color` as 3 or 4 floats.
#[inline]
pub(crate) fn push_color(out: &mut Vec<f32>, color: Rgba, stride: usize) {
    out.extend_from_slice(&[color.r, color.g, color.b]);
    if stride == 4 {
        out.push(color.a);
    }
}

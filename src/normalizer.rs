//! Axis normalization: data domain <-> `[0,1]` rendering space.

use crate::data_types::Axis;
use d3rs::scale::{LinearScale, LogScale, Scale as D3Scale};
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// User-supplied transform applied on top of the linear `[0,1]` mapping.
pub trait NormalizeFn: Send + Sync {
    fn forward(&self, t: f64) -> f64;
    fn inverse(&self, t: f64) -> f64;
}

/// Closure pair implementing [`NormalizeFn`].
pub struct FnNormalizer<F, G> {
    forward: F,
    inverse: G,
}

impl<F, G> FnNormalizer<F, G>
where
    F: Fn(f64) -> f64 + Send + Sync,
    G: Fn(f64) -> f64 + Send + Sync,
{
    pub fn new(forward: F, inverse: G) -> Self {
        Self { forward, inverse }
    }
}

impl<F, G> NormalizeFn for FnNormalizer<F, G>
where
    F: Fn(f64) -> f64 + Send + Sync,
    G: Fn(f64) -> f64 + Send + Sync,
{
    fn forward(&self, t: f64) -> f64 {
        (self.forward)(t)
    }

    fn inverse(&self, t: f64) -> f64 {
        (self.inverse)(t)
    }
}

#[derive(Clone)]
pub enum NormalizerKind {
    Linear,
    /// Base-10 logarithmic. A domain reaching zero or below maps through
    /// `log10(1 + 9t)` of the linear position instead.
    Log,
    /// `t^gamma` applied after the linear mapping.
    Gamma(f64),
    Custom(Arc<dyn NormalizeFn>),
}

impl fmt::Debug for NormalizerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Linear => write!(f, "Linear"),
            Self::Log => write!(f, "Log"),
            Self::Gamma(g) => write!(f, "Gamma({g})"),
            Self::Custom(_) => write!(f, "Custom"),
        }
    }
}

const LOG_BASE: f64 = 10.0;

/// d3 scale from the data domain onto `[0,1]`.
#[derive(Clone, Copy, Debug)]
enum DomainScale {
    Linear(LinearScale),
    Log(LogScale),
    /// Linear onto `[1, base]`, then log onto `[0,1]`.
    OffsetLog(LinearScale, LogScale),
}

impl DomainScale {
    fn build(kind: &NormalizerKind, (min, max): (f64, f64)) -> Self {
        match kind {
            NormalizerKind::Log if min > 0.0 && max > 0.0 => {
                Self::Log(LogScale::new().domain(min, max).range(0.0, 1.0))
            }
            NormalizerKind::Log => Self::OffsetLog(
                LinearScale::new().domain(min, max).range(1.0, LOG_BASE),
                LogScale::new().domain(1.0, LOG_BASE).range(0.0, 1.0),
            ),
            _ => Self::Linear(LinearScale::new().domain(min, max).range(0.0, 1.0)),
        }
    }

    fn domain(&self) -> (f64, f64) {
        match self {
            Self::Linear(s) | Self::OffsetLog(s, _) => D3Scale::domain(s),
            Self::Log(s) => D3Scale::domain(s),
        }
    }

    fn scale(&self, value: f64) -> f64 {
        match self {
            Self::Linear(s) => s.scale(value),
            Self::Log(s) => s.scale(value),
            Self::OffsetLog(lin, log) => log.scale(lin.scale(value)),
        }
    }

    fn invert(&self, t: f64) -> Option<f64> {
        match self {
            Self::Linear(s) => s.invert(t),
            Self::Log(s) => s.invert(t),
            Self::OffsetLog(lin, log) => log.invert(t).and_then(|u| lin.invert(u)),
        }
    }

    fn ticks(&self, count: usize) -> Vec<f64> {
        match self {
            Self::Linear(s) | Self::OffsetLog(s, _) => s.ticks(count),
            Self::Log(s) => s.ticks(count),
        }
    }
}

#[derive(Clone, Debug)]
pub struct AxisNormalizer {
    kind: NormalizerKind,
    scale: DomainScale,
}

fn padded(min: f64, max: f64) -> (f64, f64) {
    if (max - min).abs() < f64::EPSILON {
        (min - 0.5, max + 0.5)
    } else {
        (min, max)
    }
}

impl Default for AxisNormalizer {
    fn default() -> Self {
        Self::linear((0.0, 1.0))
    }
}

impl AxisNormalizer {
    pub fn new(kind: NormalizerKind, domain: (f64, f64)) -> Self {
        let scale = DomainScale::build(&kind, padded(domain.0, domain.1));
        Self { kind, scale }
    }

    pub fn linear(domain: (f64, f64)) -> Self {
        Self::new(NormalizerKind::Linear, domain)
    }

    pub fn log(domain: (f64, f64)) -> Self {
        Self::new(NormalizerKind::Log, domain)
    }

    pub fn gamma(gamma: f64, domain: (f64, f64)) -> Self {
        Self::new(NormalizerKind::Gamma(gamma), domain)
    }

    pub fn custom(f: impl NormalizeFn + 'static, domain: (f64, f64)) -> Self {
        Self::new(NormalizerKind::Custom(Arc::new(f)), domain)
    }

    pub fn kind(&self) -> &NormalizerKind {
        &self.kind
    }

    pub fn domain(&self) -> (f64, f64) {
        self.scale.domain()
    }

    /// Whether a log normalizer fell back to the offset mapping.
    pub fn is_offset_log(&self) -> bool {
        matches!(self.scale, DomainScale::OffsetLog(..))
    }

    /// Degenerate domains are widened by 0.5 on each side.
    pub fn update_domain(&mut self, min: f64, max: f64) {
        self.scale = DomainScale::build(&self.kind, padded(min, max));
    }

    pub fn get_normalized(&self, value: f64) -> f64 {
        let t = self.scale.scale(value);
        let res = match &self.kind {
            NormalizerKind::Gamma(g) => t.signum() * t.abs().powf(*g),
            NormalizerKind::Custom(f) => f.forward(t),
            NormalizerKind::Linear | NormalizerKind::Log => t,
        };
        if res.is_nan() || res.is_infinite() {
            0.0
        } else {
            res
        }
    }

    pub fn get_unnormalized(&self, t: f64) -> f64 {
        let t = match &self.kind {
            NormalizerKind::Gamma(g) => t.signum() * t.abs().powf(1.0 / *g),
            NormalizerKind::Custom(f) => f.inverse(t),
            NormalizerKind::Linear | NormalizerKind::Log => t,
        };
        self.scale.invert(t).unwrap_or(self.domain().0)
    }

    /// Nice tick values across the domain.
    pub fn ticks(&self, count: usize) -> Vec<f64> {
        self.scale.ticks(count)
    }
}

/// One normalizer bound to an axis, plus whether its domain follows the data.
#[derive(Clone, Debug)]
pub struct AxisBinding {
    pub normalizer: AxisNormalizer,
    /// Pinned bindings ignore data-range refreshes.
    pub pinned: bool,
}

impl AxisBinding {
    /// Spatial axes are pinned to `[0,1]`.
    pub fn spatial(kind: NormalizerKind) -> Self {
        Self {
            normalizer: AxisNormalizer::new(kind, (0.0, 1.0)),
            pinned: true,
        }
    }

    pub fn value(kind: NormalizerKind) -> Self {
        Self {
            normalizer: AxisNormalizer::new(kind, (0.0, 1.0)),
            pinned: false,
        }
    }

    pub fn fixed(normalizer: AxisNormalizer) -> Self {
        Self {
            normalizer,
            pinned: true,
        }
    }

    pub fn refresh_from_data(&mut self, range: Option<(f64, f64)>) {
        if self.pinned {
            return;
        }
        if let Some((min, max)) = range {
            self.normalizer.update_domain(min, max);
            if self.normalizer.is_offset_log() {
                warn!(
                    min,
                    max,
                    "log value axis reaches zero or below; using log10(1 + 9t)"
                );
            }
        }
    }
}

impl Default for AxisBinding {
    fn default() -> Self {
        Self::spatial(NormalizerKind::Linear)
    }
}

/// Maps bucket indices along one axis to normalized positions.
#[derive(Clone, Copy, Debug)]
pub struct CoordinateNormalizer<'a> {
    pub binding: &'a AxisBinding,
    pub divisions: usize,
}

impl<'a> CoordinateNormalizer<'a> {
    pub fn new(binding: &'a AxisBinding, divisions: usize) -> Self {
        Self { binding, divisions }
    }

    /// Position of boundary `index` (0..=divisions).
    pub fn position(&self, index: usize) -> f64 {
        if self.divisions == 0 {
            return 0.0;
        }
        self.binding
            .normalizer
            .get_normalized(index as f64 / self.divisions as f64)
    }

    pub fn boundaries(&self) -> Vec<f64> {
        (0..=self.divisions).map(|i| self.position(i)).collect()
    }
}

/// Supplies `divisions + 1` boundary positions per axis in normalized space.
pub trait BoundaryProvider: Send + Sync {
    /// `None` when the provider cannot describe this axis.
    fn boundaries(&self, axis: Axis, divisions: usize) -> Option<Vec<f64>>;
}

/// Spatial bindings for the three axes; the default boundary source.
#[derive(Clone, Debug, Default)]
pub struct SpatialBindings {
    pub x: AxisBinding,
    pub y: AxisBinding,
    pub z: AxisBinding,
}

impl SpatialBindings {
    pub fn get(&self, axis: Axis) -> &AxisBinding {
        match axis {
            Axis::X => &self.x,
            Axis::Y => &self.y,
            Axis::Z => &self.z,
        }
    }

    pub fn get_mut(&mut self, axis: Axis) -> &mut AxisBinding {
        match axis {
            Axis::X => &mut self.x,
            Axis::Y => &mut self.y,
            Axis::Z => &mut self.z,
        }
    }
}

impl BoundaryProvider for SpatialBindings {
    fn boundaries(&self, axis: Axis, divisions: usize) -> Option<Vec<f64>> {
        Some(CoordinateNormalizer::new(self.get(axis), divisions).boundaries())
    }
}

/// Explicit boundary lists, e.g. for non-uniform bucket spacing.
#[derive(Clone, Debug, Default)]
pub struct FixedBoundaries {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub z: Vec<f64>,
}

impl BoundaryProvider for FixedBoundaries {
    fn boundaries(&self, axis: Axis, divisions: usize) -> Option<Vec<f64>> {
        let list = match axis {
            Axis::X => &self.x,
            Axis::Y => &self.y,
            Axis::Z => &self.z,
        };
        (list.len() == divisions + 1).then(|| list.clone())
    }
}

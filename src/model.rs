//! Heatmap Model
//!
//! `HeatmapModel` owns the bucket data (raw grid or value-sorted pairs), the
//! axis bindings, the optional value filter and visibility mask, and the
//! index bounds derived from them. Every setter leaves the derived state
//! consistent, so a cloned model is a self-contained snapshot.

use crate::data_types::{
    is_no_data, Axis, BucketCoord, Divisions, HeatmapConfig, IndexInterval, IntervalPolicy,
    RawGrid, SortedBuckets, ValueFilter, VisibilityMask,
};
use crate::error::Result;
use crate::normalizer::{AxisBinding, AxisNormalizer, NormalizerKind, SpatialBindings};
use crate::sort_filter::{self, MaskCounts};
use crate::stats;
use std::sync::Arc;
use tracing::debug;

/// The authoritative bucket representation.
#[derive(Clone, Debug, PartialEq)]
pub enum HeatmapData {
    Raw(RawGrid),
    Sorted(SortedBuckets),
}

impl HeatmapData {
    pub fn divisions(&self) -> Divisions {
        match self {
            Self::Raw(g) => g.divisions(),
            Self::Sorted(s) => s.divisions(),
        }
    }
}

impl From<RawGrid> for HeatmapData {
    fn from(grid: RawGrid) -> Self {
        Self::Raw(grid)
    }
}

impl From<SortedBuckets> for HeatmapData {
    fn from(sorted: SortedBuckets) -> Self {
        Self::Sorted(sorted)
    }
}

#[derive(Clone, Debug)]
pub struct HeatmapModel {
    data: Option<Arc<HeatmapData>>,
    spatial: SpatialBindings,
    value: AxisBinding,
    filter: Option<ValueFilter>,
    mask: Option<Arc<VisibilityMask>>,
    interval_policy: IntervalPolicy,

    // Derived
    value_range: Option<(f64, f64)>,
    interval: Option<IndexInterval>,
    mask_counts: MaskCounts,
}

impl Default for HeatmapModel {
    fn default() -> Self {
        Self::new(NormalizerKind::Linear)
    }
}

impl HeatmapModel {
    pub fn new(value_kind: NormalizerKind) -> Self {
        Self {
            data: None,
            spatial: SpatialBindings::default(),
            value: AxisBinding::value(value_kind),
            filter: None,
            mask: None,
            interval_policy: IntervalPolicy::default(),
            value_range: None,
            interval: None,
            mask_counts: MaskCounts::default(),
        }
    }

    /// Model honoring the value-axis settings of `config`.
    pub fn from_config(config: &HeatmapConfig, value_kind: NormalizerKind) -> Self {
        let model = Self::new(value_kind).with_interval_policy(config.interval_policy);
        match config.fixed_value_range {
            Some(range) => model.with_fixed_value_range(range),
            None => model,
        }
    }

    pub fn with_interval_policy(mut self, policy: IntervalPolicy) -> Self {
        self.interval_policy = policy;
        self.recompute_interval();
        self
    }

    /// Pins the value axis to `range` instead of tracking the data.
    pub fn with_fixed_value_range(mut self, range: (f64, f64)) -> Self {
        let kind = self.value.normalizer.kind().clone();
        self.value = AxisBinding::fixed(AxisNormalizer::new(kind, range));
        self
    }

    pub fn with_spatial_normalizer(mut self, axis: Axis, kind: NormalizerKind) -> Self {
        *self.spatial.get_mut(axis) = AxisBinding::spatial(kind);
        self
    }

    // --- Data replacement ---

    pub fn set_data(&mut self, data: HeatmapData) {
        self.value_range = match &data {
            HeatmapData::Raw(grid) => stats::value_range(grid.values()),
            HeatmapData::Sorted(sorted) => sorted.value_range(),
        };
        self.value.refresh_from_data(self.value_range);
        debug!(
            sorted = matches!(data, HeatmapData::Sorted(_)),
            divisions = ?data.divisions(),
            value_range = ?self.value_range,
            "heatmap data replaced"
        );
        self.data = Some(Arc::new(data));
        self.recompute_interval();
    }

    /// Replaces the data with a raw grid; the model leaves sorted mode.
    pub fn set_raw_data(&mut self, grid: RawGrid) {
        self.set_data(HeatmapData::Raw(grid));
    }

    /// Replaces the data with a presorted pair, validating it first.
    /// On error the previous data stays in place.
    pub fn set_sorted_data(
        &mut self,
        divisions: Divisions,
        coords: Vec<BucketCoord>,
        values: Vec<f64>,
    ) -> Result<()> {
        let sorted = SortedBuckets::new(divisions, coords, values)?;
        self.set_data(HeatmapData::Sorted(sorted));
        Ok(())
    }

    /// Converts raw data into sorted mode. No-op when already sorted or empty.
    pub fn presort(&mut self) {
        if let Some(HeatmapData::Raw(grid)) = self.data.as_deref() {
            let sorted = sort_filter::sort_raw(grid);
            self.data = Some(Arc::new(HeatmapData::Sorted(sorted)));
            self.recompute_interval();
        }
    }

    pub fn clear_data(&mut self) {
        self.data = None;
        self.value_range = None;
        self.recompute_interval();
    }

    // --- Mask and filter ---

    /// `None` disables masking.
    pub fn set_mask(&mut self, mask: Option<VisibilityMask>) {
        debug!(
            masked = ?mask.as_ref().map(VisibilityMask::masked_count),
            "visibility mask replaced"
        );
        self.mask = mask.map(Arc::new);
        self.recompute_mask_counts();
    }

    /// `None` disables filtering.
    pub fn set_value_filter(&mut self, filter: Option<ValueFilter>) {
        self.filter = filter;
        self.recompute_interval();
    }

    /// Sets the filter from normalized bounds, resolved through the value
    /// axis. Bounds outside `[0,1]` or with `lo > hi` become `[0,1]`.
    pub fn set_value_filter_normalized(&mut self, lo_norm: f64, hi_norm: f64) {
        let valid = (0.0..=1.0).contains(&lo_norm)
            && (0.0..=1.0).contains(&hi_norm)
            && lo_norm <= hi_norm;
        let (lo_norm, hi_norm) = if valid { (lo_norm, hi_norm) } else { (0.0, 1.0) };
        let n = &self.value.normalizer;
        self.set_value_filter(Some(ValueFilter::new(
            n.get_unnormalized(lo_norm),
            n.get_unnormalized(hi_norm),
        )));
    }

    fn recompute_interval(&mut self) {
        self.interval = match self.data.as_deref() {
            Some(HeatmapData::Sorted(sorted)) => sort_filter::resolve_filter_interval(
                sorted.values(),
                self.filter,
                self.interval_policy,
            ),
            _ => None,
        };
        self.recompute_mask_counts();
    }

    fn recompute_mask_counts(&mut self) {
        self.mask_counts = match self.data.as_deref() {
            Some(HeatmapData::Sorted(sorted)) => {
                sort_filter::count_masked(sorted.coords(), self.mask.as_deref(), self.interval)
            }
            Some(HeatmapData::Raw(grid)) => MaskCounts {
                not_masked: grid
                    .iter_data()
                    .filter(|(c, _)| !self.is_masked(*c))
                    .count(),
                ..Default::default()
            },
            None => MaskCounts::default(),
        };
    }

    // --- Queries ---

    /// Bounds-safe: indices beyond the mask's extent are not masked.
    pub fn is_masked(&self, coord: BucketCoord) -> bool {
        self.mask.as_ref().is_some_and(|m| m.is_masked(coord))
    }

    /// Filter membership; always true without a filter.
    pub fn is_accepted(&self, value: f64, inclusive_edges: bool) -> bool {
        self.filter
            .is_none_or(|f| f.accepts(value, inclusive_edges))
    }

    pub fn data(&self) -> Option<&HeatmapData> {
        self.data.as_deref()
    }

    pub fn has_data(&self) -> bool {
        self.data.is_some()
    }

    pub fn is_sorted(&self) -> bool {
        matches!(self.data.as_deref(), Some(HeatmapData::Sorted(_)))
    }

    pub fn divisions(&self) -> Option<Divisions> {
        self.data.as_deref().map(HeatmapData::divisions)
    }

    pub fn filter(&self) -> Option<ValueFilter> {
        self.filter
    }

    pub fn mask(&self) -> Option<&VisibilityMask> {
        self.mask.as_deref()
    }

    pub fn interval_policy(&self) -> IntervalPolicy {
        self.interval_policy
    }

    /// Filtered index bounds in sorted mode; `None` in raw mode or when
    /// nothing passes the filter.
    pub fn filtered_interval(&self) -> Option<IndexInterval> {
        self.interval
    }

    pub fn mask_counts(&self) -> MaskCounts {
        self.mask_counts
    }

    /// (min, max) of the current data values.
    pub fn value_range(&self) -> Option<(f64, f64)> {
        self.value_range
    }

    /// Domain of the value axis (the display range).
    pub fn display_range(&self) -> (f64, f64) {
        self.value.normalizer.domain()
    }

    pub fn spatial(&self) -> &SpatialBindings {
        &self.spatial
    }

    pub fn value_binding(&self) -> &AxisBinding {
        &self.value
    }

    pub fn normalized_value(&self, value: f64) -> f64 {
        self.value.normalizer.get_normalized(value)
    }

    pub fn value_ticks(&self, count: usize) -> Vec<f64> {
        self.value.normalizer.ticks(count)
    }

    /// Buckets that end up on screen: data-carrying, accepted, not masked.
    /// Sorted mode yields them in ascending value order.
    pub fn visible_buckets(&self) -> Box<dyn Iterator<Item = (BucketCoord, f64)> + '_> {
        match self.data.as_deref() {
            Some(HeatmapData::Sorted(sorted)) => {
                let Some(iv) = self.interval else {
                    return Box::new(std::iter::empty());
                };
                Box::new(
                    sorted.coords()[iv.left..=iv.right]
                        .iter()
                        .copied()
                        .zip(sorted.values()[iv.left..=iv.right].iter().copied())
                        .filter(move |(c, _)| !self.is_masked(*c)),
                )
            }
            Some(HeatmapData::Raw(grid)) => Box::new(
                grid.iter_data()
                    .filter(move |(c, v)| self.is_accepted(*v, true) && !self.is_masked(*c)),
            ),
            None => Box::new(std::iter::empty()),
        }
    }

    /// Buckets that occupy GPU buffer slots. In sorted mode this ignores the
    /// filter, which is applied later as a draw sub-range.
    pub fn buffered_buckets(&self) -> Box<dyn Iterator<Item = (BucketCoord, f64)> + '_> {
        match self.data.as_deref() {
            Some(HeatmapData::Sorted(sorted)) => {
                Box::new(sorted.iter().filter(move |(c, _)| !self.is_masked(*c)))
            }
            Some(HeatmapData::Raw(_)) => self.visible_buckets(),
            None => Box::new(std::iter::empty()),
        }
    }

    pub fn visible_count(&self) -> usize {
        self.visible_buckets().count()
    }

    /// Value stored at `coord`, if it carries data.
    pub fn value_at(&self, coord: BucketCoord) -> Option<f64> {
        match self.data.as_deref() {
            Some(HeatmapData::Raw(grid)) => grid.get(coord).filter(|v| !is_no_data(*v)),
            Some(HeatmapData::Sorted(sorted)) => sorted
                .coords()
                .iter()
                .position(|c| *c == coord)
                .map(|i| sorted.values()[i]),
            None => None,
        }
    }
}

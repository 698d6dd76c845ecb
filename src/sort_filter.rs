//! Sorting raw grids by value and resolving value filters to index intervals.

use crate::data_types::{
    BucketCoord, IndexInterval, IntervalPolicy, RawGrid, SortedBuckets, ValueFilter,
    VisibilityMask,
};
use rayon::prelude::*;
use std::time::Instant;
use tracing::debug;

/// Above this many buckets the sort runs on the rayon pool.
pub const PARALLEL_SORT_THRESHOLD: usize = 16_384;

/// Enumerates every data-carrying bucket of `grid` and sorts by value ascending.
/// Ties are broken arbitrarily.
pub fn sort_raw(grid: &RawGrid) -> SortedBuckets {
    let start = Instant::now();
    let mut pairs: Vec<(BucketCoord, f64)> = grid.iter_data().collect();

    if pairs.len() > PARALLEL_SORT_THRESHOLD {
        pairs.par_sort_unstable_by(|a, b| a.1.total_cmp(&b.1));
    } else {
        pairs.sort_unstable_by(|a, b| a.1.total_cmp(&b.1));
    }

    let (coords, values): (Vec<_>, Vec<_>) = pairs.into_iter().unzip();
    debug!(
        buckets = values.len(),
        elapsed_us = start.elapsed().as_micros() as u64,
        "presorted raw grid"
    );
    SortedBuckets::from_engine(grid.divisions(), coords, values)
}

/// Resolves `filter` over ascending `values` to the inclusive interval of
/// accepted indices, in `O(log N)`.
///
/// `left` is the first index with `values[i] >= lo`, `right` the last with
/// `values[i] <= hi`. Without a filter the whole range is returned. `None`
/// means no index is drawn.
pub fn resolve_filter_interval(
    values: &[f64],
    filter: Option<ValueFilter>,
    policy: IntervalPolicy,
) -> Option<IndexInterval> {
    let n = values.len();
    if n == 0 {
        return None;
    }
    let Some(filter) = filter else {
        return Some(IndexInterval::new(0, n - 1));
    };

    let left = values.partition_point(|v| *v < filter.lo);
    let right_end = values.partition_point(|v| *v <= filter.hi);
    let left_found = left < n;
    let right_found = right_end > 0;

    let (left, right) = match policy {
        IntervalPolicy::Strict => {
            if !left_found || !right_found {
                return None;
            }
            (left, right_end - 1)
        }
        IntervalPolicy::LegacyClamp => {
            let left = if left_found { left } else { 0 };
            let right = if right_found { right_end - 1 } else { 0 };
            (left.min(n - 1), right.min(n - 1))
        }
    };

    // lo > hi, or a filter falling between two adjacent values.
    (left <= right).then(|| IndexInterval::new(left, right))
}

/// Masked-bucket bookkeeping for a sorted buffer that skips masked buckets.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MaskCounts {
    /// Buckets that occupy buffer slots.
    pub not_masked: usize,
    /// Masked buckets at sorted indices `< left`.
    pub masked_before_left: usize,
    /// Masked buckets at sorted indices in `[left, right]`.
    pub masked_within: usize,
}

pub fn count_masked(
    coords: &[BucketCoord],
    mask: Option<&VisibilityMask>,
    interval: Option<IndexInterval>,
) -> MaskCounts {
    let Some(mask) = mask else {
        return MaskCounts {
            not_masked: coords.len(),
            ..Default::default()
        };
    };

    let mut counts = MaskCounts::default();
    for (i, coord) in coords.iter().enumerate() {
        if !mask.is_masked(*coord) {
            counts.not_masked += 1;
            continue;
        }
        match interval {
            Some(iv) if i < iv.left => counts.masked_before_left += 1,
            Some(iv) if iv.contains(i) => counts.masked_within += 1,
            _ => {}
        }
    }
    counts
}

use super::bucket::{is_no_data, BucketCoord, Divisions};
use crate::error::{InvalidDataReason, Result};

/// Parallel `coords` / `values` arrays, jointly sorted ascending by value.
#[derive(Clone, Debug, PartialEq)]
pub struct SortedBuckets {
    divisions: Divisions,
    coords: Vec<BucketCoord>,
    values: Vec<f64>,
}

impl SortedBuckets {
    /// Validates and wraps caller-supplied presorted data.
    pub fn new(divisions: Divisions, coords: Vec<BucketCoord>, values: Vec<f64>) -> Result<Self> {
        if divisions.is_empty() {
            return Err(InvalidDataReason::EmptyDivisions.into());
        }
        if coords.len() != values.len() {
            return Err(InvalidDataReason::LengthMismatch {
                coords: coords.len(),
                values: values.len(),
            }
            .into());
        }
        if let Some(index) = values.iter().position(|v| is_no_data(*v)) {
            return Err(InvalidDataReason::NoDataValue { index }.into());
        }
        if let Some(index) = values.windows(2).position(|w| w[1] < w[0]) {
            return Err(InvalidDataReason::Unsorted { index: index + 1 }.into());
        }
        if let Some(coord) = coords.iter().find(|c| !divisions.contains(**c)) {
            return Err(InvalidDataReason::CoordinateOutOfRange { coord: *coord }.into());
        }
        Ok(Self {
            divisions,
            coords,
            values,
        })
    }

    /// Wraps pairs produced by the sort engine, which already hold the invariants.
    pub(crate) fn from_engine(
        divisions: Divisions,
        coords: Vec<BucketCoord>,
        values: Vec<f64>,
    ) -> Self {
        debug_assert_eq!(coords.len(), values.len());
        Self {
            divisions,
            coords,
            values,
        }
    }

    pub fn divisions(&self) -> Divisions {
        self.divisions
    }

    pub fn coords(&self) -> &[BucketCoord] {
        &self.coords
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (BucketCoord, f64)> + '_ {
        self.coords.iter().copied().zip(self.values.iter().copied())
    }

    /// (min, max) of the stored values.
    pub fn value_range(&self) -> Option<(f64, f64)> {
        Some((*self.values.first()?, *self.values.last()?))
    }
}

#![cfg(feature = "polars")]

//! Builds value-sorted bucket data from a Polars `DataFrame` with one row per
//! bucket: integer coordinate columns plus a value column.

use crate::data_types::{BucketCoord, Divisions, SortedBuckets, SENTINEL};
use crate::error::{HeatmapError, Result};
use polars::prelude::*;
use tracing::debug;

pub struct PolarsBucketSource {
    df: DataFrame,
    x_col: String,
    y_col: String,
    z_col: Option<String>,
    value_col: String,
}

impl PolarsBucketSource {
    pub fn new(df: DataFrame, x_col: &str, y_col: &str, value_col: &str) -> Self {
        Self {
            df,
            x_col: x_col.to_string(),
            y_col: y_col.to_string(),
            z_col: None,
            value_col: value_col.to_string(),
        }
    }

    pub fn with_z(mut self, z_col: &str) -> Self {
        self.z_col = Some(z_col.to_string());
        self
    }

    pub fn len(&self) -> usize {
        self.df.height()
    }

    pub fn is_empty(&self) -> bool {
        self.df.height() == 0
    }

    /// Drops null and no-data rows, sorts by value, and validates the result
    /// against `divisions`.
    pub fn to_sorted(&self, divisions: Divisions) -> Result<SortedBuckets> {
        let v = self.value_col.as_str();
        let mut coords = vec![
            col(&self.x_col).cast(DataType::UInt32),
            col(&self.y_col).cast(DataType::UInt32),
        ];
        if let Some(z) = &self.z_col {
            coords.push(col(z).cast(DataType::UInt32));
        }
        coords.push(col(v).cast(DataType::Float64));

        let df = self
            .df
            .clone()
            .lazy()
            .select(coords)
            .filter(
                col(v)
                    .is_not_null()
                    .and(col(v).is_not_nan())
                    .and(col(v).gt(lit(SENTINEL))),
            )
            .sort([v], Default::default())
            .collect()
            .map_err(|e| HeatmapError::DataFrame(e.to_string()))?;

        let xs = self.u32_column(&df, &self.x_col)?;
        let ys = self.u32_column(&df, &self.y_col)?;
        let zs = match &self.z_col {
            Some(z) => Some(self.u32_column(&df, z)?),
            None => None,
        };
        let values: Vec<f64> = df
            .column(v)
            .ok()
            .and_then(|c| c.as_series())
            .and_then(|s| s.f64().ok())
            .ok_or_else(|| HeatmapError::DataFrame(format!("missing f64 column {v}")))?
            .into_iter()
            .map(|x| x.unwrap_or(SENTINEL))
            .collect();

        let coords: Vec<BucketCoord> = (0..values.len())
            .map(|i| BucketCoord {
                x: xs[i],
                y: ys[i],
                z: zs.as_ref().map_or(0, |z| z[i]),
            })
            .collect();
        debug!(rows = self.df.height(), buckets = values.len(), "data frame sorted");
        SortedBuckets::new(divisions, coords, values)
    }

    fn u32_column(&self, df: &DataFrame, name: &str) -> Result<Vec<u32>> {
        let ca = df
            .column(name)
            .ok()
            .and_then(|c| c.as_series())
            .and_then(|s| s.u32().ok())
            .ok_or_else(|| HeatmapError::DataFrame(format!("missing coordinate column {name}")))?;
        ca.into_iter()
            .enumerate()
            .map(|(row, x)| {
                x.ok_or_else(|| HeatmapError::DataFrame(format!("null coordinate in {name} at row {row}")))
            })
            .collect()
    }
}

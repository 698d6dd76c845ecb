use super::bucket::{is_no_data, BucketCoord, Divisions};
use crate::error::{InvalidDataReason, Result};

/// Dense bucket values indexed `[z][y][x]`, stored flat.
#[derive(Clone, Debug, PartialEq)]
pub struct RawGrid {
    divisions: Divisions,
    values: Vec<f64>,
}

impl RawGrid {
    /// Builds a grid from flat `[z][y][x]` ordered values.
    pub fn from_flat(divisions: Divisions, values: Vec<f64>) -> Result<Self> {
        if divisions.is_empty() {
            return Err(InvalidDataReason::EmptyDivisions.into());
        }
        let expected = divisions.bucket_count();
        if values.len() != expected {
            return Err(InvalidDataReason::WrongLength {
                len: values.len(),
                expected,
            }
            .into());
        }
        Ok(Self { divisions, values })
    }

    /// Builds a 2D grid from rows (`rows[y][x]`).
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self> {
        let height = rows.len();
        let width = rows.first().map(|r| r.len()).unwrap_or(0);
        let mut values = Vec::with_capacity(width * height);
        for (row, r) in rows.into_iter().enumerate() {
            if r.len() != width {
                return Err(InvalidDataReason::RaggedGrid {
                    row,
                    len: r.len(),
                    expected: width,
                }
                .into());
            }
            values.extend(r);
        }
        Self::from_flat(Divisions::new_2d(width, height), values)
    }

    /// Builds a 3D grid from slices (`slices[z][y][x]`).
    pub fn from_slices(slices: Vec<Vec<Vec<f64>>>) -> Result<Self> {
        let depth = slices.len();
        let height = slices.first().map(|s| s.len()).unwrap_or(0);
        let width = slices
            .first()
            .and_then(|s| s.first())
            .map(|r| r.len())
            .unwrap_or(0);
        let mut values = Vec::with_capacity(width * height * depth);
        let mut row_index = 0;
        for slice in slices {
            if slice.len() != height {
                return Err(InvalidDataReason::RaggedGrid {
                    row: row_index,
                    len: slice.len(),
                    expected: height,
                }
                .into());
            }
            for r in slice {
                if r.len() != width {
                    return Err(InvalidDataReason::RaggedGrid {
                        row: row_index,
                        len: r.len(),
                        expected: width,
                    }
                    .into());
                }
                values.extend(r);
                row_index += 1;
            }
        }
        Self::from_flat(Divisions::new_3d(width, height, depth), values)
    }

    pub fn divisions(&self) -> Divisions {
        self.divisions
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn get(&self, coord: BucketCoord) -> Option<f64> {
        if !self.divisions.contains(coord) {
            return None;
        }
        self.values.get(self.divisions.flat_index(coord)).copied()
    }

    /// Iterates every bucket that carries data, in `[z][y][x]` order.
    pub fn iter_data(&self) -> impl Iterator<Item = (BucketCoord, f64)> + '_ {
        self.values
            .iter()
            .enumerate()
            .filter(|(_, v)| !is_no_data(**v))
            .map(|(i, v)| (self.divisions.coord_of(i), *v))
    }

    pub fn data_count(&self) -> usize {
        self.values.iter().filter(|v| !is_no_data(**v)).count()
    }
}

use serde::{Deserialize, Serialize};

/// Value reserved for "no data" buckets. Skipped everywhere.
pub const SENTINEL: f64 = f64::NEG_INFINITY;

/// Returns true for buckets that carry no data (sentinel or NaN).
#[inline]
pub fn is_no_data(value: f64) -> bool {
    value == SENTINEL || value.is_nan()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
    Z,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dimensionality {
    Two,
    Three,
}

/// One cell of the division grid. `z` is always 0 for 2D heatmaps.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BucketCoord {
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

impl BucketCoord {
    pub fn new(x: u32, y: u32, z: u32) -> Self {
        Self { x, y, z }
    }

    pub fn planar(x: u32, y: u32) -> Self {
        Self { x, y, z: 0 }
    }

    pub fn get(&self, axis: Axis) -> u32 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }
}

impl From<(u32, u32)> for BucketCoord {
    fn from((x, y): (u32, u32)) -> Self {
        Self::planar(x, y)
    }
}

impl From<(u32, u32, u32)> for BucketCoord {
    fn from((x, y, z): (u32, u32, u32)) -> Self {
        Self::new(x, y, z)
    }
}

/// Per-axis division counts of the grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Divisions {
    pub x: usize,
    pub y: usize,
    pub z: usize,
    pub dims: Dimensionality,
}

impl Divisions {
    pub fn new_2d(x: usize, y: usize) -> Self {
        Self {
            x,
            y,
            z: 1,
            dims: Dimensionality::Two,
        }
    }

    pub fn new_3d(x: usize, y: usize, z: usize) -> Self {
        Self {
            x,
            y,
            z,
            dims: Dimensionality::Three,
        }
    }

    pub fn get(&self, axis: Axis) -> usize {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }

    pub fn is_3d(&self) -> bool {
        self.dims == Dimensionality::Three
    }

    pub fn bucket_count(&self) -> usize {
        self.x * self.y * self.z
    }

    pub fn is_empty(&self) -> bool {
        self.bucket_count() == 0
    }

    pub fn contains(&self, coord: BucketCoord) -> bool {
        (coord.x as usize) < self.x && (coord.y as usize) < self.y && (coord.z as usize) < self.z
    }

    /// Flat offset of `coord` in a dense `[z][y][x]` array.
    #[inline]
    pub fn flat_index(&self, coord: BucketCoord) -> usize {
        (coord.z as usize * self.y + coord.y as usize) * self.x + coord.x as usize
    }

    #[inline]
    pub fn coord_of(&self, flat: usize) -> BucketCoord {
        let plane = self.x * self.y;
        let z = flat / plane;
        let rem = flat % plane;
        BucketCoord::new((rem % self.x) as u32, (rem / self.x) as u32, z as u32)
    }
}

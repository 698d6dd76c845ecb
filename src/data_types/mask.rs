use super::bucket::BucketCoord;

/// Per-bucket suppression flags, indexed `[z][y][x]`; `true` hides a bucket.
///
/// The mask may be smaller than the grid, and rows may be ragged: any lookup
/// outside the stored flags reads as "not masked".
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VisibilityMask {
    cells: Vec<Vec<Vec<bool>>>,
}

impl VisibilityMask {
    pub fn new(cells: Vec<Vec<Vec<bool>>>) -> Self {
        Self { cells }
    }

    /// 2D mask (`rows[y][x]`), stored as the single `z = 0` slice.
    pub fn planar(rows: Vec<Vec<bool>>) -> Self {
        Self { cells: vec![rows] }
    }

    /// Builds a mask of the given extent with `masked` deciding each flag.
    pub fn from_fn(
        x: usize,
        y: usize,
        z: usize,
        mut masked: impl FnMut(BucketCoord) -> bool,
    ) -> Self {
        let cells = (0..z)
            .map(|zi| {
                (0..y)
                    .map(|yi| {
                        (0..x)
                            .map(|xi| masked(BucketCoord::new(xi as u32, yi as u32, zi as u32)))
                            .collect()
                    })
                    .collect()
            })
            .collect();
        Self { cells }
    }

    #[inline]
    pub fn is_masked(&self, coord: BucketCoord) -> bool {
        self.cells
            .get(coord.z as usize)
            .and_then(|slice| slice.get(coord.y as usize))
            .and_then(|row| row.get(coord.x as usize))
            .copied()
            .unwrap_or(false)
    }

    pub fn masked_count(&self) -> usize {
        self.cells.iter().flatten().flatten().filter(|m| **m).count()
    }
}

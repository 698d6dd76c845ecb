use serde::{Deserialize, Serialize};

/// Closed value interval. A bucket is accepted iff its value lies inside.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ValueFilter {
    pub lo: f64,
    pub hi: f64,
}

impl ValueFilter {
    pub fn new(lo: f64, hi: f64) -> Self {
        Self { lo, hi }
    }

    /// Membership test. `inclusive_edges` selects `[lo, hi]` over `(lo, hi)`.
    pub fn accepts(&self, value: f64, inclusive_edges: bool) -> bool {
        if inclusive_edges {
            value >= self.lo && value <= self.hi
        } else {
            value > self.lo && value < self.hi
        }
    }
}

/// Inclusive index interval `[left, right]` over sorted values.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IndexInterval {
    pub left: usize,
    pub right: usize,
}

impl IndexInterval {
    pub fn new(left: usize, right: usize) -> Self {
        Self { left, right }
    }

    /// Number of indices covered; an interval always covers at least one.
    pub fn count(&self) -> usize {
        self.right + 1 - self.left
    }

    pub fn contains(&self, index: usize) -> bool {
        index >= self.left && index <= self.right
    }
}

/// How a failed boundary search is reported.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntervalPolicy {
    /// No bucket passes: the interval is absent.
    #[default]
    Strict,
    /// A failed search on either side clamps that side to index 0.
    LegacyClamp,
}

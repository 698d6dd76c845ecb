//! Value statistics over bucket arrays.
//! Relying on auto-vectorization by LLVM.

use crate::data_types::is_no_data;

/// (min, max) over all data-carrying values, or `None` if there are none.
pub fn value_range(data: &[f64]) -> Option<(f64, f64)> {
    let chunks = data.chunks_exact(8);
    let rem = chunks.remainder();

    let mut min_val = f64::INFINITY;
    let mut max_val = f64::NEG_INFINITY;
    let mut found = false;

    for c in chunks {
        for &v in c {
            if is_no_data(v) {
                continue;
            }
            min_val = min_val.min(v);
            max_val = max_val.max(v);
            found = true;
        }
    }

    for &v in rem {
        if is_no_data(v) {
            continue;
        }
        min_val = min_val.min(v);
        max_val = max_val.max(v);
        found = true;
    }

    found.then_some((min_val, max_val))
}

/// Sum of data-carrying values.
pub fn sum_values(data: &[f64]) -> f64 {
    let chunks = data.chunks_exact(8);
    let rem = chunks.remainder();
    let keep = |v: f64| if is_no_data(v) { 0.0 } else { v };
    let mut total = 0.0;

    for c in chunks {
        total += keep(c[0])
            + keep(c[1])
            + keep(c[2])
            + keep(c[3])
            + keep(c[4])
            + keep(c[5])
            + keep(c[6])
            + keep(c[7]);
    }

    for &val in rem {
        total += keep(val);
    }
    total
}

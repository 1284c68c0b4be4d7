//! Nearest-key snapping onto discrete grid axes.
//!
//! Grids are sampled at fixed steps in age and metallicity, so a request almost
//! never hits a sampled value exactly. Age and `[Fe/H]` are snapped, not
//! interpolated: the result is always a value that exists in the grid.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Sorted, distinct values present along one key dimension of a grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Axis {
    name: String,
    values: Vec<f64>,
}

impl Axis {
    /// Build an axis from raw samples. Non-finite samples are dropped.
    pub fn new(name: impl Into<String>, values: impl IntoIterator<Item = f64>) -> Self {
        let mut values: Vec<f64> = values.into_iter().filter(|v| v.is_finite()).collect();
        values.sort_by(f64::total_cmp);
        values.dedup_by(|a, b| a.total_cmp(b) == Ordering::Equal);
        Self {
            name: name.into(),
            values,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
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

    pub fn min(&self) -> Option<f64> {
        self.values.first().copied()
    }

    pub fn max(&self) -> Option<f64> {
        self.values.last().copied()
    }

    pub fn contains(&self, value: f64) -> bool {
        self.values.binary_search_by(|v| v.total_cmp(&value)).is_ok()
    }

    /// Snap `value` to the closest axis element.
    pub fn nearest(&self, value: f64) -> Result<f64> {
        nearest(value, self)
    }
}

/// Return the axis element minimizing `|element - value|`.
///
/// Ties go to the lower element. Fails with `EmptyAxis` when there is nothing
/// to snap to, and with `InvalidQuery` for a NaN request.
pub fn nearest(value: f64, axis: &Axis) -> Result<f64> {
    let values = axis.values();
    let (Some(&first), Some(&last)) = (values.first(), values.last()) else {
        return Err(Error::EmptyAxis {
            dimension: axis.name().to_string(),
        });
    };
    if value.is_nan() {
        return Err(Error::InvalidQuery(format!(
            "cannot snap NaN onto axis `{}`",
            axis.name()
        )));
    }

    let idx = values.partition_point(|&v| v < value);
    if idx == 0 {
        return Ok(first);
    }
    if idx == values.len() {
        return Ok(last);
    }

    let lo = values[idx - 1];
    let hi = values[idx];
    if value - lo <= hi - value { Ok(lo) } else { Ok(hi) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ages() -> Axis {
        Axis::new("age", [9.0, 9.5, 9.75, 10.0])
    }

    #[test]
    fn axis_sorts_and_dedups() {
        let axis = Axis::new("feh", [0.25, -0.25, 0.0, 0.0, f64::NAN, -0.25]);
        assert_eq!(axis.values(), &[-0.25, 0.0, 0.25]);
        assert_eq!(axis.min(), Some(-0.25));
        assert_eq!(axis.max(), Some(0.25));
        assert!(axis.contains(0.0));
        assert!(!axis.contains(0.1));
    }

    #[test]
    fn exact_values_are_fixed_points() {
        let axis = ages();
        for &v in axis.values() {
            assert_eq!(axis.nearest(v).unwrap(), v);
        }
    }

    #[test]
    fn snaps_to_closest_and_clamps_outside() {
        let axis = ages();
        assert_eq!(axis.nearest(9.7).unwrap(), 9.75);
        assert_eq!(axis.nearest(9.2).unwrap(), 9.0);
        assert_eq!(axis.nearest(8.0).unwrap(), 9.0);
        assert_eq!(axis.nearest(11.0).unwrap(), 10.0);
    }

    #[test]
    fn ties_prefer_lower_value() {
        let axis = Axis::new("feh", [-0.5, 0.5]);
        assert_eq!(axis.nearest(0.0).unwrap(), -0.5);
    }

    #[test]
    fn empty_axis_is_an_error() {
        let axis = Axis::new("age", []);
        assert!(matches!(axis.nearest(9.0), Err(Error::EmptyAxis { .. })));
    }
}

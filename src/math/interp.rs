//! Clamped linear interpolation on sorted abscissae.
//!
//! Everything here works on ascending `xs` and never extrapolates: queries
//! outside `[xs[0], xs[n-1]]` resolve to the nearest endpoint. Callers that
//! need to *know* a value was clamped use [`clamp_to_range`] first.

/// Position of `x` between two samples of an ascending axis.
///
/// The interpolated value is `(1 - weight) * f[lo] + weight * f[hi]`.
/// `lo == hi` (with `weight == 0`) means `x` coincides with, or was clamped
/// to, a single sample, so only that sample is read.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bracket {
    pub lo: usize,
    pub hi: usize,
    pub weight: f64,
}

impl Bracket {
    fn single(idx: usize) -> Self {
        Self {
            lo: idx,
            hi: idx,
            weight: 0.0,
        }
    }

    /// Whether `x` landed exactly on (or was clamped to) one sample.
    pub fn is_exact(&self) -> bool {
        self.lo == self.hi
    }

    /// Interpolate `values` at this bracket.
    ///
    /// Returns `None` when a sample the result depends on is not finite.
    pub fn apply(&self, values: &[f64]) -> Option<f64> {
        let a = *values.get(self.lo)?;
        if self.is_exact() {
            return a.is_finite().then_some(a);
        }
        let b = *values.get(self.hi)?;
        if !(a.is_finite() && b.is_finite()) {
            return None;
        }
        Some(a + self.weight * (b - a))
    }

    /// Index of the sample closest to `x` (ties go to `lo`).
    pub fn nearest(&self) -> usize {
        if self.weight > 0.5 { self.hi } else { self.lo }
    }
}

/// Locate `x` on the ascending axis `xs`, clamping to the ends.
///
/// Returns `None` for an empty axis or a NaN query.
pub fn bracket(x: f64, xs: &[f64]) -> Option<Bracket> {
    let last = xs.len().checked_sub(1)?;
    if x.is_nan() {
        return None;
    }
    if x <= xs[0] {
        return Some(Bracket::single(0));
    }
    if x >= xs[last] {
        return Some(Bracket::single(last));
    }

    let idx = xs.partition_point(|&v| v < x);
    if xs[idx] == x {
        return Some(Bracket::single(idx));
    }

    let lo = idx - 1;
    let span = xs[idx] - xs[lo];
    Some(Bracket {
        lo,
        hi: idx,
        weight: (x - xs[lo]) / span,
    })
}

/// Clamp `x` into `[xs[0], xs[n-1]]`, reporting whether it moved.
pub fn clamp_to_range(x: f64, xs: &[f64]) -> (f64, bool) {
    let (Some(&min), Some(&max)) = (xs.first(), xs.last()) else {
        return (x, false);
    };
    if x < min {
        (min, true)
    } else if x > max {
        (max, true)
    } else {
        (x, false)
    }
}

/// Interpolate a single value (equivalent to `numpy.interp` for ascending `xp`).
pub fn interp_one(x: f64, xp: &[f64], fp: &[f64]) -> Option<f64> {
    bracket(x, xp)?.apply(fp)
}

/// True when every sample is strictly greater than the one before it.
pub fn is_strictly_increasing(xs: &[f64]) -> bool {
    xs.windows(2).all(|w| w[0] < w[1])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interp_between_samples() {
        let xp = [0.0, 1.0, 2.0];
        let fp = [0.0, 10.0, 20.0];
        assert!((interp_one(0.5, &xp, &fp).unwrap() - 5.0).abs() < 1e-12);
        assert!((interp_one(1.5, &xp, &fp).unwrap() - 15.0).abs() < 1e-12);
    }

    #[test]
    fn interp_clamps_outside_range() {
        let xp = [1.0, 2.0, 3.0];
        let fp = [10.0, 20.0, 30.0];
        assert_eq!(interp_one(0.0, &xp, &fp), Some(10.0));
        assert_eq!(interp_one(4.0, &xp, &fp), Some(30.0));
    }

    #[test]
    fn exact_hit_ignores_missing_neighbours() {
        let xp = [1.0, 2.0, 3.0];
        let fp = [f64::NAN, 20.0, f64::NAN];
        assert_eq!(interp_one(2.0, &xp, &fp), Some(20.0));
        assert_eq!(interp_one(2.5, &xp, &fp), None);
    }

    #[test]
    fn nearest_prefers_lower_on_tie() {
        let b = bracket(1.5, &[1.0, 2.0]).unwrap();
        assert_eq!(b.nearest(), 0);
        let b = bracket(1.75, &[1.0, 2.0]).unwrap();
        assert_eq!(b.nearest(), 1);
    }

    #[test]
    fn clamp_reports_movement() {
        let xs = [200.0, 300.0];
        assert_eq!(clamp_to_range(150.0, &xs), (200.0, true));
        assert_eq!(clamp_to_range(250.0, &xs), (250.0, false));
        assert_eq!(clamp_to_range(301.0, &xs), (300.0, true));
    }

    #[test]
    fn empty_axis_has_no_bracket() {
        assert!(bracket(1.0, &[]).is_none());
        assert!(bracket(f64::NAN, &[1.0]).is_none());
    }
}

//! Unit conversions shared by the evaluators and the target ingest.

/// Convert an age in Gyr to the `log10(age / yr)` coordinate MIST grids use.
///
/// Returns `None` for non-positive or non-finite ages.
pub fn log_age_from_gyr(age_gyr: f64) -> Option<f64> {
    if !(age_gyr.is_finite() && age_gyr > 0.0) {
        return None;
    }
    Some((age_gyr * 1e9).log10())
}

/// Distance modulus `5 log10(d / 10 pc)`.
///
/// Exactly `0.0` at 10 pc, so apparent and absolute magnitudes coincide there.
pub fn distance_modulus(distance_pc: f64) -> f64 {
    5.0 * (distance_pc / 10.0).log10()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gyr_to_log_years() {
        assert!((log_age_from_gyr(1.0).unwrap() - 9.0).abs() < 1e-12);
        assert!((log_age_from_gyr(5.0).unwrap() - 9.698_970_004_336_019).abs() < 1e-12);
        assert!(log_age_from_gyr(0.0).is_none());
        assert!(log_age_from_gyr(-1.0).is_none());
    }

    #[test]
    fn distance_modulus_reference_points() {
        assert_eq!(distance_modulus(10.0), 0.0);
        assert!((distance_modulus(100.0) - 5.0).abs() < 1e-12);
        assert!((distance_modulus(1000.0) - 10.0).abs() < 1e-12);
    }
}

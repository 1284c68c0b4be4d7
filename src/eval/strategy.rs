//! Named evaluation strategies for reading values off an isochrone slice.
//!
//! Grids differ in how complete they are. Some have every column filled at
//! every EEP; others leave holes (a band that was never computed for the
//! coolest models, say). The strategies below trade accuracy for tolerance and
//! are tried per field, in `Strategy::PRIORITY` order:
//!
//! 1. `ColumnInterpolation`: linear interpolation between the two bracketing
//!    rows. Needs strictly increasing EEPs and finite values at both rows.
//! 2. `PerColumn`: the column interpolated over only its own finite samples.
//!    Fails only when the column has no data at all in the slice.
//! 3. `NearestRow`: the value at the row with the closest EEP, no
//!    interpolation. Needs that one row to carry the value.
//!
//! A hole in one column never changes how another column is evaluated.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::eval::isochrone::IsochroneSlice;
use crate::math::{bracket, interp_one};

/// Declared from most to least precise, so `Ord` ranks precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    ColumnInterpolation,
    PerColumn,
    NearestRow,
}

impl Strategy {
    /// Order in which strategies are attempted for each field.
    pub const PRIORITY: [Strategy; 3] = [
        Strategy::ColumnInterpolation,
        Strategy::PerColumn,
        Strategy::NearestRow,
    ];

    pub fn display_name(self) -> &'static str {
        match self {
            Strategy::ColumnInterpolation => "column interpolation",
            Strategy::NearestRow => "nearest row",
            Strategy::PerColumn => "per-column interpolation",
        }
    }

    /// Evaluate one field with the first strategy in `PRIORITY` that succeeds.
    ///
    /// `eep` is expected to be inside the slice's EEP range already (clamping is
    /// the caller's policy decision).
    pub fn first_success(slice: &IsochroneSlice, eep: f64, field: &str) -> Result<(Strategy, f64)> {
        let mut failures = Vec::new();
        for strategy in Strategy::PRIORITY {
            match strategy.evaluate_field(slice, eep, field) {
                Ok(value) => return Ok((strategy, value)),
                Err(err) => {
                    debug!(field, strategy = strategy.display_name(), error = %err, "strategy failed");
                    failures.push(err);
                }
            }
        }
        Err(most_informative(failures))
    }

    pub fn evaluate_field(self, slice: &IsochroneSlice, eep: f64, field: &str) -> Result<f64> {
        let column = slice.column(field).ok_or_else(|| Error::FieldNotFound {
            field: field.to_string(),
            available: slice.available_fields(),
        })?;
        let eeps = slice.eeps();

        match self {
            Strategy::ColumnInterpolation => {
                if !slice.has_distinct_eeps() {
                    return Err(Error::Interpolation(format!(
                        "isochrone at age={} feh={} has repeated EEP samples",
                        slice.age(),
                        slice.feh()
                    )));
                }
                bracket(eep, eeps)
                    .and_then(|b| b.apply(column))
                    .ok_or_else(|| missing_near(field, eep))
            }
            Strategy::NearestRow => {
                let b = bracket(eep, eeps).ok_or_else(|| missing_near(field, eep))?;
                column
                    .get(b.nearest())
                    .copied()
                    .filter(|v| v.is_finite())
                    .ok_or_else(|| missing_near(field, eep))
            }
            Strategy::PerColumn => {
                let (xs, ys): (Vec<f64>, Vec<f64>) = eeps
                    .iter()
                    .zip(column)
                    .filter(|(_, v)| v.is_finite())
                    .map(|(&x, &v)| (x, v))
                    .unzip();
                interp_one(eep, &xs, &ys).ok_or_else(|| {
                    Error::Interpolation(format!("`{field}` has no finite samples on this isochrone"))
                })
            }
        }
    }
}

fn missing_near(field: &str, eep: f64) -> Error {
    Error::Interpolation(format!("`{field}` has no value near EEP {eep}"))
}

/// Pick the error that tells the caller the most.
///
/// A `FieldNotFound` names the field and lists what is available, so it wins
/// over generic interpolation failures.
fn most_informative(failures: Vec<Error>) -> Error {
    let mut fallback = None;
    for err in failures {
        if matches!(err, Error::FieldNotFound { .. }) {
            return err;
        }
        fallback = Some(err);
    }
    fallback.unwrap_or_else(|| Error::Interpolation("no evaluation strategy was attempted".to_string()))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn slice_with(eeps: Vec<f64>, teff: Vec<f64>) -> IsochroneSlice {
        let mut columns = BTreeMap::new();
        columns.insert("Teff".to_string(), teff);
        IsochroneSlice::from_columns(9.0, 0.0, eeps, columns)
    }

    #[test]
    fn column_interpolation_is_linear_between_rows() {
        let slice = slice_with(vec![200.0, 300.0], vec![5000.0, 6000.0]);
        let v = Strategy::ColumnInterpolation.evaluate_field(&slice, 225.0, "Teff").unwrap();
        assert!((v - 5250.0).abs() < 1e-9);
    }

    #[test]
    fn hole_next_to_eep_fails_interpolation_but_not_later_strategies() {
        let slice = slice_with(vec![200.0, 250.0, 300.0], vec![5000.0, f64::NAN, 6000.0]);
        assert!(matches!(
            Strategy::ColumnInterpolation.evaluate_field(&slice, 240.0, "Teff"),
            Err(Error::Interpolation(_))
        ));
        // Nearest row to 240 is 250, which is the hole.
        assert!(Strategy::NearestRow.evaluate_field(&slice, 240.0, "Teff").is_err());
        let v = Strategy::PerColumn.evaluate_field(&slice, 240.0, "Teff").unwrap();
        assert!((v - 5400.0).abs() < 1e-9);
    }

    #[test]
    fn nearest_row_reads_without_interpolating() {
        let slice = slice_with(vec![200.0, 250.0, 300.0], vec![5000.0, 5500.0, f64::NAN]);
        let v = Strategy::NearestRow.evaluate_field(&slice, 260.0, "Teff").unwrap();
        assert_eq!(v, 5500.0);
    }

    #[test]
    fn first_success_prefers_interpolation_over_the_nearest_row() {
        let slice = slice_with(vec![200.0, 250.0, 300.0], vec![5000.0, f64::NAN, 6000.0]);
        let (strategy, v) = Strategy::first_success(&slice, 280.0, "Teff").unwrap();
        assert_eq!(strategy, Strategy::PerColumn);
        assert!((v - 5800.0).abs() < 1e-9);

        let (strategy, v) = Strategy::first_success(&slice, 200.0, "Teff").unwrap();
        assert_eq!(strategy, Strategy::ColumnInterpolation);
        assert_eq!(v, 5000.0);
    }

    #[test]
    fn priority_runs_from_most_to_least_precise() {
        assert!(Strategy::PRIORITY.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(
            [Strategy::PerColumn, Strategy::ColumnInterpolation].into_iter().max(),
            Some(Strategy::PerColumn)
        );
    }

    #[test]
    fn repeated_eeps_are_rejected_by_column_interpolation() {
        let slice = slice_with(vec![200.0, 200.0, 300.0], vec![5000.0, 5001.0, 6000.0]);
        assert!(Strategy::ColumnInterpolation.evaluate_field(&slice, 250.0, "Teff").is_err());
        assert!(Strategy::PerColumn.evaluate_field(&slice, 250.0, "Teff").is_ok());
    }

    #[test]
    fn unknown_field_lists_available_fields() {
        let slice = slice_with(vec![200.0, 300.0], vec![5000.0, 6000.0]);
        for strategy in Strategy::PRIORITY {
            match strategy.evaluate_field(&slice, 250.0, "W3_mag") {
                Err(Error::FieldNotFound { field, available }) => {
                    assert_eq!(field, "W3_mag");
                    assert_eq!(available, vec!["Teff".to_string()]);
                }
                other => panic!("{}: unexpected {other:?}", strategy.display_name()),
            }
        }
    }

    #[test]
    fn field_not_found_outranks_interpolation_errors() {
        let err = most_informative(vec![
            Error::Interpolation("a".to_string()),
            Error::FieldNotFound {
                field: "x".to_string(),
                available: vec![],
            },
            Error::Interpolation("b".to_string()),
        ]);
        assert!(matches!(err, Error::FieldNotFound { .. }));

        let err = most_informative(vec![
            Error::Interpolation("a".to_string()),
            Error::Interpolation("b".to_string()),
        ]);
        assert_eq!(err.to_string(), "interpolation failed: b");
    }
}

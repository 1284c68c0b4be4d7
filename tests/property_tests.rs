//! Property-based tests for snapping, interpolation, and end-to-end evaluation.
//!
//! Run with `ProptestConfig::with_cases(100)`; the grid-backed properties share
//! one lazily loaded interpolator.

use std::path::PathBuf;

use once_cell::sync::Lazy;
use proptest::prelude::*;
use stellar_observables::eval::{ExtinctionTable, IsochronePoint, Photometry, evaluate_isochrone};
use stellar_observables::grid::{Axis, nearest};
use stellar_observables::math::{clamp_to_range, interp_one};
use stellar_observables::{EngineConfig, Interpolator, Query};

static INTERP: Lazy<Interpolator> = Lazy::new(|| {
    let config = EngineConfig {
        track_grid: PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/tracks.csv")),
        isochrone_grid: PathBuf::from(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/tests/fixtures/isochrones.csv"
        )),
        ..EngineConfig::default()
    };
    Interpolator::from_config(&config)
});

static EXTINCTION: Lazy<ExtinctionTable> = Lazy::new(ExtinctionTable::default);

/// The (10.0, 0.25) fixture isochrone at 10 pc; Teff and every band fall with EEP.
fn evaluate_fixed_slice(eep: f64) -> IsochronePoint {
    let grid = INTERP.store().load_isochrone_grid().unwrap();
    let fields: Vec<String> = ["Teff", "G_mag", "K_mag"].iter().map(|f| f.to_string()).collect();
    let phot = Photometry::new(10.0, 0.0, &EXTINCTION);
    evaluate_isochrone(grid, eep, 10.0, 0.25, &fields, &phot).unwrap()
}

// ============================================================================
// Generators
// ============================================================================

fn arb_axis() -> impl Strategy<Value = Axis> {
    proptest::collection::vec(-50.0f64..50.0, 1..40).prop_map(|v| Axis::new("x", v))
}

/// Ascending abscissae with matching ordinates.
fn arb_samples() -> impl Strategy<Value = (Vec<f64>, Vec<f64>)> {
    proptest::collection::vec((0.01f64..5.0, -100.0f64..100.0), 2..30).prop_map(|steps| {
        let mut x = 0.0;
        steps
            .into_iter()
            .map(|(dx, y)| {
                x += dx;
                (x, y)
            })
            .unzip()
    })
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Property: snapping always lands on an axis value at minimal distance.
    #[test]
    fn prop_nearest_is_an_axis_value_at_minimal_distance(axis in arb_axis(), v in -80.0f64..80.0) {
        let snapped = nearest(v, &axis).unwrap();
        prop_assert!(axis.contains(snapped));
        let best = (snapped - v).abs();
        for &a in axis.values() {
            prop_assert!(best <= (a - v).abs());
        }
    }

    /// Property: snapping an axis value returns it unchanged.
    #[test]
    fn prop_nearest_fixes_axis_values(axis in arb_axis(), idx in any::<prop::sample::Index>()) {
        let v = axis.values()[idx.index(axis.len())];
        prop_assert_eq!(nearest(v, &axis).unwrap(), v);
    }

    /// Property: interpolation never leaves the range of the bracketing samples.
    #[test]
    fn prop_interp_stays_within_neighbours((xs, ys) in arb_samples(), t in -10.0f64..200.0) {
        let y = interp_one(t, &xs, &ys).unwrap();
        let (clamped, _) = clamp_to_range(t, &xs);
        let hi = xs.partition_point(|&x| x < clamped).min(xs.len() - 1);
        let lo = hi.saturating_sub(1);
        let (a, b) = (ys[lo].min(ys[hi]), ys[lo].max(ys[hi]));
        prop_assert!(y >= a - 1e-9 && y <= b + 1e-9);
    }

    /// Property: on-grid stars evaluate, and the snapped age/feh are grid values.
    #[test]
    fn prop_on_grid_queries_succeed(
        mass in 0.8f64..1.2,
        age in 9.0f64..10.0,
        feh in -0.3f64..0.3,
    ) {
        let obs = INTERP.get_observables(&Query::new(mass, age, feh)).unwrap();
        prop_assert!(obs.eep.is_finite());
        prop_assert!((200.0..=320.0 + 1e-9).contains(&obs.eep));
        prop_assert!([9.5, 9.75, 10.0].contains(&obs.age));
        prop_assert!([-0.25, 0.0, 0.25].contains(&obs.feh));
        prop_assert_eq!(obs.bands.len(), 6);
    }

    /// Property: moving a star farther away only makes it fainter.
    #[test]
    fn prop_magnitudes_increase_with_distance(
        mass in 0.8f64..1.2,
        age in 9.0f64..10.0,
        d1 in 1.0f64..1000.0,
        factor in 1.01f64..100.0,
    ) {
        let near = INTERP
            .get_observables(&Query::new(mass, age, 0.0).with_distance(d1))
            .unwrap();
        let far = INTERP
            .get_observables(&Query::new(mass, age, 0.0).with_distance(d1 * factor))
            .unwrap();
        for (band, m) in &near.bands {
            prop_assert!(far.bands[band] > *m);
        }
    }

    /// Property: repeating a query gives bit-identical results.
    #[test]
    fn prop_evaluation_is_deterministic(mass in 0.8f64..1.2, age in 9.0f64..10.0) {
        let q = Query::new(mass, age, 0.1).with_distance(42.0).with_av(0.1);
        prop_assert_eq!(INTERP.get_observables(&q).unwrap(), INTERP.get_observables(&q).unwrap());
    }

    /// Property: along one isochrone, a decreasing column stays ordered in EEP.
    #[test]
    fn prop_eep_interpolation_preserves_column_order(e1 in 150.0f64..500.0, gap in 0.0f64..300.0) {
        let e2 = e1 + gap;
        let a = evaluate_fixed_slice(e1);
        let b = evaluate_fixed_slice(e2);
        for field in ["Teff", "G_mag", "K_mag"] {
            prop_assert!(a.values[field] >= b.values[field] - 1e-9, "{} at {} vs {}", field, e1, e2);
        }
    }

    /// Property: an EEP outside the isochrone reads the nearest end row exactly.
    #[test]
    fn prop_out_of_range_eep_equals_the_end_row(below in 0.0f64..200.0, above in 450.0f64..2000.0) {
        let first = evaluate_fixed_slice(200.0);
        let last = evaluate_fixed_slice(450.0);
        let low = evaluate_fixed_slice(below);
        let high = evaluate_fixed_slice(above);
        prop_assert_eq!(&low.values, &first.values);
        prop_assert_eq!(&high.values, &last.values);
        prop_assert_eq!(low.eep_clamped, below < 200.0);
        prop_assert_eq!(high.eep_clamped, above > 450.0);
    }
}

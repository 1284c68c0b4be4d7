//! Track evaluation: `(mass, age, feh)` → EEP on the evolutionary-track grid.
//!
//! Metallicity snaps to the nearest sampled track set. Within it, each
//! bracketing track is interpolated linearly in age and the two tracks are
//! blended linearly in initial mass. Nothing is extrapolated: a mass or age
//! the grid does not cover is a `TrackEvaluation` error.

use std::collections::BTreeMap;

use tracing::debug;

use crate::domain::{GridKind, TrackPoint};
use crate::error::{Error, Result};
use crate::grid::{TrackGrid, nearest};
use crate::math::bracket;

pub fn evaluate_track(grid: &TrackGrid, mass: f64, age: f64, feh: f64) -> Result<TrackPoint> {
    let schema = grid.schema();
    let table = grid.table();
    let eep_idx = table
        .value_index(&schema.eep)
        .ok_or_else(|| Error::MissingField {
            kind: GridKind::Track,
            field: schema.eep.clone(),
        })?;

    let snapped_feh = nearest(feh, grid.feh_axis()?)?;
    let masses = grid.masses_at(snapped_feh)?;
    let (Some(min), Some(max)) = (masses.min(), masses.max()) else {
        return Err(Error::EmptyAxis {
            dimension: schema.mass.clone(),
        });
    };
    if !(min..=max).contains(&mass) {
        return Err(Error::TrackEvaluation {
            mass,
            reason: format!("outside the sampled masses [{min}, {max}] at initial feh {snapped_feh}"),
        });
    }

    let b = bracket(mass, masses.values()).ok_or_else(|| Error::TrackEvaluation {
        mass,
        reason: "mass could not be placed on the grid".to_string(),
    })?;
    let lo_mass = masses.values()[b.lo];
    let hi_mass = masses.values()[b.hi];
    debug!(mass, lo_mass, hi_mass, feh, snapped_feh, "track bracket");

    let lo = values_at_age(grid, mass, lo_mass, snapped_feh, age)?;
    let blended = if b.is_exact() {
        lo
    } else {
        let hi = values_at_age(grid, mass, hi_mass, snapped_feh, age)?;
        lo.iter()
            .zip(&hi)
            .map(|(&a, &h)| lerp(a, h, b.weight))
            .collect()
    };

    let eep = blended[eep_idx];
    if !eep.is_finite() {
        return Err(Error::TrackEvaluation {
            mass,
            reason: format!("no EEP at age {age} (initial feh {snapped_feh})"),
        });
    }

    let surface_feh = table
        .value_index(&schema.surface_feh)
        .map(|idx| blended[idx])
        .filter(|v| v.is_finite());

    let values: BTreeMap<String, f64> = table
        .value_columns()
        .iter()
        .cloned()
        .zip(blended)
        .filter(|(_, v)| v.is_finite())
        .collect();

    Ok(TrackPoint {
        mass,
        age,
        initial_feh: snapped_feh,
        eep,
        surface_feh,
        values,
    })
}

/// Every value column of one track, interpolated to `age`.
fn values_at_age(
    grid: &TrackGrid,
    query_mass: f64,
    track_mass: f64,
    feh: f64,
    age: f64,
) -> Result<Vec<f64>> {
    let rows = grid.track(track_mass, feh)?;
    let ages: Vec<f64> = rows.iter().map(|r| grid.age_of(r)).collect();
    let (Some(&first), Some(&last)) = (ages.first(), ages.last()) else {
        return Err(Error::TrackEvaluation {
            mass: query_mass,
            reason: format!("empty track for initial mass {track_mass}"),
        });
    };
    if !(first..=last).contains(&age) {
        return Err(Error::TrackEvaluation {
            mass: query_mass,
            reason: format!(
                "age {age} outside the track range [{first}, {last}] for initial mass {track_mass}"
            ),
        });
    }

    let b = bracket(age, &ages).ok_or_else(|| Error::TrackEvaluation {
        mass: query_mass,
        reason: format!("age {age} could not be placed on the track"),
    })?;
    let (lo, hi) = (rows[b.lo].values(), rows[b.hi].values());
    Ok(lo
        .iter()
        .zip(hi)
        .map(|(&a, &h)| if b.is_exact() { a } else { lerp(a, h, b.weight) })
        .collect())
}

fn lerp(a: f64, b: f64, weight: f64) -> f64 {
    if a.is_finite() && b.is_finite() {
        a + weight * (b - a)
    } else {
        f64::NAN
    }
}

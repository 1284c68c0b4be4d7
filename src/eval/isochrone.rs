//! Isochrone evaluation: `(EEP, age, feh)` → physical and photometric values.
//!
//! Age and metallicity are snapped to the nearest sampled isochrone (no
//! interpolation between isochrones). Along the isochrone, each field is
//! interpolated in EEP by the first [`Strategy`] that succeeds for it.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, warn};

use crate::domain::{CoreParameters, GridKind};
use crate::error::{Error, Result};
use crate::eval::photometry::Photometry;
use crate::eval::strategy::Strategy;
use crate::grid::{IsochroneGrid, nearest};
use crate::math::{bracket, clamp_to_range};

/// One isochrone (fixed age and metallicity), sampled along EEP.
///
/// `eeps` is ascending; every column has one entry per EEP, NaN where the grid
/// has no value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IsochroneSlice {
    age: f64,
    feh: f64,
    eeps: Vec<f64>,
    columns: BTreeMap<String, Vec<f64>>,
}

impl IsochroneSlice {
    /// Build from raw columns. Samples are reordered by EEP; samples with a
    /// non-finite EEP are dropped and short columns are padded with NaN.
    pub fn from_columns(
        age: f64,
        feh: f64,
        eeps: Vec<f64>,
        columns: BTreeMap<String, Vec<f64>>,
    ) -> Self {
        let mut order: Vec<usize> = (0..eeps.len()).filter(|&i| eeps[i].is_finite()).collect();
        order.sort_by(|&a, &b| eeps[a].total_cmp(&eeps[b]));

        let columns = columns
            .into_iter()
            .map(|(name, values)| {
                let reordered = order
                    .iter()
                    .map(|&i| values.get(i).copied().unwrap_or(f64::NAN))
                    .collect();
                (name, reordered)
            })
            .collect();

        Self {
            age,
            feh,
            eeps: order.iter().map(|&i| eeps[i]).collect(),
            columns,
        }
    }

    pub fn age(&self) -> f64 {
        self.age
    }

    pub fn feh(&self) -> f64 {
        self.feh
    }

    pub fn eeps(&self) -> &[f64] {
        &self.eeps
    }

    pub fn len(&self) -> usize {
        self.eeps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.eeps.is_empty()
    }

    pub fn eep_range(&self) -> Option<(f64, f64)> {
        Some((*self.eeps.first()?, *self.eeps.last()?))
    }

    /// A column with at least one finite sample.
    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns
            .get(name)
            .filter(|values| values.iter().any(|v| v.is_finite()))
            .map(Vec::as_slice)
    }

    /// Names of the columns that carry data on this isochrone.
    pub fn available_fields(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter(|(_, values)| values.iter().any(|v| v.is_finite()))
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn has_distinct_eeps(&self) -> bool {
        crate::math::is_strictly_increasing(&self.eeps)
    }
}

/// Values read off an isochrone at one EEP.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IsochronePoint {
    /// Snapped isochrone age.
    pub age: f64,
    /// Snapped isochrone metallicity.
    pub feh: f64,
    pub eep_requested: f64,
    /// EEP actually evaluated (after clamping).
    pub eep: f64,
    pub eep_clamped: bool,
    /// Requested fields; magnitude columns are apparent magnitudes.
    pub values: BTreeMap<String, f64>,
    pub core: CoreParameters,
    pub dm_deep: f64,
    /// Least precise strategy any requested field needed.
    pub strategy: Strategy,
    pub available_fields: Vec<String>,
}

/// The isochrone nearest to `(age, feh)`.
pub fn isochrone_slice(grid: &IsochroneGrid, age: f64, feh: f64) -> Result<IsochroneSlice> {
    let schema = grid.schema();
    let snapped_age = nearest(age, grid.age_axis()?)?;
    let snapped_feh = nearest(feh, grid.feh_axis()?)?;
    debug!(age, feh, snapped_age, snapped_feh, "isochrone snapped");

    let table = grid.table();
    let eep_idx = table
        .value_index(&schema.eep)
        .ok_or_else(|| Error::MissingField {
            kind: GridKind::Isochrone,
            field: schema.eep.clone(),
        })?;

    let rows = grid.rows_at(snapped_age, snapped_feh)?;
    let eeps: Vec<f64> = rows.iter().map(|r| r.values()[eep_idx]).collect();
    let columns = table
        .value_columns()
        .iter()
        .enumerate()
        .filter(|&(idx, _)| idx != eep_idx)
        .map(|(idx, name)| (name.clone(), rows.iter().map(|r| r.values()[idx]).collect()))
        .collect();

    let slice = IsochroneSlice::from_columns(snapped_age, snapped_feh, eeps, columns);
    if slice.is_empty() {
        return Err(Error::EmptyAxis {
            dimension: schema.eep.clone(),
        });
    }
    Ok(slice)
}

/// Evaluate `fields` at `eep` on the isochrone nearest to `(age, feh)`.
pub fn evaluate_isochrone(
    grid: &IsochroneGrid,
    eep: f64,
    age: f64,
    feh: f64,
    fields: &[String],
    photometry: &Photometry,
) -> Result<IsochronePoint> {
    if !eep.is_finite() {
        return Err(Error::InvalidQuery(format!("EEP must be finite, got {eep}")));
    }
    let schema = grid.schema();
    let slice = isochrone_slice(grid, age, feh)?;

    let (eep_used, eep_clamped) = clamp_to_range(eep, slice.eeps());
    if eep_clamped {
        warn!(
            eep,
            clamped_to = eep_used,
            age = slice.age(),
            feh = slice.feh(),
            "EEP outside isochrone range; clamped"
        );
    }

    let mut values = BTreeMap::new();
    let mut strategy = Strategy::ColumnInterpolation;
    for field in fields {
        let (used, value) = Strategy::first_success(&slice, eep_used, field)?;
        if used != Strategy::ColumnInterpolation {
            warn!(
                field = field.as_str(),
                strategy = used.display_name(),
                eep = eep_used,
                "fell back to a less precise evaluation strategy"
            );
        }
        strategy = strategy.max(used);
        let value = if schema.is_magnitude(field) {
            photometry.apparent(field, value)
        } else {
            value
        };
        values.insert(field.clone(), value);
    }

    let optional = |name: &str| optional_field(&slice, eep_used, name);
    let core = CoreParameters {
        teff: optional(&schema.teff).or_else(|| optional(&schema.log_teff).map(|l| 10f64.powf(l))),
        logg: optional(&schema.logg),
        logl: optional(&schema.logl),
        radius: optional(&schema.radius),
        mass_current: optional(&schema.mass),
    };

    Ok(IsochronePoint {
        age: slice.age(),
        feh: slice.feh(),
        eep_requested: eep,
        eep: eep_used,
        eep_clamped,
        values,
        core,
        dm_deep: mass_gradient(&slice, eep_used, &schema.mass),
        strategy,
        available_fields: slice.available_fields(),
    })
}

/// A value that may legitimately be absent from the grid.
fn optional_field(slice: &IsochroneSlice, eep: f64, name: &str) -> Option<f64> {
    Strategy::first_success(slice, eep, name).ok().map(|(_, v)| v)
}

/// `d(mass)/d(EEP)` over the segment containing `eep`; 0.0 when unavailable.
fn mass_gradient(slice: &IsochroneSlice, eep: f64, mass_column: &str) -> f64 {
    let Some(mass) = slice.column(mass_column) else {
        return 0.0;
    };
    let eeps = slice.eeps();
    let Some(b) = bracket(eep, eeps) else {
        return 0.0;
    };
    let (lo, hi) = if !b.is_exact() {
        (b.lo, b.hi)
    } else if b.lo + 1 < eeps.len() {
        (b.lo, b.lo + 1)
    } else if b.lo > 0 {
        (b.lo - 1, b.lo)
    } else {
        return 0.0;
    };

    let gradient = (mass[hi] - mass[lo]) / (eeps[hi] - eeps[lo]);
    if gradient.is_finite() { gradient } else { 0.0 }
}

//! The public entry point: `(mass, age, feh)` → observables.
//!
//! `Interpolator` chains the two evaluators:
//!
//! 1. the track grid turns `(mass, age, feh)` into an EEP
//! 2. the isochrone grid nearest to `(age, feh)` is read at that EEP
//!
//! and packages the result. Grids load on first use and are shared by every
//! later call, including the parallel batch path.

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::config::{EngineConfig, IsochroneSchema};
use crate::domain::{FehPolicy, GridKind, Observables, Query};
use crate::error::{Error, Result};
use crate::eval::{
    ExtinctionTable, IsochroneSlice, Photometry, evaluate_isochrone, evaluate_track, isochrone_slice,
};
use crate::grid::GridStore;
use crate::io::{CsvGridLoader, GridLoader, Target, TargetResult};
use crate::math::log_age_from_gyr;

#[derive(Debug)]
pub struct Interpolator {
    store: GridStore,
    feh_policy: FehPolicy,
    extinction: ExtinctionTable,
}

/// Outcome of evaluating a target list: successes and per-target failures.
#[derive(Debug)]
pub struct TargetRun {
    pub results: Vec<TargetResult>,
    pub failures: Vec<(String, Error)>,
}

impl Interpolator {
    pub fn new(store: GridStore, feh_policy: FehPolicy, extinction: ExtinctionTable) -> Self {
        Self {
            store,
            feh_policy,
            extinction,
        }
    }

    /// Read the grids from the CSV files named in `config`.
    pub fn from_config(config: &EngineConfig) -> Self {
        Self::with_loader(CsvGridLoader::from_config(config), config)
    }

    /// Use any grid source, with schemas and policies from `config`.
    pub fn with_loader(loader: impl GridLoader + 'static, config: &EngineConfig) -> Self {
        let store = GridStore::new(loader, config.tracks.clone(), config.isochrones.clone());
        Self::new(store, config.feh_policy, config.extinction.clone())
    }

    pub fn store(&self) -> &GridStore {
        &self.store
    }

    pub fn feh_policy(&self) -> FehPolicy {
        self.feh_policy
    }

    /// Evaluate one star.
    pub fn get_observables(&self, query: &Query) -> Result<Observables> {
        query.validate()?;

        let tracks = self.store.load_track_grid()?;
        let track = evaluate_track(tracks, query.mass, query.age, query.feh)?;

        let policy = query.feh_policy.unwrap_or(self.feh_policy);
        let iso_feh = match (policy, track.surface_feh) {
            (FehPolicy::Initial, _) => query.feh,
            (FehPolicy::Surface, Some(surface)) => surface,
            (FehPolicy::Surface, None) => {
                debug!(feh = query.feh, "track has no surface feh; using the requested value");
                query.feh
            }
        };

        let isochrones = self.store.load_isochrone_grid()?;
        let photometry = Photometry::new(query.distance, query.av, &self.extinction);
        let point = evaluate_isochrone(
            isochrones,
            track.eep,
            query.age,
            iso_feh,
            &query.bands,
            &photometry,
        )
        .map_err(|e| bands_missing(e, &query.bands, isochrones.schema()))?;

        debug!(
            mass = query.mass,
            eep = track.eep,
            age = point.age,
            feh = point.feh,
            strategy = point.strategy.display_name(),
            "observables evaluated"
        );

        Ok(Observables {
            eep: track.eep,
            age: point.age,
            feh: point.feh,
            distance: query.distance,
            av: query.av,
            core: point.core,
            dm_deep: point.dm_deep,
            bands: point.values,
            eep_clamped: point.eep_clamped,
            strategy: point.strategy,
            track,
        })
    }

    /// Evaluate independent queries in parallel; results keep the input order.
    ///
    /// Both grids are loaded once up front. If either fails, no query is
    /// evaluated: invalid queries report their own problem and every other
    /// query reports the load failure.
    pub fn get_observables_batch(&self, queries: &[Query]) -> Vec<Result<Observables>> {
        if let Err((kind, err)) = self.preload() {
            warn!(%kind, error = %err, queries = queries.len(), "grid preload failed; batch not evaluated");
            return queries
                .iter()
                .map(|q| -> Result<Observables> {
                    q.validate()?;
                    Err(grid_unavailable(kind, &err))
                })
                .collect();
        }
        queries.par_iter().map(|q| self.get_observables(q)).collect()
    }

    fn preload(&self) -> std::result::Result<(), (GridKind, Error)> {
        self.store
            .load_track_grid()
            .map_err(|e| (GridKind::Track, e))?;
        self.store
            .load_isochrone_grid()
            .map_err(|e| (GridKind::Isochrone, e))?;
        Ok(())
    }

    /// Evaluate a target list, splitting successes from failures.
    pub fn evaluate_targets(&self, targets: &[Target]) -> TargetRun {
        let queries: Vec<Query> = targets.iter().map(|t| t.query.clone()).collect();
        let mut run = TargetRun {
            results: Vec::with_capacity(targets.len()),
            failures: Vec::new(),
        };
        for (target, outcome) in targets.iter().zip(self.get_observables_batch(&queries)) {
            match outcome {
                Ok(observables) => run.results.push(TargetResult {
                    name: target.name.clone(),
                    observables,
                }),
                Err(err) => {
                    warn!(target = %target.name, error = %err, "target skipped");
                    run.failures.push((target.name.clone(), err));
                }
            }
        }
        info!(
            evaluated = run.results.len(),
            failed = run.failures.len(),
            "target list evaluated"
        );
        run
    }

    /// The isochrone nearest to an age given in Gyr and a metallicity.
    pub fn isochrone(&self, age_gyr: f64, feh: f64) -> Result<IsochroneSlice> {
        let age = log_age_from_gyr(age_gyr).ok_or_else(|| {
            Error::InvalidQuery(format!("age must be finite and > 0 Gyr, got {age_gyr}"))
        })?;
        if !feh.is_finite() {
            return Err(Error::InvalidQuery(format!("feh must be finite, got {feh}")));
        }
        isochrone_slice(self.store.load_isochrone_grid()?, age, feh)
    }
}

/// Restate one grid-load failure for each query of a batch.
fn grid_unavailable(kind: GridKind, err: &Error) -> Error {
    match err {
        Error::GridLoad { kind, message } => Error::GridLoad {
            kind: *kind,
            message: message.clone(),
        },
        other => Error::GridLoad {
            kind,
            message: other.to_string(),
        },
    }
}

/// Turn a missing-field failure into the caller-facing band report.
fn bands_missing(err: Error, requested: &[String], schema: &IsochroneSchema) -> Error {
    let Error::FieldNotFound { field, available } = err else {
        return err;
    };
    let mut missing: Vec<String> = requested
        .iter()
        .filter(|b| !available.contains(*b))
        .cloned()
        .collect();
    if missing.is_empty() {
        missing.push(field);
    }
    let bands: Vec<String> = available
        .iter()
        .filter(|f| schema.is_magnitude(f))
        .cloned()
        .collect();
    Error::BandsMissing {
        missing,
        available: if bands.is_empty() { available } else { bands },
    }
}

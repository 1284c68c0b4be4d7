//! Load-once, read-only access to the track and isochrone grids.
//!
//! `GridStore` owns the loader and two compute-once cells. The first caller of
//! `load_track_grid` / `load_isochrone_grid` runs the loader; concurrent
//! callers block until the grid is published, and every later call is a
//! lock-free read of the cached grid. A failed load is not cached, so the next
//! call tries again (useful when the file appears after a transient error).

use std::time::Instant;

use once_cell::sync::OnceCell;
use tracing::info;

use crate::config::{IsochroneSchema, TrackSchema};
use crate::domain::GridKind;
use crate::error::{Error, Result};
use crate::grid::resolver::Axis;
use crate::grid::table::{GridRow, GridTable};
use crate::io::loader::GridLoader;

/// Evolutionary-track grid: key `(initial mass, age, initial feh)`.
#[derive(Debug, Clone)]
pub struct TrackGrid {
    table: GridTable,
    schema: TrackSchema,
    mass_dim: usize,
    age_dim: usize,
}

impl TrackGrid {
    /// Wrap a table, checking that it is keyed the way `schema` says.
    ///
    /// The EEP column is *not* checked here; the track evaluator reports a
    /// missing EEP column as a `MissingField` error when it is first needed.
    pub fn new(table: GridTable, schema: TrackSchema) -> Result<Self> {
        ensure_kind(&table, GridKind::Track)?;
        let dims = ensure_keys(&table, &schema.key_columns())?;
        Ok(Self {
            table,
            schema,
            mass_dim: dims[0],
            age_dim: dims[1],
        })
    }

    pub fn table(&self) -> &GridTable {
        &self.table
    }

    pub fn schema(&self) -> &TrackSchema {
        &self.schema
    }

    pub fn feh_axis(&self) -> Result<&Axis> {
        self.table.axis_values(&self.schema.feh)
    }

    /// Initial masses sampled at one (exact) initial metallicity.
    pub fn masses_at(&self, feh: f64) -> Result<Axis> {
        let rows = self.table.section(&[(self.schema.feh.as_str(), feh)])?;
        Ok(Axis::new(
            self.schema.mass.clone(),
            rows.iter().map(|r| r.key()[self.mass_dim]),
        ))
    }

    /// One evolutionary track (fixed mass and metallicity), ordered by age.
    pub fn track(&self, mass: f64, feh: f64) -> Result<Vec<&GridRow>> {
        self.table.section(&[
            (self.schema.mass.as_str(), mass),
            (self.schema.feh.as_str(), feh),
        ])
    }

    pub fn age_of(&self, row: &GridRow) -> f64 {
        row.key()[self.age_dim]
    }
}

/// Isochrone grid: key `(age, feh)`, one row per sampled EEP.
#[derive(Debug, Clone)]
pub struct IsochroneGrid {
    table: GridTable,
    schema: IsochroneSchema,
    age_dim: usize,
    feh_dim: usize,
}

impl IsochroneGrid {
    pub fn new(table: GridTable, schema: IsochroneSchema) -> Result<Self> {
        ensure_kind(&table, GridKind::Isochrone)?;
        let dims = ensure_keys(&table, &schema.key_columns())?;
        Ok(Self {
            table,
            schema,
            age_dim: dims[0],
            feh_dim: dims[1],
        })
    }

    pub fn table(&self) -> &GridTable {
        &self.table
    }

    pub fn schema(&self) -> &IsochroneSchema {
        &self.schema
    }

    pub fn age_axis(&self) -> Result<&Axis> {
        self.table.axis_values(&self.schema.age)
    }

    pub fn feh_axis(&self) -> Result<&Axis> {
        self.table.axis_values(&self.schema.feh)
    }

    /// Rows of one isochrone at an exact (already snapped) age and metallicity.
    pub fn rows_at(&self, age: f64, feh: f64) -> Result<Vec<&GridRow>> {
        let mut key = vec![0.0; self.table.key_columns().len()];
        key[self.age_dim] = age;
        key[self.feh_dim] = feh;
        self.table.slice(&key)
    }
}

fn ensure_kind(table: &GridTable, expected: GridKind) -> Result<()> {
    if table.kind() != expected {
        return Err(Error::GridLoad {
            kind: expected,
            message: format!("loader returned a {} table", table.kind()),
        });
    }
    Ok(())
}

/// Resolve each schema key to its dimension index; the table must be keyed on
/// exactly these columns (in any order).
fn ensure_keys(table: &GridTable, keys: &[String]) -> Result<Vec<usize>> {
    if table.key_columns().len() != keys.len() {
        return Err(Error::GridLoad {
            kind: table.kind(),
            message: format!(
                "expected key columns [{}], found [{}]",
                keys.join(", "),
                table.key_columns().join(", ")
            ),
        });
    }
    keys.iter()
        .map(|k| {
            table.dimension_index(k).map_err(|_| Error::GridLoad {
                kind: table.kind(),
                message: format!(
                    "key column `{k}` not found (key columns: {})",
                    table.key_columns().join(", ")
                ),
            })
        })
        .collect()
}

/// Owned cache of both grids.
pub struct GridStore {
    loader: Box<dyn GridLoader>,
    track_schema: TrackSchema,
    isochrone_schema: IsochroneSchema,
    tracks: OnceCell<TrackGrid>,
    isochrones: OnceCell<IsochroneGrid>,
}

impl GridStore {
    pub fn new(
        loader: impl GridLoader + 'static,
        track_schema: TrackSchema,
        isochrone_schema: IsochroneSchema,
    ) -> Self {
        Self {
            loader: Box::new(loader),
            track_schema,
            isochrone_schema,
            tracks: OnceCell::new(),
            isochrones: OnceCell::new(),
        }
    }

    /// The track grid, loading it on first use.
    pub fn load_track_grid(&self) -> Result<&TrackGrid> {
        self.tracks.get_or_try_init(|| {
            let started = Instant::now();
            let table = self.loader.load(GridKind::Track)?;
            let grid = TrackGrid::new(table, self.track_schema.clone())?;
            info!(
                kind = %GridKind::Track,
                rows = grid.table().len(),
                columns = grid.table().value_columns().len(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "grid loaded"
            );
            Ok(grid)
        })
    }

    /// The isochrone grid, loading it on first use.
    pub fn load_isochrone_grid(&self) -> Result<&IsochroneGrid> {
        self.isochrones.get_or_try_init(|| {
            let started = Instant::now();
            let table = self.loader.load(GridKind::Isochrone)?;
            let grid = IsochroneGrid::new(table, self.isochrone_schema.clone())?;
            info!(
                kind = %GridKind::Isochrone,
                rows = grid.table().len(),
                columns = grid.table().value_columns().len(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "grid loaded"
            );
            Ok(grid)
        })
    }

    pub fn is_loaded(&self, kind: GridKind) -> bool {
        match kind {
            GridKind::Track => self.tracks.get().is_some(),
            GridKind::Isochrone => self.isochrones.get().is_some(),
        }
    }
}

impl std::fmt::Debug for GridStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GridStore")
            .field("tracks_loaded", &self.is_loaded(GridKind::Track))
            .field("isochrones_loaded", &self.is_loaded(GridKind::Isochrone))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    struct CountingLoader {
        calls: Arc<AtomicUsize>,
        fail_first: bool,
    }

    impl GridLoader for CountingLoader {
        fn load(&self, kind: GridKind) -> Result<GridTable> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_first && n == 0 {
                return Err(Error::GridLoad {
                    kind,
                    message: "transient".to_string(),
                });
            }
            let (keys, values, rows) = match kind {
                GridKind::Track => (
                    TrackSchema::default().key_columns(),
                    vec!["eep".to_string()],
                    vec![GridRow::new(vec![1.0, 9.0, 0.0], vec![250.0])],
                ),
                GridKind::Isochrone => (
                    IsochroneSchema::default().key_columns(),
                    vec!["eep".to_string()],
                    vec![GridRow::new(vec![9.0, 0.0], vec![250.0])],
                ),
            };
            GridTable::new(kind, keys, values, rows)
        }
    }

    fn store(calls: Arc<AtomicUsize>, fail_first: bool) -> GridStore {
        GridStore::new(
            CountingLoader { calls, fail_first },
            TrackSchema::default(),
            IsochroneSchema::default(),
        )
    }

    #[test]
    fn loads_each_grid_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let store = store(calls.clone(), false);
        assert!(!store.is_loaded(GridKind::Track));

        for _ in 0..3 {
            store.load_track_grid().unwrap();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(store.is_loaded(GridKind::Track));
        assert!(!store.is_loaded(GridKind::Isochrone));

        store.load_isochrone_grid().unwrap();
        store.load_isochrone_grid().unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn concurrent_first_use_loads_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let store = store(calls.clone(), false);
        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| store.load_isochrone_grid().map(|_| ()).unwrap());
            }
        });
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failed_load_is_retried() {
        let calls = Arc::new(AtomicUsize::new(0));
        let store = store(calls.clone(), true);
        assert!(matches!(store.load_track_grid(), Err(Error::GridLoad { .. })));
        assert!(store.load_track_grid().is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn rejects_table_with_wrong_keys() {
        let table = GridTable::new(
            GridKind::Track,
            vec!["mass".to_string(), "age".to_string(), "initial_feh".to_string()],
            vec!["eep".to_string()],
            vec![GridRow::new(vec![1.0, 9.0, 0.0], vec![250.0])],
        )
        .unwrap();
        assert!(matches!(
            TrackGrid::new(table, TrackSchema::default()),
            Err(Error::GridLoad { .. })
        ));
    }
}

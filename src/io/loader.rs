//! Grid loading.
//!
//! `GridLoader` is the seam between the engine and whatever produced the model
//! grids. `CsvGridLoader` reads one CSV export per grid kind:
//!
//! - a header row (a UTF-8 BOM on the first name is stripped)
//! - `#` comment lines anywhere
//! - key columns named by the configured schema; any other column is a value
//!   column
//! - empty or non-numeric value cells are kept as NaN (partial data)
//! - rows with an unparseable key are skipped and logged
//! - value columns with no numeric cell at all (labels, flags) are dropped

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use csv::StringRecord;
use tracing::warn;

use crate::config::EngineConfig;
use crate::domain::GridKind;
use crate::error::{Error, Result};
use crate::grid::{GridRow, GridTable};

/// Produces raw grid tables. Implementations must be shareable across threads.
pub trait GridLoader: Send + Sync {
    fn load(&self, kind: GridKind) -> Result<GridTable>;
}

/// Reads track and isochrone grids from CSV files.
#[derive(Debug, Clone)]
pub struct CsvGridLoader {
    track_path: PathBuf,
    isochrone_path: PathBuf,
    track_keys: Vec<String>,
    isochrone_keys: Vec<String>,
}

impl CsvGridLoader {
    pub fn new(
        track_path: impl Into<PathBuf>,
        isochrone_path: impl Into<PathBuf>,
        track_keys: Vec<String>,
        isochrone_keys: Vec<String>,
    ) -> Self {
        Self {
            track_path: track_path.into(),
            isochrone_path: isochrone_path.into(),
            track_keys,
            isochrone_keys,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(
            config.track_grid.clone(),
            config.isochrone_grid.clone(),
            config.tracks.key_columns(),
            config.isochrones.key_columns(),
        )
    }

    pub fn path(&self, kind: GridKind) -> &Path {
        match kind {
            GridKind::Track => &self.track_path,
            GridKind::Isochrone => &self.isochrone_path,
        }
    }

    fn keys(&self, kind: GridKind) -> &[String] {
        match kind {
            GridKind::Track => &self.track_keys,
            GridKind::Isochrone => &self.isochrone_keys,
        }
    }
}

impl GridLoader for CsvGridLoader {
    fn load(&self, kind: GridKind) -> Result<GridTable> {
        let path = self.path(kind);
        let file = File::open(path).map_err(|e| Error::GridLoad {
            kind,
            message: format!("failed to open '{}': {e}", path.display()),
        })?;
        read_grid(file, kind, self.keys(kind))
    }
}

/// Parse a grid CSV from any reader.
pub fn read_grid<R: Read>(reader: R, kind: GridKind, key_columns: &[String]) -> Result<GridTable> {
    let grid_err = |message: String| Error::GridLoad { kind, message };

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .comment(Some(b'#'))
        .from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|e| grid_err(format!("failed to read CSV header: {e}")))?
        .clone();
    let names: Vec<String> = headers.iter().map(normalize_header_name).collect();

    let key_idx: Vec<usize> = key_columns
        .iter()
        .map(|key| {
            names.iter().position(|n| n == key).ok_or_else(|| {
                grid_err(format!(
                    "missing key column `{key}` (found: {})",
                    names.join(", ")
                ))
            })
        })
        .collect::<Result<_>>()?;

    let value_idx: Vec<usize> = (0..names.len())
        .filter(|i| !key_idx.contains(i) && !names[*i].is_empty())
        .collect();

    let mut rows = Vec::new();
    let mut skipped = 0usize;
    for (idx, result) in reader.records().enumerate() {
        // Header is line 1; comment lines shift this, so it is approximate.
        let line = idx + 2;
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                warn!(%kind, line, error = %e, "skipping unreadable grid row");
                skipped += 1;
                continue;
            }
        };
        match parse_key(&record, &key_idx, &names) {
            Ok(key) => {
                let values = value_idx.iter().map(|&i| parse_cell(record.get(i))).collect();
                rows.push(GridRow::new(key, values));
            }
            Err(message) => {
                warn!(%kind, line, %message, "skipping grid row");
                skipped += 1;
            }
        }
    }

    if rows.is_empty() {
        return Err(grid_err(format!("no usable rows ({skipped} skipped)")));
    }

    // Drop value columns that never held a number.
    let keep: Vec<usize> = (0..value_idx.len())
        .filter(|&c| rows.iter().any(|r| r.values()[c].is_finite()))
        .collect();
    let value_columns: Vec<String> = keep.iter().map(|&c| names[value_idx[c]].clone()).collect();
    let rows = if keep.len() == value_idx.len() {
        rows
    } else {
        rows.into_iter()
            .map(|r| {
                let values = keep.iter().map(|&c| r.values()[c]).collect();
                GridRow::new(r.key().to_vec(), values)
            })
            .collect()
    };

    GridTable::new(kind, key_columns.to_vec(), value_columns, rows)
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports often prefix the first header with a UTF-8 BOM.
    name.trim().trim_start_matches('\u{feff}').to_string()
}

fn parse_key(record: &StringRecord, key_idx: &[usize], names: &[String]) -> std::result::Result<Vec<f64>, String> {
    key_idx
        .iter()
        .map(|&i| {
            let raw = record.get(i).unwrap_or("");
            raw.parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| format!("invalid key `{}` = '{raw}'", names[i]))
        })
        .collect()
}

fn parse_cell(cell: Option<&str>) -> f64 {
    cell.and_then(|s| s.parse::<f64>().ok()).unwrap_or(f64::NAN)
}

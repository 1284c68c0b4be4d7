//! Export evaluated observables to CSV and JSON.
//!
//! CSV is the flat, spreadsheet-friendly view (one line per target, columns from
//! `Observables::to_map`). JSON keeps the full structured result, including the
//! track point and evaluation strategy, and can be read back.

use std::collections::BTreeSet;
use std::fs::File;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::Observables;
use crate::error::{Error, Result};

pub const TOOL_NAME: &str = "stellar-observables";
pub const FORMAT_VERSION: u32 = 1;

/// Leading CSV columns, in order. Band columns follow, sorted by name.
const FIXED_COLUMNS: [&str; 11] = [
    "eep",
    "age",
    "feh",
    "distance",
    "AV",
    "Teff",
    "logg",
    "logL",
    "radius",
    "mass_current",
    "dm_deep",
];

/// One evaluated target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetResult {
    pub name: String,
    pub observables: Observables,
}

/// On-disk JSON layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservablesFile {
    pub tool: String,
    pub version: u32,
    pub generated: DateTime<Utc>,
    pub results: Vec<TargetResult>,
}

impl ObservablesFile {
    pub fn new(results: Vec<TargetResult>) -> Self {
        Self {
            tool: TOOL_NAME.to_string(),
            version: FORMAT_VERSION,
            generated: Utc::now(),
            results,
        }
    }
}

/// Write one CSV line per result.
///
/// Results may carry different bands; the header is the union and absent
/// values are left empty.
pub fn write_observables_csv(path: &Path, results: &[TargetResult]) -> Result<()> {
    let export_err = |message: String| Error::Export {
        path: path.to_path_buf(),
        message,
    };

    let maps: Vec<_> = results.iter().map(|r| r.observables.to_map()).collect();
    let bands: BTreeSet<&str> = maps
        .iter()
        .flat_map(|m| m.keys().map(String::as_str))
        .filter(|k| !FIXED_COLUMNS.contains(k))
        .collect();

    let mut writer = csv::Writer::from_path(path).map_err(|e| export_err(e.to_string()))?;

    let header = std::iter::once("name")
        .chain(FIXED_COLUMNS)
        .chain(bands.iter().copied());
    writer
        .write_record(header)
        .map_err(|e| export_err(format!("header: {e}")))?;

    for (result, map) in results.iter().zip(&maps) {
        let cells = FIXED_COLUMNS
            .iter()
            .copied()
            .chain(bands.iter().copied())
            .map(|column| match map.get(column).copied().flatten() {
                Some(v) => format!("{v:.6}"),
                None => String::new(),
            });
        let record: Vec<String> = std::iter::once(result.name.clone()).chain(cells).collect();
        writer
            .write_record(&record)
            .map_err(|e| export_err(format!("row `{}`: {e}", result.name)))?;
    }

    writer.flush().map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })
}

pub fn write_observables_json(path: &Path, results: &[TargetResult]) -> Result<()> {
    let file = File::create(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let doc = ObservablesFile::new(results.to_vec());
    serde_json::to_writer_pretty(file, &doc).map_err(|e| Error::Export {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

pub fn read_observables_json(path: &Path) -> Result<ObservablesFile> {
    let file = File::open(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let doc: ObservablesFile = serde_json::from_reader(file).map_err(|e| Error::Export {
        path: path.to_path_buf(),
        message: format!("invalid observables JSON: {e}"),
    })?;
    if doc.version != FORMAT_VERSION {
        return Err(Error::Export {
            path: path.to_path_buf(),
            message: format!("unsupported format version {}", doc.version),
        });
    }
    Ok(doc)
}

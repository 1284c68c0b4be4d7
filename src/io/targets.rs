//! Target-list ingest.
//!
//! Turns a catalog export (NASA Exoplanet Archive `pscomppars` style: one row
//! per planet, host-star columns repeated) into one `Query` per host star.
//! Rows without a usable mass, age, or metallicity are skipped and reported,
//! never silently dropped. Ages are given in Gyr and converted to the grid's
//! log10(yr) convention.

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;
use serde::{Deserialize, Serialize};

use crate::domain::Query;
use crate::error::{Error, Result};
use crate::math::log_age_from_gyr;

/// Column names in the catalog export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetColumns {
    pub name: String,
    pub mass: String,
    /// Age in Gyr.
    pub age_gyr: String,
    pub feh: String,
    /// Optional; targets without a distance are evaluated at 10 pc.
    pub distance: String,
}

impl Default for TargetColumns {
    fn default() -> Self {
        Self {
            name: "hostname".to_string(),
            mass: "st_mass".to_string(),
            age_gyr: "st_age".to_string(),
            feh: "st_met".to_string(),
            distance: "sy_dist".to_string(),
        }
    }
}

/// One host star ready for evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub name: String,
    pub age_gyr: f64,
    pub query: Query,
}

/// A row-level problem encountered during ingest.
#[derive(Debug, Clone, PartialEq)]
pub struct RowError {
    pub line: usize,
    pub id: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct TargetList {
    pub targets: Vec<Target>,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
    /// Rows that repeated an already-ingested host.
    pub duplicates: usize,
}

pub fn load_targets(path: &Path, columns: &TargetColumns) -> Result<TargetList> {
    let file = File::open(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    read_targets(file, columns)
}

pub fn read_targets<R: Read>(reader: R, columns: &TargetColumns) -> Result<TargetList> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .comment(Some(b'#'))
        .from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|e| Error::TargetList(format!("failed to read CSV header: {e}")))?
        .clone();
    let header_map = build_header_map(&headers);

    for required in [&columns.name, &columns.mass, &columns.age_gyr, &columns.feh] {
        if !header_map.contains_key(&required.to_ascii_lowercase()) {
            return Err(Error::TargetList(format!("missing required column `{required}`")));
        }
    }

    let mut targets = Vec::new();
    let mut row_errors = Vec::new();
    let mut seen = HashSet::new();
    let mut rows_read = 0usize;
    let mut duplicates = 0usize;

    for (idx, result) in reader.records().enumerate() {
        let line = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    id: None,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        match parse_row(&record, &header_map, columns) {
            Ok(target) => {
                if seen.insert(target.name.clone()) {
                    targets.push(target);
                } else {
                    duplicates += 1;
                }
            }
            Err(message) => row_errors.push(RowError {
                line,
                id: get_optional(&record, &header_map, &columns.name).map(str::to_string),
                message,
            }),
        }
    }

    if targets.is_empty() {
        return Err(Error::TargetList(format!(
            "no usable targets ({} of {rows_read} rows rejected)",
            row_errors.len()
        )));
    }

    Ok(TargetList {
        targets,
        row_errors,
        rows_read,
        duplicates,
    })
}

fn parse_row(
    record: &StringRecord,
    header_map: &HashMap<String, usize>,
    columns: &TargetColumns,
) -> std::result::Result<Target, String> {
    let name = get_required(record, header_map, &columns.name)?.to_string();
    let mass = parse_required_f64(record, header_map, &columns.mass)?;
    let age_gyr = parse_required_f64(record, header_map, &columns.age_gyr)?;
    let feh = parse_required_f64(record, header_map, &columns.feh)?;

    let age = log_age_from_gyr(age_gyr)
        .ok_or_else(|| format!("`{}` must be > 0 Gyr, got {age_gyr}", columns.age_gyr))?;

    let mut query = Query::new(mass, age, feh);
    if let Some(distance) = parse_opt_f64(get_optional(record, header_map, &columns.distance)) {
        query = query.with_distance(distance);
    }
    query.validate().map_err(|e| e.to_string())?;

    Ok(Target {
        name,
        age_gyr,
        query,
    })
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    name.trim().trim_start_matches('\u{feff}').to_ascii_lowercase()
}

fn get_required<'a>(
    record: &'a StringRecord,
    header_map: &HashMap<String, usize>,
    name: &str,
) -> std::result::Result<&'a str, String> {
    get_optional(record, header_map, name).ok_or_else(|| format!("missing value: `{name}`"))
}

fn get_optional<'a>(record: &'a StringRecord, header_map: &HashMap<String, usize>, name: &str) -> Option<&'a str> {
    let idx = header_map.get(&name.to_ascii_lowercase())?;
    record.get(*idx).map(str::trim).filter(|s| !s.is_empty())
}

fn parse_required_f64(
    record: &StringRecord,
    header_map: &HashMap<String, usize>,
    name: &str,
) -> std::result::Result<f64, String> {
    let raw = get_required(record, header_map, name)?;
    parse_opt_f64(Some(raw)).ok_or_else(|| format!("invalid `{name}` value '{raw}'"))
}

fn parse_opt_f64(s: Option<&str>) -> Option<f64> {
    let v = s?.parse::<f64>().ok()?;
    if v.is_finite() { Some(v) } else { None }
}

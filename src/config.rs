//! Engine configuration: where the grids live, how their columns are named,
//! which metallicity feeds the isochrone stage, and per-band extinction.
//!
//! Configuration can come from a JSON file or from the environment. Environment
//! variables (optionally loaded from a `.env` file) override the JSON file:
//!
//! | variable                  | meaning                                   |
//! |---------------------------|-------------------------------------------|
//! | `STELLAR_CONFIG`          | path to a JSON config file                |
//! | `STELLAR_TRACK_GRID`      | track grid CSV                            |
//! | `STELLAR_ISOCHRONE_GRID`  | isochrone grid CSV                        |
//! | `STELLAR_FEH_POLICY`      | `initial` or `surface`                    |
//! | `STELLAR_MAG_SUFFIX`      | suffix marking magnitude columns (`_mag`) |

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::FehPolicy;
use crate::error::{Error, Result};
use crate::eval::ExtinctionTable;

pub const ENV_CONFIG: &str = "STELLAR_CONFIG";
pub const ENV_TRACK_GRID: &str = "STELLAR_TRACK_GRID";
pub const ENV_ISOCHRONE_GRID: &str = "STELLAR_ISOCHRONE_GRID";
pub const ENV_FEH_POLICY: &str = "STELLAR_FEH_POLICY";
pub const ENV_MAG_SUFFIX: &str = "STELLAR_MAG_SUFFIX";

/// Column names of the evolutionary-track grid.
///
/// Defaults follow the MIST track tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackSchema {
    pub mass: String,
    pub age: String,
    pub feh: String,
    pub eep: String,
    /// Surface `[Fe/H]` reported along the track (optional in the grid).
    pub surface_feh: String,
}

impl Default for TrackSchema {
    fn default() -> Self {
        Self {
            mass: "initial_mass".to_string(),
            age: "age".to_string(),
            feh: "initial_feh".to_string(),
            eep: "eep".to_string(),
            surface_feh: "feh".to_string(),
        }
    }
}

impl TrackSchema {
    /// Key columns in `(mass, age, feh)` order.
    pub fn key_columns(&self) -> Vec<String> {
        vec![self.mass.clone(), self.age.clone(), self.feh.clone()]
    }
}

/// Column names of the isochrone grid.
///
/// Defaults follow the MIST isochrone tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IsochroneSchema {
    pub age: String,
    pub feh: String,
    pub eep: String,
    /// Current (not initial) stellar mass.
    pub mass: String,
    pub teff: String,
    /// Used to derive `teff` when the grid only ships the log column.
    pub log_teff: String,
    pub logg: String,
    pub logl: String,
    pub radius: String,
    /// Columns ending in this suffix are absolute magnitudes.
    pub magnitude_suffix: String,
}

impl Default for IsochroneSchema {
    fn default() -> Self {
        Self {
            age: "log10_isochrone_age_yr".to_string(),
            feh: "feh".to_string(),
            eep: "eep".to_string(),
            mass: "mass".to_string(),
            teff: "Teff".to_string(),
            log_teff: "logTeff".to_string(),
            logg: "logg".to_string(),
            logl: "logL".to_string(),
            radius: "radius".to_string(),
            magnitude_suffix: "_mag".to_string(),
        }
    }
}

impl IsochroneSchema {
    /// Key columns in `(age, feh)` order.
    pub fn key_columns(&self) -> Vec<String> {
        vec![self.age.clone(), self.feh.clone()]
    }

    pub fn is_magnitude(&self, column: &str) -> bool {
        column.len() > self.magnitude_suffix.len() && column.ends_with(&self.magnitude_suffix)
    }
}

/// Full engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub track_grid: PathBuf,
    pub isochrone_grid: PathBuf,
    pub tracks: TrackSchema,
    pub isochrones: IsochroneSchema,
    pub feh_policy: FehPolicy,
    pub extinction: ExtinctionTable,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            track_grid: PathBuf::from("grids/mist_tracks.csv"),
            isochrone_grid: PathBuf::from("grids/mist_isochrones.csv"),
            tracks: TrackSchema::default(),
            isochrones: IsochroneSchema::default(),
            feh_policy: FehPolicy::default(),
            extinction: ExtinctionTable::default(),
        }
    }
}

impl EngineConfig {
    /// Build from the process environment, reading `.env` first if present.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup (the environment, a map in tests).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = match lookup(ENV_CONFIG) {
            Some(path) => Self::from_json_file(Path::new(&path))?,
            None => Self::default(),
        };

        if let Some(path) = lookup(ENV_TRACK_GRID) {
            config.track_grid = PathBuf::from(path);
        }
        if let Some(path) = lookup(ENV_ISOCHRONE_GRID) {
            config.isochrone_grid = PathBuf::from(path);
        }
        if let Some(policy) = lookup(ENV_FEH_POLICY) {
            config.feh_policy = policy.parse()?;
        }
        if let Some(suffix) = lookup(ENV_MAG_SUFFIX) {
            config.isochrones.magnitude_suffix = suffix;
        }

        config.validate()?;
        Ok(config)
    }

    /// Read a JSON config file. Missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: EngineConfig = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| Error::Config(format!("invalid config JSON '{}': {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let names = [
            ("tracks.mass", &self.tracks.mass),
            ("tracks.age", &self.tracks.age),
            ("tracks.feh", &self.tracks.feh),
            ("tracks.eep", &self.tracks.eep),
            ("isochrones.age", &self.isochrones.age),
            ("isochrones.feh", &self.isochrones.feh),
            ("isochrones.eep", &self.isochrones.eep),
            ("isochrones.magnitude_suffix", &self.isochrones.magnitude_suffix),
        ];
        for (field, value) in names {
            if value.trim().is_empty() {
                return Err(Error::Config(format!("`{field}` must not be empty")));
            }
        }

        let track_keys = self.tracks.key_columns();
        if (1..track_keys.len()).any(|i| track_keys[..i].contains(&track_keys[i])) {
            return Err(Error::Config(format!(
                "track key columns must be distinct, got [{}]",
                track_keys.join(", ")
            )));
        }
        if self.isochrones.age == self.isochrones.feh {
            return Err(Error::Config(
                "isochrone age and feh columns must be distinct".to_string(),
            ));
        }

        self.extinction.validate()
    }
}

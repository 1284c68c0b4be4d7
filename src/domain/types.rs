//! Shared domain types.
//!
//! Everything here is serializable so it can be:
//!
//! - passed between the track and isochrone stages
//! - exported to JSON/CSV
//! - reloaded later for plotting or comparisons

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::eval::Strategy;

/// Bands returned when the caller does not ask for anything specific.
pub const DEFAULT_BANDS: [&str; 6] = ["G_mag", "BP_mag", "RP_mag", "J_mag", "H_mag", "K_mag"];

/// Distance (pc) at which apparent and absolute magnitudes coincide.
pub const DEFAULT_DISTANCE_PC: f64 = 10.0;

/// Which of the two precomputed grids a table holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GridKind {
    Track,
    Isochrone,
}

impl GridKind {
    pub fn display_name(self) -> &'static str {
        match self {
            GridKind::Track => "track",
            GridKind::Isochrone => "isochrone",
        }
    }
}

impl fmt::Display for GridKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Which metallicity is handed from the track stage to the isochrone stage.
///
/// The requested `[Fe/H]` matches how the isochrone grid is parameterized;
/// the track-reported surface `[Fe/H]` follows the star's computed chemical
/// evolution (diffusion lowers it over time). They usually differ by a few
/// hundredths of a dex, enough to change the snapped isochrone near a grid
/// midpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FehPolicy {
    /// Use the requested input metallicity.
    #[default]
    Initial,
    /// Use the track's surface metallicity, falling back to the input when
    /// the track grid does not report one.
    Surface,
}

impl FromStr for FehPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "initial" | "initial_feh" => Ok(FehPolicy::Initial),
            "surface" | "feh" => Ok(FehPolicy::Surface),
            other => Err(Error::Config(format!(
                "unknown metallicity policy '{other}' (expected `initial` or `surface`)"
            ))),
        }
    }
}

/// One interpolation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    /// Initial mass (solar masses).
    pub mass: f64,
    /// Age in the grid's age coordinate (log10 years for MIST).
    pub age: f64,
    /// Requested `[Fe/H]`.
    pub feh: f64,
    /// Distance in parsecs.
    pub distance: f64,
    /// V-band extinction (mag).
    #[serde(rename = "AV")]
    pub av: f64,
    /// Output columns that must be present in the result.
    pub bands: Vec<String>,
    /// Overrides the interpolator's configured policy when set.
    pub feh_policy: Option<FehPolicy>,
}

impl Query {
    pub fn new(mass: f64, age: f64, feh: f64) -> Self {
        Self {
            mass,
            age,
            feh,
            distance: DEFAULT_DISTANCE_PC,
            av: 0.0,
            bands: DEFAULT_BANDS.iter().map(|b| b.to_string()).collect(),
            feh_policy: None,
        }
    }

    pub fn with_distance(mut self, distance_pc: f64) -> Self {
        self.distance = distance_pc;
        self
    }

    pub fn with_av(mut self, av: f64) -> Self {
        self.av = av;
        self
    }

    pub fn with_bands<I, S>(mut self, bands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.bands = bands.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_feh_policy(mut self, policy: FehPolicy) -> Self {
        self.feh_policy = Some(policy);
        self
    }

    /// Reject inputs that cannot describe a physical star.
    pub fn validate(&self) -> Result<()> {
        if !(self.mass.is_finite() && self.mass > 0.0) {
            return Err(Error::InvalidQuery(format!(
                "mass must be finite and > 0, got {}",
                self.mass
            )));
        }
        if !self.age.is_finite() {
            return Err(Error::InvalidQuery(format!("age must be finite, got {}", self.age)));
        }
        if !self.feh.is_finite() {
            return Err(Error::InvalidQuery(format!("feh must be finite, got {}", self.feh)));
        }
        if !(self.distance.is_finite() && self.distance > 0.0) {
            return Err(Error::InvalidQuery(format!(
                "distance must be finite and > 0 pc, got {}",
                self.distance
            )));
        }
        if !(self.av.is_finite() && self.av >= 0.0) {
            return Err(Error::InvalidQuery(format!(
                "AV must be finite and >= 0, got {}",
                self.av
            )));
        }
        Ok(())
    }
}

/// Where a star sits on the track grid at the requested age.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackPoint {
    pub mass: f64,
    pub age: f64,
    /// Track-grid initial metallicity actually used (snapped).
    pub initial_feh: f64,
    pub eep: f64,
    /// Surface metallicity reported by the track, if the grid carries one.
    pub surface_feh: Option<f64>,
    /// Every track column that interpolated to a finite value.
    pub values: BTreeMap<String, f64>,
}

/// Core physical parameters; each one is optional because grids differ in
/// which of them they ship.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoreParameters {
    #[serde(rename = "Teff")]
    pub teff: Option<f64>,
    pub logg: Option<f64>,
    #[serde(rename = "logL")]
    pub logl: Option<f64>,
    pub radius: Option<f64>,
    pub mass_current: Option<f64>,
}

/// The structured result of one `get_observables` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observables {
    pub eep: f64,
    /// Snapped isochrone age.
    pub age: f64,
    /// Snapped isochrone metallicity.
    pub feh: f64,
    pub distance: f64,
    #[serde(rename = "AV")]
    pub av: f64,
    pub core: CoreParameters,
    /// `d(mass)/d(EEP)` along the isochrone; 0.0 when the grid cannot supply it.
    pub dm_deep: f64,
    /// Requested bands (apparent magnitudes for magnitude columns).
    pub bands: BTreeMap<String, f64>,
    /// The EEP fell outside the isochrone's sampled range and was clamped.
    pub eep_clamped: bool,
    /// Least precise strategy any requested band needed.
    pub strategy: Strategy,
    pub track: TrackPoint,
}

impl Observables {
    /// Flatten into `name -> value`, with `None` for absent core parameters.
    pub fn to_map(&self) -> BTreeMap<String, Option<f64>> {
        let mut out = BTreeMap::new();
        out.insert("eep".to_string(), Some(self.eep));
        out.insert("age".to_string(), Some(self.age));
        out.insert("feh".to_string(), Some(self.feh));
        out.insert("distance".to_string(), Some(self.distance));
        out.insert("AV".to_string(), Some(self.av));
        out.insert("Teff".to_string(), self.core.teff);
        out.insert("logg".to_string(), self.core.logg);
        out.insert("logL".to_string(), self.core.logl);
        out.insert("radius".to_string(), self.core.radius);
        out.insert("mass_current".to_string(), self.core.mass_current);
        out.insert("dm_deep".to_string(), Some(self.dm_deep));
        for (band, value) in &self.bands {
            out.insert(band.clone(), Some(*value));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_defaults_match_absolute_magnitudes() {
        let q = Query::new(1.0, 9.75, -0.05);
        assert_eq!(q.distance, 10.0);
        assert_eq!(q.av, 0.0);
        assert_eq!(q.bands.len(), 6);
        assert!(q.feh_policy.is_none());
        assert!(q.validate().is_ok());
    }

    #[test]
    fn query_rejects_unphysical_inputs() {
        assert!(Query::new(0.0, 9.0, 0.0).validate().is_err());
        assert!(Query::new(1.0, f64::NAN, 0.0).validate().is_err());
        assert!(Query::new(1.0, 9.0, 0.0).with_distance(-5.0).validate().is_err());
        assert!(Query::new(1.0, 9.0, 0.0).with_av(-0.1).validate().is_err());
    }

    #[test]
    fn feh_policy_accepts_both_spellings() {
        assert_eq!("initial_feh".parse::<FehPolicy>().unwrap(), FehPolicy::Initial);
        assert_eq!("Surface".parse::<FehPolicy>().unwrap(), FehPolicy::Surface);
        assert_eq!("feh".parse::<FehPolicy>().unwrap(), FehPolicy::Surface);
        assert!("bulk".parse::<FehPolicy>().is_err());
    }
}

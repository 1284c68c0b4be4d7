//! Absolute → apparent magnitude corrections.
//!
//! `apparent = absolute + 5 log10(d / 10 pc) + (A_band / A_V) * A_V`
//!
//! Extinction is a single scalar offset per band: `A_V` scaled by a fixed
//! band coefficient. No extinction-law modeling beyond that.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::math::distance_modulus;

/// `A_band / A_V` coefficients keyed by magnitude column name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtinctionTable {
    pub coefficients: BTreeMap<String, f64>,
    /// Applied to bands with no entry (`1.0` treats them like V).
    pub default_coefficient: f64,
}

impl Default for ExtinctionTable {
    /// Optical/NIR ratios for `R_V = 3.1` (Gaia from Wang & Chen 2019,
    /// Johnson/2MASS/WISE from Cardelli et al. 1989 and Wang & Chen 2019).
    fn default() -> Self {
        let coefficients = [
            ("B_mag", 1.324),
            ("V_mag", 1.0),
            ("G_mag", 0.789),
            ("BP_mag", 1.002),
            ("RP_mag", 0.589),
            ("J_mag", 0.243),
            ("H_mag", 0.131),
            ("K_mag", 0.078),
            ("W1_mag", 0.039),
            ("W2_mag", 0.026),
        ]
        .into_iter()
        .map(|(band, c)| (band.to_string(), c))
        .collect();

        Self {
            coefficients,
            default_coefficient: 1.0,
        }
    }
}

impl ExtinctionTable {
    pub fn coefficient(&self, band: &str) -> f64 {
        self.coefficients
            .get(band)
            .copied()
            .unwrap_or(self.default_coefficient)
    }

    pub fn validate(&self) -> Result<()> {
        let bad = |c: f64| !(c.is_finite() && c >= 0.0);
        if bad(self.default_coefficient) {
            return Err(Error::Config(format!(
                "default extinction coefficient must be finite and >= 0, got {}",
                self.default_coefficient
            )));
        }
        if let Some((band, c)) = self.coefficients.iter().find(|(_, c)| bad(**c)) {
            return Err(Error::Config(format!(
                "extinction coefficient for `{band}` must be finite and >= 0, got {c}"
            )));
        }
        Ok(())
    }
}

/// Observing conditions for one query.
#[derive(Debug, Clone, Copy)]
pub struct Photometry<'a> {
    pub distance_pc: f64,
    pub av: f64,
    pub extinction: &'a ExtinctionTable,
}

impl<'a> Photometry<'a> {
    pub fn new(distance_pc: f64, av: f64, extinction: &'a ExtinctionTable) -> Self {
        Self {
            distance_pc,
            av,
            extinction,
        }
    }

    /// Apparent magnitude of `band` given its absolute magnitude.
    pub fn apparent(&self, band: &str, absolute: f64) -> f64 {
        absolute + distance_modulus(self.distance_pc) + self.extinction.coefficient(band) * self.av
    }
}

//! `stellar-observables` library crate.
//!
//! Predicts what a star looks like from its mass, age, and metallicity by
//! bridging two precomputed stellar-model grids:
//!
//! - evolutionary tracks map `(mass, age, feh)` to an evolutionary phase (EEP)
//! - isochrones map `(EEP, age, feh)` to temperature, gravity, luminosity,
//!   radius, and band magnitudes
//!
//! Start with [`Interpolator`]:
//!
//! ```no_run
//! use stellar_observables::{EngineConfig, Interpolator, Query};
//!
//! let config = EngineConfig::from_env()?;
//! let interp = Interpolator::from_config(&config);
//! let obs = interp.get_observables(
//!     &Query::new(1.0, 9.75, -0.05).with_distance(100.0).with_av(0.02),
//! )?;
//! println!("EEP {:.1}, G = {:.3}", obs.eep, obs.bands["G_mag"]);
//! # Ok::<(), stellar_observables::Error>(())
//! ```

pub mod config;
pub mod domain;
pub mod error;
pub mod eval;
pub mod grid;
pub mod interpolator;
pub mod io;
pub mod logging;
pub mod math;

pub use config::EngineConfig;
pub use domain::{FehPolicy, Observables, Query};
pub use error::{Error, Result};
pub use interpolator::Interpolator;

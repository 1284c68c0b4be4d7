//! Model evaluation.
//!
//! - track evaluation: `(mass, age, feh)` → EEP (`track`)
//! - isochrone evaluation: `(EEP, age, feh)` → observables (`isochrone`)
//! - named fallback strategies along an isochrone (`strategy`)
//! - distance modulus and per-band extinction (`photometry`)

pub mod isochrone;
pub mod photometry;
pub mod strategy;
pub mod track;

pub use isochrone::*;
pub use photometry::*;
pub use strategy::Strategy;
pub use track::*;

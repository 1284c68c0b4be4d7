//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - grid and policy enums (`GridKind`, `FehPolicy`)
//! - the per-call request (`Query`)
//! - evaluation outputs (`TrackPoint`, `CoreParameters`, `Observables`)

pub mod types;

pub use types::*;

//! Input/output helpers.
//!
//! - grid loading (`loader`)
//! - catalog target-list ingest + validation (`targets`)
//! - result exports (CSV/JSON) (`export`)

pub mod export;
pub mod loader;
pub mod targets;

pub use export::*;
pub use loader::*;
pub use targets::*;

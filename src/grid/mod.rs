//! Grid storage.
//!
//! - composite-key tables with exact slices and partial-key sections (`table`)
//! - nearest-value snapping onto sampled axes (`resolver`)
//! - typed track/isochrone wrappers and the load-once cache (`store`)

pub mod resolver;
pub mod store;
pub mod table;

pub use resolver::*;
pub use store::*;
pub use table::*;

//! Mathematical utilities: clamped linear interpolation and unit conversions.

pub mod conversions;
pub mod interp;

pub use conversions::*;
pub use interp::*;

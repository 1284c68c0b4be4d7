//! Error taxonomy for grid loading and model evaluation.
//!
//! Every failure carries enough context to act on it without re-running the
//! query: schema mismatches always list what *is* available, because grid
//! files drift between releases and the fix is usually a renamed column.

use std::path::PathBuf;

use thiserror::Error;

use crate::domain::GridKind;

/// Result type alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The grid source is missing or malformed. Nothing can be evaluated.
    #[error("failed to load {kind} grid: {message}")]
    GridLoad { kind: GridKind, message: String },

    /// A key dimension name that the grid does not carry.
    #[error("unknown dimension `{dimension}` (grid dimensions: {})", .available.join(", "))]
    UnknownDimension {
        dimension: String,
        available: Vec<String>,
    },

    #[error("axis `{dimension}` has no values")]
    EmptyAxis { dimension: String },

    /// No rows at an exact (already snapped) composite key.
    #[error("no grid rows at key {}", format_key(.key))]
    KeyNotFound { key: Vec<(String, f64)> },

    /// The requested star is not covered by the track grid.
    #[error("track evaluation failed for mass {mass}: {reason}")]
    TrackEvaluation { mass: f64, reason: String },

    /// The grid schema lacks a column the evaluator cannot work without.
    #[error("{kind} grid has no `{field}` column")]
    MissingField { kind: GridKind, field: String },

    #[error("field `{field}` not found; available fields: {}", .available.join(", "))]
    FieldNotFound {
        field: String,
        available: Vec<String>,
    },

    #[error("requested bands missing: {}; available bands: {}", .missing.join(", "), .available.join(", "))]
    BandsMissing {
        missing: Vec<String>,
        available: Vec<String>,
    },

    /// A single evaluation strategy could not produce a value.
    #[error("interpolation failed: {0}")]
    Interpolation(String),

    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid target list: {0}")]
    TargetList(String),

    #[error("failed to access '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write '{}': {message}", .path.display())]
    Export { path: PathBuf, message: String },
}

impl Error {
    /// Process exit code category.
    ///
    /// - `2`: bad input or configuration (fixable by the caller)
    /// - `3`: the grid has no usable data for the request
    /// - `4`: computation failed on otherwise valid input
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::GridLoad { .. }
            | Error::InvalidQuery(_)
            | Error::Config(_)
            | Error::TargetList(_)
            | Error::Io { .. }
            | Error::Export { .. }
            | Error::UnknownDimension { .. }
            | Error::FieldNotFound { .. }
            | Error::BandsMissing { .. }
            | Error::MissingField { .. } => 2,
            Error::EmptyAxis { .. } | Error::KeyNotFound { .. } | Error::TrackEvaluation { .. } => 3,
            Error::Interpolation(_) => 4,
        }
    }

    /// Whether the caller can recover by adjusting the request (different
    /// mass, different fields) rather than fixing the grid.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::TrackEvaluation { .. }
                | Error::FieldNotFound { .. }
                | Error::BandsMissing { .. }
                | Error::InvalidQuery(_)
        )
    }
}

fn format_key(key: &[(String, f64)]) -> String {
    let parts: Vec<String> = key.iter().map(|(name, value)| format!("{name}={value}")).collect();
    format!("({})", parts.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_not_found_lists_available_fields() {
        let err = Error::FieldNotFound {
            field: "W1_mag".to_string(),
            available: vec!["G_mag".to_string(), "Teff".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("W1_mag"));
        assert!(msg.contains("G_mag, Teff"));
        assert_eq!(err.exit_code(), 2);
        assert!(err.is_recoverable());
    }

    #[test]
    fn key_not_found_formats_composite_key() {
        let err = Error::KeyNotFound {
            key: vec![("log10_isochrone_age_yr".to_string(), 9.75), ("feh".to_string(), 0.0)],
        };
        assert_eq!(err.to_string(), "no grid rows at key (log10_isochrone_age_yr=9.75, feh=0)");
        assert_eq!(err.exit_code(), 3);
        assert!(!err.is_recoverable());
    }
}

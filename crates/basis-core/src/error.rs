//! Error types for basis computation.

use thiserror::Error;

/// Result type for basis computation.
pub type Result<T> = std::result::Result<T, BasisError>;

/// Errors that can occur while computing the CDS-bond basis.
#[derive(Debug, Error)]
pub enum BasisError {
    /// Polars error
    #[error("Polars error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),

    /// Spline construction error
    #[error("Spline error: {0}")]
    Spline(#[from] crate::spline::SplineError),

    /// A required column is missing from the input frame
    #[error("Missing column '{column}' in {frame}")]
    MissingColumn {
        /// Column that was expected
        column: String,
        /// Frame the column was expected in
        frame: String,
    },

    /// The bond panel layout could not be recognized
    #[error(
        "Could not detect bond data format: expected either 'CS' (legacy WRDS-MMN) or 'cs' (Open Source Bond) column"
    )]
    UnknownFormat,

    /// Unknown CDS tenor label
    #[error("Unknown CDS tenor: {0}")]
    UnknownTenor(String),
}

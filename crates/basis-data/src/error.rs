//! Error types for data operations.

use thiserror::Error;

/// Result type for data operations.
pub type Result<T> = std::result::Result<T, DataError>;

/// Errors that can occur during data operations.
#[derive(Debug, Error)]
pub enum DataError {
    /// Network error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// WRDS database error
    #[error("WRDS database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Polars error
    #[error("Polars error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),

    /// Zip archive error
    #[error("Zip archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Data parsing error
    #[error("Data parsing error: {0}")]
    Parse(String),

    /// Missing data
    #[error("Missing data for {dataset}: {reason}")]
    MissingData {
        /// Dataset that was queried
        dataset: String,
        /// Reason for missing data
        reason: String,
    },

    /// Downloaded dataset is suspiciously small
    #[error("Expected at least {expected} rows in {dataset}, found {actual}")]
    TooFewRows {
        /// Dataset being validated
        dataset: String,
        /// Minimum expected row count
        expected: usize,
        /// Rows actually found
        actual: usize,
    },

    /// Invalid year range
    #[error("Invalid year range: start {start} is after end {end}")]
    InvalidYearRange {
        /// First year of the range
        start: i32,
        /// Last year of the range
        end: i32,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

//! Error types for pipeline orchestration.

use thiserror::Error;

/// Errors raised while configuring or running the pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Error from the computation crate.
    #[error(transparent)]
    Core(#[from] basis_core::error::BasisError),

    /// Error from the data-access crate.
    #[error(transparent)]
    Data(#[from] basis_data::DataError),

    /// Error from the output crate.
    #[error(transparent)]
    Output(#[from] basis_output::OutputError),

    /// Task-state database error.
    #[error("task state database error: {0}")]
    State(#[from] rusqlite::Error),

    /// Configuration file could not be parsed.
    #[error("configuration error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration is invalid or incomplete.
    #[error("configuration error: {0}")]
    Config(String),

    /// A requested task does not exist.
    #[error("unknown task: {0}")]
    UnknownTask(String),

    /// The task graph contains a cycle.
    #[error("dependency cycle involving task: {0}")]
    DependencyCycle(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

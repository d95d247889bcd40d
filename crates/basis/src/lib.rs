#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/basis/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod pipeline;
pub mod state;

// Re-export the sub-crates under short names.
pub use basis_core as core;
pub use basis_data as data;
pub use basis_output as output;

pub use config::{PipelineConfig, WrdsConfig};
pub use error::{PipelineError, Result};
pub use pipeline::{Pipeline, RunStatus, TaskReport, TaskStatus};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}

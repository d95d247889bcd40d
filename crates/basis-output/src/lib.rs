#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/basis/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod chart;
pub mod datasets;
pub mod error;
pub mod export;
pub mod summary;

pub use chart::{DEFAULT_CHART_FILE, LineChart};
pub use datasets::{to_ftsfr_aggregated, to_ftsfr_bond_level};
pub use error::{OutputError, Result};
pub use export::{ExportFormat, export_summary};
pub use summary::{BasisSummary, DescribeStats, QualityReport, summarize};

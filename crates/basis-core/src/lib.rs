#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/basis/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod basis;
pub mod bonds;
pub mod curve;
pub mod error;
pub mod spline;

pub use basis::{aggregate_by_rating, bond_level, compute_basis};
pub use bonds::{BondColumnFormat, derive_rating_flags, merge_red_codes};
pub use curve::{CdsCurves, Tenor, attach_par_spreads, collapse_quotes, fit_curves};
pub use error::{BasisError, Result};
pub use spline::{NaturalCubicSpline, SplineError};

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

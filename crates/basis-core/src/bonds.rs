//! Bond panel normalization and RED-code merging.
//!
//! Corporate bond panels arrive in one of two layouts: the legacy
//! WRDS-MMN corrected panel (`CS`, `BOND_YIELD`, `tmt` in months,
//! precomputed `size_ig`/`size_jk` flags) and the Open Source Bond Asset
//! Pricing 2025 panel (`cs`, `ytm`, `tmat` in years, numeric S&P
//! composite rating). Both are normalized to a common schema before the
//! CDS merge.

use crate::error::{BasisError, Result};
use polars::prelude::*;

/// Highest numeric rating still considered investment grade (BBB-).
///
/// Ratings run 1 (AAA) through 21 (CCC-), with 22 marking default.
pub const INVESTMENT_GRADE_MAX_RATING: f64 = 10.0;

/// Recognized bond panel layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BondColumnFormat {
    /// WRDS-MMN corrected panel: `CS`, `BOND_YIELD`, `tmt` in months.
    Legacy,
    /// Open Source Bond 2025 panel: `cs`, `ytm`, `tmat` in years.
    Osbap,
}

impl BondColumnFormat {
    /// Detect the layout from the columns present in `df`.
    pub fn detect(df: &DataFrame) -> Result<Self> {
        if df.column("CS").is_ok() {
            Ok(Self::Legacy)
        } else if df.column("cs").is_ok() {
            Ok(Self::Osbap)
        } else {
            Err(BasisError::UnknownFormat)
        }
    }

    /// Credit spread (Z-spread) column name.
    pub const fn credit_spread_col(&self) -> &'static str {
        match self {
            Self::Legacy => "CS",
            Self::Osbap => "cs",
        }
    }

    /// Bond yield column name.
    pub const fn yield_col(&self) -> &'static str {
        match self {
            Self::Legacy => "BOND_YIELD",
            Self::Osbap => "ytm",
        }
    }

    /// Time-to-maturity column name.
    pub const fn maturity_col(&self) -> &'static str {
        match self {
            Self::Legacy => "tmt",
            Self::Osbap => "tmat",
        }
    }

    /// Factor converting the maturity column to days (months or years).
    pub const fn maturity_days_factor(&self) -> f64 {
        match self {
            Self::Legacy => 30.0,
            Self::Osbap => 365.0,
        }
    }

    /// Whether the panel carries precomputed `size_ig`/`size_jk` flags.
    pub const fn has_size_flags(&self) -> bool {
        matches!(self, Self::Legacy)
    }

    /// Numeric rating column used to derive the size flags.
    pub const fn rating_col(&self) -> &'static str {
        // S&P composite rating; only meaningful for the OSBAP layout.
        "spc_rat"
    }
}

/// Derive `size_ig`/`size_jk` flags from a numeric rating column.
///
/// Investment grade is rating <= 10 (BBB- and above); everything else is
/// speculative. Both flags are null where the rating is null.
pub fn derive_rating_flags(df: &DataFrame, rating_col: &str) -> Result<DataFrame> {
    if df.column(rating_col).is_err() {
        return Err(BasisError::MissingColumn {
            column: rating_col.to_string(),
            frame: "bond panel".to_string(),
        });
    }
    let rating = col(rating_col).cast(DataType::Float64);
    let out = df
        .clone()
        .lazy()
        .with_columns([
            when(rating.clone().is_not_null())
                .then(
                    rating
                        .clone()
                        .lt_eq(lit(INVESTMENT_GRADE_MAX_RATING))
                        .cast(DataType::Float64),
                )
                .otherwise(NULL.lit())
                .alias("size_ig"),
            when(rating.clone().is_not_null())
                .then(
                    rating
                        .gt(lit(INVESTMENT_GRADE_MAX_RATING))
                        .cast(DataType::Float64),
                )
                .otherwise(NULL.lit())
                .alias("size_jk"),
        ])
        .collect()?;
    Ok(out)
}

/// Merge RED codes into the bond panel.
///
/// The RED mapping is reduced to distinct `(issuer_cusip, redcode)` pairs,
/// where the issuer CUSIP is the first 6 characters of the obligation
/// CUSIP, and inner-joined against the panel. The result is normalized to
/// the common schema:
/// `date, cusip, issuer_cusip, BOND_YIELD, CS, size_ig, size_jk, mat_days, redcode`.
pub fn merge_red_codes(bonds: &DataFrame, red_map: &DataFrame) -> Result<DataFrame> {
    let format = BondColumnFormat::detect(bonds)?;

    let bonds = if format.has_size_flags() {
        bonds.clone()
    } else {
        derive_rating_flags(bonds, format.rating_col())?
    };

    let mut bonds_lf = bonds.lazy();
    // Legacy panels already carry an issuer CUSIP; derive it otherwise.
    if bonds_lf
        .collect_schema()?
        .get("issuer_cusip")
        .is_none()
    {
        bonds_lf = bonds_lf
            .with_column(col("cusip").str().slice(lit(0), lit(6)).alias("issuer_cusip"));
    }

    let red = red_map
        .clone()
        .lazy()
        .select([col("obl_cusip"), col("redcode")])
        .drop_nulls(None)
        .with_column(
            col("obl_cusip")
                .str()
                .slice(lit(0), lit(6))
                .alias("issuer_cusip"),
        )
        .select([col("issuer_cusip"), col("redcode")])
        .unique(None, UniqueKeepStrategy::First);

    let merged = bonds_lf
        .join(
            red,
            [col("issuer_cusip")],
            [col("issuer_cusip")],
            JoinArgs::new(JoinType::Inner),
        )
        .with_column(
            (col(format.maturity_col()).cast(DataType::Float64)
                * lit(format.maturity_days_factor()))
            .alias("mat_days"),
        )
        .rename(
            [format.yield_col(), format.credit_spread_col()],
            ["BOND_YIELD", "CS"],
            true,
        )
        .select([
            col("date"),
            col("cusip"),
            col("issuer_cusip"),
            col("BOND_YIELD"),
            col("CS"),
            col("size_ig"),
            col("size_jk"),
            col("mat_days"),
            col("redcode"),
        ])
        .collect()?;

    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn osbap_panel() -> DataFrame {
        let dates = vec![NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(); 3];
        df!(
            "date" => dates,
            "cusip" => ["001957AM1", "001957AM2", "999999ZZ9"],
            "cs" => [0.03, 0.035, 0.02],
            "ytm" => [0.05, 0.06, 0.04],
            "tmat" => [2.0, 4.0, 6.0],
            "spc_rat" => [Some(5.0), Some(15.0), None],
        )
        .unwrap()
    }

    fn red_map() -> DataFrame {
        df!(
            "obl_cusip" => [Some("001957AM1"), Some("001957XX1"), None],
            "redcode" => [Some("R1"), Some("R1"), Some("R9")],
            "ticker" => [Some("ABC"), Some("ABC"), Some("XYZ")],
        )
        .unwrap()
    }

    #[test]
    fn detects_formats() {
        assert_eq!(
            BondColumnFormat::detect(&osbap_panel()).unwrap(),
            BondColumnFormat::Osbap
        );
        let legacy = df!("CS" => [0.01], "BOND_YIELD" => [0.05], "tmt" => [24.0]).unwrap();
        assert_eq!(
            BondColumnFormat::detect(&legacy).unwrap(),
            BondColumnFormat::Legacy
        );
        let bad = df!("foo" => [1.0]).unwrap();
        assert!(matches!(
            BondColumnFormat::detect(&bad),
            Err(BasisError::UnknownFormat)
        ));
    }

    #[test]
    fn rating_flags_split_at_bbb_minus() {
        let out = derive_rating_flags(&osbap_panel(), "spc_rat").unwrap();
        let ig: Vec<Option<f64>> = out.column("size_ig").unwrap().f64().unwrap().to_vec();
        let jk: Vec<Option<f64>> = out.column("size_jk").unwrap().f64().unwrap().to_vec();
        assert_eq!(ig, vec![Some(1.0), Some(0.0), None]);
        assert_eq!(jk, vec![Some(0.0), Some(1.0), None]);
    }

    #[test]
    fn rating_flags_missing_column_errors() {
        let df = df!("cusip" => ["A"]).unwrap();
        assert!(matches!(
            derive_rating_flags(&df, "spc_rat"),
            Err(BasisError::MissingColumn { .. })
        ));
    }

    #[test]
    fn merge_red_codes_normalizes_schema() {
        let out = merge_red_codes(&osbap_panel(), &red_map()).unwrap();

        // The unmatched issuer (999999) drops out of the inner join.
        assert_eq!(out.height(), 2);
        assert_eq!(
            out.get_column_names_str(),
            vec![
                "date",
                "cusip",
                "issuer_cusip",
                "BOND_YIELD",
                "CS",
                "size_ig",
                "size_jk",
                "mat_days",
                "redcode",
            ]
        );

        // tmat is in years, so mat_days = tmat * 365.
        let mat: Vec<Option<f64>> = out.column("mat_days").unwrap().f64().unwrap().to_vec();
        assert_eq!(mat, vec![Some(730.0), Some(1460.0)]);

        let red: Vec<Option<&str>> = out
            .column("redcode")
            .unwrap()
            .str()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(red, vec![Some("R1"), Some("R1")]);
    }
}

//! CDS par-spread curve construction and the bond merge.
//!
//! Markit publishes par spreads at standard tenors. For every reference
//! entity and quote date with at least two distinct tenors, a cubic
//! spline over (tenor days, par spread) lets us read off the spread at a
//! bond's exact maturity.

use crate::error::{BasisError, Result};
use crate::spline::NaturalCubicSpline;
use polars::prelude::*;
use std::collections::HashMap;

/// Standard Markit CDS tenors used in the basis replication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tenor {
    /// 1 year
    Y1,
    /// 3 years
    Y3,
    /// 5 years
    Y5,
    /// 7 years
    Y7,
    /// 10 years
    Y10,
}

impl Tenor {
    /// All tenors, in maturity order.
    pub const ALL: [Self; 5] = [Self::Y1, Self::Y3, Self::Y5, Self::Y7, Self::Y10];

    /// Markit tenor label (e.g. `"5Y"`).
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Y1 => "1Y",
            Self::Y3 => "3Y",
            Self::Y5 => "5Y",
            Self::Y7 => "7Y",
            Self::Y10 => "10Y",
        }
    }

    /// Tenor expressed in days (365 per year).
    pub const fn days(&self) -> f64 {
        match self {
            Self::Y1 => 365.0,
            Self::Y3 => 3.0 * 365.0,
            Self::Y5 => 5.0 * 365.0,
            Self::Y7 => 7.0 * 365.0,
            Self::Y10 => 10.0 * 365.0,
        }
    }

    /// Parse a Markit tenor label.
    pub fn parse(label: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.label() == label)
            .ok_or_else(|| BasisError::UnknownTenor(label.to_string()))
    }
}

/// Fitted par-spread curves keyed by `(redcode, date)`.
///
/// Dates are kept in their physical representation (days since epoch) to
/// avoid converting back and forth while attaching spreads row by row.
#[derive(Debug, Default)]
pub struct CdsCurves {
    curves: HashMap<(String, i32), NaturalCubicSpline>,
    /// Number of `(redcode, date)` groups whose fit failed.
    pub skipped: usize,
}

impl CdsCurves {
    /// Look up the curve for a reference entity on a quote date.
    pub fn get(&self, redcode: &str, date: i32) -> Option<&NaturalCubicSpline> {
        self.curves.get(&(redcode.to_string(), date))
    }

    /// Number of fitted curves.
    pub fn len(&self) -> usize {
        self.curves.len()
    }

    /// True when no curve was fitted.
    pub fn is_empty(&self) -> bool {
        self.curves.is_empty()
    }
}

/// Map a tenor label column to days.
fn tenor_days_expr() -> Expr {
    when(col("tenor").eq(lit(Tenor::Y1.label())))
        .then(lit(Tenor::Y1.days()))
        .when(col("tenor").eq(lit(Tenor::Y3.label())))
        .then(lit(Tenor::Y3.days()))
        .when(col("tenor").eq(lit(Tenor::Y5.label())))
        .then(lit(Tenor::Y5.days()))
        .when(col("tenor").eq(lit(Tenor::Y7.label())))
        .then(lit(Tenor::Y7.days()))
        .when(col("tenor").eq(lit(Tenor::Y10.label())))
        .then(lit(Tenor::Y10.days()))
        .otherwise(NULL.lit())
}

/// Collapse raw CDS quotes into one median par spread per
/// `(redcode, date, tenor)`, keeping only dates present in the bond panel
/// and groups with at least two distinct tenors.
///
/// Par spreads contributed by different dealers are roughly consistent
/// per tenor; the median is a robust collapse.
pub fn collapse_quotes(cds: &DataFrame, bonds: &DataFrame) -> Result<DataFrame> {
    let bond_dates = bonds
        .clone()
        .lazy()
        .select([col("date")])
        .unique(None, UniqueKeepStrategy::First);

    let quotes = cds
        .clone()
        .lazy()
        .drop_nulls(Some(vec![
            col("date"),
            col("parspread"),
            col("tenor"),
            col("redcode"),
        ]))
        .join(
            bond_dates,
            [col("date")],
            [col("date")],
            JoinArgs::new(JoinType::Semi),
        )
        .group_by([col("redcode"), col("date"), col("tenor")])
        .agg([col("parspread").median()])
        .with_column(tenor_days_expr().alias("tenor_days"))
        .drop_nulls(Some(vec![col("tenor_days")]))
        // A spline needs at least two nodes.
        .with_column(
            col("tenor")
                .n_unique()
                .over([col("redcode"), col("date")])
                .alias("n_tenors"),
        )
        .filter(col("n_tenors").gt(lit(1u32)))
        .select([
            col("redcode"),
            col("date"),
            col("tenor"),
            col("tenor_days"),
            col("parspread"),
        ])
        .sort(["redcode", "date", "tenor_days"], Default::default())
        .collect()?;

    Ok(quotes)
}

/// Fit one spline per `(redcode, date)` group of collapsed quotes.
///
/// Groups whose fit fails (duplicate or non-finite nodes) are skipped and
/// counted; one warning is emitted for the whole batch.
pub fn fit_curves(quotes: &DataFrame) -> Result<CdsCurves> {
    let mut out = CdsCurves::default();

    for part in quotes.partition_by(["redcode", "date"], true)? {
        let redcode = part
            .column("redcode")?
            .str()?
            .get(0)
            .unwrap_or_default()
            .to_string();
        let Some(date) = part.column("date")?.date()?.get(0) else {
            continue;
        };

        let mut nodes: Vec<(f64, f64)> = part
            .column("tenor_days")?
            .f64()?
            .into_iter()
            .zip(part.column("parspread")?.f64()?)
            .filter_map(|(x, y)| Some((x?, y?)))
            .collect();
        nodes.sort_by(|a, b| a.0.total_cmp(&b.0));

        let (xs, ys): (Vec<f64>, Vec<f64>) = nodes.into_iter().unzip();
        match NaturalCubicSpline::new(xs, ys) {
            Ok(spline) => {
                out.curves.insert((redcode, date), spline);
            }
            Err(_) => out.skipped += 1,
        }
    }

    if out.skipped > 0 {
        eprintln!(
            "Warning: failed to fit a par-spread curve for {} (redcode, date) pairs",
            out.skipped
        );
    }

    Ok(out)
}

/// Attach interpolated par spreads to the bond panel.
///
/// Bonds whose `(redcode, date)` has no fitted curve are dropped, the
/// rest get `par_spread` evaluated at their `mat_days`. The output keeps
/// `cusip, date, mat_days, BOND_YIELD, CS, size_ig, size_jk, par_spread`,
/// de-duplicated.
pub fn attach_par_spreads(bonds: &DataFrame, curves: &CdsCurves) -> Result<DataFrame> {
    let redcodes = bonds.column("redcode")?.str()?;
    let dates = bonds.column("date")?.date()?;
    let mat_days = bonds.column("mat_days")?.f64()?;

    let par_spread: Float64Chunked = redcodes
        .into_iter()
        .zip(dates.into_iter().zip(mat_days))
        .map(|(redcode, (date, mat))| {
            let value = curves.get(redcode?, date?)?.value(mat?);
            value.is_finite().then_some(value)
        })
        .collect();

    let mut with_spread = bonds.clone();
    with_spread.with_column(par_spread.into_series().with_name("par_spread".into()))?;

    let out = with_spread
        .lazy()
        .drop_nulls(Some(vec![col("par_spread")]))
        .select([
            col("cusip"),
            col("date"),
            col("mat_days"),
            col("BOND_YIELD"),
            col("CS"),
            col("size_ig"),
            col("size_jk"),
            col("par_spread"),
        ])
        .unique(None, UniqueKeepStrategy::First)
        .collect()?;

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn quote_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 31).unwrap()
    }

    fn cds_quotes() -> DataFrame {
        // R1 has a full curve; R2 quotes a single tenor and must drop out.
        let dates = vec![quote_date(); 6];
        df!(
            "date" => dates,
            "redcode" => ["R1", "R1", "R1", "R1", "R1", "R2"],
            "ticker" => ["ABC", "ABC", "ABC", "ABC", "ABC", "XYZ"],
            "parspread" => [0.03, 0.05, 0.04, 0.05, 0.06, 0.02],
            "tenor" => ["1Y", "1Y", "3Y", "5Y", "10Y", "5Y"],
        )
        .unwrap()
    }

    fn bond_panel() -> DataFrame {
        let dates = vec![quote_date(); 3];
        df!(
            "date" => dates,
            "cusip" => ["001957AM1", "001957AM2", "001957AM3"],
            "issuer_cusip" => ["001957", "001957", "001957"],
            "BOND_YIELD" => [0.05, 0.06, 0.055],
            "CS" => [0.03, 0.035, 0.032],
            "size_ig" => [1.0, 0.0, 1.0],
            "size_jk" => [0.0, 1.0, 0.0],
            "mat_days" => [365.0, 1095.0, 1825.0],
            "redcode" => ["R1", "R1", "R2"],
        )
        .unwrap()
    }

    #[test]
    fn tenor_roundtrip() {
        for t in Tenor::ALL {
            assert_eq!(Tenor::parse(t.label()).unwrap(), t);
        }
        assert!(matches!(
            Tenor::parse("30Y"),
            Err(BasisError::UnknownTenor(_))
        ));
        assert_relative_eq!(Tenor::Y7.days(), 2555.0);
    }

    #[test]
    fn collapse_takes_median_and_filters_thin_curves() {
        let quotes = collapse_quotes(&cds_quotes(), &bond_panel()).unwrap();

        // R2 only quotes one tenor, so only R1's four tenors survive.
        assert_eq!(quotes.height(), 4);
        let reds: Vec<Option<&str>> = quotes
            .column("redcode")
            .unwrap()
            .str()
            .unwrap()
            .into_iter()
            .collect();
        assert!(reds.iter().all(|r| *r == Some("R1")));

        // The duplicate 1Y quotes (0.03, 0.05) collapse to their median.
        let spread_1y = quotes
            .column("parspread")
            .unwrap()
            .f64()
            .unwrap()
            .get(0)
            .unwrap();
        assert_relative_eq!(spread_1y, 0.04, epsilon = 1e-12);
    }

    #[test]
    fn fit_and_attach() {
        let quotes = collapse_quotes(&cds_quotes(), &bond_panel()).unwrap();
        let curves = fit_curves(&quotes).unwrap();
        assert_eq!(curves.len(), 1);
        assert_eq!(curves.skipped, 0);

        let out = attach_par_spreads(&bond_panel(), &curves).unwrap();

        // The R2 bond has no curve and is dropped.
        assert_eq!(out.height(), 2);
        let spreads = out.column("par_spread").unwrap().f64().unwrap();
        // At node maturities the spline reproduces the collapsed quotes.
        assert_relative_eq!(spreads.get(0).unwrap(), 0.04, epsilon = 1e-10);
        assert_relative_eq!(spreads.get(1).unwrap(), 0.04, epsilon = 1e-10);
    }

    #[test]
    fn attach_deduplicates() {
        let doubled = bond_panel().vstack(&bond_panel()).unwrap();
        let quotes = collapse_quotes(&cds_quotes(), &doubled).unwrap();
        let curves = fit_curves(&quotes).unwrap();
        let out = attach_par_spreads(&doubled, &curves).unwrap();
        assert_eq!(out.height(), 2);
    }
}

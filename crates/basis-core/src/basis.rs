//! CDS-bond basis and implied risk-free rate.
//!
//! Following Siriwardane, Sunderam, and Wallen ("Segmented Arbitrage"),
//! the basis is `CB = par_spread - FR` where `FR` is the floating-rate
//! spread implied by the bond, approximated by its Z-spread. The implied
//! risk-free rate backs the basis out of the bond yield:
//! `rfr = (BOND_YIELD - CS - CB) * 100`, in percent.

use crate::error::Result;
use polars::prelude::*;

/// Bound used to discard blown-up rates (mirrors the data-quality check
/// applied downstream).
const RFR_BOUND: f64 = 1e10;

/// Compute `FR`, `CB`, `rfr`, and the rating category `c_rating` on a
/// merged bond/CDS panel.
///
/// Input columns: `cusip, date, mat_days, BOND_YIELD, CS, size_ig,
/// size_jk, par_spread`. Rows whose `rfr` is null, NaN, or outside
/// `(-1e10, 1e10)` are dropped.
pub fn compute_basis(df: &DataFrame) -> Result<DataFrame> {
    let out = df
        .clone()
        .lazy()
        .with_column(col("CS").alias("FR"))
        .with_column((col("par_spread") - col("FR")).alias("CB"))
        .with_column(((col("BOND_YIELD") - col("CS") - col("CB")) * lit(100.0)).alias("rfr"))
        .with_column(
            when(col("size_ig").eq(lit(1.0)))
                .then(lit("IG"))
                .when(col("size_jk").eq(lit(1.0)))
                .then(lit("HY"))
                .otherwise(NULL.lit())
                .alias("c_rating"),
        )
        .filter(
            col("rfr")
                .gt(lit(-RFR_BOUND))
                .and(col("rfr").lt(lit(RFR_BOUND))),
        )
        .collect()?;
    Ok(out)
}

/// Aggregate the implied risk-free rate to one mean per rating category
/// and date. Rows without a rating category are excluded.
pub fn aggregate_by_rating(df: &DataFrame) -> Result<DataFrame> {
    let out = df
        .clone()
        .lazy()
        .drop_nulls(Some(vec![col("c_rating"), col("rfr")]))
        .group_by([col("c_rating"), col("date")])
        .agg([col("rfr").mean()])
        .sort(["c_rating", "date"], Default::default())
        .collect()?;
    Ok(out)
}

/// Bond-level panel of implied risk-free rates: `cusip, date, rfr`.
pub fn bond_level(df: &DataFrame) -> Result<DataFrame> {
    let out = df
        .clone()
        .lazy()
        .select([col("cusip"), col("date"), col("rfr")])
        .collect()?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn merged_panel() -> DataFrame {
        let d = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        df!(
            "cusip" => ["001957AM1", "001957AM2"],
            "date" => [d, d],
            "mat_days" => [730.0, 1460.0],
            "BOND_YIELD" => [0.05, 0.06],
            "CS" => [0.03, 0.035],
            "size_ig" => [1.0, 0.0],
            "size_jk" => [0.0, 1.0],
            "par_spread" => [0.04, 0.05],
        )
        .unwrap()
    }

    #[test]
    fn basis_formulas() {
        let out = compute_basis(&merged_panel()).unwrap();
        assert_eq!(out.height(), 2);

        let fr = out.column("FR").unwrap().f64().unwrap();
        let cb = out.column("CB").unwrap().f64().unwrap();
        let rfr = out.column("rfr").unwrap().f64().unwrap();
        let cs = out.column("CS").unwrap().f64().unwrap();
        let par = out.column("par_spread").unwrap().f64().unwrap();
        let yld = out.column("BOND_YIELD").unwrap().f64().unwrap();

        for i in 0..out.height() {
            let expected_fr = cs.get(i).unwrap();
            let expected_cb = par.get(i).unwrap() - expected_fr;
            let expected_rfr = (yld.get(i).unwrap() - cs.get(i).unwrap() - expected_cb) * 100.0;
            assert_relative_eq!(fr.get(i).unwrap(), expected_fr, epsilon = 1e-12);
            assert_relative_eq!(cb.get(i).unwrap(), expected_cb, epsilon = 1e-12);
            assert_relative_eq!(rfr.get(i).unwrap(), expected_rfr, epsilon = 1e-9);
        }
    }

    #[test]
    fn rating_categories() {
        let out = compute_basis(&merged_panel()).unwrap();
        let ratings: Vec<Option<&str>> = out
            .column("c_rating")
            .unwrap()
            .str()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(ratings, vec![Some("IG"), Some("HY")]);
    }

    #[test]
    fn aggregation_means_by_rating_and_date() {
        let d = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        let panel = df!(
            "cusip" => ["A", "B", "C"],
            "date" => [d, d, d],
            "rfr" => [1.0, 3.0, 5.0],
            "c_rating" => [Some("IG"), Some("IG"), None],
        )
        .unwrap();

        let agg = aggregate_by_rating(&panel).unwrap();
        assert_eq!(agg.height(), 1);
        let mean = agg.column("rfr").unwrap().f64().unwrap().get(0).unwrap();
        assert_relative_eq!(mean, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn bond_level_projects_columns() {
        let out = bond_level(&compute_basis(&merged_panel()).unwrap()).unwrap();
        assert_eq!(out.get_column_names_str(), vec!["cusip", "date", "rfr"]);
        assert_eq!(out.height(), 2);
    }
}

//! FTSFR dataset standardization.
//!
//! Downstream forecasting tooling expects long-format panels with three
//! columns: `unique_id`, `ds` (date stamp), and `y` (observed value).

use crate::error::Result;
use polars::prelude::*;

/// Standardize a value panel to FTSFR long format.
fn standardize(df: &DataFrame, id_col: &str, value_col: &str) -> Result<DataFrame> {
    let out = df
        .clone()
        .lazy()
        .select([
            col(id_col).cast(DataType::String).alias("unique_id"),
            col("date").alias("ds"),
            col(value_col).alias("y"),
        ])
        .drop_nulls(None)
        // Stable sort so later de-duplication keeps the first-seen row.
        .sort(
            ["unique_id", "ds"],
            SortMultipleOptions::default().with_maintain_order(true),
        )
        .collect()?;
    Ok(out)
}

/// Rating-aggregated FTSFR dataset: one series per rating category.
pub fn to_ftsfr_aggregated(agg: &DataFrame) -> Result<DataFrame> {
    standardize(agg, "c_rating", "rfr")
}

/// Bond-level FTSFR dataset: one series per CUSIP.
///
/// Bonds occasionally report twice in a month; duplicate
/// `(unique_id, ds)` pairs are removed keeping the first, and the number
/// of removed rows is returned for reporting.
pub fn to_ftsfr_bond_level(bond_level: &DataFrame) -> Result<(DataFrame, usize)> {
    let long = standardize(bond_level, "cusip", "rfr")?;
    let before = long.height();
    let deduped = long
        .lazy()
        .unique_stable(
            Some(vec!["unique_id".into(), "ds".into()]),
            UniqueKeepStrategy::First,
        )
        .collect()?;
    let removed = before - deduped.height();
    Ok((deduped, removed))
}

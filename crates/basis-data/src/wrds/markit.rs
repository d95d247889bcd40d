//! Markit CDS pulls from WRDS.
//!
//! Quotes live in one `markit.cds{year}` table per year. Pulls are
//! restricted to US-dollar senior unsecured (SNRFOR) US entities at the
//! standard tenors, matching the Segmented Arbitrage replication.

use crate::error::{DataError, Result};
use crate::wrds::client::WrdsClient;
use chrono::NaiveDate;
use futures::stream::{self, StreamExt, TryStreamExt};
use polars::prelude::*;
use sqlx::Row;

/// First year with Markit CDS coverage on WRDS.
pub const DEFAULT_START_YEAR: i32 = 2001;
/// Last full year pulled by default.
pub const DEFAULT_END_YEAR: i32 = 2023;

/// How many yearly tables are queried at once.
const MAX_CONCURRENT_YEAR_PULLS: usize = 4;

/// SQL for one year of CDS quotes.
fn cds_year_query(year: i32) -> String {
    format!(
        "SELECT DISTINCT \
            date, \
            ticker, \
            redcode, \
            parspread::float8 AS parspread, \
            tenor, \
            country \
        FROM markit.cds{year} \
        WHERE country = 'United States' \
          AND currency = 'USD' \
          AND tier = 'SNRFOR' \
          AND tenor IN ('1Y', '3Y', '5Y', '7Y', '10Y')"
    )
}

/// Pull one year of quotes and tag it with a `year` column.
async fn pull_cds_year(client: &WrdsClient, year: i32) -> Result<DataFrame> {
    let rows = client.query(&cds_year_query(year)).await?;

    let mut dates: Vec<Option<NaiveDate>> = Vec::with_capacity(rows.len());
    let mut tickers: Vec<Option<String>> = Vec::with_capacity(rows.len());
    let mut redcodes: Vec<Option<String>> = Vec::with_capacity(rows.len());
    let mut parspreads: Vec<Option<f64>> = Vec::with_capacity(rows.len());
    let mut tenors: Vec<Option<String>> = Vec::with_capacity(rows.len());
    let mut countries: Vec<Option<String>> = Vec::with_capacity(rows.len());

    for row in &rows {
        dates.push(row.try_get("date")?);
        tickers.push(row.try_get("ticker")?);
        redcodes.push(row.try_get("redcode")?);
        parspreads.push(row.try_get("parspread")?);
        tenors.push(row.try_get("tenor")?);
        countries.push(row.try_get("country")?);
    }

    let n = rows.len();
    let df = DataFrame::new(vec![
        Series::new("date".into(), dates).into(),
        Series::new("ticker".into(), tickers).into(),
        Series::new("redcode".into(), redcodes).into(),
        Series::new("parspread".into(), parspreads).into(),
        Series::new("tenor".into(), tenors).into(),
        Series::new("country".into(), countries).into(),
        Series::new("year".into(), vec![year; n]).into(),
    ])?;

    Ok(df)
}

/// Pull CDS quotes for an inclusive year range and concatenate them in
/// year order. Yearly tables are queried with bounded concurrency.
pub async fn pull_cds_data(
    client: &WrdsClient,
    start_year: i32,
    end_year: i32,
) -> Result<DataFrame> {
    validate_year_range(start_year, end_year)?;

    let mut frames: Vec<(i32, DataFrame)> = stream::iter(start_year..=end_year)
        .map(|year| async move { pull_cds_year(client, year).await.map(|df| (year, df)) })
        .buffer_unordered(MAX_CONCURRENT_YEAR_PULLS)
        .try_collect()
        .await?;
    frames.sort_by_key(|(year, _)| *year);

    let lazy: Vec<LazyFrame> = frames.into_iter().map(|(_, df)| df.lazy()).collect();
    let combined = concat(lazy, UnionArgs::default())?.collect()?;
    Ok(combined)
}

fn validate_year_range(start: i32, end: i32) -> Result<()> {
    if start > end {
        return Err(DataError::InvalidYearRange { start, end });
    }
    Ok(())
}

/// Pull the obligation-level RED mapping (RED code, obligation CUSIP,
/// ISIN) used to join Markit entities onto bond issuers.
pub async fn pull_red_isin_mapping(client: &WrdsClient) -> Result<DataFrame> {
    let rows = client
        .query(
            "SELECT redcode, ticker, obl_cusip, isin, tier \
             FROM markit.redobl \
             WHERE obl_cusip IS NOT NULL",
        )
        .await?;

    let mut redcodes: Vec<Option<String>> = Vec::with_capacity(rows.len());
    let mut tickers: Vec<Option<String>> = Vec::with_capacity(rows.len());
    let mut obl_cusips: Vec<Option<String>> = Vec::with_capacity(rows.len());
    let mut isins: Vec<Option<String>> = Vec::with_capacity(rows.len());
    let mut tiers: Vec<Option<String>> = Vec::with_capacity(rows.len());

    for row in &rows {
        redcodes.push(row.try_get("redcode")?);
        tickers.push(row.try_get("ticker")?);
        obl_cusips.push(row.try_get("obl_cusip")?);
        isins.push(row.try_get("isin")?);
        tiers.push(row.try_get("tier")?);
    }

    let df = DataFrame::new(vec![
        Series::new("redcode".into(), redcodes).into(),
        Series::new("ticker".into(), tickers).into(),
        Series::new("obl_cusip".into(), obl_cusips).into(),
        Series::new("isin".into(), isins).into(),
        Series::new("tier".into(), tiers).into(),
    ])?;

    Ok(df)
}

//! Linking Markit RED entities to CRSP permnos.
//!
//! Two routes, in order: the 6-digit entity CUSIP against the CRSP
//! header CUSIP, then the Markit ticker against the CRSP ticker for
//! whatever is left. Ticker links are only as good as the company names
//! behind them, so every link carries a fuzzy name-similarity score and
//! callers filter on it (50 is the conventional floor).

use crate::error::{DataError, Result};
use crate::wrds::client::WrdsClient;
use polars::prelude::*;
use sqlx::Row;

/// Conventional minimum name-similarity score for ticker links.
pub const DEFAULT_NAME_RATIO_THRESHOLD: f64 = 50.0;

/// Partial-ratio style name similarity in [0, 100].
///
/// Slides the shorter string across the longer one and keeps the best
/// window ratio `2 * lcs / (len_a + len_b)`, the Levenshtein ratio
/// with substitutions counted twice. A legal-suffix mismatch
/// ("ACME CORP" vs "ACME CORPORATION HOLDINGS") still scores 100, and
/// transposed words keep their common subsequence instead of paying
/// full substitution cost.
pub fn partial_name_ratio(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let (short, long) = if a_chars.len() <= b_chars.len() {
        (&a_chars, &b_chars)
    } else {
        (&b_chars, &a_chars)
    };

    let mut best: f64 = 0.0;
    for window in long.windows(short.len()) {
        let lcs = lcs_len(short, window);
        let score = 2.0 * lcs as f64 / (short.len() + window.len()) as f64;
        best = best.max(score);
        if best >= 1.0 {
            break;
        }
    }
    (best * 100.0).round()
}

/// Longest common subsequence length, two-row dynamic program.
fn lcs_len(a: &[char], b: &[char]) -> usize {
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    for &ca in a {
        for (j, &cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                curr[j].max(prev[j + 1])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// Pull the RED entity header table.
async fn pull_red_entities(client: &WrdsClient) -> Result<DataFrame> {
    let rows = client
        .query("SELECT redcode, ticker, entity_cusip, shortname FROM markit.redent")
        .await?;

    let mut redcodes: Vec<Option<String>> = Vec::with_capacity(rows.len());
    let mut tickers: Vec<Option<String>> = Vec::with_capacity(rows.len());
    let mut cusips: Vec<Option<String>> = Vec::with_capacity(rows.len());
    let mut names: Vec<Option<String>> = Vec::with_capacity(rows.len());
    for row in &rows {
        redcodes.push(row.try_get("redcode")?);
        tickers.push(row.try_get("ticker")?);
        cusips.push(row.try_get("entity_cusip")?);
        names.push(row.try_get("shortname")?);
    }

    let df = DataFrame::new(vec![
        Series::new("redcode".into(), redcodes).into(),
        Series::new("ticker".into(), tickers).into(),
        Series::new("entity_cusip".into(), cusips).into(),
        Series::new("shortname".into(), names).into(),
    ])?;

    // The header table should be one row per redcode; a violation means
    // the pull grabbed the wrong table.
    let n_codes = df.column("redcode")?.as_materialized_series().n_unique()?;
    if n_codes != df.height() {
        return Err(DataError::Parse(
            "markit.redent returned multiple rows per redcode".to_string(),
        ));
    }

    Ok(df)
}

/// Pull the CRSP security header table.
async fn pull_crsp_header(client: &WrdsClient) -> Result<DataFrame> {
    let rows = client
        .query(
            "SELECT permno::float8 AS permno, permco::float8 AS permco, \
                    hdrcusip, ticker, issuernm \
             FROM crsp.stksecurityinfohdr",
        )
        .await?;

    let mut permnos: Vec<Option<f64>> = Vec::with_capacity(rows.len());
    let mut permcos: Vec<Option<f64>> = Vec::with_capacity(rows.len());
    let mut cusips: Vec<Option<String>> = Vec::with_capacity(rows.len());
    let mut tickers: Vec<Option<String>> = Vec::with_capacity(rows.len());
    let mut names: Vec<Option<String>> = Vec::with_capacity(rows.len());
    for row in &rows {
        permnos.push(row.try_get("permno")?);
        permcos.push(row.try_get("permco")?);
        cusips.push(row.try_get("hdrcusip")?);
        tickers.push(row.try_get("ticker")?);
        names.push(row.try_get("issuernm")?);
    }

    let df = DataFrame::new(vec![
        Series::new("permno".into(), permnos).into(),
        Series::new("permco".into(), permcos).into(),
        Series::new("hdrcusip".into(), cusips).into(),
        Series::new("crsp_ticker".into(), tickers).into(),
        Series::new("issuernm".into(), names).into(),
    ])?;

    Ok(df)
}

/// Link RED entities to the CRSP header, CUSIP route first, ticker route
/// for the remainder. Adds `flg` (`cusip`/`ticker`) and `name_ratio`.
pub fn link_red_to_crsp(red_entities: &DataFrame, crsp_header: &DataFrame) -> Result<DataFrame> {
    let crsp = crsp_header
        .clone()
        .lazy()
        .with_column(col("hdrcusip").str().slice(lit(0), lit(6)).alias("cusip6"));

    // Route 1: 6-digit entity CUSIP.
    let by_cusip = red_entities
        .clone()
        .lazy()
        .join(
            crsp.clone(),
            [col("entity_cusip")],
            [col("cusip6")],
            JoinArgs::new(JoinType::Left),
        )
        .collect()?;

    let matched_cusip = by_cusip
        .clone()
        .lazy()
        .filter(col("permno").is_not_null())
        .with_column(lit("cusip").alias("flg"));

    // Route 2: ticker, for entities the CUSIP route missed.
    let matched_ticker = by_cusip
        .lazy()
        .filter(col("permno").is_null())
        .select([
            col("redcode"),
            col("ticker"),
            col("entity_cusip"),
            col("shortname"),
        ])
        .join(
            crsp,
            [col("ticker")],
            [col("crsp_ticker")],
            JoinArgs::new(JoinType::Left),
        )
        .filter(col("permno").is_not_null())
        .with_column(lit("ticker").alias("flg"));

    let select_cols = [
        col("redcode"),
        col("ticker"),
        col("entity_cusip"),
        col("shortname"),
        col("permno"),
        col("permco"),
        col("issuernm"),
        col("flg"),
    ];
    let linked = concat(
        [
            matched_cusip.select(select_cols.clone()),
            matched_ticker.select(select_cols),
        ],
        UnionArgs::default(),
    )?
    .collect()?;

    // Fuzzy company-name check for every link.
    let short_names = linked.column("shortname")?.str()?;
    let issuer_names = linked.column("issuernm")?.str()?;
    let ratios: Float64Chunked = short_names
        .into_iter()
        .zip(issuer_names)
        .map(|(red_name, crsp_name)| {
            Some(partial_name_ratio(
                &red_name?.to_uppercase(),
                &crsp_name?.to_uppercase(),
            ))
        })
        .collect();

    let mut out = linked;
    out.with_column(ratios.into_series().with_name("name_ratio".into()))?;
    Ok(out)
}

/// Pull both source tables and build the RED-to-CRSP link table.
pub async fn pull_red_crsp_link(client: &WrdsClient) -> Result<DataFrame> {
    let red_entities = pull_red_entities(client).await?;
    let crsp_header = pull_crsp_header(client).await?;
    link_red_to_crsp(&red_entities, &crsp_header)
}

/// Restrict CDS quotes to entities with an acceptable CRSP link.
///
/// Equivalent to a right merge of the quotes onto the link table,
/// filtered to `name_ratio >= ratio_threshold`.
pub fn subset_cds_to_crsp(
    cds: &DataFrame,
    link: &DataFrame,
    ratio_threshold: f64,
) -> Result<DataFrame> {
    let link_cols = link
        .clone()
        .lazy()
        .select([
            col("redcode"),
            col("permno"),
            col("permco"),
            col("flg"),
            col("name_ratio"),
        ])
        .filter(col("name_ratio").gt_eq(lit(ratio_threshold)));

    let out = link_cols
        .join(
            cds.clone().lazy(),
            [col("redcode")],
            [col("redcode")],
            JoinArgs::new(JoinType::Left),
        )
        .collect()?;
    Ok(out)
}

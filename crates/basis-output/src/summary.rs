//! Summary statistics for the basis datasets.
//!
//! Mirrors the replication's summary notebook: describe-style tables per
//! rating series, pairwise correlations between the rating series,
//! monthly aggregates, and data-quality counts.

use crate::error::{OutputError, Result};
use chrono::NaiveDate;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Values outside this band count as blown-up in the quality check.
const QUALITY_BOUND: f64 = 1e10;

/// Describe-style statistics for one series.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DescribeStats {
    /// Number of observations.
    pub count: usize,
    /// Arithmetic mean.
    pub mean: f64,
    /// Sample standard deviation.
    pub std: f64,
    /// Minimum.
    pub min: f64,
    /// Lower quartile.
    pub q25: f64,
    /// Median.
    pub median: f64,
    /// Upper quartile.
    pub q75: f64,
    /// Maximum.
    pub max: f64,
}

impl DescribeStats {
    /// Compute describe statistics; `None` for an empty slice.
    ///
    /// A single observation reports `std = 0.0`: the sample deviation is
    /// undefined there, and NaN would not survive JSON serialization.
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));

        let count = sorted.len();
        let mean = sorted.iter().sum::<f64>() / count as f64;
        let var = if count > 1 {
            sorted.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (count - 1) as f64
        } else {
            0.0
        };

        Some(Self {
            count,
            mean,
            std: var.sqrt(),
            min: sorted[0],
            q25: quantile(&sorted, 0.25),
            median: quantile(&sorted, 0.5),
            q75: quantile(&sorted, 0.75),
            max: sorted[count - 1],
        })
    }
}

/// Linearly interpolated quantile on a pre-sorted slice.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let n = sorted.len();
    if n == 1 {
        return sorted[0];
    }
    let pos = q * (n - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] * (1.0 - frac) + sorted[hi] * frac
}

/// Describe statistics attached to a series id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SeriesSummary {
    /// Series id (rating category or CUSIP).
    pub unique_id: String,
    /// Statistics for the series.
    pub stats: DescribeStats,
}

/// Pearson correlation between two rating series, aligned on date.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SeriesCorrelation {
    /// First series id.
    pub left: String,
    /// Second series id.
    pub right: String,
    /// Pearson correlation coefficient.
    pub rho: f64,
    /// Number of overlapping dates.
    pub overlap: usize,
}

/// Data-quality counts.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct QualityReport {
    /// Null observations.
    pub missing: usize,
    /// Observations outside `(-1e10, 1e10)`.
    pub out_of_bounds: usize,
}

/// Full summary of a long-format basis dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BasisSummary {
    /// First observation date.
    pub date_min: Option<NaiveDate>,
    /// Last observation date.
    pub date_max: Option<NaiveDate>,
    /// Per-series describe tables, ordered by series id.
    pub series: Vec<SeriesSummary>,
    /// Describe table over all observations.
    pub overall: Option<DescribeStats>,
    /// Pairwise correlations between the series.
    pub correlations: Vec<SeriesCorrelation>,
    /// Monthly mean/std/count per series.
    #[serde(skip)]
    pub monthly: Option<DataFrame>,
    /// Data-quality counts.
    pub quality: QualityReport,
}

/// Summarize a long-format `(unique_id, ds, y)` dataset.
pub fn summarize(long: &DataFrame) -> Result<BasisSummary> {
    if long.height() == 0 {
        return Err(OutputError::Empty("summary input".to_string()));
    }

    let dates = long.column("ds")?.date()?;
    let date_min = dates.min().and_then(epoch_day_to_date);
    let date_max = dates.max().and_then(epoch_day_to_date);

    // Per-series and overall describe tables.
    let mut series = Vec::new();
    let mut all_values = Vec::new();
    let mut parts = long.partition_by(["unique_id"], true)?;
    parts.sort_by_key(|p| series_id(p).unwrap_or_default());
    for part in &parts {
        let id = series_id(part)?;
        let values: Vec<f64> = part.column("y")?.f64()?.into_iter().flatten().collect();
        all_values.extend_from_slice(&values);
        if let Some(stats) = DescribeStats::from_values(&values) {
            series.push(SeriesSummary {
                unique_id: id,
                stats,
            });
        }
    }
    let overall = DescribeStats::from_values(&all_values);

    // Pairwise correlations, aligned on date.
    let mut correlations = Vec::new();
    for i in 0..parts.len() {
        for j in (i + 1)..parts.len() {
            if let Some(corr) = correlate(&parts[i], &parts[j])? {
                correlations.push(corr);
            }
        }
    }

    let monthly = monthly_stats(long)?;
    let quality = quality_report(long)?;

    Ok(BasisSummary {
        date_min,
        date_max,
        series,
        overall,
        correlations,
        monthly: Some(monthly),
        quality,
    })
}

fn series_id(part: &DataFrame) -> Result<String> {
    Ok(part
        .column("unique_id")?
        .str()?
        .get(0)
        .unwrap_or_default()
        .to_string())
}

/// Pearson correlation between two series after an inner join on `ds`.
fn correlate(a: &DataFrame, b: &DataFrame) -> Result<Option<SeriesCorrelation>> {
    let left_id = series_id(a)?;
    let right_id = series_id(b)?;

    let joined = a
        .clone()
        .lazy()
        .select([col("ds"), col("y").alias("y_left")])
        .join(
            b.clone()
                .lazy()
                .select([col("ds"), col("y").alias("y_right")]),
            [col("ds")],
            [col("ds")],
            JoinArgs::new(JoinType::Inner),
        )
        .drop_nulls(None)
        .collect()?;

    let xs: Vec<f64> = joined.column("y_left")?.f64()?.into_iter().flatten().collect();
    let ys: Vec<f64> = joined.column("y_right")?.f64()?.into_iter().flatten().collect();
    Ok(pearson(&xs, &ys).map(|rho| SeriesCorrelation {
        left: left_id,
        right: right_id,
        rho,
        overlap: xs.len(),
    }))
}

/// Pearson correlation coefficient; `None` when undefined.
fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() != ys.len() || xs.len() < 2 {
        return None;
    }
    let n = xs.len() as f64;
    let mean_x = xs.iter().sum::<f64>() / n;
    let mean_y = ys.iter().sum::<f64>() / n;
    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        cov += (x - mean_x) * (y - mean_y);
        var_x += (x - mean_x).powi(2);
        var_y += (y - mean_y).powi(2);
    }
    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }
    Some(cov / (var_x * var_y).sqrt())
}

/// Monthly mean/std/count per series.
pub fn monthly_stats(long: &DataFrame) -> Result<DataFrame> {
    let out = long
        .clone()
        .lazy()
        .drop_nulls(Some(vec![col("y")]))
        .group_by([
            col("ds").dt().year().alias("year"),
            col("ds").dt().month().alias("month"),
            col("unique_id"),
        ])
        .agg([
            col("y").mean().alias("mean"),
            col("y").std(1).alias("std"),
            col("y").count().alias("count"),
        ])
        .sort(["year", "month", "unique_id"], Default::default())
        .collect()?;
    Ok(out)
}

/// Count missing and blown-up observations.
pub fn quality_report(long: &DataFrame) -> Result<QualityReport> {
    let y = long.column("y")?.f64()?;
    let missing = y.null_count();
    let out_of_bounds = y
        .into_iter()
        .flatten()
        .filter(|v| !(-QUALITY_BOUND < *v && *v < QUALITY_BOUND))
        .count();
    Ok(QualityReport {
        missing,
        out_of_bounds,
    })
}

fn epoch_day_to_date(days: i32) -> Option<NaiveDate> {
    // Days since 1970-01-01, which is day 719,163 of the common era.
    NaiveDate::from_num_days_from_ce_opt(days + 719_163)
}

impl BasisSummary {
    /// Serialize the summary (without the monthly frame) to pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl fmt::Display for BasisSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== CDS-Bond Basis Summary ===")?;
        if let (Some(min), Some(max)) = (self.date_min, self.date_max) {
            writeln!(f, "Date range: {min} to {max}")?;
        }
        writeln!(
            f,
            "\n{:<10} {:>7} {:>9} {:>9} {:>9} {:>9} {:>9} {:>9} {:>9}",
            "series", "count", "mean", "std", "min", "q25", "median", "q75", "max"
        )?;
        for s in &self.series {
            let st = &s.stats;
            writeln!(
                f,
                "{:<10} {:>7} {:>9.4} {:>9.4} {:>9.4} {:>9.4} {:>9.4} {:>9.4} {:>9.4}",
                s.unique_id, st.count, st.mean, st.std, st.min, st.q25, st.median, st.q75, st.max
            )?;
        }
        if let Some(overall) = &self.overall {
            writeln!(
                f,
                "{:<10} {:>7} {:>9.4} {:>9.4} {:>9.4} {:>9.4} {:>9.4} {:>9.4} {:>9.4}",
                "(all)",
                overall.count,
                overall.mean,
                overall.std,
                overall.min,
                overall.q25,
                overall.median,
                overall.q75,
                overall.max
            )?;
        }
        if !self.correlations.is_empty() {
            writeln!(f, "\nCorrelations (aligned on date):")?;
            for c in &self.correlations {
                writeln!(
                    f,
                    "  {} ~ {}: {:.4} ({} overlapping dates)",
                    c.left, c.right, c.rho, c.overlap
                )?;
            }
        }
        writeln!(
            f,
            "\nQuality: {} missing, {} out-of-bounds",
            self.quality.missing, self.quality.out_of_bounds
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn long_panel() -> DataFrame {
        let d1 = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        let d3 = NaiveDate::from_ymd_opt(2024, 3, 29).unwrap();
        df!(
            "unique_id" => ["IG", "IG", "IG", "HY", "HY", "HY"],
            "ds" => [d1, d2, d3, d1, d2, d3],
            "y" => [1.0, 2.0, 3.0, 2.0, 4.0, 6.0],
        )
        .unwrap()
    }

    #[test]
    fn describe_matches_hand_computation() {
        let stats = DescribeStats::from_values(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(stats.count, 4);
        assert_relative_eq!(stats.mean, 2.5);
        assert_relative_eq!(stats.std, (5.0f64 / 3.0).sqrt(), epsilon = 1e-12);
        assert_relative_eq!(stats.q25, 1.75);
        assert_relative_eq!(stats.median, 2.5);
        assert_relative_eq!(stats.q75, 3.25);
        assert_relative_eq!(stats.min, 1.0);
        assert_relative_eq!(stats.max, 4.0);
    }

    #[test]
    fn describe_empty_is_none() {
        assert!(DescribeStats::from_values(&[]).is_none());
    }

    #[test]
    fn single_observation_reports_zero_std() {
        let stats = DescribeStats::from_values(&[4.2]).unwrap();
        assert_eq!(stats.count, 1);
        assert_relative_eq!(stats.std, 0.0);
        assert_relative_eq!(stats.q25, 4.2);
        assert_relative_eq!(stats.max, 4.2);

        // The serialized form stays finite.
        let json = serde_json::to_string(&stats).unwrap();
        assert!(json.contains("\"std\":0.0"));
    }

    #[test]
    fn perfectly_correlated_series() {
        let summary = summarize(&long_panel()).unwrap();
        assert_eq!(summary.series.len(), 2);
        // Sorted by id: HY before IG.
        assert_eq!(summary.series[0].unique_id, "HY");
        assert_eq!(summary.series[1].unique_id, "IG");

        assert_eq!(summary.correlations.len(), 1);
        let corr = &summary.correlations[0];
        assert_eq!(corr.overlap, 3);
        // HY = 2 * IG, exactly linear.
        assert_relative_eq!(corr.rho, 1.0, epsilon = 1e-12);

        assert_eq!(
            summary.date_min,
            Some(NaiveDate::from_ymd_opt(2024, 1, 31).unwrap())
        );
        assert_eq!(
            summary.date_max,
            Some(NaiveDate::from_ymd_opt(2024, 3, 29).unwrap())
        );
    }

    #[test]
    fn monthly_stats_group_by_month() {
        let monthly = monthly_stats(&long_panel()).unwrap();
        // 3 months x 2 series.
        assert_eq!(monthly.height(), 6);
        assert_eq!(
            monthly.get_column_names_str(),
            vec!["year", "month", "unique_id", "mean", "std", "count"]
        );
    }

    #[test]
    fn quality_flags_bad_values() {
        let d = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        let long = df!(
            "unique_id" => ["IG", "IG", "IG"],
            "ds" => [d, d, d],
            "y" => [Some(1.0), None, Some(1e12)],
        )
        .unwrap();
        let report = quality_report(&long).unwrap();
        assert_eq!(report.missing, 1);
        assert_eq!(report.out_of_bounds, 1);
    }

    #[test]
    fn empty_input_is_an_error() {
        let long = df!(
            "unique_id" => Vec::<String>::new(),
            "y" => Vec::<f64>::new(),
        )
        .unwrap();
        assert!(matches!(
            summarize(&long),
            Err(OutputError::Empty(_))
        ));
    }
}

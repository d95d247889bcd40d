//! Export of summary tables to CSV and JSON.

use crate::error::Result;
use crate::summary::BasisSummary;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Export format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// Comma-separated values format.
    Csv,
    /// Compact JSON format.
    Json,
    /// Pretty-printed JSON format.
    PrettyJson,
}

impl ExportFormat {
    /// Get the file extension for this format.
    pub const fn extension(&self) -> &str {
        match self {
            Self::Csv => "csv",
            Self::Json | Self::PrettyJson => "json",
        }
    }
}

/// One row of the per-series describe table, flattened for CSV.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SummaryRow {
    /// Series id.
    pub unique_id: String,
    /// Number of observations.
    pub count: usize,
    /// Mean.
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

impl SummaryRow {
    fn from_summary(summary: &BasisSummary) -> Vec<Self> {
        summary
            .series
            .iter()
            .map(|s| Self {
                unique_id: s.unique_id.clone(),
                count: s.stats.count,
                mean: s.stats.mean,
                std: s.stats.std,
                min: s.stats.min,
                q25: s.stats.q25,
                median: s.stats.median,
                q75: s.stats.q75,
                max: s.stats.max,
            })
            .collect()
    }
}

/// Export the per-series describe table to `path` in the given format.
pub fn export_summary<P: AsRef<Path>>(
    summary: &BasisSummary,
    format: ExportFormat,
    path: P,
) -> Result<()> {
    let rows = SummaryRow::from_summary(summary);
    match format {
        ExportFormat::Csv => {
            let mut writer = csv::Writer::from_path(path.as_ref())?;
            for row in &rows {
                writer.serialize(row)?;
            }
            writer.flush()?;
        }
        ExportFormat::Json => {
            let mut file = File::create(path.as_ref())?;
            file.write_all(serde_json::to_string(&rows)?.as_bytes())?;
        }
        ExportFormat::PrettyJson => {
            let mut file = File::create(path.as_ref())?;
            file.write_all(serde_json::to_string_pretty(&rows)?.as_bytes())?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::summary::summarize;
    use chrono::NaiveDate;
    use polars::prelude::*;

    fn sample_summary() -> BasisSummary {
        let d1 = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        let long = df!(
            "unique_id" => ["IG", "IG", "HY", "HY"],
            "ds" => [d1, d2, d1, d2],
            "y" => [1.0, 2.0, 3.0, 5.0],
        )
        .unwrap();
        summarize(&long).unwrap()
    }

    #[test]
    fn extensions() {
        assert_eq!(ExportFormat::Csv.extension(), "csv");
        assert_eq!(ExportFormat::Json.extension(), "json");
        assert_eq!(ExportFormat::PrettyJson.extension(), "json");
    }

    #[test]
    fn csv_roundtrip() {
        let path = std::env::temp_dir().join(format!(
            "basis-export-{}.csv",
            std::process::id()
        ));
        export_summary(&sample_summary(), ExportFormat::Csv, &path).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let rows: Vec<SummaryRow> = reader.deserialize().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].unique_id, "HY");
        assert_eq!(rows[0].count, 2);

        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn json_has_both_series() {
        let path = std::env::temp_dir().join(format!(
            "basis-export-{}.json",
            std::process::id()
        ));
        export_summary(&sample_summary(), ExportFormat::PrettyJson, &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"IG\""));
        assert!(text.contains("\"HY\""));
        std::fs::remove_file(path).unwrap();
    }
}

//! Interactive HTML chart for the aggregated basis series.
//!
//! Produces a standalone page: series data embedded as JSON, Plotly
//! pulled from its CDN, one line per rating category with a dashed zero
//! reference line.

use crate::error::{OutputError, Result};
use chrono::NaiveDate;
use polars::prelude::*;
use serde::Serialize;
use std::path::Path;

/// Default output file name for the replication chart.
pub const DEFAULT_CHART_FILE: &str = "cds_bond_basis_replication.html";

/// One plotted series.
#[derive(Debug, Clone, Serialize)]
pub struct ChartSeries {
    /// Legend label.
    pub name: String,
    /// Observation dates (ISO-8601).
    pub dates: Vec<NaiveDate>,
    /// Observed values.
    pub values: Vec<f64>,
}

/// A line chart over dated series.
#[derive(Debug, Clone)]
pub struct LineChart {
    title: String,
    x_label: String,
    y_label: String,
    series: Vec<ChartSeries>,
}

impl LineChart {
    /// Build the replication chart from a long-format
    /// `(unique_id, ds, y)` frame, one series per `unique_id`.
    pub fn from_long(long: &DataFrame) -> Result<Self> {
        if long.height() == 0 {
            return Err(OutputError::Empty("chart input".to_string()));
        }

        let sorted = long
            .clone()
            .lazy()
            .drop_nulls(None)
            .sort(["unique_id", "ds"], Default::default())
            .collect()?;

        let mut series = Vec::new();
        for part in sorted.partition_by_stable(["unique_id"], true)? {
            let name = part
                .column("unique_id")?
                .str()?
                .get(0)
                .unwrap_or_default()
                .to_string();
            let dates: Vec<NaiveDate> = part
                .column("ds")?
                .date()?
                .as_date_iter()
                .flatten()
                .collect();
            let values: Vec<f64> = part.column("y")?.f64()?.into_iter().flatten().collect();
            series.push(ChartSeries {
                name,
                dates,
                values,
            });
        }

        Ok(Self {
            title: "CDS-Bond Basis by Rating Category".to_string(),
            x_label: "Date".to_string(),
            y_label: "Implied Risk-Free Rate (%)".to_string(),
            series,
        })
    }

    /// Plotted series.
    pub fn series(&self) -> &[ChartSeries] {
        &self.series
    }

    /// Render the standalone HTML page.
    pub fn to_html(&self) -> Result<String> {
        let traces: Vec<serde_json::Value> = self
            .series
            .iter()
            .map(|s| {
                serde_json::json!({
                    "type": "scatter",
                    "mode": "lines",
                    "name": s.name,
                    "x": s.dates,
                    "y": s.values,
                    "line": {"width": 1.0},
                })
            })
            .collect();

        let layout = serde_json::json!({
            "title": {"text": self.title},
            "template": "plotly_white",
            "hovermode": "x unified",
            "xaxis": {"title": {"text": self.x_label}},
            "yaxis": {"title": {"text": self.y_label}},
            "shapes": [{
                "type": "line",
                "xref": "paper",
                "x0": 0, "x1": 1,
                "y0": 0, "y1": 0,
                "line": {"color": "black", "width": 0.8, "dash": "dash"},
            }],
        });

        let html = format!(
            r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8" />
<title>{title}</title>
<script src="https://cdn.plot.ly/plotly-2.35.2.min.js"></script>
</head>
<body>
<div id="chart" style="width:100%;height:90vh;"></div>
<script>
Plotly.newPlot("chart", {traces}, {layout});
</script>
</body>
</html>
"#,
            title = self.title,
            traces = serde_json::to_string(&traces)?,
            layout = serde_json::to_string(&layout)?,
        );
        Ok(html)
    }

    /// Render and write the chart to `path`, creating parent directories.
    pub fn write_html<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_html()?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn long_panel() -> DataFrame {
        let d1 = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        df!(
            "unique_id" => ["IG", "IG", "HY"],
            "ds" => [d1, d2, d1],
            "y" => [1.5, 2.5, -0.5],
        )
        .unwrap()
    }

    #[test]
    fn builds_one_series_per_rating() {
        let chart = LineChart::from_long(&long_panel()).unwrap();
        assert_eq!(chart.series().len(), 2);

        let ig = chart.series().iter().find(|s| s.name == "IG").unwrap();
        assert_eq!(ig.dates.len(), 2);
        assert_eq!(ig.values, vec![1.5, 2.5]);
    }

    #[test]
    fn html_embeds_series_and_plotly() {
        let chart = LineChart::from_long(&long_panel()).unwrap();
        let html = chart.to_html().unwrap();
        assert!(html.contains("cdn.plot.ly"));
        assert!(html.contains("\"IG\""));
        assert!(html.contains("\"HY\""));
        assert!(html.contains("Implied Risk-Free Rate"));
        assert!(html.contains("2024-01-31"));
    }

    #[test]
    fn empty_chart_is_an_error() {
        let empty = df!(
            "unique_id" => Vec::<String>::new(),
        )
        .unwrap();
        assert!(matches!(
            LineChart::from_long(&empty),
            Err(OutputError::Empty(_))
        ));
    }
}

//! Integration tests for the output stage: FTSFR standardization,
//! summary statistics, export, and chart generation end to end.

use basis_output::{
    ExportFormat, LineChart, export_summary, summarize, to_ftsfr_aggregated, to_ftsfr_bond_level,
};
use chrono::NaiveDate;
use polars::prelude::*;

fn date(month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, month, day).unwrap()
}

/// A small rating-aggregated panel shaped like the basis stage output.
fn aggregated_panel() -> DataFrame {
    df!(
        "c_rating" => ["IG", "HY", "IG", "HY", "IG", "HY"],
        "date" => [date(1, 31), date(1, 31), date(2, 29), date(2, 29), date(3, 29), date(3, 29)],
        "rfr" => [3.1, 5.2, 3.3, 5.6, 3.2, 5.4],
    )
    .unwrap()
}

#[test]
fn aggregated_workflow() {
    let long = to_ftsfr_aggregated(&aggregated_panel()).unwrap();
    assert_eq!(long.get_column_names_str(), vec!["unique_id", "ds", "y"]);
    assert_eq!(long.height(), 6);

    let summary = summarize(&long).unwrap();
    assert_eq!(summary.series.len(), 2);
    assert_eq!(summary.series[0].unique_id, "HY");
    assert_eq!(summary.series[1].unique_id, "IG");
    assert_eq!(summary.date_min, Some(date(1, 31)));
    assert_eq!(summary.date_max, Some(date(3, 29)));
    assert_eq!(summary.quality.missing, 0);
    assert_eq!(summary.quality.out_of_bounds, 0);

    // One IG~HY correlation over the three shared dates.
    assert_eq!(summary.correlations.len(), 1);
    assert_eq!(summary.correlations[0].overlap, 3);

    let text = summary.to_string();
    assert!(text.contains("IG"));
    assert!(text.contains("HY"));
    assert!(text.contains("Date range: 2024-01-31 to 2024-03-29"));
}

#[test]
fn bond_level_workflow() {
    let panel = df!(
        "cusip" => ["037833AA", "037833AA", "594918BB", "594918BB"],
        "date" => [date(1, 31), date(1, 31), date(1, 31), date(2, 29)],
        "rfr" => [3.1, 3.4, 2.9, 3.0],
    )
    .unwrap();

    let (long, removed) = to_ftsfr_bond_level(&panel).unwrap();
    assert_eq!(removed, 1);
    assert_eq!(long.height(), 3);

    let summary = summarize(&long).unwrap();
    assert_eq!(summary.series.len(), 2);
}

#[test]
fn summary_export_and_chart() {
    let long = to_ftsfr_aggregated(&aggregated_panel()).unwrap();
    let summary = summarize(&long).unwrap();

    let dir = std::env::temp_dir();
    let csv_path = dir.join(format!("basis-it-{}.csv", std::process::id()));
    export_summary(&summary, ExportFormat::Csv, &csv_path).unwrap();
    let csv_text = std::fs::read_to_string(&csv_path).unwrap();
    assert!(csv_text.starts_with("unique_id,count,mean,std,min,q25,median,q75,max"));
    std::fs::remove_file(&csv_path).unwrap();

    let chart = LineChart::from_long(&long).unwrap();
    let html = chart.to_html().unwrap();
    assert!(html.contains("plotly"));
    assert!(html.contains("\"IG\""));
    assert!(html.contains("\"HY\""));
    assert!(html.contains("2024-01-31"));
}

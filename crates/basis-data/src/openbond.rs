//! Downloads from Open Source Bond Asset Pricing (openbondassetpricing.com).
//!
//! Two public datasets feed the pipeline: monthly treasury bond returns
//! (plain CSV) and the 2025 corporate bond panel (parquet inside a zip
//! archive). Both land in the [`DataStore`] as parquet.

use crate::error::{DataError, Result};
use crate::store::{self, DataStore};
use polars::prelude::*;
use std::io::{Cursor, Read};

/// Minimum row count a healthy download is expected to have.
pub const MIN_ROWS_EXPECTED: usize = 500;

/// On-the-wire format of a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    /// Plain CSV file.
    Csv,
    /// Zip archive containing a parquet member.
    ZipParquet,
}

/// A downloadable dataset and where it lands in the store.
#[derive(Debug, Clone)]
pub struct DatasetSpec {
    /// Human-readable dataset name.
    pub name: &'static str,
    /// Download URL.
    pub url: &'static str,
    /// Wire format.
    pub source_format: SourceFormat,
    /// Expected parquet member inside a zip archive.
    pub archive_member: Option<&'static str>,
    /// Target parquet file name in the store.
    pub target: &'static str,
    /// Standalone README URL, when the provider publishes one.
    pub readme_url: Option<&'static str>,
    /// README member inside a zip archive.
    pub readme_member: Option<&'static str>,
    /// Target README file name in the store.
    pub readme_target: Option<&'static str>,
}

/// The Open Source Bond datasets used by the basis replication.
pub fn datasets() -> Vec<DatasetSpec> {
    vec![
        DatasetSpec {
            name: "Treasury Bond Returns",
            url: "https://openbondassetpricing.com/wp-content/uploads/2024/06/bondret_treasury.csv",
            source_format: SourceFormat::Csv,
            archive_member: None,
            target: store::TREASURY_BOND_RETURNS,
            readme_url: Some(
                "https://openbondassetpricing.com/wp-content/uploads/2024/06/BNS_README.pdf",
            ),
            readme_member: None,
            readme_target: Some("treasury_bond_returns_README.pdf"),
        },
        DatasetSpec {
            name: "Corporate Bond Returns",
            url: "https://openbondassetpricing.com/wp-content/uploads/2026/01/osbap_main_data_2025_public_beta.zip",
            source_format: SourceFormat::ZipParquet,
            archive_member: Some("main_panel_2025.parquet"),
            target: store::CORPORATE_BOND_RETURNS,
            readme_url: None,
            readme_member: Some("README.txt"),
            readme_target: Some("corporate_bond_returns_README.txt"),
        },
    ]
}

/// HTTP client for Open Source Bond downloads.
#[derive(Debug)]
pub struct OpenBondClient {
    http: reqwest::Client,
}

impl OpenBondClient {
    /// Create a client with a generous timeout; the corporate panel is a
    /// multi-hundred-megabyte archive.
    pub fn new() -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(600))
            .build()?;
        Ok(Self { http })
    }

    /// Download one dataset, validate it, and install it in the store.
    ///
    /// Returns the parsed frame so callers can report row counts.
    pub async fn download_dataset(
        &self,
        spec: &DatasetSpec,
        store: &DataStore,
    ) -> Result<DataFrame> {
        let bytes = self
            .http
            .get(spec.url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;

        let mut df = match spec.source_format {
            SourceFormat::Csv => parse_csv(&bytes)?,
            SourceFormat::ZipParquet => {
                let member = spec.archive_member.ok_or_else(|| DataError::MissingData {
                    dataset: spec.name.to_string(),
                    reason: "zip dataset without an expected archive member".to_string(),
                })?;
                extract_zip_parquet(spec, &bytes, member, store)?
            }
        };

        validate_row_count(spec.name, &df)?;
        store.write_parquet(&mut df, spec.target)?;

        if let (Some(url), Some(target)) = (spec.readme_url, spec.readme_target) {
            let readme = self
                .http
                .get(url)
                .send()
                .await?
                .error_for_status()?
                .bytes()
                .await?;
            store.write_bytes(target, &readme)?;
        }

        Ok(df)
    }
}

/// Parse CSV bytes, letting polars pick up the date column.
fn parse_csv(bytes: &[u8]) -> Result<DataFrame> {
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .map_parse_options(|po| po.with_try_parse_dates(true))
        .into_reader_with_file_handle(Cursor::new(bytes))
        .finish()?;
    Ok(df)
}

/// Pull the expected parquet member (and README, when present) out of a
/// zip archive held in memory.
fn extract_zip_parquet(
    spec: &DatasetSpec,
    bytes: &[u8],
    member: &str,
    store: &DataStore,
) -> Result<DataFrame> {
    let mut archive = ::zip::ZipArchive::new(Cursor::new(bytes))?;

    let names: Vec<String> = archive.file_names().map(str::to_string).collect();
    if !names.iter().any(|n| n == member) {
        return Err(DataError::MissingData {
            dataset: spec.name.to_string(),
            reason: format!(
                "expected {member} not found in archive; available: {}",
                names.join(", ")
            ),
        });
    }

    let mut parquet_bytes = Vec::new();
    archive.by_name(member)?.read_to_end(&mut parquet_bytes)?;
    let df = ParquetReader::new(Cursor::new(parquet_bytes)).finish()?;

    if let (Some(readme), Some(target)) = (spec.readme_member, spec.readme_target) {
        if names.iter().any(|n| n == readme) {
            let mut readme_bytes = Vec::new();
            archive.by_name(readme)?.read_to_end(&mut readme_bytes)?;
            store.write_bytes(target, &readme_bytes)?;
        }
    }

    Ok(df)
}

/// Reject downloads that came back truncated or empty.
fn validate_row_count(name: &str, df: &DataFrame) -> Result<()> {
    if df.height() < MIN_ROWS_EXPECTED {
        return Err(DataError::TooFewRows {
            dataset: name.to_string(),
            expected: MIN_ROWS_EXPECTED,
            actual: df.height(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn temp_store(tag: &str) -> DataStore {
        let dir = std::env::temp_dir().join(format!("basis-openbond-{tag}-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        DataStore::new(dir)
    }

    #[test]
    fn registry_covers_both_panels() {
        let specs = datasets();
        assert_eq!(specs.len(), 2);
        assert!(
            specs
                .iter()
                .any(|s| s.target == store::CORPORATE_BOND_RETURNS
                    && s.source_format == SourceFormat::ZipParquet)
        );
        assert!(
            specs
                .iter()
                .any(|s| s.target == store::TREASURY_BOND_RETURNS
                    && s.source_format == SourceFormat::Csv)
        );
    }

    #[test]
    fn csv_parsing_detects_dates() {
        let csv = b"date,ret\n2024-01-31,0.01\n2024-02-29,-0.02\n";
        let df = parse_csv(csv).unwrap();
        assert_eq!(df.height(), 2);
        assert_eq!(df.column("date").unwrap().dtype(), &DataType::Date);
    }

    #[test]
    fn short_downloads_are_rejected() {
        let df = df!("a" => [1.0, 2.0]).unwrap();
        assert!(matches!(
            validate_row_count("Treasury Bond Returns", &df),
            Err(DataError::TooFewRows { actual: 2, .. })
        ));
    }

    #[test]
    fn zip_extraction_finds_member_and_readme() {
        let store = temp_store("zip");

        // Build a zip holding a parquet member plus a README.
        let mut parquet_bytes = Vec::new();
        let mut df = df!("x" => [1i64, 2, 3]).unwrap();
        ParquetWriter::new(&mut parquet_bytes).finish(&mut df).unwrap();

        let mut zip_bytes = Vec::new();
        {
            let mut writer = ::zip::ZipWriter::new(Cursor::new(&mut zip_bytes));
            let options = ::zip::write::SimpleFileOptions::default();
            writer.start_file("main_panel_2025.parquet", options).unwrap();
            writer.write_all(&parquet_bytes).unwrap();
            writer.start_file("README.txt", options).unwrap();
            writer.write_all(b"panel readme").unwrap();
            writer.finish().unwrap();
        }

        let spec = datasets()
            .into_iter()
            .find(|s| s.source_format == SourceFormat::ZipParquet)
            .unwrap();
        let out = extract_zip_parquet(&spec, &zip_bytes, "main_panel_2025.parquet", &store).unwrap();
        assert_eq!(out.height(), 3);
        assert!(store.exists("corporate_bond_returns_README.txt"));

        let missing = extract_zip_parquet(&spec, &zip_bytes, "nope.parquet", &store);
        assert!(matches!(missing, Err(DataError::MissingData { .. })));

        std::fs::remove_dir_all(store.data_dir()).unwrap();
    }
}

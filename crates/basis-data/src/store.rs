//! Parquet-backed data store.
//!
//! Every pipeline stage reads and writes named parquet files under a
//! single data directory, so intermediate products double as a cache
//! between runs.

use crate::error::{DataError, Result};
use polars::prelude::*;
use std::fs::File;
use std::path::{Path, PathBuf};

/// Markit CDS quotes pulled from WRDS.
pub const MARKIT_CDS: &str = "markit_cds.parquet";
/// RED obligation to ISIN/CUSIP mapping.
pub const RED_ISIN_MAPPING: &str = "RED_and_ISIN_mapping.parquet";
/// Markit RED to CRSP permno link table.
pub const MARKIT_RED_CRSP_LINK: &str = "markit_red_crsp_link.parquet";
/// CDS quotes restricted to entities with a CRSP link.
pub const MARKIT_CDS_SUBSET_CRSP: &str = "markit_cds_subsetted_to_crsp.parquet";
/// Corporate bond panel from Open Source Bond Asset Pricing.
pub const CORPORATE_BOND_RETURNS: &str = "corporate_bond_returns.parquet";
/// Treasury bond returns from Open Source Bond Asset Pricing.
pub const TREASURY_BOND_RETURNS: &str = "treasury_bond_returns.parquet";
/// Bond panel with RED codes attached.
pub const RED_DATA: &str = "Red_Data.parquet";
/// Merged bond/CDS panel with interpolated par spreads.
pub const FINAL_DATA: &str = "final_data.parquet";
/// Long-format dataset aggregated by rating category.
pub const FTSFR_AGGREGATED: &str = "ftsfr_cds_bond_basis_aggregated.parquet";
/// Long-format dataset at the bond level.
pub const FTSFR_NON_AGGREGATED: &str = "ftsfr_cds_bond_basis_non_aggregated.parquet";

/// Parquet store rooted at a data directory.
#[derive(Debug, Clone)]
pub struct DataStore {
    data_dir: PathBuf,
}

impl DataStore {
    /// Create a store rooted at `data_dir`. The directory is created on
    /// first write, not here.
    pub fn new<P: Into<PathBuf>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Root directory of the store.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Absolute path of a named file in the store.
    pub fn path(&self, name: &str) -> PathBuf {
        self.data_dir.join(name)
    }

    /// Whether a named file exists.
    pub fn exists(&self, name: &str) -> bool {
        self.path(name).exists()
    }

    /// Write a frame to a named parquet file, creating the data
    /// directory if needed.
    pub fn write_parquet(&self, df: &mut DataFrame, name: &str) -> Result<()> {
        std::fs::create_dir_all(&self.data_dir)?;
        let file = File::create(self.path(name))?;
        ParquetWriter::new(file).finish(df)?;
        Ok(())
    }

    /// Read a named parquet file into a frame.
    pub fn read_parquet(&self, name: &str) -> Result<DataFrame> {
        let path = self.path(name);
        if !path.exists() {
            return Err(DataError::MissingData {
                dataset: name.to_string(),
                reason: format!("{} does not exist; run the pull tasks first", path.display()),
            });
        }
        let file = File::open(path)?;
        Ok(ParquetReader::new(file).finish()?)
    }

    /// Write raw bytes (e.g. a README) next to the parquet files.
    pub fn write_bytes(&self, name: &str, bytes: &[u8]) -> Result<()> {
        std::fs::create_dir_all(&self.data_dir)?;
        std::fs::write(self.path(name), bytes)?;
        Ok(())
    }

    /// Markit CDS quotes.
    pub fn load_markit_cds(&self) -> Result<DataFrame> {
        self.read_parquet(MARKIT_CDS)
    }

    /// RED obligation mapping.
    pub fn load_red_isin_mapping(&self) -> Result<DataFrame> {
        self.read_parquet(RED_ISIN_MAPPING)
    }

    /// Corporate bond panel.
    pub fn load_corporate_bond_returns(&self) -> Result<DataFrame> {
        self.read_parquet(CORPORATE_BOND_RETURNS)
    }

    /// Treasury bond returns.
    pub fn load_treasury_bond_returns(&self) -> Result<DataFrame> {
        self.read_parquet(TREASURY_BOND_RETURNS)
    }

    /// Merged bond/CDS panel.
    pub fn load_final_data(&self) -> Result<DataFrame> {
        self.read_parquet(FINAL_DATA)
    }

    /// Aggregated FTSFR dataset.
    pub fn load_ftsfr_aggregated(&self) -> Result<DataFrame> {
        self.read_parquet(FTSFR_AGGREGATED)
    }

    /// Bond-level FTSFR dataset.
    pub fn load_ftsfr_non_aggregated(&self) -> Result<DataFrame> {
        self.read_parquet(FTSFR_NON_AGGREGATED)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store(tag: &str) -> DataStore {
        let dir = std::env::temp_dir().join(format!(
            "basis-store-{}-{}",
            tag,
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        DataStore::new(dir)
    }

    #[test]
    fn roundtrip_parquet() {
        let store = temp_store("roundtrip");
        let mut df = df!(
            "cusip" => ["A", "B"],
            "rfr" => [1.5, 2.5],
        )
        .unwrap();

        assert!(!store.exists(FINAL_DATA));
        store.write_parquet(&mut df, FINAL_DATA).unwrap();
        assert!(store.exists(FINAL_DATA));

        let back = store.load_final_data().unwrap();
        assert_eq!(back.height(), 2);
        assert!(back.equals(&df));

        std::fs::remove_dir_all(store.data_dir()).unwrap();
    }

    #[test]
    fn missing_file_is_reported() {
        let store = temp_store("missing");
        let err = store.load_markit_cds().unwrap_err();
        assert!(matches!(err, DataError::MissingData { .. }));
    }
}

//! Pipeline configuration.
//!
//! Settings come from an optional `basis.toml` (working directory first,
//! then the platform config directory) with environment overrides. WRDS
//! credentials are usually supplied through `WRDS_USERNAME` and
//! `WRDS_PASSWORD` rather than the file.

use crate::error::{PipelineError, Result};
use basis_data::wrds::client::{WRDS_DB, WRDS_HOST, WRDS_PORT};
use basis_data::wrds::crsp_link::DEFAULT_NAME_RATIO_THRESHOLD;
use basis_data::wrds::markit::{DEFAULT_END_YEAR, DEFAULT_START_YEAR};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// WRDS connection settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WrdsConfig {
    /// PostgreSQL host.
    pub host: String,
    /// PostgreSQL port.
    pub port: u16,
    /// Database name.
    pub database: String,
    /// Account username.
    pub username: Option<String>,
    /// Account password.
    pub password: Option<String>,
}

impl Default for WrdsConfig {
    fn default() -> Self {
        Self {
            host: WRDS_HOST.to_string(),
            port: WRDS_PORT,
            database: WRDS_DB.to_string(),
            username: None,
            password: None,
        }
    }
}

impl WrdsConfig {
    /// Username and password, or an error naming the missing variable.
    pub fn credentials(&self) -> Result<(&str, &str)> {
        let username = self.username.as_deref().ok_or_else(|| {
            PipelineError::Config("WRDS username not set (WRDS_USERNAME)".to_string())
        })?;
        let password = self.password.as_deref().ok_or_else(|| {
            PipelineError::Config("WRDS password not set (WRDS_PASSWORD)".to_string())
        })?;
        Ok((username, password))
    }
}

/// Top-level pipeline settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Directory for pulled and computed parquet files.
    pub data_dir: PathBuf,
    /// Directory for charts and summary exports.
    pub output_dir: PathBuf,
    /// First Markit CDS year to pull (inclusive).
    pub start_year: i32,
    /// Last Markit CDS year to pull (inclusive).
    pub end_year: i32,
    /// Minimum fuzzy name-match score for the RED-to-CRSP link.
    pub name_ratio_threshold: f64,
    /// WRDS connection settings.
    pub wrds: WrdsConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("_data"),
            output_dir: PathBuf::from("_output"),
            start_year: DEFAULT_START_YEAR,
            end_year: DEFAULT_END_YEAR,
            name_ratio_threshold: DEFAULT_NAME_RATIO_THRESHOLD,
            wrds: WrdsConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Load the configuration: file (if any), then environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = match Self::find_config_file() {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a configuration file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }

    /// `BASIS_CONFIG`, then `./basis.toml`, then the platform config dir.
    fn find_config_file() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("BASIS_CONFIG") {
            return Some(PathBuf::from(path));
        }
        let local = PathBuf::from("basis.toml");
        if local.is_file() {
            return Some(local);
        }
        let global = dirs::config_dir()?.join("basis").join("basis.toml");
        global.is_file().then_some(global)
    }

    /// Apply `BASIS_*`/`WRDS_*` overrides supplied by `get`; every field
    /// has one.
    fn apply_overrides<F>(&mut self, get: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = get("BASIS_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(dir) = get("BASIS_OUTPUT_DIR") {
            self.output_dir = PathBuf::from(dir);
        }
        if let Some(year) = get("BASIS_START_YEAR") {
            self.start_year = parse_override("BASIS_START_YEAR", &year)?;
        }
        if let Some(year) = get("BASIS_END_YEAR") {
            self.end_year = parse_override("BASIS_END_YEAR", &year)?;
        }
        if let Some(ratio) = get("BASIS_NAME_RATIO_THRESHOLD") {
            self.name_ratio_threshold = parse_override("BASIS_NAME_RATIO_THRESHOLD", &ratio)?;
        }
        if let Some(host) = get("WRDS_HOST") {
            self.wrds.host = host;
        }
        if let Some(port) = get("WRDS_PORT") {
            self.wrds.port = parse_override("WRDS_PORT", &port)?;
        }
        if let Some(database) = get("WRDS_DB") {
            self.wrds.database = database;
        }
        if let Some(username) = get("WRDS_USERNAME") {
            self.wrds.username = Some(username);
        }
        if let Some(password) = get("WRDS_PASSWORD") {
            self.wrds.password = Some(password);
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.start_year > self.end_year {
            return Err(PipelineError::Config(format!(
                "start_year {} is after end_year {}",
                self.start_year, self.end_year
            )));
        }
        if !(0.0..=100.0).contains(&self.name_ratio_threshold) {
            return Err(PipelineError::Config(format!(
                "name_ratio_threshold {} must be between 0 and 100",
                self.name_ratio_threshold
            )));
        }
        Ok(())
    }
}

fn parse_override<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| PipelineError::Config(format!("could not parse {key}={value}")))
}

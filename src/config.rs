//! Explicit configuration for an ingestion run.
//!
//! Nothing here is process-wide: the orchestrator and store receive the values
//! they need through their constructors.

use bon::Builder;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_FORECAST_BASE_URL: &str = "https://www.jma.go.jp/bosai/forecast/data/forecast";
pub const DEFAULT_CATALOG_URL: &str = "https://www.jma.go.jp/bosai/common/const/area.json";

/// Where the region hierarchy document is read from.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogSource {
    File(PathBuf),
    Url(String),
}

impl Default for CatalogSource {
    fn default() -> Self {
        CatalogSource::Url(DEFAULT_CATALOG_URL.to_string())
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{0}'")]
    Read(PathBuf, #[source] std::io::Error),

    #[error("Failed to parse config file '{0}'")]
    Parse(PathBuf, #[source] serde_json::Error),
}

/// Settings for [`crate::IngestionOrchestrator`].
///
/// # Examples
///
/// ```
/// use jma_forecast::{CatalogSource, IngestConfig};
///
/// let config = IngestConfig::builder()
///     .catalog(CatalogSource::File("area.json".into()))
///     .database_path("weather.db")
///     .concurrency(8)
///     .build();
/// assert_eq!(config.concurrency, 8);
/// assert_eq!(config.fetch_retries, 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Builder, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IngestConfig {
    /// Prefix of the forecast endpoint; region documents live at `<base>/<code>.json`.
    #[builder(into, default = DEFAULT_FORECAST_BASE_URL.to_string())]
    pub forecast_base_url: String,

    #[builder(default)]
    pub catalog: CatalogSource,

    /// SQLite file. `None` resolves to the platform data directory.
    #[builder(into)]
    pub database_path: Option<PathBuf>,

    /// Maximum number of regions fetched and normalized at once.
    #[builder(default = 4)]
    pub concurrency: usize,

    #[builder(default = 30)]
    pub request_timeout_secs: u64,

    /// Extra fetch attempts per region after the first failure.
    #[builder(default = 1)]
    pub fetch_retries: u32,

    #[builder(default = 500)]
    pub retry_backoff_ms: u64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl IngestConfig {
    /// Reads a JSON config file. Missing fields take their defaults, unknown
    /// fields are rejected.
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let text =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Read(path.to_path_buf(), e))?;
        serde_json::from_str(&text).map_err(|e| ConfigError::Parse(path.to_path_buf(), e))
    }

    pub fn worker_limit(&self) -> usize {
        self.concurrency.max(1)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = IngestConfig::default();
        assert_eq!(config.forecast_base_url, DEFAULT_FORECAST_BASE_URL);
        assert_eq!(config.catalog, CatalogSource::Url(DEFAULT_CATALOG_URL.into()));
        assert_eq!(config.database_path, None);
        assert_eq!(config.worker_limit(), 4);
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_zero_concurrency_still_runs_one_worker() {
        let config = IngestConfig::builder().concurrency(0).build();
        assert_eq!(config.worker_limit(), 1);
    }

    #[test]
    fn test_from_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "catalog": {{ "file": "area.json" }}, "database_path": "w.db", "concurrency": 2 }}"#
        )
        .unwrap();
        let config = IngestConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.catalog, CatalogSource::File("area.json".into()));
        assert_eq!(config.database_path, Some(PathBuf::from("w.db")));
        assert_eq!(config.concurrency, 2);
        assert_eq!(config.fetch_retries, 1);
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "db_file": "w.db" }}"#).unwrap();
        let err = IngestConfig::from_json_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(..)));
    }
}

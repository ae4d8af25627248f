use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogLoadError {
    #[error("Failed to read region catalog '{0}'")]
    FileRead(PathBuf, #[source] std::io::Error),

    #[error("Network request failed for {0}")]
    NetworkRequest(String, #[source] reqwest::Error),

    #[error("HTTP request failed for {url} with status {status}")]
    HttpStatus {
        url: String,
        status: reqwest::StatusCode,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to parse region catalog JSON")]
    JsonParse(#[from] serde_json::Error),

    #[error("Region catalog is not a JSON object")]
    NotAnObject,

    #[error("Region catalog has no '{0}' grouping")]
    MissingGrouping(&'static str),

    #[error("Center '{center}' in region catalog is malformed")]
    InvalidCenter {
        center: String,
        #[source]
        source: serde_json::Error,
    },
}

use crate::types::region_code::RegionCode;
use thiserror::Error;

/// Transport-level reasons a forecast fetch can fail.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Network request failed for {0}")]
    NetworkRequest(String, #[source] reqwest::Error),

    #[error("HTTP request failed for {url} with status {status}")]
    HttpStatus {
        url: String,
        status: reqwest::StatusCode,
        #[source]
        source: reqwest::Error,
    },

    #[error("Response body from {0} is not valid JSON")]
    BodyDecode(String, #[source] reqwest::Error),

    #[error("Failed to build HTTP client")]
    ClientBuild(#[source] reqwest::Error),
}

impl FetchError {
    /// HTTP status of the failed response, if the server answered at all.
    pub fn status(&self) -> Option<reqwest::StatusCode> {
        match self {
            FetchError::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// A failed fetch for one region. Returned instead of raised so the
/// orchestrator can carry on with the remaining regions.
#[derive(Debug, Error)]
#[error("Failed to fetch forecast for region {region_code}")]
pub struct FetchFailure {
    pub region_code: RegionCode,
    #[source]
    pub source: FetchError,
}

impl FetchFailure {
    pub fn new(region_code: RegionCode, source: FetchError) -> Self {
        Self {
            region_code,
            source,
        }
    }
}

/// The forecast document as a whole does not have the expected outer shape.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NormalizationError {
    #[error("Forecast document for region {0} is not a JSON array")]
    NotAnArray(RegionCode),

    #[error("Forecast document for region {0} contains no editions")]
    EmptyDocument(RegionCode),
}

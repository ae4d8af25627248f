use crate::forecast_data::error::FetchError;
use crate::regions::error::CatalogLoadError;
use crate::store::error::StoreError;
use crate::types::region_code::RegionCode;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that end an ingestion run. Per-region problems are reported through
/// [`crate::FailureReason`] instead.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Catalog(#[from] CatalogLoadError),

    #[error("Failed to open forecast store")]
    StoreOpen(#[source] StoreError),

    #[error("Failed to rebuild forecast schema")]
    SchemaRebuild(#[source] StoreError),

    #[error("Lost the forecast store connection while persisting region {region_code}")]
    StoreConnectionLost {
        region_code: RegionCode,
        #[source]
        source: StoreError,
    },

    #[error("Failed to determine data directory")]
    DataDirResolution,

    #[error("Failed to create data directory '{0}'")]
    DataDirCreation(PathBuf, #[source] std::io::Error),

    #[error("Failed to build HTTP client")]
    HttpClient(#[source] FetchError),

    #[error("Background store task failed")]
    TaskJoin(#[source] tokio::task::JoinError),
}

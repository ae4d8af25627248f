mod config;
mod error;
mod forecast_data;
mod orchestrator;
mod regions;
mod store;
mod types;
mod utils;

pub use config::*;
pub use error::IngestError;
pub use orchestrator::IngestionOrchestrator;

pub use regions::error::CatalogLoadError;
pub use regions::region_catalog::{load_region_codes, Center, RegionCatalog};

pub use forecast_data::error::{FetchError, FetchFailure, NormalizationError};
pub use forecast_data::fetcher::{build_client, ForecastSource, HttpForecastFetcher};
pub use forecast_data::normalizer::{normalize, normalize_forecast_date};

pub use store::error::StoreError;
pub use store::forecast_store::{ForecastStore, RecordCounts};

pub use types::raw_forecast::{AreaPayload, AreaRef, BlockKind, RawForecastDocument, TimeSeriesBlock};
pub use types::records::{ConditionRecord, ForecastRow, NormalizedForecast, TemperatureRecord};
pub use types::region_code::RegionCode;
pub use types::run_summary::{FailureReason, IngestState, RegionOutcome, RegionSuccess, RunSummary};

pub use utils::{error_chain, resolve_database_path};

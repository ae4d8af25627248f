//! Runs one full ingestion pass: catalog, schema rebuild, then every region.
//!
//! Regions are fetched and normalized concurrently, up to
//! [`IngestConfig::worker_limit`] at a time. Persistence happens in the loop
//! that drains those results, so the store only ever sees one writer and each
//! region's records land in a single transaction. Per-region problems are
//! collected into the [`RunSummary`]; only catalog, schema and lost-connection
//! errors end the run.

use crate::config::IngestConfig;
use crate::error::IngestError;
use crate::forecast_data::error::{FetchError, FetchFailure};
use crate::forecast_data::fetcher::{build_client, ForecastSource, HttpForecastFetcher};
use crate::forecast_data::normalizer::normalize;
use crate::regions::region_catalog::RegionCatalog;
use crate::store::forecast_store::ForecastStore;
use crate::types::raw_forecast::RawForecastDocument;
use crate::types::records::NormalizedForecast;
use crate::types::region_code::RegionCode;
use crate::types::run_summary::{
    FailureReason, IngestState, RegionOutcome, RegionSuccess, RunSummary,
};
use crate::utils::{error_chain, resolve_database_path};
use chrono::Utc;
use futures_util::stream::{self, StreamExt};
use log::{debug, error, info, warn};
use reqwest::Client;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Drives the ingestion state machine.
///
/// # Examples
///
/// ```no_run
/// # use jma_forecast::{IngestConfig, IngestError, IngestionOrchestrator};
/// # use tokio_util::sync::CancellationToken;
/// # async fn run() -> Result<(), IngestError> {
/// let config = IngestConfig::builder().database_path("weather.db").build();
/// let mut orchestrator = IngestionOrchestrator::new(config)?;
/// let summary = orchestrator.run(CancellationToken::new()).await?;
/// println!("{summary}");
/// # Ok(())
/// # }
/// ```
pub struct IngestionOrchestrator<S = HttpForecastFetcher> {
    config: IngestConfig,
    source: S,
    catalog_client: Client,
    state: IngestState,
}

impl IngestionOrchestrator<HttpForecastFetcher> {
    /// Orchestrator fetching forecasts over HTTP from `config.forecast_base_url`.
    pub fn new(config: IngestConfig) -> Result<Self, IngestError> {
        let fetcher = HttpForecastFetcher::new(&config).map_err(IngestError::HttpClient)?;
        let catalog_client = fetcher.client().clone();
        Ok(Self::assemble(config, fetcher, catalog_client))
    }
}

impl<S: ForecastSource> IngestionOrchestrator<S> {
    /// Orchestrator reading forecasts from any [`ForecastSource`].
    pub fn with_source(config: IngestConfig, source: S) -> Result<Self, IngestError> {
        let catalog_client = build_client(&config).map_err(IngestError::HttpClient)?;
        Ok(Self::assemble(config, source, catalog_client))
    }

    fn assemble(config: IngestConfig, source: S, catalog_client: Client) -> Self {
        Self {
            config,
            source,
            catalog_client,
            state: IngestState::Idle,
        }
    }

    pub fn state(&self) -> IngestState {
        self.state
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Runs one ingestion pass to completion against the configured database.
    ///
    /// Cancelling `cancel` stops in-flight fetches; the regions they belonged
    /// to, and any not started yet, are reported as [`FailureReason::Cancelled`].
    pub async fn run(&mut self, cancel: CancellationToken) -> Result<RunSummary, IngestError> {
        self.run_against(None, cancel).await
    }

    /// Like [`IngestionOrchestrator::run`], writing into an already open store
    /// instead of `config.database_path`.
    pub async fn run_with_store(
        &mut self,
        store: Arc<ForecastStore>,
        cancel: CancellationToken,
    ) -> Result<RunSummary, IngestError> {
        self.run_against(Some(store), cancel).await
    }

    async fn run_against(
        &mut self,
        store: Option<Arc<ForecastStore>>,
        cancel: CancellationToken,
    ) -> Result<RunSummary, IngestError> {
        self.state = IngestState::Idle;
        let result = self.run_to_completion(store, &cancel).await;
        if let Err(e) = &result {
            error!("Ingestion run failed in state {}: {}", self.state, error_chain(e));
            self.transition(IngestState::Failed);
        }
        result
    }

    async fn run_to_completion(
        &mut self,
        store: Option<Arc<ForecastStore>>,
        cancel: &CancellationToken,
    ) -> Result<RunSummary, IngestError> {
        let started_at = Utc::now();

        let catalog = RegionCatalog::load(&self.config.catalog, &self.catalog_client).await?;
        let region_codes = catalog.region_codes();
        self.transition(IngestState::CatalogLoaded);

        let store = match store {
            Some(store) => store,
            None => Arc::new(self.open_store().await?),
        };

        let rebuild = Arc::clone(&store);
        tokio::task::spawn_blocking(move || rebuild.rebuild_schema())
            .await
            .map_err(IngestError::TaskJoin)?
            .map_err(IngestError::SchemaRebuild)?;
        self.transition(IngestState::SchemaRebuilt);

        self.transition(IngestState::Ingesting);
        let outcomes = self.ingest_regions(&region_codes, &store, cancel).await?;

        let summary = RunSummary {
            started_at,
            finished_at: Utc::now(),
            outcomes,
        };
        self.transition(IngestState::Completed);
        info!("Ingestion finished: {summary}");
        Ok(summary)
    }

    async fn ingest_regions(
        &self,
        region_codes: &[RegionCode],
        store: &Arc<ForecastStore>,
        cancel: &CancellationToken,
    ) -> Result<Vec<RegionOutcome>, IngestError> {
        let limit = self.config.worker_limit();
        info!(
            "Ingesting {} regions with up to {} concurrent fetches",
            region_codes.len(),
            limit
        );

        let mut prepared = stream::iter(region_codes.iter().enumerate())
            .map(|(index, region_code)| async move {
                let result = self.prepare_region(region_code, cancel).await;
                (index, region_code, result)
            })
            .buffer_unordered(limit);

        let mut outcomes = Vec::with_capacity(region_codes.len());
        while let Some((index, region_code, result)) = prepared.next().await {
            let result = match result {
                Ok(_) if cancel.is_cancelled() => Err(FailureReason::Cancelled),
                Ok(records) => persist_region(store, region_code, records).await?,
                Err(reason) => Err(reason),
            };
            match &result {
                Ok(success) => info!(
                    "Region {}: stored {} condition and {} temperature records",
                    region_code, success.conditions, success.temperatures
                ),
                Err(reason) => warn!("Region {} failed: {}", region_code, error_chain(reason)),
            }
            outcomes.push(RegionOutcome {
                index,
                region_code: region_code.clone(),
                result,
            });
        }

        outcomes.sort_by_key(|outcome| outcome.index);
        Ok(outcomes)
    }

    async fn open_store(&self) -> Result<ForecastStore, IngestError> {
        let database_path = resolve_database_path(&self.config).await?;
        tokio::task::spawn_blocking(move || ForecastStore::open(&database_path))
            .await
            .map_err(IngestError::TaskJoin)?
            .map_err(IngestError::StoreOpen)
    }

    /// Fetch and normalize, giving up as soon as the run is cancelled.
    async fn prepare_region(
        &self,
        region_code: &RegionCode,
        cancel: &CancellationToken,
    ) -> Result<NormalizedForecast, FailureReason> {
        let document = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(FailureReason::Cancelled),
            fetched = self.fetch_with_retry(region_code) => fetched?,
        };
        Ok(normalize(region_code, &document)?)
    }

    /// Retries transport errors and 5xx responses; other statuses and
    /// undecodable bodies fail at once.
    async fn fetch_with_retry(
        &self,
        region_code: &RegionCode,
    ) -> Result<RawForecastDocument, FetchFailure> {
        let mut attempt = 0;
        loop {
            match self.source.fetch(region_code).await {
                Ok(document) => return Ok(document),
                Err(failure) if attempt < self.config.fetch_retries && is_retryable(&failure) => {
                    attempt += 1;
                    debug!(
                        "Retrying region {} ({}/{}) after: {}",
                        region_code,
                        attempt,
                        self.config.fetch_retries,
                        error_chain(&failure)
                    );
                    tokio::time::sleep(self.config.retry_backoff()).await;
                }
                Err(failure) => return Err(failure),
            }
        }
    }

    fn transition(&mut self, next: IngestState) {
        info!("Ingestion state {} -> {}", self.state, next);
        self.state = next;
    }
}

fn is_retryable(failure: &FetchFailure) -> bool {
    match &failure.source {
        FetchError::NetworkRequest(..) => true,
        FetchError::HttpStatus { status, .. } => status.is_server_error(),
        FetchError::BodyDecode(..) | FetchError::ClientBuild(_) => false,
    }
}

/// Writes one region on the blocking pool. A lost connection is fatal, any
/// other store error only fails this region.
async fn persist_region(
    store: &Arc<ForecastStore>,
    region_code: &RegionCode,
    records: NormalizedForecast,
) -> Result<Result<RegionSuccess, FailureReason>, IngestError> {
    let success = RegionSuccess {
        conditions: records.conditions.len(),
        temperatures: records.temperatures.len(),
    };
    let store = Arc::clone(store);
    let written = tokio::task::spawn_blocking(move || store.persist_region(&records))
        .await
        .map_err(IngestError::TaskJoin)?;
    match written {
        Ok(_) => Ok(Ok(success)),
        Err(e) if e.is_connection_lost() => Err(IngestError::StoreConnectionLost {
            region_code: region_code.clone(),
            source: e,
        }),
        Err(e) => Ok(Err(FailureReason::Persist(e))),
    }
}

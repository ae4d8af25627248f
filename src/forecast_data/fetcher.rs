use crate::config::IngestConfig;
use crate::forecast_data::error::{FetchError, FetchFailure};
use crate::types::raw_forecast::RawForecastDocument;
use crate::types::region_code::RegionCode;
use log::{debug, warn};
use reqwest::Client;
use serde_json::Value;
use std::future::Future;

/// Anything that can produce the raw forecast document for a region.
///
/// Failures come back as values so one region never takes the run down.
pub trait ForecastSource {
    fn fetch(
        &self,
        region_code: &RegionCode,
    ) -> impl Future<Output = Result<RawForecastDocument, FetchFailure>> + Send;
}

/// HTTP client with the configured request timeout and the crate's user agent.
pub fn build_client(config: &IngestConfig) -> Result<Client, FetchError> {
    Client::builder()
        .timeout(config.request_timeout())
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(FetchError::ClientBuild)
}

/// Fetches `<base_url>/<region_code>.json` over HTTP. One request per call, no retries.
#[derive(Debug, Clone)]
pub struct HttpForecastFetcher {
    client: Client,
    base_url: String,
}

impl HttpForecastFetcher {
    /// Builds a fetcher with its own client, honoring the configured timeout.
    pub fn new(config: &IngestConfig) -> Result<Self, FetchError> {
        let client = build_client(config)?;
        Ok(Self::with_client(client, &config.forecast_base_url))
    }

    pub fn with_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn url_for(&self, region_code: &RegionCode) -> String {
        format!("{}/{}.json", self.base_url, region_code)
    }

    async fn download(&self, url: String) -> Result<Value, FetchError> {
        debug!("Downloading forecast from {}", url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| FetchError::NetworkRequest(url.clone(), e))?;

        let response = match response.error_for_status() {
            Ok(resp) => resp,
            Err(e) => {
                return Err(match e.status() {
                    Some(status) => FetchError::HttpStatus {
                        url,
                        status,
                        source: e,
                    },
                    None => FetchError::NetworkRequest(url, e),
                });
            }
        };

        response.json::<Value>().await.map_err(|e| {
            if e.is_decode() {
                FetchError::BodyDecode(url, e)
            } else {
                FetchError::NetworkRequest(url, e)
            }
        })
    }
}

impl ForecastSource for HttpForecastFetcher {
    async fn fetch(&self, region_code: &RegionCode) -> Result<RawForecastDocument, FetchFailure> {
        match self.download(self.url_for(region_code)).await {
            Ok(value) => {
                debug!("Fetched forecast for region {}", region_code);
                Ok(RawForecastDocument::new(value))
            }
            Err(e) => {
                warn!("Forecast fetch failed for region {}: {}", region_code, e);
                Err(FetchFailure::new(region_code.clone(), e))
            }
        }
    }
}

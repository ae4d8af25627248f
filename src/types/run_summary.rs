//! Orchestrator state machine and the per-run report.

use crate::forecast_data::error::{FetchFailure, NormalizationError};
use crate::store::error::StoreError;
use crate::types::region_code::RegionCode;
use crate::utils::error_chain;
use chrono::{DateTime, Utc};
use std::fmt;
use thiserror::Error;

/// Where an [`crate::IngestionOrchestrator`] is in its run.
///
/// `Idle → CatalogLoaded → SchemaRebuilt → Ingesting → Completed`, or `Failed`
/// from any of them on a fatal error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IngestState {
    Idle,
    CatalogLoaded,
    SchemaRebuilt,
    Ingesting,
    Completed,
    Failed,
}

impl fmt::Display for IngestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IngestState::Idle => "idle",
            IngestState::CatalogLoaded => "catalog-loaded",
            IngestState::SchemaRebuilt => "schema-rebuilt",
            IngestState::Ingesting => "ingesting",
            IngestState::Completed => "completed",
            IngestState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Why a single region did not make it into the store. Never fatal to the run.
#[derive(Debug, Error)]
pub enum FailureReason {
    #[error(transparent)]
    Fetch(#[from] FetchFailure),

    #[error(transparent)]
    Normalization(#[from] NormalizationError),

    #[error("Failed to persist records")]
    Persist(#[source] StoreError),

    #[error("Run was cancelled before the region finished")]
    Cancelled,
}

/// Records written for one region.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegionSuccess {
    pub conditions: usize,
    pub temperatures: usize,
}

impl RegionSuccess {
    pub fn records(&self) -> usize {
        self.conditions + self.temperatures
    }
}

/// Result of one catalog entry. `index` is the entry's position in the catalog,
/// so duplicated region codes stay distinguishable.
#[derive(Debug)]
pub struct RegionOutcome {
    pub index: usize,
    pub region_code: RegionCode,
    pub result: Result<RegionSuccess, FailureReason>,
}

/// Final report of one ingestion pass, with outcomes in catalog order.
#[derive(Debug)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcomes: Vec<RegionOutcome>,
}

impl RunSummary {
    pub fn attempted(&self) -> usize {
        self.outcomes.len()
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.attempted() - self.succeeded()
    }

    pub fn failures(&self) -> impl Iterator<Item = (&RegionCode, &FailureReason)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|reason| (&o.region_code, reason)))
    }

    pub fn records_written(&self) -> usize {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok())
            .map(RegionSuccess::records)
            .sum()
    }

    pub fn is_clean(&self) -> bool {
        self.failed() == 0
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let elapsed = self.finished_at - self.started_at;
        write!(
            f,
            "{} regions attempted, {} succeeded, {} failed, {} records written in {:.1}s",
            self.attempted(),
            self.succeeded(),
            self.failed(),
            self.records_written(),
            elapsed.num_milliseconds() as f64 / 1000.0
        )?;
        for (region_code, reason) in self.failures() {
            write!(f, "\n  {region_code}: {}", error_chain(reason))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(index: usize, code: &str, result: Result<RegionSuccess, FailureReason>) -> RegionOutcome {
        RegionOutcome {
            index,
            region_code: code.into(),
            result,
        }
    }

    fn summary() -> RunSummary {
        let now = Utc::now();
        RunSummary {
            started_at: now,
            finished_at: now,
            outcomes: vec![
                outcome(
                    0,
                    "011000",
                    Ok(RegionSuccess {
                        conditions: 3,
                        temperatures: 7,
                    }),
                ),
                outcome(
                    1,
                    "130000",
                    Err(NormalizationError::EmptyDocument("130000".into()).into()),
                ),
                outcome(2, "471000", Err(FailureReason::Cancelled)),
                outcome(
                    3,
                    "080000",
                    Ok(RegionSuccess {
                        conditions: 2,
                        temperatures: 0,
                    }),
                ),
            ],
        }
    }

    #[test]
    fn test_counts() {
        let summary = summary();
        assert_eq!(summary.attempted(), 4);
        assert_eq!(summary.succeeded(), 2);
        assert_eq!(summary.failed(), 2);
        assert_eq!(summary.records_written(), 12);
        assert!(!summary.is_clean());
        let failed: Vec<_> = summary.failures().map(|(code, _)| code.as_str()).collect();
        assert_eq!(failed, ["130000", "471000"]);
    }

    #[test]
    fn test_display_lists_failures() {
        let text = summary().to_string();
        assert!(text.starts_with("4 regions attempted, 2 succeeded, 2 failed, 12 records written"));
        assert!(text.contains("130000: Forecast document for region 130000 contains no editions"));
        assert!(text.contains("471000: Run was cancelled"));
    }

    #[test]
    fn test_state_names() {
        assert_eq!(IngestState::SchemaRebuilt.to_string(), "schema-rebuilt");
        assert_eq!(IngestState::Failed.to_string(), "failed");
    }
}

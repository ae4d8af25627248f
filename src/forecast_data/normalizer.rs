//! Turns one region's raw forecast document into condition and temperature records.
//!
//! Every block of every edition is parsed on its own and classified by
//! [`BlockKind::classify`]; the two extraction passes below only ever see blocks
//! of a known shape. Per-index data that is missing or malformed is skipped (for
//! condition codes) or recorded as absent (for temperatures). The only hard
//! failure is a document that isn't a non-empty array of editions.

use crate::forecast_data::error::NormalizationError;
use crate::types::raw_forecast::{BlockKind, RawForecastDocument, TimeSeriesBlock};
use crate::types::records::{ConditionRecord, NormalizedForecast, TemperatureRecord};
use crate::types::region_code::RegionCode;
use chrono::{DateTime, NaiveDate};
use log::debug;
use serde_json::Value;

const TIME_SERIES_KEY: &str = "timeSeries";

/// Extracts both record sets for `region_code`.
///
/// Output order follows (edition, block, area, date index); nothing is sorted.
///
/// # Examples
///
/// ```
/// use jma_forecast::{normalize, RawForecastDocument};
/// use serde_json::json;
///
/// let doc = RawForecastDocument::new(json!([{ "timeSeries": [{
///     "timeDefines": ["2024-01-01", "2024-01-02"],
///     "areas": [{ "area": { "code": "130000" }, "weatherCodes": ["100", "200"] }]
/// }]}]));
/// let records = normalize(&"130000".into(), &doc).unwrap();
/// assert_eq!(records.conditions.len(), 2);
/// assert!(records.temperatures.is_empty());
/// ```
pub fn normalize(
    region_code: &RegionCode,
    document: &RawForecastDocument,
) -> Result<NormalizedForecast, NormalizationError> {
    let Value::Array(editions) = document.as_value() else {
        return Err(NormalizationError::NotAnArray(region_code.clone()));
    };
    if editions.is_empty() {
        return Err(NormalizationError::EmptyDocument(region_code.clone()));
    }

    let mut normalized = NormalizedForecast::default();
    for (edition_idx, edition) in editions.iter().enumerate() {
        let Some(blocks) = edition.get(TIME_SERIES_KEY).and_then(Value::as_array) else {
            debug!(
                "Region {}: edition {} has no timeSeries array",
                region_code, edition_idx
            );
            continue;
        };
        for (block_idx, raw_block) in blocks.iter().enumerate() {
            let Some(block) = TimeSeriesBlock::from_value(raw_block) else {
                debug!(
                    "Region {}: skipping malformed block {}/{}",
                    region_code, edition_idx, block_idx
                );
                continue;
            };
            let kind = BlockKind::classify(&block);
            if kind.carries_conditions() {
                extract_conditions(region_code, &block, &mut normalized.conditions);
            }
            if kind.is_weekly() {
                extract_temperatures(region_code, &block, &mut normalized.temperatures);
            }
        }
    }
    Ok(normalized)
}

/// One record per populated weather code of each area whose code is `region_code`.
fn extract_conditions(
    region_code: &RegionCode,
    block: &TimeSeriesBlock,
    out: &mut Vec<ConditionRecord>,
) {
    let matching = block
        .areas
        .iter()
        .filter(|area| area.area.code.as_deref() == Some(region_code.as_str()));
    for area in matching {
        let Some(codes) = &area.weather_codes else {
            continue;
        };
        for (date, code) in block.time_defines.iter().zip(codes) {
            let Some(date) = date else {
                continue;
            };
            if let Some(weather_code) = weather_code_from(code) {
                out.push(ConditionRecord {
                    region_code: region_code.clone(),
                    forecast_date: normalize_forecast_date(date),
                    weather_code,
                });
            }
        }
    }
}

/// One record per (area, date) of a weekly block, absent values included.
/// Indices without a usable date are skipped.
fn extract_temperatures(
    region_code: &RegionCode,
    block: &TimeSeriesBlock,
    out: &mut Vec<TemperatureRecord>,
) {
    for area in &block.areas {
        for (idx, date) in block.time_defines.iter().enumerate() {
            let Some(date) = date else {
                continue;
            };
            out.push(TemperatureRecord {
                region_code: region_code.clone(),
                forecast_date: normalize_forecast_date(date),
                temp_min: temperature_at(area.temps_min.as_deref(), idx),
                temp_max: temperature_at(area.temps_max.as_deref(), idx),
            });
        }
    }
}

fn weather_code_from(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Parses the temperature at `idx`; empty strings and sentinels come back as `None`.
fn temperature_at(values: Option<&[Value]>, idx: usize) -> Option<f64> {
    let parsed = match values?.get(idx)? {
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Number(n) => n.as_f64(),
        _ => None,
    };
    parsed.filter(|t| t.is_finite())
}

/// Reduces an upstream `timeDefines` entry to the calendar date it names.
///
/// RFC 3339 timestamps keep the date in their own offset, so
/// `2024-01-01T00:00:00+09:00` is `2024-01-01`. Plain dates pass through and
/// anything unrecognized is kept verbatim.
pub fn normalize_forecast_date(raw: &str) -> String {
    let raw = raw.trim();
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(raw) {
        return timestamp.date_naive().to_string();
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.to_string();
    }
    raw.to_string()
}

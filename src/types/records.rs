//! Normalized record types written to and read back from the forecast store.

use crate::types::region_code::RegionCode;
use serde::Serialize;

/// A weather-condition code for one region and date.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ConditionRecord {
    pub region_code: RegionCode,
    pub forecast_date: String,
    pub weather_code: String,
}

/// Min/max temperature pair for one region and date. Either side may be absent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemperatureRecord {
    pub region_code: RegionCode,
    pub forecast_date: String,
    pub temp_min: Option<f64>,
    pub temp_max: Option<f64>,
}

/// Both record sets extracted from one region's forecast document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedForecast {
    pub conditions: Vec<ConditionRecord>,
    pub temperatures: Vec<TemperatureRecord>,
}

impl NormalizedForecast {
    pub fn len(&self) -> usize {
        self.conditions.len() + self.temperatures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty() && self.temperatures.is_empty()
    }
}

/// One row of the joined read path: everything known about a region on a date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastRow {
    pub forecast_date: String,
    pub weather_code: Option<String>,
    pub temp_min: Option<f64>,
    pub temp_max: Option<f64>,
}

//! Shape of the per-region forecast document returned by the upstream service,
//! and the classifier that decides which extraction passes a block feeds.
//!
//! The document is an array of *editions* (near-term, extended). Each edition
//! holds a `timeSeries` array of blocks, each block a `timeDefines` date list and
//! an `areas` list whose arrays are aligned by index to `timeDefines`:
//!
//! ```json
//! [{ "timeSeries": [{
//!     "timeDefines": ["2024-01-01T00:00:00+09:00", "2024-01-02T00:00:00+09:00"],
//!     "areas": [{ "area": { "name": "東京地方", "code": "130010" },
//!                 "weatherCodes": ["100", "200"] }]
//! }]}]
//! ```

use serde_json::Value;

/// The unparsed forecast response for one region.
///
/// Kept as a [`serde_json::Value`] because editions and blocks vary in shape
/// between regions and horizons; blocks are parsed individually by the
/// normalizer so one malformed block never spoils the rest of the document.
#[derive(Debug, Clone, PartialEq)]
pub struct RawForecastDocument(Value);

impl RawForecastDocument {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }
}

impl From<Value> for RawForecastDocument {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// One `timeSeries` entry within an edition.
///
/// Read field by field rather than in one pass, so a bad element only costs
/// itself: a `timeDefines` entry that isn't a string stays as a `None`
/// placeholder (later indices keep their alignment) and each area is read on
/// its own.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeSeriesBlock {
    pub time_defines: Vec<Option<String>>,
    pub areas: Vec<AreaPayload>,
}

impl TimeSeriesBlock {
    /// Parses a block out of a raw JSON value, `None` unless it is an object
    /// with `timeDefines` and `areas` arrays.
    pub fn from_value(value: &Value) -> Option<Self> {
        let time_defines = value.get("timeDefines")?.as_array()?;
        let areas = value.get("areas")?.as_array()?;
        Some(Self {
            time_defines: time_defines
                .iter()
                .map(|date| date.as_str().map(str::to_string))
                .collect(),
            areas: areas.iter().map(AreaPayload::from_value).collect(),
        })
    }
}

/// An area-scoped payload inside a block. Every array is aligned by index to
/// the block's `timeDefines` and may be shorter than it.
///
/// Elements stay untyped: upstream mixes strings, numbers, empty strings and
/// `null`, and each element is coerced individually.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AreaPayload {
    pub area: AreaRef,
    pub weather_codes: Option<Vec<Value>>,
    pub temps_min: Option<Vec<Value>>,
    pub temps_max: Option<Vec<Value>>,
}

impl AreaPayload {
    /// Reads one area. A field of the wrong type counts as absent.
    pub fn from_value(value: &Value) -> Self {
        let array = |key: &str| value.get(key).and_then(Value::as_array).cloned();
        Self {
            area: value.get("area").map(AreaRef::from_value).unwrap_or_default(),
            weather_codes: array("weatherCodes"),
            temps_min: array("tempsMin"),
            temps_max: array("tempsMax"),
        }
    }

    pub fn carries_temperatures(&self) -> bool {
        self.temps_min.is_some() || self.temps_max.is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AreaRef {
    pub name: Option<String>,
    pub code: Option<String>,
}

impl AreaRef {
    pub fn from_value(value: &Value) -> Self {
        let text = |key: &str| value.get(key).and_then(Value::as_str).map(str::to_string);
        Self {
            name: text("name"),
            code: text("code"),
        }
    }
}

/// What a block can contribute to normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockKind {
    /// At least one area payload carries `weatherCodes`.
    Condition,
    /// The first area payload carries `tempsMin` or `tempsMax`.
    Weekly,
    /// Both signals are present; the block feeds both passes.
    ConditionAndWeekly,
    /// Neither signal.
    Unknown,
}

impl BlockKind {
    /// Classifies a parsed block by its structural signals.
    ///
    /// # Examples
    ///
    /// ```
    /// use jma_forecast::{BlockKind, TimeSeriesBlock};
    /// use serde_json::json;
    ///
    /// let weekly = TimeSeriesBlock::from_value(&json!({
    ///     "timeDefines": ["2024-01-01"],
    ///     "areas": [{ "area": { "code": "44132" }, "tempsMin": ["5"], "tempsMax": [""] }]
    /// })).unwrap();
    /// assert_eq!(BlockKind::classify(&weekly), BlockKind::Weekly);
    /// ```
    pub fn classify(block: &TimeSeriesBlock) -> Self {
        let conditions = block.areas.iter().any(|area| area.weather_codes.is_some());
        let weekly = block
            .areas
            .first()
            .is_some_and(AreaPayload::carries_temperatures);
        match (conditions, weekly) {
            (true, true) => BlockKind::ConditionAndWeekly,
            (true, false) => BlockKind::Condition,
            (false, true) => BlockKind::Weekly,
            (false, false) => BlockKind::Unknown,
        }
    }

    pub fn carries_conditions(self) -> bool {
        matches!(self, BlockKind::Condition | BlockKind::ConditionAndWeekly)
    }

    pub fn is_weekly(self) -> bool {
        matches!(self, BlockKind::Weekly | BlockKind::ConditionAndWeekly)
    }
}

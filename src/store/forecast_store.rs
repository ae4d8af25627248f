//! SQLite-backed forecast tables.
//!
//! Two tables keyed by the natural pair (area code, forecast date), each with a
//! surrogate id and no uniqueness constraint:
//!
//! - `weather_forecast (id, area_code, forecast_date, weather_code)`
//! - `weekly_temp (id, area_code, forecast_date, temps_min, temps_max)`
//!
//! Both are derived state: [`ForecastStore::rebuild_schema`] drops and recreates
//! them at the start of every run.

use crate::store::error::StoreError;
use crate::types::records::{ConditionRecord, ForecastRow, NormalizedForecast, TemperatureRecord};
use crate::types::region_code::RegionCode;
use log::{debug, info};
use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

const CONDITION_TABLE: &str = "weather_forecast";
const TEMPERATURE_TABLE: &str = "weekly_temp";
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

// Drop precedes create unconditionally; both run in one transaction so a
// failure leaves the previous tables in place.
const REBUILD_SCHEMA_SQL: &str = "
    DROP TABLE IF EXISTS weather_forecast;
    DROP TABLE IF EXISTS weekly_temp;

    CREATE TABLE weather_forecast (
        id              INTEGER PRIMARY KEY AUTOINCREMENT,
        area_code       TEXT NOT NULL,
        forecast_date   TEXT NOT NULL,
        weather_code    TEXT NOT NULL
    );
    CREATE INDEX idx_weather_forecast_area_date ON weather_forecast(area_code, forecast_date);

    CREATE TABLE weekly_temp (
        id              INTEGER PRIMARY KEY AUTOINCREMENT,
        area_code       TEXT NOT NULL,
        forecast_date   TEXT NOT NULL,
        temps_min       REAL,
        temps_max       REAL
    );
    CREATE INDEX idx_weekly_temp_area_date ON weekly_temp(area_code, forecast_date);
";

// Full outer join by date. Each side is first collapsed to one row per date,
// keeping the earliest inserted row (SQLite takes bare columns from the MIN(id) row).
const QUERY_FORECAST_SQL: &str = "
    WITH conditions AS (
        SELECT forecast_date, weather_code, MIN(id) AS first_id
        FROM weather_forecast
        WHERE area_code = ?1
        GROUP BY forecast_date
    ),
    temperatures AS (
        SELECT forecast_date, temps_min, temps_max, MIN(id) AS first_id
        FROM weekly_temp
        WHERE area_code = ?1
        GROUP BY forecast_date
    )
    SELECT COALESCE(c.forecast_date, t.forecast_date) AS forecast_day,
           c.weather_code,
           t.temps_min,
           t.temps_max
    FROM conditions AS c
    FULL OUTER JOIN temperatures AS t ON c.forecast_date = t.forecast_date
    ORDER BY forecast_day
";

/// Row counts of both forecast tables.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordCounts {
    pub conditions: usize,
    pub temperatures: usize,
}

/// The persistent store behind the ingestion pipeline and its read path.
///
/// The connection sits behind a mutex: every write goes through one
/// connection, and each region's batches are committed in a single transaction.
pub struct ForecastStore {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl ForecastStore {
    /// Opens (or creates) the database file, creating its parent directory.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::DirCreation(parent.to_path_buf(), e))?;
        }
        let open_err = |e| StoreError::Open(path.to_path_buf(), e);
        let conn = Connection::open(path).map_err(open_err)?;
        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(open_err)?;
        conn.busy_timeout(BUSY_TIMEOUT).map_err(open_err)?;
        debug!("Opened forecast database at {}", path.display());
        Ok(Self {
            conn: Mutex::new(conn),
            path: Some(path.to_path_buf()),
        })
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| StoreError::Open(PathBuf::from(":memory:"), e))?;
        Ok(Self {
            conn: Mutex::new(conn),
            path: None,
        })
    }

    /// Database file, `None` for in-memory stores.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::ConnectionPoisoned)
    }

    /// Leaves the connection lock poisoned, as a writer panicking mid-transaction would.
    #[cfg(test)]
    pub(crate) fn poison(&self) {
        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = self.conn.lock();
            panic!("writer panicked while holding the connection");
        }));
    }

    /// Drops and recreates both tables. Safe to call repeatedly.
    pub fn rebuild_schema(&self) -> Result<(), StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(StoreError::SchemaRebuild)?;
        tx.execute_batch(REBUILD_SCHEMA_SQL)
            .map_err(StoreError::SchemaRebuild)?;
        tx.commit().map_err(StoreError::SchemaRebuild)?;
        info!("Rebuilt forecast schema ({CONDITION_TABLE}, {TEMPERATURE_TABLE})");
        Ok(())
    }

    pub fn append_condition_records(&self, batch: &[ConditionRecord]) -> Result<usize, StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(persist_err(CONDITION_TABLE))?;
        let written = insert_conditions(&tx, batch).map_err(persist_err(CONDITION_TABLE))?;
        tx.commit().map_err(persist_err(CONDITION_TABLE))?;
        Ok(written)
    }

    pub fn append_temperature_records(
        &self,
        batch: &[TemperatureRecord],
    ) -> Result<usize, StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(persist_err(TEMPERATURE_TABLE))?;
        let written = insert_temperatures(&tx, batch).map_err(persist_err(TEMPERATURE_TABLE))?;
        tx.commit().map_err(persist_err(TEMPERATURE_TABLE))?;
        Ok(written)
    }

    /// Writes both batches of one region atomically: either all rows land or none do.
    pub fn persist_region(&self, records: &NormalizedForecast) -> Result<usize, StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(persist_err(CONDITION_TABLE))?;
        let conditions =
            insert_conditions(&tx, &records.conditions).map_err(persist_err(CONDITION_TABLE))?;
        let temperatures = insert_temperatures(&tx, &records.temperatures)
            .map_err(persist_err(TEMPERATURE_TABLE))?;
        tx.commit().map_err(persist_err(CONDITION_TABLE))?;
        Ok(conditions + temperatures)
    }

    /// Date-ordered forecast for one region, combining both tables.
    ///
    /// A date known to only one table still yields a row, with the other
    /// table's fields left empty.
    pub fn query_forecast(&self, region_code: &RegionCode) -> Result<Vec<ForecastRow>, StoreError> {
        let query_err = |source| StoreError::Query {
            region: region_code.to_string(),
            source,
        };
        let conn = self.lock()?;
        let mut stmt = conn.prepare(QUERY_FORECAST_SQL).map_err(query_err)?;
        let rows = stmt
            .query_map(params![region_code.as_str()], |row| {
                Ok(ForecastRow {
                    forecast_date: row.get(0)?,
                    weather_code: row.get(1)?,
                    temp_min: row.get(2)?,
                    temp_max: row.get(3)?,
                })
            })
            .map_err(query_err)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(query_err)
    }

    pub fn record_counts(&self) -> Result<RecordCounts, StoreError> {
        let query_err = |source| StoreError::Query {
            region: "*".to_string(),
            source,
        };
        let conn = self.lock()?;
        let count = |table: &str| -> rusqlite::Result<usize> {
            conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                row.get::<_, i64>(0)
            })
            .map(|n| n as usize)
        };
        Ok(RecordCounts {
            conditions: count(CONDITION_TABLE).map_err(query_err)?,
            temperatures: count(TEMPERATURE_TABLE).map_err(query_err)?,
        })
    }

    /// Every condition row, ordered by its natural key and value.
    pub fn all_condition_records(&self) -> Result<Vec<ConditionRecord>, StoreError> {
        let query_err = |source| StoreError::Query {
            region: "*".to_string(),
            source,
        };
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT area_code, forecast_date, weather_code FROM weather_forecast \
                 ORDER BY area_code, forecast_date, weather_code",
            )
            .map_err(query_err)?;
        let rows = stmt
            .query_map([], |row| {
                Ok(ConditionRecord {
                    region_code: RegionCode::new(row.get::<_, String>(0)?),
                    forecast_date: row.get(1)?,
                    weather_code: row.get(2)?,
                })
            })
            .map_err(query_err)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(query_err)
    }

    /// Every temperature row, ordered by its natural key and values.
    pub fn all_temperature_records(&self) -> Result<Vec<TemperatureRecord>, StoreError> {
        let query_err = |source| StoreError::Query {
            region: "*".to_string(),
            source,
        };
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT area_code, forecast_date, temps_min, temps_max FROM weekly_temp \
                 ORDER BY area_code, forecast_date, temps_min, temps_max",
            )
            .map_err(query_err)?;
        let rows = stmt
            .query_map([], |row| {
                Ok(TemperatureRecord {
                    region_code: RegionCode::new(row.get::<_, String>(0)?),
                    forecast_date: row.get(1)?,
                    temp_min: row.get(2)?,
                    temp_max: row.get(3)?,
                })
            })
            .map_err(query_err)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(query_err)
    }
}

fn persist_err(table: &'static str) -> impl Fn(rusqlite::Error) -> StoreError {
    move |source| StoreError::Persist { table, source }
}

fn insert_conditions(conn: &Connection, batch: &[ConditionRecord]) -> rusqlite::Result<usize> {
    let mut stmt = conn.prepare(
        "INSERT INTO weather_forecast (area_code, forecast_date, weather_code) \
         VALUES (?1, ?2, ?3)",
    )?;
    for record in batch {
        stmt.execute(params![
            record.region_code.as_str(),
            record.forecast_date,
            record.weather_code
        ])?;
    }
    Ok(batch.len())
}

fn insert_temperatures(conn: &Connection, batch: &[TemperatureRecord]) -> rusqlite::Result<usize> {
    let mut stmt = conn.prepare(
        "INSERT INTO weekly_temp (area_code, forecast_date, temps_min, temps_max) \
         VALUES (?1, ?2, ?3, ?4)",
    )?;
    for record in batch {
        stmt.execute(params![
            record.region_code.as_str(),
            record.forecast_date,
            record.temp_min,
            record.temp_max
        ])?;
    }
    Ok(batch.len())
}

//! SQLite persistence for weather records.

use std::path::Path;

use rusqlite::{params, Connection};
use thiserror::Error;

use crate::model::WeatherRecord;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

const CREATE_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS weather_data (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        timestamp TEXT NOT NULL UNIQUE,
        temp_avg REAL,
        temp_high REAL,
        temp_low REAL,
        windchill_avg REAL,
        windchill_high REAL,
        windchill_low REAL,
        windgust_avg REAL,
        windgust_high REAL,
        windgust_low REAL,
        windspeed_avg REAL,
        windspeed_high REAL,
        windspeed_low REAL,
        winddir_avg REAL,
        precip_rate REAL,
        pressure_max REAL,
        pressure_min REAL,
        station_id TEXT NOT NULL,
        power REAL
    )";

const COLUMNS: &str = "timestamp, temp_avg, temp_high, temp_low, \
    windchill_avg, windchill_high, windchill_low, \
    windgust_avg, windgust_high, windgust_low, \
    windspeed_avg, windspeed_high, windspeed_low, \
    winddir_avg, precip_rate, pressure_max, pressure_min, station_id, power";

/// The `weather_data` table, one row per unique timestamp.
pub struct RecordStore {
    conn: Connection,
}

impl RecordStore {
    /// Opens (or creates) the database file and makes sure the table exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        Self::init(Connection::open(path)?)
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute(CREATE_TABLE, ())?;
        Ok(RecordStore { conn })
    }

    /// Inserts the record unless one with the same timestamp is already stored.
    ///
    /// Returns `true` when the row was newly written. An existing row is left
    /// untouched and `false` is returned.
    pub fn upsert(&self, record: &WeatherRecord) -> Result<bool, StoreError> {
        let sql = format!(
            "INSERT OR IGNORE INTO weather_data ({COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)"
        );
        let inserted = self.conn.prepare_cached(&sql)?.execute(params![
            record.timestamp,
            record.temp_avg,
            record.temp_high,
            record.temp_low,
            record.windchill_avg,
            record.windchill_high,
            record.windchill_low,
            record.windgust_avg,
            record.windgust_high,
            record.windgust_low,
            record.windspeed_avg,
            record.windspeed_high,
            record.windspeed_low,
            record.winddir_avg,
            record.precip_rate,
            record.pressure_max,
            record.pressure_min,
            record.station_id,
            record.power,
        ])?;

        Ok(inserted == 1)
    }

    pub fn count(&self) -> Result<u64, StoreError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM weather_data", [], |row| row.get(0))?;

        Ok(count as u64)
    }
}

// -- Tests -------------------------------------------------------------------

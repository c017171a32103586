//! Weather records and the date ranges they are fetched for.

use chrono::{DateTime, NaiveDate, Utc};

/// One hourly history observation for a station.
///
/// Every measurement is optional: a value the upstream payload did not carry
/// stays `None` and is stored as `NULL`, never as zero.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WeatherRecord {
    pub timestamp: DateTime<Utc>,
    pub station_id: String,

    // °C
    pub temp_avg: Option<f64>,
    pub temp_high: Option<f64>,
    pub temp_low: Option<f64>,

    // °C
    pub windchill_avg: Option<f64>,
    pub windchill_high: Option<f64>,
    pub windchill_low: Option<f64>,

    // km/h
    pub windgust_avg: Option<f64>,
    pub windgust_high: Option<f64>,
    pub windgust_low: Option<f64>,

    // km/h
    pub windspeed_avg: Option<f64>,
    pub windspeed_high: Option<f64>,
    pub windspeed_low: Option<f64>,

    /// Degrees, 0-360.
    pub winddir_avg: Option<f64>,

    /// mm/h
    pub precip_rate: Option<f64>,

    // hPa
    pub pressure_max: Option<f64>,
    pub pressure_min: Option<f64>,

    /// Derived wind power (W).
    pub power: Option<f64>,
}

impl WeatherRecord {
    pub fn new(timestamp: DateTime<Utc>, station_id: impl Into<String>) -> Self {
        WeatherRecord {
            timestamp,
            station_id: station_id.into(),
            ..Default::default()
        }
    }
}

/// Spot conditions from the current observation endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentConditions {
    pub timestamp: DateTime<Utc>,
    pub station_id: String,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub pressure: Option<f64>,
    pub wind_speed: Option<f64>,
    pub wind_direction: Option<f64>,
    pub precipitation: Option<f64>,
    pub solar_radiation: Option<f64>,
    pub uv_index: Option<f64>,
}

/// An inclusive range of calendar days, always ordered `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// Builds the range, swapping reversed endpoints. The flag reports whether
    /// a swap happened.
    pub fn new(start: NaiveDate, end: NaiveDate) -> (Self, bool) {
        if start > end {
            (DateRange { start: end, end: start }, true)
        } else {
            (DateRange { start, end }, false)
        }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Number of days covered, both endpoints included.
    pub fn num_days(&self) -> u64 {
        (self.end - self.start).num_days() as u64 + 1
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start.iter_days().take_while(move |day| *day <= end)
    }
}

// -- Tests -------------------------------------------------------------------

//! JSON payloads of the PWS endpoints and their conversion into records.
//!
//! Only the fields we persist are declared; everything else in the payload is
//! ignored. All fields are optional so that a missing value stays `None`.

use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;

use crate::model::{CurrentConditions, WeatherRecord};

#[derive(Debug, Default, Deserialize)]
pub struct HistoryResponse {
    #[serde(default)]
    pub observations: Vec<HistoryObservation>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryObservation {
    pub epoch: Option<i64>,
    /// Degrees are not unit converted, so they sit outside `metric`.
    pub winddir_avg: Option<f64>,
    #[serde(default)]
    pub metric: HistoryMetric,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryMetric {
    pub temp_avg: Option<f64>,
    pub temp_high: Option<f64>,
    pub temp_low: Option<f64>,
    pub windchill_avg: Option<f64>,
    pub windchill_high: Option<f64>,
    pub windchill_low: Option<f64>,
    pub windgust_avg: Option<f64>,
    pub windgust_high: Option<f64>,
    pub windgust_low: Option<f64>,
    pub windspeed_avg: Option<f64>,
    pub windspeed_high: Option<f64>,
    pub windspeed_low: Option<f64>,
    pub precip_rate: Option<f64>,
    pub pressure_max: Option<f64>,
    pub pressure_min: Option<f64>,
}

impl HistoryObservation {
    /// Converts the observation, or `None` when it has no usable epoch.
    pub fn into_record(self, station_id: &str) -> Option<WeatherRecord> {
        let timestamp = epoch_to_utc(self.epoch?)?;
        let m = self.metric;

        Some(WeatherRecord {
            temp_avg: m.temp_avg,
            temp_high: m.temp_high,
            temp_low: m.temp_low,
            windchill_avg: m.windchill_avg,
            windchill_high: m.windchill_high,
            windchill_low: m.windchill_low,
            windgust_avg: m.windgust_avg,
            windgust_high: m.windgust_high,
            windgust_low: m.windgust_low,
            windspeed_avg: m.windspeed_avg,
            windspeed_high: m.windspeed_high,
            windspeed_low: m.windspeed_low,
            winddir_avg: self.winddir_avg,
            precip_rate: m.precip_rate,
            pressure_max: m.pressure_max,
            pressure_min: m.pressure_min,
            ..WeatherRecord::new(timestamp, station_id)
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CurrentResponse {
    #[serde(default)]
    pub observations: Vec<CurrentObservation>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentObservation {
    pub epoch: Option<i64>,
    pub humidity: Option<f64>,
    pub winddir: Option<f64>,
    pub solar_radiation: Option<f64>,
    pub uv: Option<f64>,
    #[serde(default)]
    pub metric: CurrentMetric,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentMetric {
    pub temp: Option<f64>,
    pub pressure: Option<f64>,
    pub wind_speed: Option<f64>,
    pub precip_rate: Option<f64>,
}

impl CurrentObservation {
    /// Converts the snapshot; a missing epoch falls back to `now`.
    pub fn into_conditions(self, station_id: &str, now: DateTime<Utc>) -> CurrentConditions {
        let timestamp = self.epoch.and_then(epoch_to_utc).unwrap_or(now);

        CurrentConditions {
            timestamp,
            station_id: station_id.to_string(),
            temperature: self.metric.temp,
            humidity: self.humidity,
            pressure: self.metric.pressure,
            wind_speed: self.metric.wind_speed,
            wind_direction: self.winddir,
            precipitation: self.metric.precip_rate,
            solar_radiation: self.solar_radiation,
            uv_index: self.uv,
        }
    }
}

fn epoch_to_utc(epoch: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(epoch, 0).single()
}

// -- Tests -------------------------------------------------------------------

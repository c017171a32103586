//! Settings sourced from the process environment (and `.env`, when present).

use std::{path::PathBuf, time::Duration};

use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_BASE_URL: &str = "https://api.weather.com/v2";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid environment configuration: {0}")]
    Env(#[from] envy::Error),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// `WUNDERGROUND_API_KEY`; required by the API client, checked there.
    #[serde(rename = "wunderground_api_key")]
    pub api_key: Option<String>,

    /// `STATION_ID`
    pub station_id: Option<String>,

    /// `WUNDERGROUND_BASE_URL`
    #[serde(rename = "wunderground_base_url", default = "default_base_url")]
    pub base_url: String,

    /// `WEATHER_DB`
    #[serde(rename = "weather_db", default = "default_database_path")]
    pub database_path: PathBuf,

    /// `REQUEST_DELAY_MS`, pause between consecutive day requests.
    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(envy::from_env::<Config>()?)
    }

    /// Builds a config from explicit key/value pairs instead of the process env.
    #[cfg(test)]
    pub fn from_pairs<I>(pairs: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        Ok(envy::from_iter::<_, Config>(pairs)?)
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_database_path() -> PathBuf {
    PathBuf::from("weather_data.db")
}

fn default_request_delay_ms() -> u64 {
    100
}

// -- Tests -------------------------------------------------------------------

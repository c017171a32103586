//! Client for the weather.com PWS (personal weather station) API.
//!
//! History is fetched one calendar day per request. [`fetch_range`] turns a
//! [`DateRange`] into a lazy stream of records, skipping days that fail.

pub mod payload;

use std::{future::Future, time::Duration};

use chrono::{NaiveDate, Utc};
use futures::{stream, Stream, StreamExt};
use log::{debug, warn};
use reqwest::{Client, StatusCode};
use thiserror::Error;

use crate::{
    config::Config,
    model::{CurrentConditions, DateRange, WeatherRecord},
};
use payload::{CurrentResponse, HistoryResponse};

const HISTORY_PATH: &str = "pws/history/hourly";
const CURRENT_PATH: &str = "pws/observations/current";

/// Raised when the client cannot be built from the configuration.
#[derive(Debug, Error, PartialEq)]
pub enum ClientError {
    #[error("API key is required (set WUNDERGROUND_API_KEY)")]
    MissingApiKey,
    #[error("station ID is required (set STATION_ID)")]
    MissingStationId,
}

/// Why a single request produced no data.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected status {0}")]
    Status(StatusCode),
    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Anything that can produce the records observed on one calendar day.
pub trait DaySource {
    fn fetch_day(
        &self,
        day: NaiveDate,
    ) -> impl Future<Output = Result<Vec<WeatherRecord>, FetchError>>;
}

/// A day whose request failed; it contributes no records.
#[derive(Debug, Error)]
#[error("{day}: {error}")]
pub struct SkippedDay {
    pub day: NaiveDate,
    pub error: FetchError,
}

/// Streams the records of every day in `range`, in day order.
///
/// A day is only requested once the previous day's records have been
/// consumed, and `delay` separates consecutive requests. A failed day shows
/// up as a single `Err(SkippedDay)` in its place and the stream moves on.
pub fn fetch_range<S: DaySource>(
    source: &S,
    range: DateRange,
    delay: Duration,
) -> impl Stream<Item = Result<WeatherRecord, SkippedDay>> + '_ {
    stream::iter(range.days().enumerate())
        .then(move |(index, day)| async move {
            if index > 0 && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            debug!("Fetching hourly data for {day}");
            match source.fetch_day(day).await {
                Ok(records) => records.into_iter().map(Ok).collect::<Vec<_>>(),
                Err(error) => vec![Err(SkippedDay { day, error })],
            }
        })
        .flat_map(stream::iter)
}

#[derive(Debug, Clone)]
pub struct WundergroundClient {
    http: Client,
    base_url: String,
    api_key: String,
    station_id: String,
}

impl WundergroundClient {
    /// Fails fast, before any network activity, when credentials are missing.
    pub fn new(config: &Config) -> Result<Self, ClientError> {
        let api_key = non_blank(config.api_key.as_deref()).ok_or(ClientError::MissingApiKey)?;
        let station_id =
            non_blank(config.station_id.as_deref()).ok_or(ClientError::MissingStationId)?;

        Ok(WundergroundClient {
            http: Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            station_id: station_id.to_string(),
        })
    }

    pub fn station_id(&self) -> &str {
        &self.station_id
    }

    /// Latest spot observation, or `None` if anything goes wrong.
    pub async fn fetch_current(&self) -> Option<CurrentConditions> {
        let body = match self.get(CURRENT_PATH, &[]).await {
            Ok(body) => body,
            Err(e) => {
                warn!("Error fetching current conditions: {e}");
                return None;
            }
        };

        let decoded = body
            .as_deref()
            .map(serde_json::from_str::<CurrentResponse>);
        let response = match decoded {
            Some(Ok(response)) => response,
            Some(Err(e)) => {
                warn!("Error decoding current conditions: {e}");
                return None;
            }
            None => CurrentResponse::default(),
        };

        let Some(observation) = response.observations.into_iter().next() else {
            warn!("No current observation for station {}", self.station_id);
            return None;
        };

        Some(observation.into_conditions(&self.station_id, Utc::now()))
    }

    /// GETs `path` with the common query parameters.
    ///
    /// Returns `None` when the API answers with no content, which it does for
    /// days the station did not report.
    async fn get(&self, path: &str, extra: &[(&str, &str)]) -> Result<Option<String>, FetchError> {
        let url = format!("{}/{}", self.base_url, path);
        let response = self
            .http
            .get(url)
            .query(&[
                ("apiKey", self.api_key.as_str()),
                ("stationId", self.station_id.as_str()),
                ("format", "json"),
                ("units", "m"),
            ])
            .query(extra)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }
        if status == StatusCode::NO_CONTENT {
            return Ok(None);
        }

        let body = response.text().await?;
        if body.trim().is_empty() {
            return Ok(None);
        }

        Ok(Some(body))
    }
}

impl DaySource for WundergroundClient {
    async fn fetch_day(&self, day: NaiveDate) -> Result<Vec<WeatherRecord>, FetchError> {
        let date = day.format("%Y%m%d").to_string();
        let Some(body) = self.get(HISTORY_PATH, &[("date", date.as_str())]).await? else {
            return Ok(Vec::new());
        };

        let response: HistoryResponse = serde_json::from_str(&body)?;
        let total = response.observations.len();
        let records: Vec<WeatherRecord> = response
            .observations
            .into_iter()
            .filter_map(|observation| observation.into_record(&self.station_id))
            .collect();

        if records.len() < total {
            warn!(
                "Dropped {} observations without epoch on {day}",
                total - records.len()
            );
        }

        Ok(records)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, collections::HashSet};

    use chrono::{TimeZone, Utc};
    use tokio::{
        io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
        net::TcpListener,
        task::JoinHandle,
        time::Instant,
    };

    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn config_for(base_url: &str, api_key: Option<&str>, station_id: Option<&str>) -> Config {
        let mut pairs = vec![("WUNDERGROUND_BASE_URL".to_string(), base_url.to_string())];
        if let Some(key) = api_key {
            pairs.push(("WUNDERGROUND_API_KEY".to_string(), key.to_string()));
        }
        if let Some(station) = station_id {
            pairs.push(("STATION_ID".to_string(), station.to_string()));
        }
        Config::from_pairs(pairs).unwrap()
    }

    fn config(api_key: Option<&str>, station_id: Option<&str>) -> Config {
        config_for("http://127.0.0.1:1/v2", api_key, station_id)
    }

    /// Answers a single HTTP request with `status` and `body`, then closes.
    ///
    /// Returns the base URL to point the client at and a handle resolving to
    /// the request line that was received.
    async fn serve_once(status: &str, body: &str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}/v2", listener.local_addr().unwrap());

        let response = if body.is_empty() {
            format!("HTTP/1.1 {status}\r\nConnection: close\r\n\r\n")
        } else {
            format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            )
        };

        let handle = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let mut reader = BufReader::new(socket);

            let mut request_line = String::new();
            reader.read_line(&mut request_line).await.unwrap();
            loop {
                let mut header = String::new();
                reader.read_line(&mut header).await.unwrap();
                if header == "\r\n" || header.is_empty() {
                    break;
                }
            }

            reader.get_mut().write_all(response.as_bytes()).await.unwrap();
            reader.get_mut().shutdown().await.unwrap();

            request_line.trim_end().to_string()
        });

        (base_url, handle)
    }

    async fn client_for(status: &str, body: &str) -> (WundergroundClient, JoinHandle<String>) {
        let (base_url, handle) = serve_once(status, body).await;
        let client =
            WundergroundClient::new(&config_for(&base_url, Some("secret"), Some("IGHENT42")))
                .unwrap();

        (client, handle)
    }

    /// Serves two records per day, failing on the listed days.
    #[derive(Default)]
    struct FakeSource {
        failing: HashSet<NaiveDate>,
        requested: RefCell<Vec<NaiveDate>>,
        requested_at: RefCell<Vec<Instant>>,
    }

    impl DaySource for FakeSource {
        async fn fetch_day(&self, day: NaiveDate) -> Result<Vec<WeatherRecord>, FetchError> {
            self.requested.borrow_mut().push(day);
            self.requested_at.borrow_mut().push(Instant::now());
            if self.failing.contains(&day) {
                return Err(FetchError::Status(StatusCode::INTERNAL_SERVER_ERROR));
            }

            let midnight = Utc.from_utc_datetime(&day.and_hms_opt(0, 0, 0).unwrap());
            Ok((0..2)
                .map(|hour| WeatherRecord::new(midnight + chrono::Duration::hours(hour), "IGHENT42"))
                .collect())
        }
    }

    #[test]
    fn should_require_api_key() {
        let result = WundergroundClient::new(&config(None, Some("IGHENT42")));

        assert_eq!(result.unwrap_err(), ClientError::MissingApiKey);
    }

    #[test]
    fn should_require_station_id() {
        let result = WundergroundClient::new(&config(Some("secret"), Some("  ")));

        assert_eq!(result.unwrap_err(), ClientError::MissingStationId);
    }

    #[test]
    fn should_build_client_from_config() {
        let client = WundergroundClient::new(&config(Some("secret"), Some("IGHENT42"))).unwrap();

        assert_eq!(client.station_id(), "IGHENT42");
        assert_eq!(client.base_url, "http://127.0.0.1:1/v2");
    }

    #[tokio::test]
    async fn should_request_history_with_fixed_query() {
        let body = r#"{ "observations": [ { "epoch": 1704067200, "metric": { "tempAvg": 3.0 } } ] }"#;
        let (client, request) = client_for("200 OK", body).await;

        let records = client.fetch_day(date("2024-01-01")).await.unwrap();

        assert_eq!(
            request.await.unwrap(),
            "GET /v2/pws/history/hourly?apiKey=secret&stationId=IGHENT42&format=json&units=m&date=20240101 HTTP/1.1"
        );
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].timestamp.timestamp(), 1_704_067_200);
        assert_eq!(records[0].temp_avg, Some(3.0));
        assert_eq!(records[0].station_id, "IGHENT42");
    }

    #[tokio::test]
    async fn should_report_status_for_non_success_response() {
        let (client, _request) = client_for("500 Internal Server Error", "oops").await;

        let result = client.fetch_day(date("2024-01-01")).await;

        assert!(matches!(
            result,
            Err(FetchError::Status(StatusCode::INTERNAL_SERVER_ERROR))
        ));
    }

    #[tokio::test]
    async fn should_report_decode_error_for_malformed_json() {
        let (client, _request) = client_for("200 OK", "{ not json").await;

        let result = client.fetch_day(date("2024-01-01")).await;

        assert!(matches!(result, Err(FetchError::Decode(_))));
    }

    #[tokio::test]
    async fn should_treat_no_content_as_empty_day() {
        let (client, _request) = client_for("204 No Content", "").await;

        let records = client.fetch_day(date("2024-01-01")).await.unwrap();

        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn should_fetch_current_conditions() {
        let body = r#"{ "observations": [ { "epoch": 1704110400, "humidity": 80, "metric": { "temp": 3.0 } } ] }"#;
        let (client, request) = client_for("200 OK", body).await;

        let current = client.fetch_current().await.unwrap();

        assert_eq!(
            request.await.unwrap(),
            "GET /v2/pws/observations/current?apiKey=secret&stationId=IGHENT42&format=json&units=m HTTP/1.1"
        );
        assert_eq!(current.station_id, "IGHENT42");
        assert_eq!(current.timestamp.timestamp(), 1_704_110_400);
        assert_eq!(current.temperature, Some(3.0));
        assert_eq!(current.humidity, Some(80.0));
    }

    #[tokio::test]
    async fn should_return_none_for_empty_current_observations() {
        let (client, _request) = client_for("200 OK", r#"{ "observations": [] }"#).await;

        assert!(client.fetch_current().await.is_none());
    }

    #[tokio::test]
    async fn should_stream_days_in_order() {
        let source = FakeSource::default();
        let (range, _) = DateRange::new(date("2024-01-01"), date("2024-01-03"));

        let items: Vec<_> = fetch_range(&source, range, Duration::ZERO).collect().await;
        let records: Vec<_> = items.into_iter().map(Result::unwrap).collect();

        assert_eq!(records.len(), 6);
        assert!(records.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
        assert_eq!(
            *source.requested.borrow(),
            vec![date("2024-01-01"), date("2024-01-02"), date("2024-01-03")]
        );
    }

    #[tokio::test]
    async fn should_skip_failed_days_and_continue() {
        let source = FakeSource {
            failing: HashSet::from([date("2024-01-02"), date("2024-01-04")]),
            ..Default::default()
        };
        let (range, _) = DateRange::new(date("2024-01-01"), date("2024-01-05"));

        let items: Vec<_> = fetch_range(&source, range, Duration::ZERO).collect().await;
        let skipped: Vec<_> = items
            .iter()
            .filter_map(|item| item.as_ref().err().map(|s| s.day))
            .collect();
        let records: Vec<_> = items.iter().filter_map(|item| item.as_ref().ok()).collect();

        assert_eq!(source.requested.borrow().len(), 5);
        assert_eq!(skipped, vec![date("2024-01-02"), date("2024-01-04")]);
        assert_eq!(records.len(), 6);
        assert!(records
            .iter()
            .all(|r| r.timestamp.date_naive() != date("2024-01-02")
                && r.timestamp.date_naive() != date("2024-01-04")));
    }

    #[tokio::test]
    async fn should_fetch_lazily() {
        let source = FakeSource::default();
        let (range, _) = DateRange::new(date("2024-01-01"), date("2024-12-31"));

        let stream = fetch_range(&source, range, Duration::ZERO);
        let first: Vec<_> = stream.take(2).collect().await;

        assert_eq!(first.len(), 2);
        assert_eq!(source.requested.borrow().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn should_pause_between_days_only() {
        let source = FakeSource::default();
        let (range, _) = DateRange::new(date("2024-01-01"), date("2024-01-03"));
        let delay = Duration::from_millis(100);
        let started = Instant::now();

        let items: Vec<_> = fetch_range(&source, range, delay).collect().await;

        assert_eq!(items.len(), 6);
        let offsets: Vec<_> = source
            .requested_at
            .borrow()
            .iter()
            .map(|at| at.duration_since(started))
            .collect();
        assert_eq!(offsets, vec![Duration::ZERO, delay, delay * 2]);
        assert_eq!(started.elapsed(), delay * 2);
    }

    #[tokio::test]
    async fn should_report_transport_error_for_unreachable_api() {
        let client = WundergroundClient::new(&config(Some("secret"), Some("IGHENT42"))).unwrap();

        let result = client.fetch_day(date("2024-01-01")).await;

        assert!(matches!(result, Err(FetchError::Transport(_))));
    }

    #[tokio::test]
    async fn should_yield_only_skips_when_every_day_fails() {
        let client = WundergroundClient::new(&config(Some("secret"), Some("IGHENT42"))).unwrap();
        let (range, _) = DateRange::new(date("2024-01-01"), date("2024-01-02"));

        let items: Vec<_> = fetch_range(&client, range, Duration::ZERO).collect().await;

        assert_eq!(items.len(), 2);
        assert!(items
            .iter()
            .all(|item| matches!(item, Err(SkippedDay { error: FetchError::Transport(_), .. }))));
    }

    #[tokio::test]
    async fn should_return_none_for_failed_current_conditions() {
        let client = WundergroundClient::new(&config(Some("secret"), Some("IGHENT42"))).unwrap();

        assert!(client.fetch_current().await.is_none());
    }
}

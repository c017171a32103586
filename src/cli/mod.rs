//! Command line interface.

pub mod command;

use std::time::Duration;

use anyhow::{anyhow, Result};
use chrono::{Days, NaiveDate};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

/// Days fetched when neither a start date nor a day count is given.
pub const DEFAULT_DAYS: u64 = 30;

#[derive(Parser)]
#[command(version, about, long_about = None)]
/// Fetches Weather Underground station data into a local SQLite database
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch hourly history for a date range
    History {
        /// Start date (YYYY-MM-DD)
        #[arg(long, value_parser = parse_date)]
        start_date: Option<NaiveDate>,
        /// End date (YYYY-MM-DD), defaults to today
        #[arg(long, value_parser = parse_date)]
        end_date: Option<NaiveDate>,
        /// Number of days to fetch, counting back from the end date
        #[arg(long, conflicts_with = "start_date")]
        days: Option<u64>,
    },
    /// Show the station's current conditions
    Current {},
}

pub fn parse_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| format!("Invalid date format `{value}`: {e}"))
}

/// Turns the optional CLI arguments into a `(start, end)` pair.
///
/// The end defaults to `today`; the start to `days` (or 30) days before it.
/// No ordering is enforced here, reversed pairs are fixed up by the ingester.
pub fn resolve_range(
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    days: Option<u64>,
    today: NaiveDate,
) -> Result<(NaiveDate, NaiveDate)> {
    let end = end_date.unwrap_or(today);
    let start = match start_date {
        Some(start) => start,
        None => {
            let days = days.unwrap_or(DEFAULT_DAYS);
            end.checked_sub_days(Days::new(days))
                .ok_or_else(|| anyhow!("{days} days before {end} is out of range"))?
        }
    };

    Ok((start, end))
}

/// Creates a spinner.
pub fn create_spinner(message: String) -> ProgressBar {
    let bar = ProgressBar::new_spinner().with_message(message);
    bar.enable_steady_tick(Duration::from_millis(100));

    bar
}

/// Creates a progress bar.
pub fn create_progress_bar(size: u64, message: String) -> ProgressBar {
    let style = ProgressStyle::with_template("[{eta_precise}] {bar:40.cyan/blue} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-");

    ProgressBar::new(size).with_message(message).with_style(style)
}

// -- Tests -------------------------------------------------------------------

//! Fetch a range of hourly history into the database.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use indicatif::{HumanCount, ProgressBar};
use log::{error, info, warn};

use crate::{
    api::{SkippedDay, WundergroundClient},
    cli::create_progress_bar,
    config::Config,
    ingest::{ingest, IngestEvents, IngestOptions, Progress, RunPlan, Summary},
    model::DateRange,
    store::{RecordStore, StoreError},
};

pub async fn history(config: &Config, start: NaiveDate, end: NaiveDate) -> Result<Summary> {
    let client = WundergroundClient::new(config)?;
    let store = RecordStore::open(&config.database_path).with_context(|| {
        format!(
            "Failed to open database `{}`",
            config.database_path.display()
        )
    })?;

    let options = IngestOptions {
        request_delay: config.request_delay(),
        ..Default::default()
    };
    let mut events = ConsoleEvents::default();

    let summary = ingest(
        &store,
        &client,
        start,
        end,
        &options,
        shutdown_signal(),
        &mut events,
    )
    .await;

    info!(
        "Database `{}` now holds {} records",
        config.database_path.display(),
        HumanCount(store.count()?)
    );

    Ok(summary)
}

/// Resolves on Ctrl-C. Never resolves if the handler cannot be installed.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Unable to listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
}

/// Logs run events and keeps a progress bar sized to the estimate.
#[derive(Default)]
pub struct ConsoleEvents {
    bar: Option<ProgressBar>,
}

impl ConsoleEvents {
    fn log(&self, f: impl FnOnce()) {
        match &self.bar {
            Some(bar) => bar.suspend(f),
            None => f(),
        }
    }
}

impl IngestEvents for ConsoleEvents {
    fn range_swapped(&mut self, range: &DateRange) {
        warn!(
            "Start date was after end date, using {} to {}",
            range.start(),
            range.end()
        );
    }

    fn planned(&mut self, plan: &RunPlan) {
        info!(
            "Fetching historical weather data from {} to {}",
            plan.range.start(),
            plan.range.end()
        );
        info!("Date range: {} days", plan.days);
        info!(
            "Estimated number of records: {}",
            HumanCount(plan.estimated_records)
        );
        info!(
            "Estimated storage needed: {:.2} MB",
            plan.estimated_megabytes()
        );
        if plan.is_large() {
            warn!(
                "Large date range detected ({} days). This might take a while.",
                plan.days
            );
        }

        self.bar = Some(create_progress_bar(
            plan.estimated_records,
            "Fetching observations".to_string(),
        ));
    }

    fn progress(&mut self, progress: &Progress) {
        if let Some(bar) = &self.bar {
            bar.set_position(progress.saved + progress.skipped);
        }
        self.log(|| {
            info!(
                "Progress: {:.1}% - Saved: {} records, Skipped: {} records",
                progress.percent,
                HumanCount(progress.saved),
                HumanCount(progress.skipped)
            )
        });
    }

    fn day_skipped(&mut self, skipped: &SkippedDay) {
        self.log(|| warn!("Skipping {skipped}"));
    }

    fn interrupted(&mut self) {
        self.log(|| info!("Process interrupted by user, stopping"));
    }

    fn failed(&mut self, e: &StoreError) {
        self.log(|| error!("Error in main process: {e}"));
    }

    fn finished(&mut self, summary: &Summary) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }

        if summary.interrupted {
            info!("Process stopped early, counts cover records handled so far");
        } else if summary.failed {
            warn!("Process aborted on a database error, counts cover records handled so far");
        } else {
            info!("Process completed:");
        }
        info!("- Total records processed: {}", HumanCount(summary.total()));
        info!("- New records saved: {}", HumanCount(summary.saved));
        info!("- Existing records skipped: {}", HumanCount(summary.skipped));
        if let Some(rate) = summary.duplicate_rate() {
            info!("- Duplicate rate: {rate:.1}%");
        }
    }
}

// -- Tests -------------------------------------------------------------------

//! Drives a date range from the API into the record store.
//!
//! The loop is linear: pull a record, upsert it, count the
//! outcome, report. Everything observable is sent to an [`IngestEvents`] sink.

use std::{
    future::Future,
    pin::pin,
    time::{Duration, Instant},
};

use chrono::NaiveDate;
use futures::StreamExt;

use crate::{
    api::{fetch_range, DaySource, SkippedDay},
    model::DateRange,
    store::{RecordStore, StoreError},
};

/// Five-minute sampling, used only for the progress estimate.
pub const SAMPLES_PER_DAY: u64 = 288;
const BYTES_PER_RECORD: u64 = 100;
const LARGE_RANGE_DAYS: u64 = 365;

#[derive(Debug, Clone)]
pub struct IngestOptions {
    pub request_delay: Duration,
    /// Report after this many saved records...
    pub progress_every: u64,
    /// ...or when this much time passed since the last report.
    pub progress_interval: Duration,
}

impl Default for IngestOptions {
    fn default() -> Self {
        IngestOptions {
            request_delay: Duration::from_millis(100),
            progress_every: 100,
            progress_interval: Duration::from_secs(60),
        }
    }
}

/// What a run is about to do, with a rough size forecast.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunPlan {
    pub range: DateRange,
    pub days: u64,
    pub estimated_records: u64,
}

impl RunPlan {
    pub fn new(range: DateRange) -> Self {
        let days = range.num_days();
        RunPlan {
            range,
            days,
            estimated_records: days * SAMPLES_PER_DAY,
        }
    }

    pub fn estimated_megabytes(&self) -> f64 {
        (self.estimated_records * BYTES_PER_RECORD) as f64 / (1024.0 * 1024.0)
    }

    pub fn is_large(&self) -> bool {
        self.days > LARGE_RANGE_DAYS
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    pub saved: u64,
    pub skipped: u64,
    /// Share of the estimate processed so far, in percent.
    pub percent: f64,
}

impl Progress {
    fn new(summary: &Summary, estimated_records: u64) -> Self {
        let percent = if estimated_records == 0 {
            0.0
        } else {
            summary.total() as f64 / estimated_records as f64 * 100.0
        };

        Progress {
            saved: summary.saved,
            skipped: summary.skipped,
            percent,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Summary {
    pub saved: u64,
    pub skipped: u64,
    pub interrupted: bool,
    /// The store failed and the run stopped early.
    pub failed: bool,
}

impl Summary {
    pub fn total(&self) -> u64 {
        self.saved + self.skipped
    }

    /// Skipped share of all processed records, in percent; `None` when nothing
    /// was processed.
    pub fn duplicate_rate(&self) -> Option<f64> {
        match self.total() {
            0 => None,
            total => Some(self.skipped as f64 / total as f64 * 100.0),
        }
    }
}

/// Receives everything a run has to report. All methods default to no-ops.
pub trait IngestEvents {
    fn range_swapped(&mut self, _range: &DateRange) {}
    fn planned(&mut self, _plan: &RunPlan) {}
    fn progress(&mut self, _progress: &Progress) {}
    fn day_skipped(&mut self, _skipped: &SkippedDay) {}
    fn interrupted(&mut self) {}
    fn failed(&mut self, _error: &StoreError) {}
    fn finished(&mut self, _summary: &Summary) {}
}

/// Fetches `start..=end` and upserts every record into `store`.
///
/// Stops early when `shutdown` resolves or the store fails; either way the
/// counts gathered so far are reported through `events.finished` and returned.
pub async fn ingest<S, E, F>(
    store: &RecordStore,
    source: &S,
    start: NaiveDate,
    end: NaiveDate,
    options: &IngestOptions,
    shutdown: F,
    events: &mut E,
) -> Summary
where
    S: DaySource,
    E: IngestEvents,
    F: Future<Output = ()>,
{
    let (range, swapped) = DateRange::new(start, end);
    if swapped {
        events.range_swapped(&range);
    }

    let plan = RunPlan::new(range);
    events.planned(&plan);

    let mut records = pin!(fetch_range(source, range, options.request_delay));
    let mut shutdown = pin!(shutdown);
    let mut summary = Summary::default();
    let mut last_report = Instant::now();

    loop {
        let record = tokio::select! {
            biased;
            _ = &mut shutdown => {
                summary.interrupted = true;
                events.interrupted();
                break;
            }
            next = records.next() => match next {
                Some(Ok(record)) => record,
                Some(Err(skipped)) => {
                    events.day_skipped(&skipped);
                    continue;
                }
                None => break,
            },
        };

        match store.upsert(&record) {
            Ok(true) => {
                summary.saved += 1;

                let every =
                    options.progress_every > 0 && summary.saved % options.progress_every == 0;
                if every || last_report.elapsed() >= options.progress_interval {
                    events.progress(&Progress::new(&summary, plan.estimated_records));
                    last_report = Instant::now();
                }
            }
            Ok(false) => summary.skipped += 1,
            Err(e) => {
                summary.failed = true;
                events.failed(&e);
                break;
            }
        }
    }

    events.finished(&summary);
    summary
}

// -- Tests -------------------------------------------------------------------

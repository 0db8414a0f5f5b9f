//! Download orchestrator: pages through a listing, runs one media job per
//! item and folds everything into a single progress/completion/error stream.
//!
//! Sequential mode runs one job at a time and reports per-item fractional
//! progress. Concurrent mode launches jobs without waiting (up to
//! `max_concurrent_jobs` when set) and reports progress per finished item.
//! A failed item counts as processed; only page fetch failures end a run
//! with an error.

mod concurrent;
mod counter;
mod events;
mod pages;
mod sequential;

use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;

use crate::control::JobControl;
use crate::listing::{FetchError, MediaRef, PageFetcher};
use crate::media_job::{JobOutcome, MediaFetcher};

pub use events::{ItemReport, OrchestratorEvent};

use self::events::EventSink;

/// Scheduling policy for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleMode {
    Sequential,
    #[default]
    Concurrent,
}

/// Tunables that apply to every job of a run.
#[derive(Debug, Clone, Default)]
pub struct RunSettings {
    /// Cap on jobs running at once in concurrent mode (`None` or 0 = no cap).
    pub max_concurrent_jobs: Option<usize>,
    /// Per-item limit; an expired item is killed and counted as failed.
    pub job_timeout: Option<Duration>,
}

/// What to download.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub listing_id: String,
    /// Items of page 1, already fetched by the caller.
    pub first_page: Vec<MediaRef>,
    /// Total item count observed on page 1. Fixed for the whole run.
    pub expected_total: usize,
    pub output_dir: PathBuf,
    pub mode: ScheduleMode,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl RunSummary {
    fn record(&mut self, outcome: &JobOutcome) {
        match outcome {
            JobOutcome::Succeeded => {
                self.processed += 1;
                self.succeeded += 1;
            }
            JobOutcome::Failed(_) => {
                self.processed += 1;
                self.failed += 1;
            }
            JobOutcome::Cancelled => {}
        }
    }
}

/// Run-fatal failure.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("failed to fetch listing page: {0}")]
    Fetch(#[from] FetchError),

    #[error("cannot create output directory {path}: {source}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug)]
pub enum RunOutcome {
    Completed(RunSummary),
    Cancelled(RunSummary),
    Failed(RunError),
}

/// Coordinates one download run. Create one per run; a cancelled
/// orchestrator stays cancelled.
pub struct DownloadOrchestrator {
    pages: Arc<dyn PageFetcher>,
    media: Arc<dyn MediaFetcher>,
    settings: RunSettings,
    control: Arc<JobControl>,
    sink: Arc<EventSink>,
    cancel_requested: AtomicBool,
    aborted: AtomicBool,
}

impl DownloadOrchestrator {
    pub fn new(
        pages: Arc<dyn PageFetcher>,
        media: Arc<dyn MediaFetcher>,
        settings: RunSettings,
        events: UnboundedSender<OrchestratorEvent>,
    ) -> Self {
        Self {
            pages,
            media,
            settings,
            control: Arc::new(JobControl::new()),
            sink: Arc::new(EventSink::new(events)),
            cancel_requested: AtomicBool::new(false),
            aborted: AtomicBool::new(false),
        }
    }

    /// Download every item of the listing. Emits `Completed` or `Error`
    /// (never both) unless the run is cancelled, in which case neither.
    pub async fn run(&self, request: RunRequest) -> RunOutcome {
        tracing::info!(
            listing = %request.listing_id,
            total = request.expected_total,
            mode = ?request.mode,
            output_dir = %request.output_dir.display(),
            "download run started"
        );

        let mut summary = RunSummary::default();
        let result = match tokio::fs::create_dir_all(&request.output_dir).await {
            Err(source) => Err(RunError::OutputDir {
                path: request.output_dir.clone(),
                source,
            }),
            Ok(()) => {
                self.sink
                    .progress(counter::overall_percent(0.0, request.expected_total));
                match request.mode {
                    ScheduleMode::Sequential => {
                        sequential::run(self, &request, &mut summary).await
                    }
                    ScheduleMode::Concurrent => {
                        concurrent::run(self, &request, &mut summary).await
                    }
                }
            }
        };

        if self.is_cancelled() {
            tracing::info!(processed = summary.processed, "download run cancelled");
            return RunOutcome::Cancelled(summary);
        }
        match result {
            Ok(()) => {
                self.sink.completed(request.output_dir.clone());
                tracing::info!(
                    processed = summary.processed,
                    succeeded = summary.succeeded,
                    failed = summary.failed,
                    "download run completed"
                );
                RunOutcome::Completed(summary)
            }
            Err(e) => {
                self.abort_run(&e);
                tracing::error!("download run failed: {}", e);
                RunOutcome::Failed(e)
            }
        }
    }

    /// Kill every running job and silence the event stream. Idempotent.
    pub fn cancel(&self) {
        if self.cancel_requested.swap(true, Ordering::SeqCst) {
            return;
        }
        tracing::info!(active = self.control.active(), "cancel requested");
        self.sink.close();
        self.control.cancel_all();
    }

    /// True once `cancel` was called.
    pub fn is_cancelled(&self) -> bool {
        self.cancel_requested.load(Ordering::SeqCst)
    }

    /// Emit the run's single error event, then tear down running jobs.
    /// Only the first call acts; returns whether this call did.
    fn abort_run(&self, err: &RunError) -> bool {
        if self.aborted.swap(true, Ordering::SeqCst) {
            return false;
        }
        self.sink.error(err.to_string());
        self.control.cancel_all();
        true
    }

    /// True when no further work should start (user cancel or teardown).
    fn halted(&self) -> bool {
        self.control.is_cancelled()
    }
}

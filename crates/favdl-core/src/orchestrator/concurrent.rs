//! Concurrent mode: one task per item, launched without waiting.
//!
//! Keeps at most `max_concurrent_jobs` tasks in flight when a cap is set;
//! otherwise every item of a page starts at once. Progress is reported per
//! finished item only.

use std::sync::Arc;

use tokio::task::{JoinError, JoinSet};

use crate::listing::MediaRef;
use crate::media_job::{JobOutcome, MediaJob};

use super::counter::{overall_percent, CompletionCounter};
use super::events::ItemReport;
use super::pages::PageCursor;
use super::{DownloadOrchestrator, RunError, RunRequest, RunSummary};

pub(super) async fn run(
    orch: &DownloadOrchestrator,
    request: &RunRequest,
    summary: &mut RunSummary,
) -> Result<(), RunError> {
    let total = request.expected_total;
    let counter = Arc::new(CompletionCounter::new(total));
    let cap = orch.settings.max_concurrent_jobs.filter(|n| *n > 0);
    let mut cursor = PageCursor::new(orch.pages.clone(), &request.listing_id, total);
    let mut join_set: JoinSet<ItemReport> = JoinSet::new();
    let mut launched = 0usize;
    let mut items = request.first_page.clone();

    let result = loop {
        for media in items {
            if launched >= total || orch.halted() {
                break;
            }
            if let Some(cap) = cap {
                while join_set.len() >= cap {
                    match join_set.join_next().await {
                        Some(res) => collect(res, summary),
                        None => break,
                    }
                }
                if orch.halted() {
                    break;
                }
            }
            spawn_job(orch, request, &counter, &mut join_set, media);
            launched += 1;
        }

        if launched >= total || orch.halted() {
            break Ok(());
        }
        match cursor.next_page().await {
            Err(e) => break Err(RunError::from(e)),
            Ok(page) if page.items.is_empty() => {
                tracing::info!(launched, total, "listing exhausted before expected total");
                break Ok(());
            }
            Ok(page) => items = page.items,
        }
    };

    // Tear down before draining so in-flight jobs die now; `run` sees the
    // run already aborted and only reports the outcome.
    if let Err(e) = &result {
        orch.abort_run(e);
    }

    // Completion: every launched job has reported to the counter.
    while let Some(res) = join_set.join_next().await {
        collect(res, summary);
    }
    tracing::debug!(completed = counter.completed(), launched, "all jobs finished");
    result
}

fn spawn_job(
    orch: &DownloadOrchestrator,
    request: &RunRequest,
    counter: &Arc<CompletionCounter>,
    join_set: &mut JoinSet<ItemReport>,
    media: MediaRef,
) {
    let fetcher = Arc::clone(&orch.media);
    let control = Arc::clone(&orch.control);
    let sink = Arc::clone(&orch.sink);
    let counter = Arc::clone(counter);
    let output_dir = request.output_dir.clone();
    let timeout = orch.settings.job_timeout;
    let total = request.expected_total;

    join_set.spawn(async move {
        let mut job = MediaJob::new(media.clone(), output_dir).with_timeout(timeout);
        if let Err(e) = job.start(fetcher.as_ref(), &control) {
            tracing::debug!(media = %media.id, "job did not start: {}", e);
        }
        let outcome = job.wait().await;
        if !matches!(outcome, JobOutcome::Cancelled) {
            counter.record(|n| sink.progress(overall_percent(n as f64, total)));
        }
        sink.item_finished(ItemReport {
            media: media.clone(),
            outcome: outcome.clone(),
        });
        ItemReport { media, outcome }
    });
}

fn collect(res: Result<ItemReport, JoinError>, summary: &mut RunSummary) {
    match res {
        Ok(report) => summary.record(&report.outcome),
        Err(e) => {
            tracing::error!("download task panicked: {}", e);
            summary.processed += 1;
            summary.failed += 1;
        }
    }
}

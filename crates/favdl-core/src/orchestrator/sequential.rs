//! Sequential mode: one job at a time, in listing order.

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
    let counter = CompletionCounter::new(total);
    let mut cursor = PageCursor::new(orch.pages.clone(), &request.listing_id, total);
    let mut items = request.first_page.clone();

    loop {
        for media in items {
            if counter.completed() >= total || orch.halted() {
                break;
            }
            let done = counter.completed() as f64;
            let mut job = MediaJob::new(media.clone(), &request.output_dir)
                .with_timeout(orch.settings.job_timeout);
            if let Err(e) = job.start(orch.media.as_ref(), &orch.control) {
                tracing::debug!(media = %media.id, "job did not start: {}", e);
            }
            let outcome = job
                .run(|fraction| orch.sink.progress(overall_percent(done + fraction, total)))
                .await;
            if let JobOutcome::Cancelled = outcome {
                return Ok(());
            }

            counter.record(|n| orch.sink.progress(overall_percent(n as f64, total)));
            summary.record(&outcome);
            orch.sink.item_finished(ItemReport { media, outcome });
        }

        if counter.completed() >= total || orch.halted() {
            return Ok(());
        }
        let page = cursor.next_page().await?;
        if orch.halted() {
            return Ok(());
        }
        if page.items.is_empty() {
            tracing::info!(
                completed = counter.completed(),
                total,
                "listing exhausted before expected total"
            );
            return Ok(());
        }
        items = page.items;
    }
}

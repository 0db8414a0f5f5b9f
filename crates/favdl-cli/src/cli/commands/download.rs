//! `favdl download <id>` – download every item of a listing.

use anyhow::{bail, Result};
use favdl_core::config::FavdlConfig;
use favdl_core::orchestrator::{
    DownloadOrchestrator, OrchestratorEvent, RunOutcome, RunRequest, ScheduleMode,
};
use std::io::Write;
use std::sync::Arc;

use super::fetch_detail;

#[derive(Debug, Clone)]
pub struct DownloadArgs {
    pub listing_id: String,
    pub mode: ScheduleMode,
    /// Fail the command when any item failed.
    pub strict: bool,
}

pub async fn run_download(cfg: &FavdlConfig, args: DownloadArgs) -> Result<()> {
    let client = cfg.listing_client();
    let detail = fetch_detail(client.clone(), &args.listing_id).await?;
    let total = detail.first_page.expected_total;
    let output_dir = cfg.output_dir_or_default()?;
    println!(
        "{} by {}: {} item(s) -> {}",
        detail.title,
        detail.author,
        total,
        output_dir.display()
    );

    let (events_tx, mut events_rx) = tokio::sync::mpsc::unbounded_channel();
    let orch = Arc::new(DownloadOrchestrator::new(
        Arc::new(client),
        Arc::new(cfg.downloader()),
        cfg.run_settings(),
        events_tx,
    ));

    #[cfg(unix)]
    let listener = match favdl_core::control::default_control_socket_path() {
        Ok(path) => match crate::cli::control_socket::spawn_control_listener(Arc::clone(&orch), &path) {
            Ok(handle) => {
                tracing::debug!(path = %path.display(), "control socket listening");
                Some((handle, path))
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), "control socket bind: {}", e);
                None
            }
        },
        Err(_) => None,
    };

    let request = RunRequest {
        listing_id: args.listing_id.clone(),
        first_page: detail.first_page.items,
        expected_total: total,
        output_dir,
        mode: args.mode,
    };
    let mut run = {
        let orch = Arc::clone(&orch);
        tokio::spawn(async move { orch.run(request).await })
    };

    let mut printer = ProgressPrinter::new(total);
    let mut interrupted = false;
    let outcome = loop {
        tokio::select! {
            res = &mut run => break res?,
            Some(event) = events_rx.recv() => printer.show(&event),
            sig = tokio::signal::ctrl_c(), if !interrupted => {
                interrupted = true;
                if sig.is_ok() {
                    eprintln!();
                    eprintln!("Cancelling...");
                    orch.cancel();
                }
            }
        }
    };
    while let Ok(event) = events_rx.try_recv() {
        printer.show(&event);
    }
    printer.finish();

    #[cfg(unix)]
    if let Some((handle, path)) = listener {
        handle.abort();
        let _ = std::fs::remove_file(path);
    }

    match outcome {
        RunOutcome::Completed(summary) => {
            println!(
                "Done: {} processed, {} succeeded, {} failed.",
                summary.processed, summary.succeeded, summary.failed
            );
            for id in &printer.failed {
                println!("  failed: {}", id);
            }
            if args.strict && summary.failed > 0 {
                bail!("{} item(s) failed", summary.failed);
            }
            Ok(())
        }
        RunOutcome::Cancelled(summary) => {
            println!("Cancelled after {} item(s).", summary.processed);
            Ok(())
        }
        RunOutcome::Failed(e) => Err(e.into()),
    }
}

/// Renders events as a single redrawn status line.
struct ProgressPrinter {
    total: usize,
    percent: u8,
    processed: usize,
    failed: Vec<String>,
    dirty: bool,
}

impl ProgressPrinter {
    fn new(total: usize) -> Self {
        Self {
            total,
            percent: 0,
            processed: 0,
            failed: Vec::new(),
            dirty: false,
        }
    }

    fn show(&mut self, event: &OrchestratorEvent) {
        match event {
            OrchestratorEvent::Progress(p) => self.percent = *p,
            OrchestratorEvent::ItemFinished(report) => {
                self.processed += 1;
                if !report.outcome.is_success() {
                    self.failed.push(report.media.id.clone());
                }
            }
            OrchestratorEvent::Completed(dir) => {
                self.finish();
                println!("Saved to {}", dir.display());
                return;
            }
            OrchestratorEvent::Error(msg) => {
                self.finish();
                eprintln!("Error: {}", msg);
                return;
            }
        }
        print!(
            "\r  {:>3}%  {}/{} item(s)  ",
            self.percent, self.processed, self.total
        );
        let _ = std::io::stdout().flush();
        self.dirty = true;
    }

    fn finish(&mut self) {
        if self.dirty {
            println!();
            self.dirty = false;
        }
    }
}

//! One download of one media item, backed by one external process.
//!
//! Lifecycle: `Pending -> Running -> {Succeeded, Failed}`, or
//! `Running -> Cancelled` through an abort (direct `cancel` or the run's
//! [`JobControl`]). Terminal states are final. The process is reaped and the
//! job leaves the active set exactly once, on the terminal transition.

mod fetcher;
mod kill;
mod output;

use std::io;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::process::{Child, Command};
use tokio::time::Instant;

use crate::control::{JobControl, JobTicket};
use crate::listing::MediaRef;
use crate::progress_line::parse_fraction;

pub use fetcher::{
    background_command, default_downloader_args, ExternalDownloader, MediaFetcher,
    DEFAULT_DOWNLOADER, DEFAULT_MEDIA_URL_TEMPLATE,
};

use self::output::MergedOutput;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Pending,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Succeeded | JobState::Failed | JobState::Cancelled)
    }
}

/// Why a single item failed. Item-scoped: never fatal to the run.
#[derive(Debug, Clone, Error)]
pub enum JobError {
    #[error("failed to start downloader: {0}")]
    Spawn(#[source] Arc<io::Error>),

    #[error("failed reading downloader output: {0}")]
    Stream(#[source] Arc<io::Error>),

    #[error("downloader did not finish within {0:?}")]
    TimedOut(Duration),

    #[error("downloader exited with {0}")]
    Exit(ExitStatus),

    #[error("job was never started")]
    NotStarted,
}

/// Terminal result of a job.
#[derive(Debug, Clone)]
pub enum JobOutcome {
    Succeeded,
    Failed(JobError),
    Cancelled,
}

impl JobOutcome {
    pub fn state(&self) -> JobState {
        match self {
            JobOutcome::Succeeded => JobState::Succeeded,
            JobOutcome::Failed(_) => JobState::Failed,
            JobOutcome::Cancelled => JobState::Cancelled,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, JobOutcome::Succeeded)
    }
}

enum Step {
    Aborted,
    TimedOut,
    Line(Option<io::Result<String>>),
    Exited(io::Result<ExitStatus>),
}

pub struct MediaJob {
    media: MediaRef,
    output_dir: PathBuf,
    timeout: Option<Duration>,
    state: JobState,
    last_fraction: f64,
    child: Option<Child>,
    output: Option<MergedOutput>,
    ticket: Option<JobTicket>,
    deadline: Option<Instant>,
    stream_error: Option<JobError>,
    outcome: Option<JobOutcome>,
}

impl MediaJob {
    pub fn new(media: MediaRef, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            media,
            output_dir: output_dir.into(),
            timeout: None,
            state: JobState::Pending,
            last_fraction: 0.0,
            child: None,
            output: None,
            ticket: None,
            deadline: None,
            stream_error: None,
            outcome: None,
        }
    }

    /// Limit the whole job (output and exit) to `timeout`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn media(&self) -> &MediaRef {
        &self.media
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    /// Last parsed progress fraction in `[0.0, 1.0]`.
    pub fn last_fraction(&self) -> f64 {
        self.last_fraction
    }

    /// Launch the downloader with stdout and stderr merged and register the
    /// job with `control`. A spawn failure moves the job straight to `Failed`.
    pub fn start(
        &mut self,
        fetcher: &dyn MediaFetcher,
        control: &Arc<JobControl>,
    ) -> Result<(), JobError> {
        if self.state != JobState::Pending {
            return Ok(());
        }

        let mut std_cmd = fetcher.command(&self.media, &self.output_dir);
        std_cmd
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        kill::isolate(&mut std_cmd);
        let mut cmd = Command::from(std_cmd);
        cmd.kill_on_drop(true);

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                let err = JobError::Spawn(Arc::new(e));
                tracing::warn!(media = %self.media.id, "{}", err);
                self.finish(JobOutcome::Failed(err.clone()));
                return Err(err);
            }
        };

        let output = match MergedOutput::attach(&mut child) {
            Ok(output) => output,
            Err(e) => {
                if let Some(pid) = child.id() {
                    kill::kill_tree(pid);
                }
                let _ = child.start_kill();
                let err = JobError::Stream(Arc::new(e));
                self.finish(JobOutcome::Failed(err.clone()));
                return Err(err);
            }
        };

        tracing::info!(
            media = %self.media.id,
            pid = child.id().unwrap_or_default(),
            "download started"
        );
        self.ticket = Some(control.register());
        self.deadline = self.timeout.map(|t| Instant::now() + t);
        self.child = Some(child);
        self.output = Some(output);
        self.state = JobState::Running;
        Ok(())
    }

    /// Next progress fraction parsed from the output, skipping lines without
    /// one. `None` once the output is exhausted or the job left `Running`.
    pub async fn next_progress(&mut self) -> Option<f64> {
        loop {
            if self.state != JobState::Running {
                return None;
            }
            let step = {
                let (Some(ticket), Some(output)) = (self.ticket.as_ref(), self.output.as_mut())
                else {
                    return None;
                };
                let deadline = self.deadline;
                tokio::select! {
                    biased;
                    _ = ticket.token().aborted() => Step::Aborted,
                    _ = until(deadline) => Step::TimedOut,
                    line = output.next_line() => Step::Line(line),
                }
            };

            match step {
                Step::Line(Some(Ok(line))) => {
                    tracing::debug!(media = %self.media.id, "{}", line);
                    if let Some(fraction) = parse_fraction(&line) {
                        self.last_fraction = fraction;
                        return Some(fraction);
                    }
                }
                Step::Line(Some(Err(e))) => {
                    tracing::warn!(media = %self.media.id, "output read error: {}", e);
                    if self.stream_error.is_none() {
                        self.stream_error = Some(JobError::Stream(Arc::new(e)));
                    }
                }
                Step::Line(None) => {
                    self.output = None;
                    return None;
                }
                other => {
                    self.handle_interrupt(other).await;
                    return None;
                }
            }
        }
    }

    /// Wait for the output to close and the process to exit, then report
    /// the terminal outcome. Safe to call again after the job finished.
    pub async fn wait(&mut self) -> JobOutcome {
        while self.next_progress().await.is_some() {}

        if self.state == JobState::Running {
            let step = match (self.ticket.as_ref(), self.child.as_mut()) {
                (Some(ticket), Some(child)) => {
                    let deadline = self.deadline;
                    tokio::select! {
                        biased;
                        _ = ticket.token().aborted() => Step::Aborted,
                        _ = until(deadline) => Step::TimedOut,
                        status = child.wait() => Step::Exited(status),
                    }
                }
                _ => Step::Exited(Err(io::Error::new(
                    io::ErrorKind::Other,
                    "running job has no process",
                ))),
            };
            self.handle_interrupt(step).await;
        }

        match &self.outcome {
            Some(outcome) => outcome.clone(),
            None => JobOutcome::Failed(JobError::NotStarted),
        }
    }

    /// Stream all progress to `on_progress`, then wait for the outcome.
    pub async fn run<F>(&mut self, mut on_progress: F) -> JobOutcome
    where
        F: FnMut(f64),
    {
        while let Some(fraction) = self.next_progress().await {
            on_progress(fraction);
        }
        self.wait().await
    }

    /// Forcefully stop the job. No-op once terminal.
    pub async fn cancel(&mut self) {
        match self.state {
            JobState::Pending => self.finish(JobOutcome::Cancelled),
            JobState::Running => self.terminate(JobOutcome::Cancelled).await,
            _ => {}
        }
    }

    async fn handle_interrupt(&mut self, step: Step) {
        match step {
            Step::Aborted => {
                tracing::info!(media = %self.media.id, "download cancelled");
                self.terminate(JobOutcome::Cancelled).await;
            }
            Step::TimedOut => {
                let timeout = self.timeout.unwrap_or_default();
                tracing::warn!(media = %self.media.id, ?timeout, "download timed out");
                self.terminate(JobOutcome::Failed(JobError::TimedOut(timeout)))
                    .await;
            }
            Step::Exited(Ok(status)) => {
                let outcome = match self.stream_error.take() {
                    Some(err) => JobOutcome::Failed(err),
                    None if status.success() => JobOutcome::Succeeded,
                    None => JobOutcome::Failed(JobError::Exit(status)),
                };
                self.child = None;
                self.finish(outcome);
            }
            Step::Exited(Err(e)) => {
                self.terminate(JobOutcome::Failed(JobError::Stream(Arc::new(e))))
                    .await;
            }
            Step::Line(_) => {}
        }
    }

    /// Kill the process tree, reap the child and finish with `outcome`.
    async fn terminate(&mut self, outcome: JobOutcome) {
        self.output = None;
        if let Some(mut child) = self.child.take() {
            if let Some(pid) = child.id() {
                kill::kill_tree(pid);
            }
            let _ = child.start_kill();
            if let Err(e) = child.wait().await {
                tracing::warn!(media = %self.media.id, "reaping downloader failed: {}", e);
            }
        }
        self.finish(outcome);
    }

    fn finish(&mut self, outcome: JobOutcome) {
        if self.state.is_terminal() {
            return;
        }
        self.state = outcome.state();
        if outcome.is_success() {
            self.last_fraction = 1.0;
        }
        match &outcome {
            JobOutcome::Succeeded => tracing::info!(media = %self.media.id, "download finished"),
            JobOutcome::Failed(e) => tracing::warn!(media = %self.media.id, "download failed: {}", e),
            JobOutcome::Cancelled => {}
        }
        self.outcome = Some(outcome);
        self.output = None;
        self.ticket = None;
        self.deadline = None;
    }
}

impl Drop for MediaJob {
    fn drop(&mut self) {
        if let Some(pid) = self.child.as_ref().and_then(|c| c.id()) {
            kill::kill_tree(pid);
        }
    }
}

async fn until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending::<()>().await,
    }
}

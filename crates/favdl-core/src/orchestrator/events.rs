//! Events emitted to the presentation layer.

use std::path::PathBuf;
use std::sync::Mutex;

use tokio::sync::mpsc::UnboundedSender;

use crate::listing::MediaRef;
use crate::media_job::JobOutcome;

#[derive(Debug, Clone)]
pub enum OrchestratorEvent {
    /// Overall progress in percent. Never decreases within a run.
    Progress(u8),
    /// One item reached a terminal state. Lenient consumers can ignore this;
    /// it is the only place where "processed" and "succeeded" differ.
    ItemFinished(ItemReport),
    /// The run finished; carries the output directory.
    Completed(PathBuf),
    /// The run failed. Emitted at most once, never together with `Completed`.
    Error(String),
}

#[derive(Debug, Clone)]
pub struct ItemReport {
    pub media: MediaRef,
    pub outcome: JobOutcome,
}

#[derive(Debug, Default)]
struct SinkState {
    last_percent: Option<u8>,
    closed: bool,
}

/// Gate in front of the event channel: drops regressing or repeated
/// progress and anything after the sink was closed (completion, error or
/// cancellation).
#[derive(Debug)]
pub(crate) struct EventSink {
    tx: UnboundedSender<OrchestratorEvent>,
    state: Mutex<SinkState>,
}

impl EventSink {
    pub(crate) fn new(tx: UnboundedSender<OrchestratorEvent>) -> Self {
        Self {
            tx,
            state: Mutex::new(SinkState::default()),
        }
    }

    pub(crate) fn progress(&self, percent: u8) {
        let mut state = self.state.lock().unwrap();
        if state.closed || state.last_percent.is_some_and(|last| percent <= last) {
            return;
        }
        state.last_percent = Some(percent);
        let _ = self.tx.send(OrchestratorEvent::Progress(percent));
    }

    pub(crate) fn item_finished(&self, report: ItemReport) {
        let state = self.state.lock().unwrap();
        if state.closed {
            return;
        }
        let _ = self.tx.send(OrchestratorEvent::ItemFinished(report));
    }

    pub(crate) fn completed(&self, output_dir: PathBuf) {
        self.terminal(OrchestratorEvent::Completed(output_dir));
    }

    pub(crate) fn error(&self, message: String) {
        self.terminal(OrchestratorEvent::Error(message));
    }

    fn terminal(&self, event: OrchestratorEvent) {
        let mut state = self.state.lock().unwrap();
        if state.closed {
            return;
        }
        state.closed = true;
        let _ = self.tx.send(event);
    }

    /// Stop emitting. Returns once no emit can be in flight.
    pub(crate) fn close(&self) {
        self.state.lock().unwrap().closed = true;
    }

    #[cfg(test)]
    pub(crate) fn is_closed(&self) -> bool {
        self.state.lock().unwrap().closed
    }
}

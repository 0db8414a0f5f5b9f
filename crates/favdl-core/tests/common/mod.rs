//! Shared fixtures for orchestrator integration tests.

#![allow(dead_code)]

pub mod fake_pages;
#[cfg(unix)]
pub mod scripts;

use favdl_core::orchestrator::OrchestratorEvent;
use tokio::sync::mpsc::UnboundedReceiver;

/// Everything currently queued on the event channel.
pub fn drain(rx: &mut UnboundedReceiver<OrchestratorEvent>) -> Vec<OrchestratorEvent> {
    let mut events = Vec::new();
    while let Ok(ev) = rx.try_recv() {
        events.push(ev);
    }
    events
}

pub fn progress_values(events: &[OrchestratorEvent]) -> Vec<u8> {
    events
        .iter()
        .filter_map(|ev| match ev {
            OrchestratorEvent::Progress(p) => Some(*p),
            _ => None,
        })
        .collect()
}

pub fn count_completed(events: &[OrchestratorEvent]) -> usize {
    events
        .iter()
        .filter(|ev| matches!(ev, OrchestratorEvent::Completed(_)))
        .count()
}

pub fn count_errors(events: &[OrchestratorEvent]) -> usize {
    events
        .iter()
        .filter(|ev| matches!(ev, OrchestratorEvent::Error(_)))
        .count()
}

pub fn count_finished(events: &[OrchestratorEvent]) -> usize {
    events
        .iter()
        .filter(|ev| matches!(ev, OrchestratorEvent::ItemFinished(_)))
        .count()
}

/// Progress must never go backwards or repeat.
pub fn assert_strictly_increasing(values: &[u8]) {
    for pair in values.windows(2) {
        assert!(pair[0] < pair[1], "progress regressed or repeated: {:?}", values);
    }
}

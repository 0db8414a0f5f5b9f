//! Shared completion counter and overall-percent math.

use std::sync::Mutex;

/// `floor(done / total * 100)`, clamped to `0..=100`. An empty listing is 100%.
pub(crate) fn overall_percent(done: f64, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    let pct = (done / total as f64 * 100.0).floor();
    pct.clamp(0.0, 100.0) as u8
}

/// Number of items accounted for, never above `total`.
///
/// Increment and the caller's report run under one lock, so reports are
/// emitted in counter order. The lock is never held across I/O.
#[derive(Debug)]
pub(crate) struct CompletionCounter {
    total: usize,
    completed: Mutex<usize>,
}

impl CompletionCounter {
    pub(crate) fn new(total: usize) -> Self {
        Self {
            total,
            completed: Mutex::new(0),
        }
    }

    pub(crate) fn completed(&self) -> usize {
        *self.completed.lock().unwrap()
    }

    /// Count one finished item and call `report` with the new count while
    /// still holding the lock. Saturates at `total`.
    pub(crate) fn record<F>(&self, report: F) -> usize
    where
        F: FnOnce(usize),
    {
        let mut completed = self.completed.lock().unwrap();
        if *completed >= self.total {
            tracing::warn!(total = self.total, "completion beyond expected total ignored");
            return *completed;
        }
        *completed += 1;
        report(*completed);
        *completed
    }
}

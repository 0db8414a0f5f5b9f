//! Job control for cancellation: shared abort tokens for every running job.
//!
//! Each running media job registers with the run's `JobControl` and gets a
//! ticket holding its abort token; dropping the ticket unregisters the job.
//! `cancel_all` aborts every registered job and any job registering later.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use tokio::sync::Notify;

/// Abort signal for one job. Set once, never cleared.
#[derive(Debug, Default)]
pub struct AbortToken {
    aborted: AtomicBool,
    notify: Notify,
}

impl AbortToken {
    pub fn abort(&self) {
        self.aborted.store(true, Ordering::SeqCst);
        self.notify.notify_one();
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::SeqCst)
    }

    /// Resolves once `abort` has been called. Single waiter only.
    pub async fn aborted(&self) {
        loop {
            if self.is_aborted() {
                return;
            }
            self.notify.notified().await;
        }
    }
}

/// Registry of running jobs (the run's active set) plus the run-wide cancel flag.
#[derive(Debug, Default)]
pub struct JobControl {
    jobs: RwLock<HashMap<u64, Arc<AbortToken>>>,
    next_id: AtomicU64,
    cancelled: AtomicBool,
}

impl JobControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a running job. The returned ticket unregisters it when dropped.
    /// If the run was already cancelled, the token comes back aborted.
    pub fn register(self: &Arc<Self>) -> JobTicket {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let token = Arc::new(AbortToken::default());
        self.jobs.write().unwrap().insert(id, Arc::clone(&token));
        if self.is_cancelled() {
            token.abort();
        }
        JobTicket {
            control: Arc::clone(self),
            id,
            token,
        }
    }

    fn unregister(&self, id: u64) {
        self.jobs.write().unwrap().remove(&id);
    }

    /// Number of jobs currently registered.
    pub fn active(&self) -> usize {
        self.jobs.read().unwrap().len()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Abort every registered job and refuse new ones. Idempotent.
    pub fn cancel_all(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        let jobs = self.jobs.read().unwrap();
        for token in jobs.values() {
            token.abort();
        }
        tracing::debug!(jobs = jobs.len(), "abort requested for all running jobs");
    }
}

/// Membership of one job in a [`JobControl`]; unregisters on drop.
#[derive(Debug)]
pub struct JobTicket {
    control: Arc<JobControl>,
    id: u64,
    token: Arc<AbortToken>,
}

impl JobTicket {
    pub fn token(&self) -> &AbortToken {
        &self.token
    }
}

impl Drop for JobTicket {
    fn drop(&mut self) {
        self.control.unregister(self.id);
    }
}

/// Default path for the control socket (XDG state dir).
pub fn default_control_socket_path() -> std::io::Result<PathBuf> {
    let dir = xdg::BaseDirectories::with_prefix("favdl")?.get_state_home();
    Ok(dir.join("control.sock"))
}

//! Registry of running jobs: cancellation token and task handle per job id.
//!
//! The dispatcher registers a job before spawning its task and the task
//! unregisters itself when done. Deletion looks jobs up here to cancel them.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::job_db::JobId;

struct Entry {
    ticket: u64,
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

#[derive(Default)]
pub struct JobRegistry {
    jobs: Mutex<HashMap<JobId, Entry>>,
    next_ticket: AtomicU64,
    idle: Notify,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<JobId, Entry>> {
        // Entries stay consistent even if a holder panicked.
        self.jobs.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Register a job about to start. Returns a ticket identifying this
    /// registration, or `None` if the job is already registered.
    pub fn register(&self, job_id: JobId, cancel: CancellationToken) -> Option<u64> {
        let mut jobs = self.lock();
        if jobs.contains_key(&job_id) {
            return None;
        }
        let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);
        jobs.insert(
            job_id,
            Entry {
                ticket,
                cancel,
                handle: None,
            },
        );
        Some(ticket)
    }

    /// Store the task handle for a registration. Dropped (detaching the task)
    /// if the task already finished and unregistered.
    pub fn attach(&self, job_id: JobId, ticket: u64, handle: JoinHandle<()>) {
        if let Some(entry) = self.lock().get_mut(&job_id) {
            if entry.ticket == ticket {
                entry.handle = Some(handle);
            }
        }
    }

    /// Remove a registration; wakes [`JobRegistry::wait_idle`] when the last one goes.
    pub fn unregister(&self, job_id: JobId, ticket: u64) {
        let mut jobs = self.lock();
        if jobs.get(&job_id).is_some_and(|e| e.ticket == ticket) {
            jobs.remove(&job_id);
        }
        if jobs.is_empty() {
            self.idle.notify_waiters();
        }
    }

    /// Cancel a running job. Returns whether the job was registered.
    pub fn request_cancel(&self, job_id: JobId) -> bool {
        match self.lock().get(&job_id) {
            Some(entry) => {
                entry.cancel.cancel();
                true
            }
            None => false,
        }
    }

    pub fn is_running(&self, job_id: JobId) -> bool {
        self.lock().contains_key(&job_id)
    }

    pub fn running_ids(&self) -> Vec<JobId> {
        let mut ids: Vec<JobId> = self.lock().keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Take every attached task handle, leaving the registrations in place.
    pub(crate) fn take_handles(&self) -> Vec<(JobId, JoinHandle<()>)> {
        let mut jobs = self.lock();
        jobs.iter_mut()
            .filter_map(|(id, e)| e.handle.take().map(|h| (*id, h)))
            .collect()
    }

    /// Drop a registration regardless of ticket (used after aborting its task).
    pub(crate) fn forget(&self, job_id: JobId) {
        let mut jobs = self.lock();
        jobs.remove(&job_id);
        if jobs.is_empty() {
            self.idle.notify_waiters();
        }
    }

    /// Wait until no job is registered.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.is_empty() {
                return;
            }
            notified.await;
        }
    }
}

//! Worker dispatcher: one task per job, bounded by a semaphore, tracked in a
//! [`JobRegistry`] so jobs can be cancelled and shutdown can drain them.

mod registry;

pub use registry::JobRegistry;

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use crate::job_db::JobId;
use crate::orchestrator::{FetchError, Orchestrator};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error("job {0} is already running")]
    AlreadyRunning(JobId),
    #[error("dispatcher is shutting down")]
    ShuttingDown,
}

/// What [`Dispatcher::shutdown`] had to do.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Tasks that ended within the grace period.
    pub drained: usize,
    /// Tasks aborted after the grace period; their jobs may stay non-terminal.
    pub aborted: Vec<JobId>,
}

#[derive(Clone)]
pub struct Dispatcher {
    orchestrator: Arc<Orchestrator>,
    registry: Arc<JobRegistry>,
    permits: Arc<Semaphore>,
    root: CancellationToken,
}

impl Dispatcher {
    /// `max_concurrent` is clamped to at least one.
    pub fn new(orchestrator: Arc<Orchestrator>, max_concurrent: usize) -> Self {
        Self {
            orchestrator,
            registry: Arc::new(JobRegistry::new()),
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
            root: CancellationToken::new(),
        }
    }

    pub fn orchestrator(&self) -> &Arc<Orchestrator> {
        &self.orchestrator
    }

    pub fn registry(&self) -> &Arc<JobRegistry> {
        &self.registry
    }

    /// Start a job in the background. Returns once the task is spawned; the
    /// task waits for a free slot before running.
    pub fn dispatch(&self, job_id: JobId) -> Result<(), DispatchError> {
        if self.root.is_cancelled() {
            return Err(DispatchError::ShuttingDown);
        }
        let cancel = self.root.child_token();
        let ticket = self
            .registry
            .register(job_id, cancel.clone())
            .ok_or(DispatchError::AlreadyRunning(job_id))?;

        let orchestrator = Arc::clone(&self.orchestrator);
        let registry = Arc::clone(&self.registry);
        let permits = Arc::clone(&self.permits);
        let handle = tokio::spawn(async move {
            let permit = tokio::select! {
                _ = cancel.cancelled() => None,
                permit = permits.acquire_owned() => permit.ok(),
            };
            let outcome = match permit {
                Some(_permit) => orchestrator.run_job(job_id, cancel).await,
                None => {
                    tracing::debug!(job_id, "cancelled while queued");
                    orchestrator.abandon(job_id, FetchError::Cancelled).await
                }
            };
            tracing::debug!(job_id, ?outcome, "worker finished");
            registry.unregister(job_id, ticket);
        });
        self.registry.attach(job_id, ticket, handle);
        tracing::debug!(job_id, "job dispatched");
        Ok(())
    }

    /// Cancel one job. Returns whether it was running or queued.
    pub fn cancel(&self, job_id: JobId) -> bool {
        self.registry.request_cancel(job_id)
    }

    /// Wait until every dispatched job has finished.
    pub async fn wait_idle(&self) {
        self.registry.wait_idle().await;
    }

    /// Cancel every job, wait up to `grace` for the workers to record their
    /// outcome, then abort whatever is left. Later dispatches are rejected.
    pub async fn shutdown(&self, grace: Duration) -> ShutdownReport {
        self.root.cancel();
        let handles = self.registry.take_handles();
        tracing::info!(jobs = handles.len(), grace_secs = grace.as_secs(), "shutting down dispatcher");

        let deadline = tokio::time::Instant::now() + grace;
        let mut report = ShutdownReport::default();
        for (job_id, mut handle) in handles {
            match tokio::time::timeout_at(deadline, &mut handle).await {
                Ok(_) => report.drained += 1,
                Err(_) => {
                    handle.abort();
                    self.registry.forget(job_id);
                    tracing::warn!(job_id, "worker aborted after grace period; job may remain in progress");
                    report.aborted.push(job_id);
                }
            }
        }
        report
    }
}

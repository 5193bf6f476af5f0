//! Terminal writes and cleanup of removed jobs.

use std::path::{Path, PathBuf};

use crate::job_db::{JobId, WriteOutcome};

use super::error::FetchError;
use super::{Orchestrator, RunOutcome};

impl Orchestrator {
    pub(super) async fn finish_success(&self, job_id: JobId, path: PathBuf) -> RunOutcome {
        let size = match tokio::fs::metadata(&path).await {
            Ok(meta) => i64::try_from(meta.len()).unwrap_or(i64::MAX),
            Err(e) => {
                tracing::warn!(job_id, path = %path.display(), "cannot stat output: {}", e);
                return self.finish_failure(job_id, FetchError::OutputMissing, None).await;
            }
        };

        let stored = path.to_string_lossy();
        match self.db.complete(job_id, &stored, size).await {
            Ok(WriteOutcome::Applied) => {
                tracing::info!(job_id, path = %path.display(), size, "job completed");
                RunOutcome::Completed(path)
            }
            Ok(WriteOutcome::Tombstoned | WriteOutcome::Missing) => {
                tracing::info!(job_id, "job removed before completion was recorded");
                self.discard(job_id, Some(&path)).await;
                RunOutcome::Removed
            }
            Ok(WriteOutcome::Stale(status)) => {
                tracing::warn!(job_id, %status, "completion not recorded; job already moved on");
                RunOutcome::Skipped
            }
            Err(e) => self.finish_failure(job_id, FetchError::Store(e), None).await,
        }
    }

    pub(super) async fn finish_failure(
        &self,
        job_id: JobId,
        err: FetchError,
        artifact: Option<&Path>,
    ) -> RunOutcome {
        match &err {
            FetchError::Cancelled => tracing::info!(job_id, "job cancelled"),
            other => tracing::warn!(job_id, "job failed: {}", other),
        }

        match self.db.fail(job_id, err.user_message()).await {
            Ok(WriteOutcome::Applied) => RunOutcome::Failed,
            Ok(WriteOutcome::Tombstoned | WriteOutcome::Missing) => {
                self.discard(job_id, artifact).await;
                RunOutcome::Removed
            }
            Ok(WriteOutcome::Stale(status)) => {
                tracing::debug!(job_id, %status, "failure not recorded; job already terminal");
                RunOutcome::Skipped
            }
            Err(e) => {
                // Nothing else can record this outcome; the liveness sweep
                // (`fail_stale_jobs`) is the only way out for the row.
                tracing::error!(
                    job_id,
                    "could not record failure, job may stay in progress: {:#}",
                    e
                );
                RunOutcome::Failed
            }
        }
    }

    /// Remove the artifact (best effort) and the tombstoned row of a job that
    /// was deleted while its worker ran.
    pub(super) async fn discard(&self, job_id: JobId, artifact: Option<&Path>) {
        if let Some(path) = artifact {
            match tokio::fs::remove_file(path).await {
                Ok(()) => tracing::debug!(job_id, path = %path.display(), "removed artifact"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => tracing::warn!(job_id, path = %path.display(), "could not remove artifact: {}", e),
            }
        }
        match self.db.purge(job_id).await {
            Ok(true) => tracing::info!(job_id, "removed job purged"),
            Ok(false) => {}
            Err(e) => tracing::warn!(job_id, "purge failed: {:#}", e),
        }
    }
}

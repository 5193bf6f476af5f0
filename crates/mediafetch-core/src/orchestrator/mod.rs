//! Job orchestrator: drives one job from `pending` to a terminal state.
//!
//! Sequence: load → `fetching_metadata` → bounded metadata probe (best effort)
//! → `downloading` → tool run with streamed progress → output resolution →
//! `completed`. Every error on the way ends in `failed`; nothing propagates to
//! the caller. A job whose row was removed mid-run is cleaned up instead of
//! being written back.

mod download;
mod error;
mod finish;
mod resolve;

pub use error::FetchError;
pub use resolve::resolve_output;

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::config::{MediafetchConfig, ToolConfig};
use crate::invoker::probe_metadata;
use crate::job_db::{JobDb, JobId, WriteOutcome};
use crate::progress::{OutputParser, YtDlpParser};

/// How a job run ended, from the worker's point of view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed(PathBuf),
    Failed,
    /// The row was removed while the job ran; artifacts were cleaned up.
    Removed,
    /// The row was not in a state this worker may advance.
    Skipped,
}

/// Result of the forward path when it did not fail.
enum Step {
    Done(PathBuf),
    Removed,
    Skipped,
}

/// Everything a worker needs to run jobs. Cheap to share behind an `Arc`.
pub struct Orchestrator {
    db: JobDb,
    tool: ToolConfig,
    output_dir: PathBuf,
    metadata_timeout: Duration,
}

impl Orchestrator {
    pub fn new(db: JobDb, cfg: &MediafetchConfig) -> Result<Self> {
        Ok(Self::from_parts(
            db,
            cfg.tool(),
            cfg.resolve_output_dir()?,
            cfg.metadata_timeout(),
        ))
    }

    pub fn from_parts(
        db: JobDb,
        tool: ToolConfig,
        output_dir: PathBuf,
        metadata_timeout: Duration,
    ) -> Self {
        Self {
            db,
            tool,
            output_dir,
            metadata_timeout,
        }
    }

    pub fn db(&self) -> &JobDb {
        &self.db
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Run one job to a terminal state. Never returns an error: failures are
    /// recorded on the job (or logged when even that write cannot land).
    pub async fn run_job(&self, job_id: JobId, cancel: CancellationToken) -> RunOutcome {
        tracing::info!(job_id, "job started");
        let mut parser = YtDlpParser::new();
        match self.execute(job_id, &mut parser, &cancel).await {
            Ok(Step::Done(path)) => self.finish_success(job_id, path).await,
            Ok(Step::Removed) => {
                self.discard(job_id, None).await;
                RunOutcome::Removed
            }
            Ok(Step::Skipped) => RunOutcome::Skipped,
            Err(e) => self.finish_failure(job_id, e, parser.output_path()).await,
        }
    }

    /// Record a job that will never run (e.g. cancelled while queued).
    pub async fn abandon(&self, job_id: JobId, reason: FetchError) -> RunOutcome {
        self.finish_failure(job_id, reason, None).await
    }

    async fn execute(
        &self,
        job_id: JobId,
        parser: &mut dyn OutputParser,
        cancel: &CancellationToken,
    ) -> Result<Step, FetchError> {
        let Some(job) = self.db.get_job(job_id).await? else {
            tracing::warn!(job_id, "job not found; nothing to run");
            return Ok(Step::Removed);
        };
        if cancel.is_cancelled() {
            return Err(FetchError::Cancelled);
        }

        if let Some(step) = halted(job_id, self.db.begin_metadata(job_id).await?) {
            return Ok(step);
        }

        let meta = tokio::select! {
            _ = cancel.cancelled() => return Err(FetchError::Cancelled),
            meta = probe_metadata(&self.tool, &job.source_url, self.metadata_timeout) => meta,
        };
        match meta {
            Some(meta) => {
                let enrichment = meta.to_enrichment();
                tracing::debug!(job_id, title = ?enrichment.title, "metadata fetched");
                if let Some(step) = halted(job_id, self.db.apply_enrichment(job_id, &enrichment).await?) {
                    return Ok(step);
                }
            }
            None => tracing::info!(job_id, "metadata unavailable; continuing without it"),
        }

        if let Some(step) = halted(job_id, self.db.begin_download(job_id).await?) {
            return Ok(step);
        }

        self.download(&job, parser, cancel).await?;

        match resolve_output(&self.output_dir, parser.output_path(), parser.working_title()).await {
            Some(path) => Ok(Step::Done(path)),
            None => Err(FetchError::OutputMissing),
        }
    }
}

/// Map a forward write that did not apply to the step that ends the run.
fn halted(job_id: JobId, outcome: WriteOutcome) -> Option<Step> {
    match outcome {
        WriteOutcome::Applied => None,
        WriteOutcome::Tombstoned | WriteOutcome::Missing => {
            tracing::info!(job_id, "job removed; stopping");
            Some(Step::Removed)
        }
        WriteOutcome::Stale(status) => {
            tracing::warn!(job_id, %status, "job is not in a runnable state; skipping");
            Some(Step::Skipped)
        }
    }
}

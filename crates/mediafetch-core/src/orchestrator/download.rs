//! Download phase: spawn the tool, stream its output through the parser,
//! persist progress, wait for exit.

use std::collections::VecDeque;
use tokio_util::sync::CancellationToken;

use crate::invoker::download_command;
use crate::job_db::{JobId, JobRecord, WriteOutcome};
use crate::progress::{merged_lines, OutputParser, ProgressUpdate};

use super::error::FetchError;
use super::resolve::remove_partials;
use super::Orchestrator;

/// Trailing output lines kept for the failure log.
const TAIL_LINES: usize = 20;

/// Why the output loop stopped early.
enum Interrupted {
    Cancelled,
    Removed,
}

impl Orchestrator {
    /// Run the tool to completion. On success the parser holds the announced
    /// output path; resolving it is the caller's job.
    pub(super) async fn download(
        &self,
        job: &JobRecord,
        parser: &mut dyn OutputParser,
        cancel: &CancellationToken,
    ) -> Result<(), FetchError> {
        let job_id = job.id;
        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .map_err(FetchError::OutputDir)?;

        let cmd = download_command(
            &self.tool,
            &job.source_url,
            job.media_kind,
            job.quality,
            &self.output_dir,
        );
        tracing::debug!(job_id, args = ?cmd.args, "spawning extraction tool");
        let mut child = cmd.to_command().spawn().map_err(FetchError::Spawn)?;
        let mut lines = merged_lines(child.stdout.take(), child.stderr.take());

        let mut tail: VecDeque<String> = VecDeque::with_capacity(TAIL_LINES);
        let mut last_sent: Option<ProgressUpdate> = None;
        let mut interrupted = None;

        loop {
            let line = tokio::select! {
                _ = cancel.cancelled() => {
                    interrupted = Some(Interrupted::Cancelled);
                    break;
                }
                line = lines.recv() => line,
            };
            let Some(line) = line else { break };

            if let Some(update) = parser.feed(&line) {
                if last_sent.as_ref() != Some(&update) {
                    if let Some(stop) = self.persist_progress(job_id, &update).await {
                        interrupted = Some(stop);
                        break;
                    }
                    last_sent = Some(update);
                }
            }

            if tail.len() == TAIL_LINES {
                tail.pop_front();
            }
            tail.push_back(line);
        }

        if let Some(why) = interrupted {
            if let Err(e) = child.kill().await {
                tracing::warn!(job_id, "failed to kill extraction tool: {}", e);
            }
            match why {
                Interrupted::Cancelled => tracing::info!(job_id, "download cancelled; tool killed"),
                Interrupted::Removed => {
                    tracing::info!(job_id, "job removed while downloading; tool killed")
                }
            }
            self.sweep_partials(job_id, parser).await;
            return Err(FetchError::Cancelled);
        }

        let status = tokio::select! {
            _ = cancel.cancelled() => {
                if let Err(e) = child.kill().await {
                    tracing::warn!(job_id, "failed to kill extraction tool: {}", e);
                }
                self.sweep_partials(job_id, parser).await;
                return Err(FetchError::Cancelled);
            }
            status = child.wait() => status.map_err(FetchError::Spawn)?,
        };

        if status.success() {
            tracing::debug!(job_id, "extraction tool exited successfully");
            return Ok(());
        }

        tracing::warn!(
            job_id,
            %status,
            "extraction tool failed; last output:\n{}",
            tail.iter().map(String::as_str).collect::<Vec<_>>().join("\n")
        );
        Err(FetchError::ToolExit { status })
    }

    /// Drop what a killed tool left half-written next to the announced path.
    async fn sweep_partials(&self, job_id: JobId, parser: &dyn OutputParser) {
        let Some(announced) = parser.output_path() else { return };
        let removed = remove_partials(&self.output_dir, announced).await;
        if removed > 0 {
            tracing::debug!(job_id, removed, "removed partial files");
        }
    }

    /// Store one progress update. Returns `Some` when the job is gone and the
    /// download should stop. Store errors are logged and the download goes on.
    async fn persist_progress(&self, job_id: JobId, update: &ProgressUpdate) -> Option<Interrupted> {
        let title = (!update.title.is_empty()).then_some(update.title.as_str());
        match self.db.record_progress(job_id, update.percent, title).await {
            Ok(WriteOutcome::Applied) => None,
            Ok(WriteOutcome::Tombstoned | WriteOutcome::Missing) => Some(Interrupted::Removed),
            Ok(WriteOutcome::Stale(status)) => {
                tracing::debug!(job_id, %status, "progress write skipped");
                None
            }
            Err(e) => {
                tracing::warn!(job_id, "progress write failed: {:#}", e);
                None
            }
        }
    }
}

//! Owner-scoped accessors for the collaborators around the core: the status
//! poller, the file server, and deletion.
//!
//! A job id paired with the wrong owner token behaves exactly like an unknown
//! id. Nothing here exposes another owner's data or internal error detail.

use anyhow::Result;
use serde::Serialize;
use std::path::PathBuf;

use crate::dispatcher::JobRegistry;
use crate::humanize::format_duration;
use crate::job_db::{JobDb, JobId, JobRecord, JobStatus, MediaKind};

/// Shown while the title is not known yet.
pub const TITLE_PLACEHOLDER: &str = "Processing...";

/// Status as returned to a polling client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobStatusView {
    pub id: JobId,
    pub title: String,
    pub status: JobStatus,
    pub progress: u8,
    pub error_message: Option<String>,
    pub file_available: bool,
    pub thumbnail: Option<String>,
    /// Formatted as `m:ss` or `h:mm:ss`.
    pub duration: Option<String>,
    pub media_kind: MediaKind,
}

impl From<&JobRecord> for JobStatusView {
    fn from(job: &JobRecord) -> Self {
        let title = job
            .title
            .clone()
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| TITLE_PLACEHOLDER.to_string());
        let error_message = match job.status {
            JobStatus::Failed => job.error_detail.clone(),
            _ => None,
        };
        Self {
            id: job.id,
            title,
            status: job.status,
            progress: job.progress_percent,
            error_message,
            file_available: job.status == JobStatus::Completed && job.output_path.is_some(),
            thumbnail: job.thumbnail_url.clone(),
            duration: job.duration_secs.map(format_duration),
            media_kind: job.media_kind,
        }
    }
}

pub async fn status_for_owner(db: &JobDb, id: JobId, owner_token: &str) -> Result<Option<JobStatusView>> {
    let job = db.get_job_for_owner(id, owner_token).await?;
    Ok(job.as_ref().map(JobStatusView::from))
}

/// What the file server needs to send a finished artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHandoff {
    pub path: PathBuf,
    pub content_type: &'static str,
    /// Download name offered to the client.
    pub file_name: String,
    pub size: u64,
}

/// The finished file of a completed job, if it is still on disk.
pub async fn file_for_owner(db: &JobDb, id: JobId, owner_token: &str) -> Result<Option<FileHandoff>> {
    let Some(job) = db.get_job_for_owner(id, owner_token).await? else {
        return Ok(None);
    };
    if job.status != JobStatus::Completed {
        return Ok(None);
    }
    let Some(path) = job.output_path.map(PathBuf::from) else {
        return Ok(None);
    };
    let meta = match tokio::fs::metadata(&path).await {
        Ok(meta) if meta.is_file() => meta,
        _ => {
            tracing::warn!(job_id = id, path = %path.display(), "completed job's file is gone");
            return Ok(None);
        }
    };
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "download".to_string());
    Ok(Some(FileHandoff {
        path,
        content_type: job.media_kind.content_type(),
        file_name,
        size: meta.len(),
    }))
}

/// Result of [`remove_job`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    NotFound,
    /// A worker is running the job; it was cancelled and cleans up on exit.
    Cancelled,
    /// Row purged and artifact removed.
    Removed,
}

/// Delete an owner's job.
///
/// The row is tombstoned first. If the job is not terminal yet and `registry`
/// knows a worker for it, the worker is cancelled and purges the row on its
/// terminal write. Otherwise the row is purged here and the artifact removed
/// best effort. A terminal job has no writes left, so a worker that has not
/// unregistered yet would never see the tombstone. A worker in another process
/// sees the missing row on its next write and cleans up the same way.
pub async fn remove_job(
    db: &JobDb,
    registry: Option<&JobRegistry>,
    id: JobId,
    owner_token: &str,
) -> Result<Removal> {
    let Some(job) = db.tombstone(id, owner_token).await? else {
        return Ok(Removal::NotFound);
    };

    if let Some(registry) = registry.filter(|_| !job.status.is_terminal()) {
        if registry.request_cancel(id) {
            tracing::info!(job_id = id, "removal requested for running job");
            return Ok(Removal::Cancelled);
        }
    }

    if let Some(path) = job.output_path.as_deref() {
        match tokio::fs::remove_file(path).await {
            Ok(()) => tracing::debug!(job_id = id, path, "removed artifact"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(job_id = id, path, "could not remove artifact: {}", e),
        }
    }
    db.purge(id).await?;
    tracing::info!(job_id = id, "job removed");
    Ok(Removal::Removed)
}

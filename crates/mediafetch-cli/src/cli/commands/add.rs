//! `mediafetch add` – validate a URL and queue a job.

use anyhow::Result;
use mediafetch_core::config::MediafetchConfig;
use mediafetch_core::intake::validate_source_url;
use mediafetch_core::job_db::{JobDb, MediaKind, NewJob, QualitySelector};

use super::run::drive_jobs;

pub struct AddRequest {
    pub url: String,
    pub audio: bool,
    pub quality: QualitySelector,
    pub owner: String,
    pub wait: bool,
}

pub async fn run_add(db: &JobDb, cfg: &MediafetchConfig, req: AddRequest) -> Result<()> {
    let url = validate_source_url(&req.url, cfg.allowed_hosts.as_deref())?;
    let kind = if req.audio {
        MediaKind::Audio
    } else {
        MediaKind::Video
    };
    let job = NewJob::new(url.as_str(), kind, req.quality, req.owner);
    let id = db.add_job(&job).await?;
    tracing::info!(job_id = id, kind = kind.as_str(), quality = job.quality.as_str(), "job added");
    println!("Added job {id} ({}, {})", kind.as_str(), job.quality.as_str());

    if req.wait {
        drive_jobs(db, cfg, &[id]).await?;
    }
    Ok(())
}

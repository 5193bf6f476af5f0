//! `mediafetch run` – dispatch pending jobs and follow them to the end.

use anyhow::Result;
use mediafetch_core::config::MediafetchConfig;
use mediafetch_core::dispatcher::Dispatcher;
use mediafetch_core::humanize::format_file_size;
use mediafetch_core::job_db::{JobDb, JobId, JobStatus};
use mediafetch_core::orchestrator::Orchestrator;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

const POLL_INTERVAL: Duration = Duration::from_millis(500);

pub async fn run_pending(db: &JobDb, cfg: &MediafetchConfig, owner: Option<&str>) -> Result<()> {
    let ids = db.pending_job_ids(owner).await?;
    if ids.is_empty() {
        println!("No pending jobs.");
        return Ok(());
    }
    drive_jobs(db, cfg, &ids).await
}

/// Dispatch `ids`, print progress while they run, and shut down gracefully on Ctrl-C.
pub(super) async fn drive_jobs(db: &JobDb, cfg: &MediafetchConfig, ids: &[JobId]) -> Result<()> {
    let orchestrator = Arc::new(Orchestrator::new(db.clone(), cfg)?);
    let dispatcher = Dispatcher::new(orchestrator, cfg.max_concurrent_jobs);
    for &id in ids {
        if let Err(e) = dispatcher.dispatch(id) {
            tracing::warn!(job_id = id, "not dispatched: {}", e);
        }
    }
    tracing::info!(jobs = ids.len(), max_concurrent = cfg.max_concurrent_jobs, "run started");

    let idle = dispatcher.wait_idle();
    tokio::pin!(idle);
    let mut ticker = tokio::time::interval(POLL_INTERVAL);
    let mut shown: HashMap<JobId, (JobStatus, u8)> = HashMap::new();

    loop {
        tokio::select! {
            _ = &mut idle => break,
            res = tokio::signal::ctrl_c() => {
                if let Err(e) = res {
                    tracing::warn!("cannot listen for Ctrl-C: {}", e);
                    continue;
                }
                println!("Interrupted; stopping running jobs...");
                let report = dispatcher.shutdown(cfg.shutdown_grace()).await;
                if !report.aborted.is_empty() {
                    println!(
                        "Jobs {:?} did not stop in time; use `mediafetch reap` if they stay in progress.",
                        report.aborted
                    );
                }
                break;
            }
            _ = ticker.tick() => print_changes(db, ids, &mut shown).await,
        }
    }

    print_changes(db, ids, &mut shown).await;
    Ok(())
}

async fn print_changes(db: &JobDb, ids: &[JobId], shown: &mut HashMap<JobId, (JobStatus, u8)>) {
    for &id in ids {
        let job = match db.get_job(id).await {
            Ok(Some(job)) => job,
            Ok(None) => continue,
            Err(e) => {
                tracing::debug!(job_id = id, "status poll failed: {:#}", e);
                continue;
            }
        };
        let now = (job.status, job.progress_percent);
        if shown.get(&id) == Some(&now) {
            continue;
        }
        shown.insert(id, now);
        let title = job.title.as_deref().unwrap_or("");
        match job.status {
            JobStatus::Completed => println!(
                "  #{:<5} completed  {} {}",
                id,
                job.output_path.as_deref().unwrap_or(title),
                job.output_size_bytes
                    .map(|b| format!("({})", format_file_size(b.max(0) as u64)))
                    .unwrap_or_default()
            ),
            JobStatus::Failed => println!(
                "  #{:<5} failed     {}",
                id,
                job.error_detail.as_deref().unwrap_or("")
            ),
            status => println!("  #{:<5} {:<18} {:>3}%  {}", id, status.as_str(), job.progress_percent, title),
        }
    }
}

//! `mediafetch status` – show one job or list an owner's jobs.

use anyhow::{bail, Result};
use mediafetch_core::handoff::{status_for_owner, JobStatusView};
use mediafetch_core::job_db::{JobDb, JobId};

pub async fn run_status(
    db: &JobDb,
    id: Option<JobId>,
    owner: &str,
    json: bool,
    limit: u32,
) -> Result<()> {
    if let Some(id) = id {
        let Some(view) = status_for_owner(db, id, owner).await? else {
            bail!("job {id} not found");
        };
        if json {
            println!("{}", serde_json::to_string_pretty(&view)?);
        } else {
            print_view(&view);
        }
        return Ok(());
    }

    let jobs = db.list_jobs_for_owner(owner, limit).await?;
    if json {
        let mut views = Vec::with_capacity(jobs.len());
        for j in &jobs {
            if let Some(view) = status_for_owner(db, j.id, owner).await? {
                views.push(view);
            }
        }
        println!("{}", serde_json::to_string_pretty(&views)?);
        return Ok(());
    }

    if jobs.is_empty() {
        println!("No jobs for {owner}.");
    } else {
        println!("{:<6} {:<18} {:<6} {:<5} {}", "ID", "STATUS", "KIND", "PCT", "TITLE / URL");
        for j in jobs {
            println!(
                "{:<6} {:<18} {:<6} {:<5} {}",
                j.id,
                j.status.as_str(),
                j.media_kind.as_str(),
                format!("{}%", j.progress_percent),
                j.title.as_deref().unwrap_or(&j.source_url)
            );
        }
    }
    Ok(())
}

fn print_view(view: &JobStatusView) {
    println!("Job {}: {}", view.id, view.title);
    println!("  status:   {}", view.status);
    println!("  progress: {}%", view.progress);
    println!("  kind:     {}", view.media_kind.as_str());
    if let Some(d) = &view.duration {
        println!("  duration: {d}");
    }
    if let Some(t) = &view.thumbnail {
        println!("  thumb:    {t}");
    }
    if let Some(e) = &view.error_message {
        println!("  error:    {e}");
    }
    if view.file_available {
        println!("  file:     ready");
    }
}

//! `mediafetch reap` – fail jobs whose worker stopped without recording an outcome.

use anyhow::Result;
use mediafetch_core::job_db::JobDb;
use std::time::Duration;

const REAPED_MESSAGE: &str = "Download interrupted";

pub async fn run_reap(db: &JobDb, older_than_mins: u64) -> Result<()> {
    let older_than = Duration::from_secs(older_than_mins.saturating_mul(60));
    let n = db.fail_stale_jobs(older_than, REAPED_MESSAGE).await?;
    tracing::info!(reaped = n, older_than_mins, "liveness sweep done");
    println!("Marked {n} stale job(s) as failed.");
    Ok(())
}

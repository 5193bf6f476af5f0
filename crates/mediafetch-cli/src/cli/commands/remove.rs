//! `mediafetch remove` – delete a job and its file.

use anyhow::{bail, Result};
use mediafetch_core::handoff::{remove_job, Removal};
use mediafetch_core::job_db::{JobDb, JobId};

pub async fn run_remove(db: &JobDb, id: JobId, owner: &str) -> Result<()> {
    // No registry here: a worker in a running `mediafetch run` sees the row
    // gone on its next write and cleans up itself.
    match remove_job(db, None, id, owner).await? {
        Removal::NotFound => bail!("job {id} not found"),
        Removal::Removed | Removal::Cancelled => println!("Removed job {id}"),
    }
    Ok(())
}

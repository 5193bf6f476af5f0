//! CLI for the mediafetch job orchestrator.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use mediafetch_core::config;
use mediafetch_core::job_db::{JobDb, QualitySelector};

use commands::{run_add, run_info, run_pending, run_reap, run_remove, run_status, AddRequest};

/// Owner token used when none is given; the CLI acts as a single local client.
pub const DEFAULT_OWNER: &str = "local";

/// Top-level CLI for mediafetch.
#[derive(Debug, Parser)]
#[command(name = "mediafetch")]
#[command(about = "mediafetch: queue and run media fetch jobs", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Queue a new fetch job.
    Add {
        /// Source page URL (e.g. a video link).
        url: String,
        /// Fetch audio only (MP3); quality is ignored.
        #[arg(long)]
        audio: bool,
        /// Video quality: best, 1080p, 720p, 480p or worst.
        #[arg(long, default_value = "best", value_name = "Q")]
        quality: QualitySelector,
        /// Owner token the job is visible to.
        #[arg(long, default_value = DEFAULT_OWNER, value_name = "TOKEN")]
        owner: String,
        /// Run the job now and wait for it to finish.
        #[arg(long)]
        wait: bool,
    },

    /// Run every pending job and wait until all are finished.
    Run {
        /// Only run jobs of this owner.
        #[arg(long, value_name = "TOKEN")]
        owner: Option<String>,
    },

    /// Show one job, or list an owner's jobs.
    Status {
        /// Job identifier; omit to list jobs.
        id: Option<i64>,
        #[arg(long, default_value = DEFAULT_OWNER, value_name = "TOKEN")]
        owner: String,
        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
        /// Maximum number of jobs listed.
        #[arg(long, default_value = "20", value_name = "N")]
        limit: u32,
    },

    /// Show metadata for a URL without creating a job.
    Info {
        url: String,
    },

    /// Remove a job and its file.
    Remove {
        /// Job identifier.
        id: i64,
        #[arg(long, default_value = DEFAULT_OWNER, value_name = "TOKEN")]
        owner: String,
    },

    /// Mark jobs with no progress for a while as failed.
    Reap {
        /// Jobs not updated for this many minutes are failed.
        #[arg(long, default_value = "60", value_name = "MINUTES")]
        older_than_mins: u64,
    },
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        if let CliCommand::Info { url } = &cli.command {
            return run_info(&cfg, url).await;
        }

        let db = JobDb::open_default(cfg.retry_policy()).await?;
        match cli.command {
            CliCommand::Add {
                url,
                audio,
                quality,
                owner,
                wait,
            } => {
                let req = AddRequest {
                    url,
                    audio,
                    quality,
                    owner,
                    wait,
                };
                run_add(&db, &cfg, req).await?
            }
            CliCommand::Run { owner } => run_pending(&db, &cfg, owner.as_deref()).await?,
            CliCommand::Status {
                id,
                owner,
                json,
                limit,
            } => run_status(&db, id, &owner, json, limit).await?,
            CliCommand::Info { .. } => {}
            CliCommand::Remove { id, owner } => run_remove(&db, id, &owner).await?,
            CliCommand::Reap { older_than_mins } => run_reap(&db, older_than_mins).await?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;

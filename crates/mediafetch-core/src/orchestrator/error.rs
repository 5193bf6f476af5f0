//! Why a job run ended without producing a file.

use std::process::ExitStatus;

/// Internal failure of one job run. The full value is logged; only
/// [`FetchError::user_message`] reaches the job record.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("could not prepare output directory: {0}")]
    OutputDir(#[source] std::io::Error),

    #[error("could not start extraction tool: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("extraction tool exited with {status}")]
    ToolExit { status: ExitStatus },

    #[error("tool reported success but no output file was found")]
    OutputMissing,

    #[error("job cancelled")]
    Cancelled,

    #[error("job store: {0:#}")]
    Store(#[from] anyhow::Error),
}

impl FetchError {
    /// Short, generic text stored as the job's `error_detail`.
    pub fn user_message(&self) -> &'static str {
        match self {
            FetchError::OutputMissing => "Download completed but file not found",
            FetchError::Cancelled => "Download cancelled",
            FetchError::OutputDir(_)
            | FetchError::Spawn(_)
            | FetchError::ToolExit { .. }
            | FetchError::Store(_) => "Download failed",
        }
    }
}

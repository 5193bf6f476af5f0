//! Persistent job store (SQLite via sqlx).
//!
//! Holds one row per fetch job: request parameters, the status state machine,
//! enrichment metadata, progress, and the final artifact. Every access goes
//! through the contention-resilient retry wrapper in [`crate::retry`].

mod db;
mod jobs;
mod types;

pub use db::JobDb;
pub use types::*;

#[cfg(test)]
pub(crate) use db::open_memory;

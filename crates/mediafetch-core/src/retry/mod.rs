//! Retry and backoff for store access under write contention.
//!
//! Every job-store read and write goes through [`run_with_retry`]: errors are
//! classified (locked vs. anything else), locked errors are retried with
//! exponential backoff up to the policy's attempt limit, everything else
//! propagates immediately.

mod classify;
mod policy;
mod run;

pub use classify::{classify_sqlx, is_locked_code, is_locked_message, RetryClassify};
pub use policy::{ErrorKind, RetryDecision, RetryPolicy};
pub use run::run_with_retry;

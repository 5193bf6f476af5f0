//! CLI command handlers, one file per command.

mod add;
mod info;
mod reap;
mod remove;
mod run;
mod status;

pub use add::{run_add, AddRequest};
pub use info::run_info;
pub use reap::run_reap;
pub use remove::run_remove;
pub use run::run_pending;
pub use status::run_status;

pub mod config;
pub mod logging;

pub mod dispatcher;
pub mod handoff;
pub mod humanize;
pub mod intake;
pub mod invoker;
pub mod job_db;
pub mod orchestrator;
pub mod progress;
pub mod retry;

//! Progress stream parsing: turns the tool's line-oriented output into
//! progress updates and a candidate output path.
//!
//! The tool's output is an unversioned text contract. Everything that depends
//! on its exact wording sits behind [`OutputParser`], so a different tool (or a
//! structured event mode) only needs a new implementation.

mod parser;
mod stream;

pub use parser::YtDlpParser;
pub use stream::{merged_lines, LINE_CHANNEL_CAPACITY};

use std::path::Path;

/// One progress report derived from a single output line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressUpdate {
    /// Whole percent, clamped to 0..=100.
    pub percent: u8,
    /// Working title at the time of the report (may be empty).
    pub title: String,
}

/// Consumes one invocation's output, line by line, in order.
///
/// One instance per invocation; it is not restartable.
pub trait OutputParser: Send + Sync {
    /// Feed one line (without trailing newline). Returns a progress update when
    /// the line carried a well-formed percentage.
    fn feed(&mut self, line: &str) -> Option<ProgressUpdate>;

    /// Best candidate for the final output file seen so far.
    fn output_path(&self) -> Option<&Path>;

    /// Title derived from the announced destination, or empty.
    fn working_title(&self) -> &str;
}

//! External extraction tool invocation.
//!
//! Maps a job's media kind and quality to the tool's format selection,
//! builds argument vectors for the metadata and download modes, and runs the
//! bounded metadata probe. Building a command cannot fail: every input is a
//! closed enum or an owned path, so job failures only start once a process
//! is spawned.

mod command;
mod format;
mod metadata;

pub use command::{download_command, metadata_command, ToolCommand, OUTPUT_TEMPLATE};
pub use format::{video_format_selector, AUDIO_FORMAT};
pub use metadata::{parse_metadata_line, probe_metadata, MediaMetadata};

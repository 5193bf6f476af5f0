//! Argument vectors for the extraction tool.

use std::ffi::OsString;
use std::path::Path;
use std::process::Stdio;

use crate::config::ToolConfig;
use crate::job_db::{MediaKind, QualitySelector};

use super::format::{video_format_selector, AUDIO_FORMAT};

/// Output filename template: the tool substitutes the media title and
/// extension, and `--restrict-filenames` strips unsafe characters from the title.
pub const OUTPUT_TEMPLATE: &str = "%(title)s.%(ext)s";

/// A fully built tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    pub program: OsString,
    pub args: Vec<OsString>,
}

impl ToolCommand {
    fn new(tool: &ToolConfig) -> Self {
        Self {
            program: OsString::from(&tool.program),
            args: tool.prefix_args.iter().map(OsString::from).collect(),
        }
    }

    fn arg(&mut self, a: impl Into<OsString>) -> &mut Self {
        self.args.push(a.into());
        self
    }

    /// Spawnable command: no stdin, both output streams piped, killed if the
    /// owning task is dropped.
    pub fn to_command(&self) -> tokio::process::Command {
        let mut cmd = tokio::process::Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    fn common_tail(&mut self, tool: &ToolConfig, url: &str) {
        if let Some(ua) = &tool.user_agent {
            self.arg("--user-agent").arg(ua);
        }
        // One job fetches exactly one item even if the URL names a playlist.
        self.arg("--no-playlist");
        for extra in &tool.extra_args {
            self.arg(extra);
        }
        self.arg("--").arg(url);
    }
}

/// Metadata-only invocation: one JSON record on the first stdout line.
pub fn metadata_command(tool: &ToolConfig, url: &str) -> ToolCommand {
    let mut cmd = ToolCommand::new(tool);
    cmd.arg("--dump-json")
        .arg("--no-download")
        .arg("--no-warnings");
    cmd.common_tail(tool, url);
    cmd
}

/// Download invocation writing into `output_dir` with line-oriented progress.
pub fn download_command(
    tool: &ToolConfig,
    url: &str,
    kind: MediaKind,
    quality: QualitySelector,
    output_dir: &Path,
) -> ToolCommand {
    let mut cmd = ToolCommand::new(tool);
    match kind {
        MediaKind::Video => {
            cmd.arg("-f")
                .arg(video_format_selector(quality))
                .arg("--merge-output-format")
                .arg("mp4");
        }
        MediaKind::Audio => {
            cmd.arg("-f")
                .arg(AUDIO_FORMAT)
                .arg("--extract-audio")
                .arg("--audio-format")
                .arg("mp3")
                .arg("--audio-quality")
                .arg("0");
        }
    }
    cmd.arg("-o")
        .arg(output_dir.join(OUTPUT_TEMPLATE))
        .arg("--newline")
        .arg("--progress")
        .arg("--restrict-filenames");
    cmd.common_tail(tool, url);
    cmd
}

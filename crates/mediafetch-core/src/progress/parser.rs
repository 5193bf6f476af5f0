//! Parser for yt-dlp style `--newline --progress` output.

use std::path::{Path, PathBuf};

use super::{OutputParser, ProgressUpdate};

const DOWNLOAD_TAG: &str = "[download]";
const MERGER_TAG: &str = "[Merger]";
const EXTRACT_AUDIO_TAG: &str = "[ExtractAudio]";
const DESTINATION: &str = "Destination:";
const MERGING_INTO: &str = "Merging formats into";

/// Recognised line shapes. Anything else is ignored.
#[derive(Debug, PartialEq)]
enum Line<'a> {
    Destination(&'a str),
    Percent(&'a str),
    Merged(&'a str),
    AudioExtracted(&'a str),
    Other,
}

fn classify(line: &str) -> Line<'_> {
    if line.contains(DOWNLOAD_TAG) {
        if let Some(dest) = after_marker(line, DESTINATION) {
            return Line::Destination(dest);
        }
        if let Some(token) = percent_token(line) {
            return Line::Percent(token);
        }
        return Line::Other;
    }
    if line.contains(MERGER_TAG) && line.contains(MERGING_INTO) {
        return match last_quoted(line) {
            Some(path) => Line::Merged(path),
            None => Line::Other,
        };
    }
    if line.contains(EXTRACT_AUDIO_TAG) {
        if let Some(dest) = after_marker(line, DESTINATION) {
            return Line::AudioExtracted(dest);
        }
    }
    Line::Other
}

/// Text after the last occurrence of `marker`, trimmed; `None` if empty.
fn after_marker<'a>(line: &'a str, marker: &str) -> Option<&'a str> {
    let (_, rest) = line.rsplit_once(marker)?;
    let rest = rest.trim();
    (!rest.is_empty()).then_some(rest)
}

/// The whitespace-separated token directly in front of the first `%`.
fn percent_token(line: &str) -> Option<&str> {
    let (head, _) = line.split_once('%')?;
    head.split_whitespace().last()
}

/// Text between the last pair of double quotes.
fn last_quoted(line: &str) -> Option<&str> {
    let end = line.rfind('"')?;
    let start = line[..end].rfind('"')?;
    let inner = &line[start + 1..end];
    (!inner.is_empty()).then_some(inner)
}

fn parse_percent(token: &str) -> Option<u8> {
    let value: f64 = token.parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    Some(value.trunc().clamp(0.0, 100.0) as u8)
}

/// Holds only the current candidate path and working title.
#[derive(Debug, Default)]
pub struct YtDlpParser {
    path: Option<PathBuf>,
    title: String,
}

impl YtDlpParser {
    pub fn new() -> Self {
        Self::default()
    }
}

impl OutputParser for YtDlpParser {
    fn feed(&mut self, line: &str) -> Option<ProgressUpdate> {
        match classify(line.trim()) {
            Line::Destination(dest) => {
                let path = PathBuf::from(dest);
                self.title = path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default();
                self.path = Some(path);
                None
            }
            Line::Percent(token) => parse_percent(token).map(|percent| ProgressUpdate {
                percent,
                title: self.title.clone(),
            }),
            Line::Merged(path) | Line::AudioExtracted(path) => {
                self.path = Some(PathBuf::from(path));
                None
            }
            Line::Other => None,
        }
    }

    fn output_path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn working_title(&self) -> &str {
        &self.title
    }
}

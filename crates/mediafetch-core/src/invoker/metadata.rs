//! Bounded metadata-only probe.
//!
//! Best effort by contract: a non-zero exit, a timeout, a missing tool, or an
//! unparseable record all yield `None` and are only logged.

use serde::Deserialize;
use std::time::Duration;

use crate::config::ToolConfig;
use crate::job_db::JobEnrichment;

use super::command::metadata_command;

/// Fields read from the tool's JSON record. Everything is optional; unknown
/// fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct MediaMetadata {
    pub id: Option<String>,
    pub title: Option<String>,
    pub thumbnail: Option<String>,
    /// Seconds; the tool may report fractional values.
    pub duration: Option<f64>,
    pub uploader: Option<String>,
    pub view_count: Option<u64>,
    pub upload_date: Option<String>,
    pub webpage_url: Option<String>,
    pub is_live: Option<bool>,
    pub age_limit: Option<u32>,
}

impl MediaMetadata {
    pub fn duration_secs(&self) -> Option<i64> {
        self.duration
            .filter(|d| d.is_finite() && *d >= 0.0)
            .map(|d| d.round() as i64)
    }

    /// The subset persisted on the job row.
    pub fn to_enrichment(&self) -> JobEnrichment {
        let non_empty = |s: &Option<String>| s.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(String::from);
        JobEnrichment {
            title: non_empty(&self.title),
            thumbnail_url: non_empty(&self.thumbnail),
            uploader: non_empty(&self.uploader),
            duration_secs: self.duration_secs(),
        }
    }
}

/// Parse the first line of the tool's metadata output.
pub fn parse_metadata_line(stdout: &str) -> Option<MediaMetadata> {
    let first = stdout.lines().map(str::trim).find(|l| !l.is_empty())?;
    match serde_json::from_str::<MediaMetadata>(first) {
        Ok(meta) => Some(meta),
        Err(e) => {
            tracing::warn!("metadata record did not parse: {}", e);
            None
        }
    }
}

/// Run the tool in metadata mode, bounded by `timeout`.
pub async fn probe_metadata(tool: &ToolConfig, url: &str, timeout: Duration) -> Option<MediaMetadata> {
    let mut cmd = metadata_command(tool, url).to_command();
    let output = match tokio::time::timeout(timeout, cmd.output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            tracing::warn!(program = %tool.program, "metadata probe could not start: {}", e);
            return None;
        }
        Err(_) => {
            // Dropping the output future kills the child (kill_on_drop).
            tracing::warn!(timeout_secs = timeout.as_secs(), "metadata probe timed out");
            return None;
        }
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        tracing::warn!(
            status = %output.status,
            "metadata probe failed: {}",
            stderr.lines().last().unwrap_or_default()
        );
        return None;
    }

    parse_metadata_line(&String::from_utf8_lossy(&output.stdout))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_first_record_only() {
        let out = concat!(
            r#"{"id":"abc","title":"A Song","thumbnail":"https://i/x.jpg","duration":212.4,"uploader":"Someone","view_count":1200,"extra":{"nested":true}}"#,
            "\n",
            r#"{"id":"second"}"#,
            "\n"
        );
        let meta = parse_metadata_line(out).unwrap();
        assert_eq!(meta.id.as_deref(), Some("abc"));
        assert_eq!(meta.view_count, Some(1200));
        assert_eq!(meta.duration_secs(), Some(212));

        let e = meta.to_enrichment();
        assert_eq!(e.title.as_deref(), Some("A Song"));
        assert_eq!(e.thumbnail_url.as_deref(), Some("https://i/x.jpg"));
        assert_eq!(e.uploader.as_deref(), Some("Someone"));
        assert_eq!(e.duration_secs, Some(212));
    }

    #[test]
    fn garbage_or_empty_yields_none() {
        assert!(parse_metadata_line("").is_none());
        assert!(parse_metadata_line("ERROR: Video unavailable").is_none());
    }

    #[test]
    fn blank_fields_are_not_enrichment() {
        let meta = parse_metadata_line(r#"{"title":"  ","duration":null}"#).unwrap();
        let e = meta.to_enrichment();
        assert!(e.title.is_none());
        assert!(e.duration_secs.is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn missing_tool_yields_none() {
        let tool = ToolConfig {
            program: "/nonexistent/mediafetch-test-tool".to_string(),
            ..ToolConfig::default()
        };
        assert!(probe_metadata(&tool, "https://youtu.be/x", Duration::from_secs(5))
            .await
            .is_none());
    }
}

//! Types used by the job store.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Job identifier.
pub type JobId = i64;

/// Job status state machine:
/// `pending → fetching_metadata → downloading → {completed | failed}`.
///
/// Transitions only move forward and both terminal states are final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    FetchingMetadata,
    Downloading,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::FetchingMetadata => "fetching_metadata",
            JobStatus::Downloading => "downloading",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "pending" => JobStatus::Pending,
            "fetching_metadata" => JobStatus::FetchingMetadata,
            "downloading" => JobStatus::Downloading,
            "completed" => JobStatus::Completed,
            _ => JobStatus::Failed,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Whether the state machine allows moving from `self` to `next`.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        use JobStatus::*;
        matches!(
            (self, next),
            (Pending, FetchingMetadata)
                | (FetchingMetadata, Downloading)
                | (Downloading, Completed)
                | (Pending | FetchingMetadata | Downloading, Failed)
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the job fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Video,
    Audio,
}

impl MediaKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MediaKind::Video => "video",
            MediaKind::Audio => "audio",
        }
    }

    /// MIME type handed to the file-serving side.
    pub fn content_type(self) -> &'static str {
        match self {
            MediaKind::Video => "video/mp4",
            MediaKind::Audio => "audio/mpeg",
        }
    }
}

impl FromStr for MediaKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "video" | "mp4" => Ok(MediaKind::Video),
            "audio" | "mp3" => Ok(MediaKind::Audio),
            other => Err(format!("unknown media kind: {other}")),
        }
    }
}

/// Requested video quality. Audio jobs always use [`QualitySelector::Best`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum QualitySelector {
    #[default]
    #[serde(rename = "best")]
    Best,
    #[serde(rename = "1080p")]
    Max1080,
    #[serde(rename = "720p")]
    Max720,
    #[serde(rename = "480p")]
    Max480,
    #[serde(rename = "worst")]
    Worst,
}

impl QualitySelector {
    pub fn as_str(self) -> &'static str {
        match self {
            QualitySelector::Best => "best",
            QualitySelector::Max1080 => "1080p",
            QualitySelector::Max720 => "720p",
            QualitySelector::Max480 => "480p",
            QualitySelector::Worst => "worst",
        }
    }

    /// Height ceiling in pixels for the capped tiers.
    pub fn height_ceiling(self) -> Option<u32> {
        match self {
            QualitySelector::Max1080 => Some(1080),
            QualitySelector::Max720 => Some(720),
            QualitySelector::Max480 => Some(480),
            QualitySelector::Best | QualitySelector::Worst => None,
        }
    }
}

impl FromStr for QualitySelector {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "best" => Ok(QualitySelector::Best),
            "1080p" | "1080" => Ok(QualitySelector::Max1080),
            "720p" | "720" => Ok(QualitySelector::Max720),
            "480p" | "480" => Ok(QualitySelector::Max480),
            "worst" => Ok(QualitySelector::Worst),
            other => Err(format!("unknown quality: {other}")),
        }
    }
}

/// A validated fetch request as handed over by intake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewJob {
    pub source_url: String,
    pub media_kind: MediaKind,
    pub quality: QualitySelector,
    pub owner_token: String,
}

impl NewJob {
    /// Build a request; audio requests ignore the quality and fetch the best audio stream.
    pub fn new(
        source_url: impl Into<String>,
        media_kind: MediaKind,
        quality: QualitySelector,
        owner_token: impl Into<String>,
    ) -> Self {
        let quality = match media_kind {
            MediaKind::Audio => QualitySelector::Best,
            MediaKind::Video => quality,
        };
        Self {
            source_url: source_url.into(),
            media_kind,
            quality,
            owner_token: owner_token.into(),
        }
    }
}

/// Best-effort metadata gathered before the download starts. Each field is
/// written at most once; later writes never replace a value already stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobEnrichment {
    pub title: Option<String>,
    pub thumbnail_url: Option<String>,
    pub uploader: Option<String>,
    pub duration_secs: Option<i64>,
}

/// Full job row.
#[derive(Debug, Clone)]
pub struct JobRecord {
    pub id: JobId,
    pub owner_token: String,
    pub source_url: String,
    pub media_kind: MediaKind,
    pub quality: QualitySelector,
    pub status: JobStatus,
    pub progress_percent: u8,
    pub title: Option<String>,
    pub thumbnail_url: Option<String>,
    pub uploader: Option<String>,
    pub duration_secs: Option<i64>,
    pub output_path: Option<String>,
    pub output_size_bytes: Option<i64>,
    pub error_detail: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
    pub completed_at: Option<i64>,
}

/// Summary view used for per-owner listings.
#[derive(Debug, Clone)]
pub struct JobSummary {
    pub id: JobId,
    pub source_url: String,
    pub media_kind: MediaKind,
    pub status: JobStatus,
    pub progress_percent: u8,
    pub title: Option<String>,
    pub created_at: i64,
}

/// Result of a guarded state write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The row was updated.
    Applied,
    /// The row is still present but its status does not allow this write.
    Stale(JobStatus),
    /// The row was deleted while the job ran; the caller should clean up.
    Tombstoned,
    /// No such row.
    Missing,
}

impl WriteOutcome {
    pub fn applied(self) -> bool {
        self == WriteOutcome::Applied
    }
}

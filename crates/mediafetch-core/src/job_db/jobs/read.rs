//! Job read operations: get, owner-scoped get, list, pending ids.
//!
//! Tombstoned rows are invisible to every read.

use anyhow::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use super::super::db::JobDb;
use super::super::types::{JobId, JobRecord, JobStatus, JobSummary, MediaKind, QualitySelector};

pub(crate) const RECORD_COLUMNS: &str = r#"
    id, owner_token, source_url, media_kind, quality, status, progress,
    title, thumbnail_url, uploader, duration_secs,
    output_path, output_size, error_detail,
    created_at, updated_at, completed_at
"#;

fn media_kind_from_db(s: &str) -> MediaKind {
    s.parse().unwrap_or(MediaKind::Video)
}

fn quality_from_db(s: &str) -> QualitySelector {
    s.parse().unwrap_or_default()
}

fn progress_from_db(p: i64) -> u8 {
    p.clamp(0, 100) as u8
}

pub(crate) fn record_from_row(row: &SqliteRow) -> JobRecord {
    let media_kind: String = row.get("media_kind");
    let quality: String = row.get("quality");
    let status: String = row.get("status");
    let progress: i64 = row.get("progress");

    JobRecord {
        id: row.get("id"),
        owner_token: row.get("owner_token"),
        source_url: row.get("source_url"),
        media_kind: media_kind_from_db(&media_kind),
        quality: quality_from_db(&quality),
        status: JobStatus::from_str(&status),
        progress_percent: progress_from_db(progress),
        title: row.get("title"),
        thumbnail_url: row.get("thumbnail_url"),
        uploader: row.get("uploader"),
        duration_secs: row.get("duration_secs"),
        output_path: row.get("output_path"),
        output_size_bytes: row.get("output_size"),
        error_detail: row.get("error_detail"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        completed_at: row.get("completed_at"),
    }
}

impl JobDb {
    /// Fetch a single live job row.
    pub async fn get_job(&self, id: JobId) -> Result<Option<JobRecord>> {
        let sql = format!("SELECT {RECORD_COLUMNS} FROM jobs WHERE id = ?1 AND deleted_at IS NULL");
        let sql = sql.as_str();
        let pool = &self.pool;
        let row = self
            .with_retry("get_job", move || async move {
                sqlx::query(sql).bind(id).fetch_optional(pool).await
            })
            .await?;
        Ok(row.as_ref().map(record_from_row))
    }

    /// Fetch a job only if it belongs to `owner_token`. A mismatched owner
    /// looks exactly like a missing job.
    pub async fn get_job_for_owner(&self, id: JobId, owner_token: &str) -> Result<Option<JobRecord>> {
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM jobs WHERE id = ?1 AND owner_token = ?2 AND deleted_at IS NULL"
        );
        let sql = sql.as_str();
        let pool = &self.pool;
        let row = self
            .with_retry("get_job_for_owner", move || async move {
                sqlx::query(sql)
                    .bind(id)
                    .bind(owner_token)
                    .fetch_optional(pool)
                    .await
            })
            .await?;
        Ok(row.as_ref().map(record_from_row))
    }

    /// List an owner's jobs, newest first.
    pub async fn list_jobs_for_owner(&self, owner_token: &str, limit: u32) -> Result<Vec<JobSummary>> {
        let pool = &self.pool;
        let rows = self
            .with_retry("list_jobs_for_owner", move || async move {
                sqlx::query(
                    r#"
                    SELECT id, source_url, media_kind, status, progress, title, created_at
                    FROM jobs
                    WHERE owner_token = ?1 AND deleted_at IS NULL
                    ORDER BY created_at DESC, id DESC
                    LIMIT ?2
                    "#,
                )
                .bind(owner_token)
                .bind(i64::from(limit))
                .fetch_all(pool)
                .await
            })
            .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let media_kind: String = row.get("media_kind");
            let status: String = row.get("status");
            let progress: i64 = row.get("progress");
            out.push(JobSummary {
                id: row.get("id"),
                source_url: row.get("source_url"),
                media_kind: media_kind_from_db(&media_kind),
                status: JobStatus::from_str(&status),
                progress_percent: progress_from_db(progress),
                title: row.get("title"),
                created_at: row.get("created_at"),
            });
        }
        Ok(out)
    }

    /// Ids of pending jobs, oldest first; optionally restricted to one owner.
    pub async fn pending_job_ids(&self, owner_token: Option<&str>) -> Result<Vec<JobId>> {
        let pool = &self.pool;
        let rows = self
            .with_retry("pending_job_ids", move || async move {
                sqlx::query(
                    r#"
                    SELECT id FROM jobs
                    WHERE status = 'pending'
                      AND deleted_at IS NULL
                      AND (?1 IS NULL OR owner_token = ?1)
                    ORDER BY id ASC
                    "#,
                )
                .bind(owner_token)
                .fetch_all(pool)
                .await
            })
            .await?;
        Ok(rows.iter().map(|r| r.get::<i64, _>("id")).collect())
    }
}

//! Job write operations: add, guarded state transitions, progress, tombstone, purge.
//!
//! Every transition is a single guarded UPDATE: the `WHERE` clause names the
//! statuses it may move from and excludes tombstoned rows, so a write that lost
//! a race reports why instead of silently reviving or rewinding a job.

use anyhow::Result;
use sqlx::{Row, SqliteConnection};
use std::time::Duration;

use super::super::db::{unix_timestamp, JobDb};
use super::super::types::{JobEnrichment, JobId, JobRecord, JobStatus, NewJob, WriteOutcome};
use super::read::{record_from_row, RECORD_COLUMNS};

/// Explain why a guarded UPDATE touched no row.
async fn skipped_outcome(
    conn: &mut SqliteConnection,
    id: JobId,
) -> std::result::Result<WriteOutcome, sqlx::Error> {
    let row = sqlx::query("SELECT status, deleted_at FROM jobs WHERE id = ?1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    let Some(row) = row else {
        return Ok(WriteOutcome::Missing);
    };
    let deleted_at: Option<i64> = row.get("deleted_at");
    if deleted_at.is_some() {
        return Ok(WriteOutcome::Tombstoned);
    }
    let status: String = row.get("status");
    Ok(WriteOutcome::Stale(JobStatus::from_str(&status)))
}

impl JobDb {
    /// Insert a new pending job. Intake validates the request beforehand.
    pub async fn add_job(&self, job: &NewJob) -> Result<JobId> {
        let pool = &self.pool;
        self.with_retry("add_job", move || async move {
            let now = unix_timestamp();
            let mut tx = pool.begin().await?;
            let id = sqlx::query(
                r#"
                INSERT INTO jobs (
                    owner_token, source_url, media_kind, quality,
                    status, progress, created_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6, ?6)
                "#,
            )
            .bind(&job.owner_token)
            .bind(&job.source_url)
            .bind(job.media_kind.as_str())
            .bind(job.quality.as_str())
            .bind(JobStatus::Pending.as_str())
            .bind(now)
            .execute(&mut *tx)
            .await?
            .last_insert_rowid();
            tx.commit().await?;
            Ok(id)
        })
        .await
    }

    /// `pending → fetching_metadata`.
    pub async fn begin_metadata(&self, id: JobId) -> Result<WriteOutcome> {
        self.transition(
            "begin_metadata",
            id,
            JobStatus::FetchingMetadata,
            "status = 'pending'",
        )
        .await
    }

    /// `fetching_metadata → downloading`.
    pub async fn begin_download(&self, id: JobId) -> Result<WriteOutcome> {
        self.transition(
            "begin_download",
            id,
            JobStatus::Downloading,
            "status = 'fetching_metadata'",
        )
        .await
    }

    async fn transition(
        &self,
        op: &'static str,
        id: JobId,
        next: JobStatus,
        guard: &'static str,
    ) -> Result<WriteOutcome> {
        let sql = format!(
            "UPDATE jobs SET status = ?1, updated_at = ?2 WHERE id = ?3 AND {guard} AND deleted_at IS NULL"
        );
        let sql = sql.as_str();
        let pool = &self.pool;
        self.with_retry(op, move || async move {
            let mut tx = pool.begin().await?;
            let r = sqlx::query(sql)
                .bind(next.as_str())
                .bind(unix_timestamp())
                .bind(id)
                .execute(&mut *tx)
                .await?;
            let outcome = if r.rows_affected() == 1 {
                WriteOutcome::Applied
            } else {
                skipped_outcome(&mut tx, id).await?
            };
            tx.commit().await?;
            Ok(outcome)
        })
        .await
    }

    /// Store enrichment metadata. Fields already set are left untouched.
    pub async fn apply_enrichment(&self, id: JobId, meta: &JobEnrichment) -> Result<WriteOutcome> {
        let pool = &self.pool;
        self.with_retry("apply_enrichment", move || async move {
            let mut tx = pool.begin().await?;
            let r = sqlx::query(
                r#"
                UPDATE jobs
                SET title = COALESCE(title, ?1),
                    thumbnail_url = COALESCE(thumbnail_url, ?2),
                    uploader = COALESCE(uploader, ?3),
                    duration_secs = COALESCE(duration_secs, ?4),
                    updated_at = ?5
                WHERE id = ?6
                  AND status IN ('pending', 'fetching_metadata', 'downloading')
                  AND deleted_at IS NULL
                "#,
            )
            .bind(meta.title.as_deref())
            .bind(meta.thumbnail_url.as_deref())
            .bind(meta.uploader.as_deref())
            .bind(meta.duration_secs)
            .bind(unix_timestamp())
            .bind(id)
            .execute(&mut *tx)
            .await?;
            let outcome = if r.rows_affected() == 1 {
                WriteOutcome::Applied
            } else {
                skipped_outcome(&mut tx, id).await?
            };
            tx.commit().await?;
            Ok(outcome)
        })
        .await
    }

    /// Record download progress; `title` only fills a title that is still unset.
    pub async fn record_progress(
        &self,
        id: JobId,
        percent: u8,
        title: Option<&str>,
    ) -> Result<WriteOutcome> {
        let percent = i64::from(percent.min(100));
        let pool = &self.pool;
        self.with_retry("record_progress", move || async move {
            let mut tx = pool.begin().await?;
            let r = sqlx::query(
                r#"
                UPDATE jobs
                SET progress = ?1,
                    title = COALESCE(title, ?2),
                    updated_at = ?3
                WHERE id = ?4
                  AND status = 'downloading'
                  AND deleted_at IS NULL
                "#,
            )
            .bind(percent)
            .bind(title)
            .bind(unix_timestamp())
            .bind(id)
            .execute(&mut *tx)
            .await?;
            let outcome = if r.rows_affected() == 1 {
                WriteOutcome::Applied
            } else {
                skipped_outcome(&mut tx, id).await?
            };
            tx.commit().await?;
            Ok(outcome)
        })
        .await
    }

    /// `downloading → completed`, with the final artifact and 100% progress.
    pub async fn complete(&self, id: JobId, output_path: &str, size_bytes: i64) -> Result<WriteOutcome> {
        let pool = &self.pool;
        self.with_retry("complete", move || async move {
            let now = unix_timestamp();
            let mut tx = pool.begin().await?;
            let r = sqlx::query(
                r#"
                UPDATE jobs
                SET status = 'completed',
                    progress = 100,
                    output_path = ?1,
                    output_size = ?2,
                    error_detail = NULL,
                    completed_at = ?3,
                    updated_at = ?3
                WHERE id = ?4
                  AND status = 'downloading'
                  AND deleted_at IS NULL
                "#,
            )
            .bind(output_path)
            .bind(size_bytes)
            .bind(now)
            .bind(id)
            .execute(&mut *tx)
            .await?;
            let outcome = if r.rows_affected() == 1 {
                WriteOutcome::Applied
            } else {
                skipped_outcome(&mut tx, id).await?
            };
            tx.commit().await?;
            Ok(outcome)
        })
        .await
    }

    /// Any non-terminal status `→ failed` with a short user-visible message.
    pub async fn fail(&self, id: JobId, detail: &str) -> Result<WriteOutcome> {
        let pool = &self.pool;
        self.with_retry("fail", move || async move {
            let mut tx = pool.begin().await?;
            let r = sqlx::query(
                r#"
                UPDATE jobs
                SET status = 'failed',
                    error_detail = ?1,
                    output_path = NULL,
                    output_size = NULL,
                    updated_at = ?2
                WHERE id = ?3
                  AND status IN ('pending', 'fetching_metadata', 'downloading')
                  AND deleted_at IS NULL
                "#,
            )
            .bind(detail)
            .bind(unix_timestamp())
            .bind(id)
            .execute(&mut *tx)
            .await?;
            let outcome = if r.rows_affected() == 1 {
                WriteOutcome::Applied
            } else {
                skipped_outcome(&mut tx, id).await?
            };
            tx.commit().await?;
            Ok(outcome)
        })
        .await
    }

    /// Mark an owner's job as deleted and return its last state.
    ///
    /// The row stays until [`JobDb::purge`] so a running worker can tell that
    /// its job was removed instead of writing into a reused id.
    pub async fn tombstone(&self, id: JobId, owner_token: &str) -> Result<Option<JobRecord>> {
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM jobs WHERE id = ?1 AND owner_token = ?2 AND deleted_at IS NULL"
        );
        let sql = sql.as_str();
        let pool = &self.pool;
        let row = self
            .with_retry("tombstone", move || async move {
                let mut tx = pool.begin().await?;
                let row = sqlx::query(sql)
                    .bind(id)
                    .bind(owner_token)
                    .fetch_optional(&mut *tx)
                    .await?;
                if row.is_some() {
                    sqlx::query("UPDATE jobs SET deleted_at = ?1 WHERE id = ?2")
                        .bind(unix_timestamp())
                        .bind(id)
                        .execute(&mut *tx)
                        .await?;
                }
                tx.commit().await?;
                Ok(row)
            })
            .await?;
        Ok(row.as_ref().map(record_from_row))
    }

    /// Permanently remove a tombstoned row. Returns whether a row was removed.
    pub async fn purge(&self, id: JobId) -> Result<bool> {
        let pool = &self.pool;
        self.with_retry("purge", move || async move {
            let mut tx = pool.begin().await?;
            let r = sqlx::query("DELETE FROM jobs WHERE id = ?1 AND deleted_at IS NOT NULL")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            tx.commit().await?;
            Ok(r.rows_affected() > 0)
        })
        .await
    }

    /// Fail every live, non-terminal job not updated within `older_than`.
    /// Operator tool for workers that died without recording an outcome.
    /// Returns the number of jobs failed.
    pub async fn fail_stale_jobs(&self, older_than: Duration, detail: &str) -> Result<u64> {
        let cutoff = unix_timestamp() - older_than.as_secs() as i64;
        let pool = &self.pool;
        self.with_retry("fail_stale_jobs", move || async move {
            let mut tx = pool.begin().await?;
            let r = sqlx::query(
                r#"
                UPDATE jobs
                SET status = 'failed',
                    error_detail = ?1,
                    updated_at = ?2
                WHERE status IN ('pending', 'fetching_metadata', 'downloading')
                  AND deleted_at IS NULL
                  AND updated_at < ?3
                "#,
            )
            .bind(detail)
            .bind(unix_timestamp())
            .bind(cutoff)
            .execute(&mut *tx)
            .await?;
            tx.commit().await?;
            Ok(r.rows_affected())
        })
        .await
    }
}

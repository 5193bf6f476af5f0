//! SQLite-backed job store: connection, migrations, retry wrapper, timestamps.
//!
//! Row reads live in `jobs::read`, state writes in `jobs::write`.

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::future::Future;
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::retry::{run_with_retry, RetryPolicy};

/// How long SQLite itself waits on a busy lock before surfacing SQLITE_BUSY
/// to the retry wrapper.
const SQLITE_BUSY_TIMEOUT: Duration = Duration::from_millis(250);

/// Handle to the SQLite-backed job store.
///
/// The database file is stored under the XDG state directory:
/// `~/.local/state/mediafetch/jobs.db` on Debian.
#[derive(Clone)]
pub struct JobDb {
    pub(crate) pool: Pool<Sqlite>,
    pub(crate) retry: RetryPolicy,
}

impl JobDb {
    /// Open (or create) the default job store and run migrations.
    pub async fn open_default(retry: RetryPolicy) -> Result<Self> {
        let xdg_dirs = xdg::BaseDirectories::with_prefix("mediafetch")?;
        let db_path = xdg_dirs.get_state_home().join("jobs.db");
        Self::open_at(&db_path, retry).await
    }

    /// Open (or create) the store at a specific path. Creates parent dirs if needed.
    pub async fn open_at(path: impl AsRef<Path>, retry: RetryPolicy) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(SQLITE_BUSY_TIMEOUT);
        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .connect_with(options)
            .await
            .with_context(|| format!("open job store {}", path.display()))?;

        let db = JobDb { pool, retry };
        db.migrate().await?;
        Ok(db)
    }

    async fn migrate(&self) -> Result<()> {
        // - `deleted_at` is the tombstone: set when a job is removed while its
        //   worker may still be running; reads ignore tombstoned rows.
        // - `updated_at` drives the operator liveness sweep.
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS jobs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                owner_token TEXT NOT NULL,
                source_url TEXT NOT NULL,
                media_kind TEXT NOT NULL,
                quality TEXT NOT NULL,
                status TEXT NOT NULL,
                progress INTEGER NOT NULL DEFAULT 0,
                title TEXT,
                thumbnail_url TEXT,
                uploader TEXT,
                duration_secs INTEGER,
                output_path TEXT,
                output_size INTEGER,
                error_detail TEXT,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                completed_at INTEGER,
                deleted_at INTEGER
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS jobs_owner_created
            ON jobs (owner_token, created_at)
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Run one store operation under the contention retry policy.
    ///
    /// `f` runs once per attempt and must do its work inside its own transaction.
    pub(crate) async fn with_retry<T, F, Fut>(&self, op: &'static str, f: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, sqlx::Error>>,
    {
        run_with_retry(&self.retry, op, f)
            .await
            .with_context(|| format!("job store: {op}"))
    }
}

/// Current time as Unix seconds (for DB timestamps).
pub(crate) fn unix_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

/// Open an in-memory store for tests (no disk I/O).
#[cfg(test)]
pub(crate) async fn open_memory() -> Result<JobDb> {
    // Single connection so the pool never hands back a different empty DB.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;
    let db = JobDb {
        pool,
        retry: RetryPolicy::default(),
    };
    db.migrate().await?;
    Ok(db)
}

//! Classify store errors into retry policy error kinds.

use crate::retry::policy::ErrorKind;

/// Errors that can tell the retry loop whether they are worth another attempt.
pub trait RetryClassify {
    fn retry_kind(&self) -> ErrorKind;
}

impl RetryClassify for sqlx::Error {
    fn retry_kind(&self) -> ErrorKind {
        classify_sqlx(self)
    }
}

/// SQLite result codes (primary or extended) meaning "someone else holds the lock".
///
/// Extended codes keep the primary code in the low byte, e.g. SQLITE_BUSY_SNAPSHOT = 517.
pub fn is_locked_code(code: &str) -> bool {
    const SQLITE_BUSY: i64 = 5;
    const SQLITE_LOCKED: i64 = 6;
    match code.trim().parse::<i64>() {
        Ok(n) => matches!(n & 0xff, SQLITE_BUSY | SQLITE_LOCKED),
        Err(_) => false,
    }
}

pub fn is_locked_message(message: &str) -> bool {
    let m = message.to_ascii_lowercase();
    m.contains("database is locked")
        || m.contains("database table is locked")
        || m.contains("database is busy")
}

/// Classify a sqlx error: only lock contention is retryable.
pub fn classify_sqlx(e: &sqlx::Error) -> ErrorKind {
    match e {
        sqlx::Error::Database(db) => {
            let locked = db.code().as_deref().map(is_locked_code).unwrap_or(false)
                || is_locked_message(db.message());
            if locked {
                ErrorKind::Locked
            } else {
                ErrorKind::Other
            }
        }
        _ => ErrorKind::Other,
    }
}

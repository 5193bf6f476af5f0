//! Retry loop: run an async operation until success or policy says stop.

use std::fmt::Display;
use std::future::Future;

use super::classify::RetryClassify;
use super::policy::{ErrorKind, RetryDecision, RetryPolicy};

/// Runs `f` until it succeeds or the retry policy says to stop.
///
/// `f` is called once per attempt and must open its own transaction so each
/// attempt commits or rolls back as a unit. On a locked failure the loop sleeps
/// for the backoff duration and tries again; any other error is returned at once.
pub async fn run_with_retry<T, E, F, Fut>(policy: &RetryPolicy, op: &str, mut f: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: RetryClassify + Display,
{
    let mut attempt = 1u32;
    loop {
        match f().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                let kind = e.retry_kind();
                match policy.decide(attempt, kind) {
                    RetryDecision::NoRetry => {
                        if kind == ErrorKind::Locked {
                            tracing::warn!(op, attempt, "store still locked, giving up: {}", e);
                        }
                        return Err(e);
                    }
                    RetryDecision::RetryAfter(d) => {
                        tracing::debug!(op, attempt, delay_ms = d.as_millis() as u64, "store locked, retrying");
                        tokio::time::sleep(d).await;
                        attempt += 1;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;
    use tokio::time::Instant;

    #[derive(Debug)]
    enum FakeError {
        Locked,
        Broken,
    }

    impl Display for FakeError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                FakeError::Locked => write!(f, "database is locked"),
                FakeError::Broken => write!(f, "no such table: jobs"),
            }
        }
    }

    impl RetryClassify for FakeError {
        fn retry_kind(&self) -> ErrorKind {
            match self {
                FakeError::Locked => ErrorKind::Locked,
                FakeError::Broken => ErrorKind::Other,
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn locked_twice_then_succeeds_after_100_and_200ms() {
        let calls = AtomicU32::new(0);
        let mut stamps = Vec::new();
        let start = Instant::now();
        let result: Result<u32, FakeError> = run_with_retry(&RetryPolicy::default(), "test", || {
            stamps.push(start.elapsed());
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if n <= 2 {
                    Err(FakeError::Locked)
                } else {
                    Ok(n)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(stamps[1] - stamps[0], Duration::from_millis(100));
        assert_eq!(stamps[2] - stamps[1], Duration::from_millis(200));
    }

    #[tokio::test(start_paused = true)]
    async fn locked_five_times_gives_up() {
        let calls = AtomicU32::new(0);
        let result: Result<(), FakeError> = run_with_retry(&RetryPolicy::default(), "test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(FakeError::Locked) }
        })
        .await;
        assert!(matches!(result, Err(FakeError::Locked)));
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn other_errors_propagate_without_retry() {
        let calls = AtomicU32::new(0);
        let start = Instant::now();
        let result: Result<(), FakeError> = run_with_retry(&RetryPolicy::default(), "test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(FakeError::Broken) }
        })
        .await;
        assert!(matches!(result, Err(FakeError::Broken)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }
}

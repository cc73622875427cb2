// SPDX-FileCopyrightText: 2026 EcoSnap Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Retry discipline for contended writes.
//!
//! Several short-lived `ecosnap` processes may write to the same database at
//! once. SQLite's own busy handler waits `busy_timeout_ms`; past that the write
//! surfaces `SQLITE_BUSY`/`SQLITE_LOCKED` and is retried here with linearly
//! growing sleeps. Other errors are not retried.

use std::future::Future;
use std::time::Duration;

use ecosnap_config::model::StorageConfig;
use ecosnap_core::EcoSnapError;
use rusqlite::ErrorCode;
use tracing::{error, warn};

/// How many times, and how patiently, a contended write is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first.
    pub attempts: u32,
    /// Attempt `n` that hits a busy database sleeps `n * backoff` before the next.
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &StorageConfig) -> Self {
        Self {
            attempts: config.write_retries.max(1),
            backoff: Duration::from_millis(config.retry_backoff_ms),
        }
    }

    /// Sleep after the given (1-based) failed attempt.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.backoff * attempt
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&StorageConfig::default())
    }
}

/// Whether the error is a transient lock-busy condition worth retrying.
pub fn is_busy(err: &tokio_rusqlite::Error<rusqlite::Error>) -> bool {
    match err {
        tokio_rusqlite::Error::Error(inner) => matches!(
            inner.sqlite_error_code(),
            Some(ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
        ),
        _ => false,
    }
}

/// Run `operation` until it succeeds, fails with a non-busy error, or the
/// policy's attempts are used up.
///
/// Exhaustion and permanent failures both map to
/// [`EcoSnapError::AuditWriteFailed`] carrying the last underlying error.
pub async fn with_busy_retry<F, Fut, T>(
    policy: RetryPolicy,
    operation_name: &str,
    mut operation: F,
) -> Result<T, EcoSnapError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, tokio_rusqlite::Error<rusqlite::Error>>>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if is_busy(&err) && attempt < policy.attempts => {
                let delay = policy.delay_after(attempt);
                warn!(
                    operation = operation_name,
                    error = %EcoSnapError::AuditWriteContended { attempt },
                    backoff_ms = delay.as_millis() as u64,
                    "database busy, retrying"
                );
                tokio::time::sleep(delay).await;
            }
            Err(err) => {
                error!(operation = operation_name, attempt, error = %err, "write failed");
                return Err(EcoSnapError::AuditWriteFailed {
                    attempts: attempt,
                    source: Box::new(err),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn busy() -> tokio_rusqlite::Error<rusqlite::Error> {
        tokio_rusqlite::Error::Error(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
            Some("database is locked".to_string()),
        ))
    }

    fn constraint() -> tokio_rusqlite::Error<rusqlite::Error> {
        tokio_rusqlite::Error::Error(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CONSTRAINT),
            Some("FOREIGN KEY constraint failed".to_string()),
        ))
    }

    fn fast() -> RetryPolicy {
        RetryPolicy {
            attempts: 5,
            backoff: Duration::from_millis(1),
        }
    }

    #[test]
    fn classifies_busy_and_locked() {
        assert!(is_busy(&busy()));
        assert!(is_busy(&tokio_rusqlite::Error::Error(
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_LOCKED),
                None,
            )
        )));
        assert!(!is_busy(&constraint()));
        assert!(!is_busy(&tokio_rusqlite::Error::ConnectionClosed));
    }

    #[test]
    fn backoff_grows_linearly() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.attempts, 5);
        assert_eq!(policy.delay_after(1), Duration::from_millis(200));
        assert_eq!(policy.delay_after(3), Duration::from_millis(600));
    }

    #[tokio::test]
    async fn succeeds_after_transient_busy() {
        let calls = AtomicU32::new(0);
        let value = with_busy_retry(fast(), "test", || {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move { if n < 3 { Err(busy()) } else { Ok(n) } }
        })
        .await
        .unwrap();
        assert_eq!(value, 3);
    }

    #[tokio::test]
    async fn exhaustion_surfaces_failure() {
        let calls = AtomicU32::new(0);
        let err = with_busy_retry(fast(), "test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(busy()) }
        })
        .await
        .unwrap_err();
        assert!(matches!(err, EcoSnapError::AuditWriteFailed { attempts: 5, .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn permanent_error_is_not_retried() {
        let calls = AtomicU32::new(0);
        let err = with_busy_retry(fast(), "test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(constraint()) }
        })
        .await
        .unwrap_err();
        assert!(matches!(err, EcoSnapError::AuditWriteFailed { attempts: 1, .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}

//! Transient-call executor
//!
//! Runs a single remote round trip under a bounded-retry policy with
//! exponential backoff and jitter. Which failures are retried depends on the
//! kind of call: reads retry network faults only, writes additionally retry
//! an expired resumable upload session. Absence is never retried.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Retry policy for transient remote failures
///
/// Stored per alias; a missing field falls back to its default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Attempts per call, the first one included
    pub max_attempts: u32,

    /// First backoff in milliseconds; 0 retries immediately
    pub initial_backoff_ms: u64,

    pub max_backoff_ms: u64,
}

/// Upper bound for either backoff setting, one hour
pub const MAX_BACKOFF_MS: u64 = 3_600_000;

impl RetryConfig {
    /// Reject policies that cannot make progress or would stall for hours
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(Error::Config("max_attempts must be at least 1".into()));
        }
        for (field, value) in [
            ("initial_backoff_ms", self.initial_backoff_ms),
            ("max_backoff_ms", self.max_backoff_ms),
        ] {
            if value > MAX_BACKOFF_MS {
                return Err(Error::Config(format!(
                    "{field} must be at most {MAX_BACKOFF_MS}, got {value}"
                )));
            }
        }
        Ok(())
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 100,
            max_backoff_ms: 10_000,
        }
    }
}

/// Retry classification of a remote call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    /// Fetching content or metadata
    Read,
    /// Create-or-replace of a named object; safe to restart from scratch
    Write,
}

impl CallKind {
    /// Whether `error` should trigger another attempt for this kind of call
    pub fn is_retryable(self, error: &Error) -> bool {
        match (self, error) {
            (_, Error::Network(_)) => true,
            (CallKind::Write, Error::SessionExpired(_)) => true,
            _ => false,
        }
    }
}

/// Bounded-retry executor shared by the store's single-call operations
#[derive(Debug, Clone, Default)]
pub struct CallExecutor {
    config: RetryConfig,
}

impl CallExecutor {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Run `operation` until it succeeds, fails terminally, or attempts run out
    ///
    /// `operation` must perform exactly one remote round trip per call. When
    /// every attempt fails with a retryable error the last error is returned
    /// inside `Error::Exhausted`.
    pub async fn execute<T, F, Fut>(
        &self,
        kind: CallKind,
        label: &str,
        mut operation: F,
    ) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            tracing::debug!(operation = label, attempt, "Executing remote call");

            let error = match operation().await {
                Ok(value) => return Ok(value),
                Err(e) => e,
            };

            if !kind.is_retryable(&error) {
                return Err(error);
            }

            if attempt >= max_attempts {
                return Err(Error::Exhausted {
                    attempts: attempt,
                    source: Box::new(error),
                });
            }

            let backoff = calculate_backoff(&self.config, attempt);
            tracing::warn!(
                operation = label,
                attempt,
                backoff_ms = backoff.as_millis() as u64,
                error = %error,
                "Retrying after transient error"
            );

            if !backoff.is_zero() {
                tokio::time::sleep(backoff).await;
            }
        }
    }
}

/// Calculate backoff duration with jitter
fn calculate_backoff(config: &RetryConfig, attempt: u32) -> Duration {
    // Exponential backoff: initial * 2^(attempt-1)
    let base_ms = config
        .initial_backoff_ms
        .saturating_mul(1u64 << attempt.saturating_sub(1).min(10));
    let capped_ms = base_ms.min(config.max_backoff_ms);

    let jitter_ms = rand_jitter(capped_ms);
    Duration::from_millis(capped_ms.saturating_add(jitter_ms))
}

/// Pseudo-random jitter in `0..max` without an RNG dependency
fn rand_jitter(max: u64) -> u64 {
    use std::time::SystemTime;
    if max == 0 {
        return 0;
    }
    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos() as u64;
    nanos % max
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn immediate(max_attempts: u32) -> CallExecutor {
        CallExecutor::new(RetryConfig {
            max_attempts,
            initial_backoff_ms: 0,
            max_backoff_ms: 0,
        })
    }

    #[test]
    fn test_calculate_backoff() {
        let config = RetryConfig {
            max_attempts: 3,
            initial_backoff_ms: 100,
            max_backoff_ms: 10000,
        };

        let b1 = calculate_backoff(&config, 1);
        assert!(b1.as_millis() >= 100 && b1.as_millis() < 200);

        let b2 = calculate_backoff(&config, 2);
        assert!(b2.as_millis() >= 200 && b2.as_millis() < 400);

        let b3 = calculate_backoff(&config, 3);
        assert!(b3.as_millis() >= 400 && b3.as_millis() < 800);
    }

    #[test]
    fn test_backoff_cap_and_zero() {
        let config = RetryConfig {
            max_attempts: 10,
            initial_backoff_ms: 1000,
            max_backoff_ms: 5000,
        };
        assert!(calculate_backoff(&config, 10).as_millis() < 10000);

        let config = RetryConfig {
            max_attempts: 3,
            initial_backoff_ms: 0,
            max_backoff_ms: 0,
        };
        assert!(calculate_backoff(&config, 2).is_zero());
    }

    #[test]
    fn test_backoff_saturates_on_huge_values() {
        let config = RetryConfig {
            max_attempts: 3,
            initial_backoff_ms: 1 << 63,
            max_backoff_ms: u64::MAX,
        };
        for attempt in [0, 1, 2, 11, u32::MAX] {
            assert!(calculate_backoff(&config, attempt) >= Duration::from_millis(1 << 63));
        }

        let capped = RetryConfig {
            max_backoff_ms: 5000,
            ..config
        };
        assert!(calculate_backoff(&capped, 2).as_millis() < 10000);
    }

    #[test]
    fn test_validate_bounds() {
        assert!(RetryConfig::default().validate().is_ok());

        let huge = RetryConfig {
            initial_backoff_ms: 9_223_372_036_854_775_808,
            ..RetryConfig::default()
        };
        assert!(matches!(huge.validate(), Err(Error::Config(_))));

        let zero = RetryConfig {
            max_attempts: 0,
            ..RetryConfig::default()
        };
        assert!(zero.validate().is_err());
    }

    #[test]
    fn test_retry_classification() {
        let network = Error::Network("connection reset".into());
        let gone = Error::SessionExpired("410 Gone".into());
        let missing = Error::NotFound("blob".into());
        let integrity = Error::Integrity("no size".into());

        assert!(CallKind::Read.is_retryable(&network));
        assert!(CallKind::Write.is_retryable(&network));
        assert!(!CallKind::Read.is_retryable(&gone));
        assert!(CallKind::Write.is_retryable(&gone));
        assert!(!CallKind::Read.is_retryable(&missing));
        assert!(!CallKind::Write.is_retryable(&missing));
        assert!(!CallKind::Write.is_retryable(&integrity));
    }

    #[tokio::test]
    async fn test_success_first_attempt() {
        let executor = immediate(3);
        let mut calls = 0;

        let result = executor
            .execute(CallKind::Read, "read", || {
                calls += 1;
                async { Ok::<_, Error>(42) }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn test_success_after_transient_failures() {
        let executor = immediate(3);
        let calls = Arc::new(AtomicU32::new(0));

        let result = executor
            .execute(CallKind::Read, "read", || {
                let calls = calls.clone();
                async move {
                    if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(Error::Network("timeout".into()))
                    } else {
                        Ok("data")
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), "data");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhausted_keeps_last_error() {
        let executor = immediate(3);
        let mut calls = 0;

        let result: Result<()> = executor
            .execute(CallKind::Read, "read", || {
                calls += 1;
                let n = calls;
                async move { Err(Error::Network(format!("failure {n}"))) }
            })
            .await;

        assert_eq!(calls, 3);
        match result.unwrap_err() {
            Error::Exhausted { attempts, source } => {
                assert_eq!(attempts, 3);
                assert_eq!(source.to_string(), "Network error: failure 3");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_not_found_never_retried() {
        let executor = immediate(3);
        let mut calls = 0;

        let result: Result<()> = executor
            .execute(CallKind::Read, "read", || {
                calls += 1;
                async { Err(Error::NotFound("snap-1.dat".into())) }
            })
            .await;

        assert!(matches!(result, Err(Error::NotFound(_))));
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn test_session_expired_retried_for_writes_only() {
        let executor = immediate(3);

        let mut write_calls = 0;
        let result: Result<()> = executor
            .execute(CallKind::Write, "write", || {
                write_calls += 1;
                async { Err(Error::SessionExpired("gone".into())) }
            })
            .await;
        assert!(matches!(result, Err(Error::Exhausted { attempts: 3, .. })));
        assert_eq!(write_calls, 3);

        let mut read_calls = 0;
        let result: Result<()> = executor
            .execute(CallKind::Read, "read", || {
                read_calls += 1;
                async { Err(Error::SessionExpired("gone".into())) }
            })
            .await;
        assert!(matches!(result, Err(Error::SessionExpired(_))));
        assert_eq!(read_calls, 1);
    }

    #[tokio::test]
    async fn test_zero_attempts_still_runs_once() {
        let executor = immediate(0);
        let mut calls = 0;

        let result: Result<()> = executor
            .execute(CallKind::Write, "write", || {
                calls += 1;
                async { Err(Error::Network("reset".into())) }
            })
            .await;

        assert!(matches!(result, Err(Error::Exhausted { attempts: 1, .. })));
        assert_eq!(calls, 1);
    }
}

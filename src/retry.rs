//! Bounded retry with exponential backoff for the API fetch path.
//!
//! The policy is an explicit value composed around the operation at the call
//! site, not a hidden wrapper:
//! - transient transport failures (timeout, connection error) are retried
//! - permanent failures (HTTP 4xx/5xx, decode errors) return immediately
//! - exhaustion yields `Ok(None)` so the caller skips the unit of work
//!   instead of aborting the run

use std::future::Future;
use std::time::Duration;

use crate::EtlError;

// ---

/// Retry schedule: bounded attempts, exponential backoff between them.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles after each failure.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// Backoff before retry number `attempt` (1-based): base * 2^(attempt-1).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor)
    }
}

/// Run `operation` under `policy`.
///
/// Returns `Ok(Some(value))` on success, `Ok(None)` once all attempts are
/// exhausted on transient failures, and `Err` immediately for any
/// non-transient error. No delay is incurred after the final attempt.
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    op_name: &str,
    operation: F,
) -> Result<Option<T>, EtlError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, EtlError>>,
{
    for attempt in 1..=policy.max_attempts {
        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::info!("{op_name} succeeded on attempt {attempt}");
                }
                return Ok(Some(value));
            }
            Err(e) if e.is_transient() => {
                if attempt < policy.max_attempts {
                    let max = policy.max_attempts;
                    let delay = policy.delay_for_attempt(attempt);
                    tracing::warn!(
                        "[Retry {attempt}/{max}] {op_name} failed with: {e}. Retrying in {delay:?}..."
                    );
                    tokio::time::sleep(delay).await;
                }
            }
            Err(e) => return Err(e),
        }
    }

    tracing::error!("All {} attempts failed for {op_name}", policy.max_attempts);
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn zero_delay() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::ZERO,
        }
    }

    // A transient error without a live socket: reqwest connect failure against
    // a port that cannot be listening.
    async fn transient_error() -> EtlError {
        let client = reqwest::Client::new();
        let err = client
            .get("http://127.0.0.1:1/")
            .send()
            .await
            .expect_err("connect to port 1 must fail");
        EtlError::from_transport(err)
    }

    #[test]
    fn backoff_doubles_from_base() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for_attempt(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_secs(4));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_secs(8));
    }

    #[tokio::test]
    async fn transient_failure_exhausts_to_absent() {
        let attempts = AtomicU32::new(0);
        let result: Result<Option<()>, _> = with_retry(&zero_delay(), "fetch", || async {
            attempts.fetch_add(1, Ordering::SeqCst);
            Err(transient_error().await)
        })
        .await;

        assert!(matches!(result, Ok(None)));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn permanent_failure_is_not_retried() {
        let attempts = AtomicU32::new(0);
        let result: Result<Option<()>, _> = with_retry(&zero_delay(), "fetch", || async {
            attempts.fetch_add(1, Ordering::SeqCst);
            Err(EtlError::Status(StatusCode::NOT_FOUND))
        })
        .await;

        assert!(matches!(result, Err(EtlError::Status(s)) if s == StatusCode::NOT_FOUND));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn success_after_transient_failures() {
        let attempts = AtomicU32::new(0);
        let result = with_retry(&zero_delay(), "fetch", || async {
            if attempts.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(transient_error().await)
            } else {
                Ok(42)
            }
        })
        .await;

        assert!(matches!(result, Ok(Some(42))));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }
}

//! Retry with exponential backoff for calls against flaky or rate-limited
//! wiki APIs.
//!
//! Both HTTP adapters run their requests through `retry`. A `RateLimited`
//! error carries the server's Retry-After and overrides the computed delay.

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::domain::DomainError;

/// Backoff configuration.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of retries, not counting the initial attempt.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Upper bound for the computed delay.
    pub max_delay: Duration,
    /// Multiplier applied per retry (2.0 doubles the delay each time).
    pub backoff_multiplier: f64,
    /// Adds up to 25% jitter to avoid request bursts lining up.
    pub add_jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            add_jitter: true,
        }
    }
}

impl RetryPolicy {
    /// No retries at all. Used in tests and for operations that must not repeat.
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            backoff_multiplier: 1.0,
            add_jitter: false,
        }
    }

    /// Delay before the given attempt (attempt 1 = first retry).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let base = self.initial_delay.as_secs_f64()
            * self
                .backoff_multiplier
                .powi(attempt.saturating_sub(1) as i32);
        let capped = base.min(self.max_delay.as_secs_f64());

        let final_delay = if self.add_jitter {
            capped + capped * 0.25 * rand_jitter()
        } else {
            capped
        };

        Duration::from_secs_f64(final_delay)
    }
}

/// Pseudo-random jitter in [0.0, 1.0) derived from the clock. Good enough
/// for spreading retries without pulling in a rand dependency.
fn rand_jitter() -> f64 {
    use std::time::SystemTime;
    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos();
    (nanos % 1000) as f64 / 1000.0
}

/// Whether an error is worth retrying.
pub fn is_retryable(error: &DomainError) -> bool {
    match error {
        DomainError::RateLimited { .. } => true,
        DomainError::Auth(_) | DomainError::Config(_) => false,
        _ => {
            let msg = error.to_string().to_lowercase();

            let is_transient = msg.contains("timeout")
                || msg.contains("timed out")
                || msg.contains("connection refused")
                || msg.contains("connection reset")
                || msg.contains("temporary");

            let is_server_error = msg.contains("500")
                || msg.contains("502")
                || msg.contains("503")
                || msg.contains("504")
                || msg.contains("internal server error")
                || msg.contains("bad gateway")
                || msg.contains("service unavailable");

            is_transient || is_server_error
        }
    }
}

/// Runs an async operation up to `max_retries + 1` times.
///
/// A rate-limited response dictates its own wait; every other retryable
/// error sleeps the computed backoff delay. Non-retryable errors and the
/// final failure are returned as-is so callers can record them.
pub async fn retry<F, Fut, T>(
    policy: &RetryPolicy,
    operation_name: &str,
    mut operation: F,
) -> Result<T, DomainError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, DomainError>>,
{
    let max_attempts = policy.max_retries + 1;
    let mut last_error: Option<DomainError> = None;

    for attempt in 0..max_attempts {
        if attempt > 0 {
            let delay = match &last_error {
                Some(DomainError::RateLimited { seconds }) => Duration::from_secs(*seconds),
                _ => policy.delay_for_attempt(attempt),
            };
            debug!(
                "{}: retry {}/{} after {:?}",
                operation_name, attempt, policy.max_retries, delay
            );
            sleep(delay).await;
        }

        match operation().await {
            Ok(result) => {
                if attempt > 0 {
                    debug!("{}: succeeded after {} retries", operation_name, attempt);
                }
                return Ok(result);
            }
            Err(e) => {
                if is_retryable(&e) && attempt < policy.max_retries {
                    warn!(
                        "{}: retryable error (attempt {}/{}): {}",
                        operation_name,
                        attempt + 1,
                        max_attempts,
                        e
                    );
                    last_error = Some(e);
                } else {
                    return Err(e);
                }
            }
        }
    }

    Err(last_error.unwrap_or_else(|| DomainError::Source("all retry attempts failed".to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_policy_default() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.initial_delay, Duration::from_millis(500));
        assert_eq!(policy.max_delay, Duration::from_secs(30));
        assert!(policy.add_jitter);
    }

    #[test]
    fn test_delay_for_attempt_zero() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for_attempt(0), Duration::ZERO);
    }

    #[test]
    fn test_delay_exponential() {
        let policy = RetryPolicy {
            initial_delay: Duration::from_secs(1),
            backoff_multiplier: 2.0,
            max_delay: Duration::from_secs(100),
            add_jitter: false,
            ..Default::default()
        };

        assert_eq!(policy.delay_for_attempt(1), Duration::from_secs(1));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_secs(2));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_secs(4));
        assert_eq!(policy.delay_for_attempt(4), Duration::from_secs(8));
    }

    #[test]
    fn test_delay_capped_at_max() {
        let policy = RetryPolicy {
            initial_delay: Duration::from_secs(10),
            backoff_multiplier: 10.0,
            max_delay: Duration::from_secs(30),
            add_jitter: false,
            ..Default::default()
        };

        assert_eq!(policy.delay_for_attempt(5), Duration::from_secs(30));
    }

    #[test]
    fn test_rate_limited_is_retryable() {
        assert!(is_retryable(&DomainError::RateLimited { seconds: 60 }));
    }

    #[test]
    fn test_server_error_is_retryable() {
        let error = DomainError::Source("API error 503: Service Unavailable".to_string());
        assert!(is_retryable(&error));
    }

    #[test]
    fn test_timeout_is_retryable() {
        let error = DomainError::Target("request timed out after 30s".to_string());
        assert!(is_retryable(&error));
    }

    #[test]
    fn test_auth_is_not_retryable() {
        let error = DomainError::Auth("HTTP 401 Unauthorized".to_string());
        assert!(!is_retryable(&error));
    }

    #[test]
    fn test_not_found_is_not_retryable() {
        let error = DomainError::Source("API error 404: page does not exist".to_string());
        assert!(!is_retryable(&error));
    }

    #[test]
    fn test_config_is_not_retryable() {
        let error = DomainError::Config("missing MEDIAWIKI_URL".to_string());
        assert!(!is_retryable(&error));
    }

    #[tokio::test]
    async fn test_retry_success_first_try() {
        let policy = RetryPolicy::no_retry();
        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = calls.clone();

        let result = retry(&policy, "test_op", || {
            let count = calls_clone.clone();
            async move {
                count.fetch_add(1, Ordering::SeqCst);
                Ok::<_, DomainError>(42)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retry_success_after_failures() {
        let policy = RetryPolicy {
            max_retries: 3,
            initial_delay: Duration::from_millis(1),
            add_jitter: false,
            ..Default::default()
        };
        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = calls.clone();

        let result = retry(&policy, "test_op", || {
            let count = calls_clone.clone();
            async move {
                let current = count.fetch_add(1, Ordering::SeqCst);
                if current < 2 {
                    Err(DomainError::Source(
                        "API error 503: Service Unavailable".to_string(),
                    ))
                } else {
                    Ok::<_, DomainError>(42)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_all_attempts_fail() {
        let policy = RetryPolicy {
            max_retries: 2,
            initial_delay: Duration::from_millis(1),
            add_jitter: false,
            ..Default::default()
        };
        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = calls.clone();

        let result: Result<i32, DomainError> = retry(&policy, "test_op", || {
            let count = calls_clone.clone();
            async move {
                count.fetch_add(1, Ordering::SeqCst);
                Err(DomainError::Target(
                    "API error 500: Internal Server Error".to_string(),
                ))
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_non_retryable_stops_immediately() {
        let policy = RetryPolicy {
            max_retries: 5,
            initial_delay: Duration::from_millis(1),
            ..Default::default()
        };
        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = calls.clone();

        let result: Result<i32, DomainError> = retry(&policy, "test_op", || {
            let count = calls_clone.clone();
            async move {
                count.fetch_add(1, Ordering::SeqCst);
                Err(DomainError::Auth("HTTP 401 Unauthorized".to_string()))
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_rate_limited_consumes_attempts() {
        let policy = RetryPolicy {
            max_retries: 2,
            initial_delay: Duration::from_millis(1),
            add_jitter: false,
            ..Default::default()
        };
        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = calls.clone();

        // Retry-After of 0 keeps the test fast; the point is attempt counting.
        let result: Result<i32, DomainError> = retry(&policy, "test_op", || {
            let count = calls_clone.clone();
            async move {
                count.fetch_add(1, Ordering::SeqCst);
                Err(DomainError::RateLimited { seconds: 0 })
            }
        })
        .await;

        assert!(matches!(result, Err(DomainError::RateLimited { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}

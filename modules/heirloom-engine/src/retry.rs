// Bounded-attempt retry around one external call.
//
// Only retryable errors consume attempts; terminal errors (validation,
// authentication) propagate on the spot. Backoff grows base * 3^attempt with
// up to a second of jitter, matching how the scrapers back off elsewhere.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::warn;

/// Retry policy for one call site.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// Policy with no delays, for tests.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::ZERO,
        }
    }
}

/// Run `op` up to `policy.max_attempts` times. `is_retryable` decides which
/// errors burn an attempt; anything else returns immediately. Exhaustion
/// returns the last error seen.
pub async fn with_retry<T, E, F, Fut, R>(
    policy: &RetryPolicy,
    is_retryable: R,
    mut op: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    R: Fn(&E) -> bool,
    E: std::fmt::Display,
{
    let attempts = policy.max_attempts.max(1);
    let mut last_err = None;

    for attempt in 0..attempts {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if is_retryable(&e) => {
                warn!(attempt = attempt + 1, error = %e, "Retryable failure");
                last_err = Some(e);
                if attempt + 1 < attempts {
                    let backoff = policy.base_delay * 3u32.pow(attempt);
                    let jitter = if policy.base_delay.is_zero() {
                        Duration::ZERO
                    } else {
                        Duration::from_millis(rand::rng().random_range(0..1000))
                    };
                    tokio::time::sleep(backoff + jitter).await;
                }
            }
            Err(e) => return Err(e),
        }
    }

    Err(last_err.expect("at least one attempt was made"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug)]
    struct Flaky {
        retryable: bool,
    }

    impl std::fmt::Display for Flaky {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "flaky(retryable={})", self.retryable)
        }
    }

    #[tokio::test]
    async fn always_failing_call_runs_exactly_max_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<(), Flaky> = with_retry(
            &RetryPolicy::immediate(3),
            |e: &Flaky| e.retryable,
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(Flaky { retryable: true }) }
            },
        )
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn terminal_errors_are_attempted_once() {
        let calls = AtomicU32::new(0);
        let result: Result<(), Flaky> = with_retry(
            &RetryPolicy::immediate(5),
            |e: &Flaky| e.retryable,
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(Flaky { retryable: false }) }
            },
        )
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn recovers_when_a_later_attempt_succeeds() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, Flaky> = with_retry(
            &RetryPolicy::immediate(3),
            |e: &Flaky| e.retryable,
            || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(Flaky { retryable: true })
                    } else {
                        Ok(n)
                    }
                }
            },
        )
        .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn first_success_returns_immediately() {
        let calls = AtomicU32::new(0);
        let result: Result<&str, Flaky> = with_retry(
            &RetryPolicy::immediate(3),
            |e: &Flaky| e.retryable,
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok("done") }
            },
        )
        .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}

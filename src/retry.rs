//! Reusable retry policy with exponential backoff.
//!
//! Transient hosted-service failures are backend-agnostic, so the policy is
//! parameterized per backend instead of being baked into one provider.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::warn;

/// All attempts of a retried operation failed.
#[derive(Debug)]
pub struct RetryExhausted<E> {
    /// Total attempts made.
    pub attempts: u32,
    /// The error from the final attempt.
    pub last: E,
}

impl<E: Display> Display for RetryExhausted<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} after {} attempts", self.last, self.attempts)
    }
}

/// Retries an operation with exponential backoff between attempts.
///
/// The delay before retry `n` (0-based attempt index) is
/// `base_delay * 2^n`; no delay follows the final failure.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
}

impl RetryPolicy {
    /// Create a policy with the given total attempt count and base delay.
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self { max_attempts: max_attempts.max(1), base_delay }
    }

    /// The delay applied after the given 0-based failed attempt.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt)
    }

    /// Run `op` until it succeeds or `max_attempts` attempts have failed.
    pub async fn run<T, E, F, Fut>(&self, mut op: F) -> std::result::Result<T, RetryExhausted<E>>
    where
        E: Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
    {
        let mut attempt = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(error) => {
                    attempt += 1;
                    if attempt >= self.max_attempts {
                        return Err(RetryExhausted { attempts: attempt, last: error });
                    }
                    let delay = self.delay_for(attempt - 1);
                    warn!(attempt, delay_ms = delay.as_millis() as u64, error = %error, "attempt failed, backing off");
                    sleep(delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test(start_paused = true)]
    async fn succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(3, Duration::from_secs(1));

        let result = policy
            .run(|| {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move { if n < 2 { Err("transient") } else { Ok("done") } }
            })
            .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn exhaustion_reports_attempt_count() {
        let policy = RetryPolicy::new(3, Duration::from_secs(1));
        let result: std::result::Result<(), _> = policy.run(|| async { Err("down") }).await;

        let err = result.unwrap_err();
        assert_eq!(err.attempts, 3);
        assert_eq!(err.to_string(), "down after 3 attempts");
    }

    #[test]
    fn backoff_doubles_per_attempt() {
        let policy = RetryPolicy::new(3, Duration::from_secs(1));
        assert_eq!(policy.delay_for(0), Duration::from_secs(1));
        assert_eq!(policy.delay_for(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for(2), Duration::from_secs(4));
    }

    #[tokio::test]
    async fn single_attempt_policy_does_not_sleep() {
        let policy = RetryPolicy::new(1, Duration::from_secs(3600));
        let result: std::result::Result<(), _> = policy.run(|| async { Err("down") }).await;
        assert_eq!(result.unwrap_err().attempts, 1);
    }
}

//! Bounded retry for idempotent async operations.
//!
//! The policy (how many attempts, how long to wait) is a value; the operation
//! is a closure that receives the 1-based attempt number. Nothing here knows
//! what is being retried.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    max_attempts: u32,
    delay: Duration,
    backoff: f64,
}

impl RetryPolicy {
    /// `max_attempts` below 1 is treated as 1.
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
            backoff: 1.0,
        }
    }

    /// Run once, never wait.
    pub fn once() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Multiply the delay by `factor` after each failed attempt.
    pub fn with_backoff(mut self, factor: f64) -> Self {
        self.backoff = factor.max(1.0);
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Wait before `attempt` (1-based). The first attempt never waits.
    pub fn delay_before(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        let exponent = attempt.saturating_sub(2) as i32;
        if exponent == 0 || self.backoff == 1.0 {
            return self.delay;
        }
        self.delay.mul_f64(self.backoff.powi(exponent))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(200))
    }
}

/// Run `op` until it succeeds or the policy's attempts are used up.
///
/// Returns the first success, or the error of the last attempt.
pub async fn retry<T, E, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let mut attempt = 1;
    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if attempt >= policy.max_attempts => return Err(e),
            Err(e) => {
                tracing::warn!(
                    attempt,
                    max_attempts = policy.max_attempts,
                    error = %e,
                    "attempt failed, retrying"
                );
                attempt += 1;
                tokio::time::sleep(policy.delay_before(attempt)).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn zero_attempts_means_one() {
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts(), 1);
    }

    #[test]
    fn delay_schedule() {
        let policy = RetryPolicy::new(4, Duration::from_millis(100)).with_backoff(2.0);
        assert_eq!(policy.delay_before(1), Duration::ZERO);
        assert_eq!(policy.delay_before(2), Duration::from_millis(100));
        assert_eq!(policy.delay_before(3), Duration::from_millis(200));
        assert_eq!(policy.delay_before(4), Duration::from_millis(400));
    }

    #[test]
    fn constant_delay_by_default() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_before(2), Duration::from_millis(200));
        assert_eq!(policy.delay_before(3), Duration::from_millis(200));
    }

    #[test]
    fn fractional_backoff_keeps_configured_first_delay() {
        let policy = RetryPolicy::new(3, Duration::from_millis(100)).with_backoff(1.5);
        assert_eq!(policy.delay_before(2), Duration::from_millis(100));
        assert_eq!(policy.delay_before(3), Duration::from_millis(150));
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_after_failures() {
        let calls = Cell::new(0);
        let result: Result<u32, String> = retry(&RetryPolicy::default(), |attempt| {
            calls.set(calls.get() + 1);
            async move {
                if attempt < 3 {
                    Err(format!("attempt {attempt}"))
                } else {
                    Ok(attempt)
                }
            }
        })
        .await;
        assert_eq!(result, Ok(3));
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_with_last_error() {
        let calls = Cell::new(0);
        let result: Result<(), String> = retry(&RetryPolicy::default(), |attempt| {
            calls.set(calls.get() + 1);
            async move { Err(format!("attempt {attempt}")) }
        })
        .await;
        assert_eq!(result, Err("attempt 3".to_string()));
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test]
    async fn first_success_does_not_wait() {
        let policy = RetryPolicy::new(3, Duration::from_secs(60));
        let started = std::time::Instant::now();
        let result: Result<&str, String> = retry(&policy, |_| async { Ok("done") }).await;
        assert_eq!(result, Ok("done"));
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}

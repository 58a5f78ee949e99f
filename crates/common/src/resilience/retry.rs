//! Retry executor for blocking and async operations
//!
//! The executor owns the retry budget and the backoff policy; deciding whether
//! a particular error is worth retrying is delegated to a [`RetryPolicy`].
//! Both execution modes share [`RetryExecutor::next_delay`], so the only
//! difference between them is how they sleep.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, warn};

use super::backoff::BackoffPolicy;

/// Errors raised while configuring retries
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RetryError {
    #[error("max_retries must be -1 (unlimited) or non-negative, got {0}")]
    InvalidMaxRetries(i32),
}

/// Retry budget, not counting the initial attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaxRetries {
    Limited(u32),
    Unlimited,
}

impl MaxRetries {
    /// Interpret the conventional integer form, where `-1` means unlimited.
    ///
    /// # Errors
    ///
    /// Returns [`RetryError::InvalidMaxRetries`] for any other negative value.
    pub fn from_config(value: i32) -> Result<Self, RetryError> {
        match value {
            -1 => Ok(Self::Unlimited),
            n => u32::try_from(n).map(Self::Limited).map_err(|_| RetryError::InvalidMaxRetries(n)),
        }
    }

    /// Whether retry number `retry` (1-based) is within budget.
    pub const fn allows(self, retry: u32) -> bool {
        match self {
            Self::Limited(max) => retry <= max,
            Self::Unlimited => true,
        }
    }
}

impl fmt::Display for MaxRetries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Limited(n) => write!(f, "{n}"),
            Self::Unlimited => f.write_str("unlimited"),
        }
    }
}

/// Decision for whether to retry an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after the backoff delay
    Retry,
    /// Surface the error immediately
    Stop,
}

/// Trait for determining whether an error should be retried
pub trait RetryPolicy<E> {
    fn should_retry(&self, error: &E) -> RetryDecision;
}

impl<E, F> RetryPolicy<E> for F
where
    F: Fn(&E) -> bool,
{
    fn should_retry(&self, error: &E) -> RetryDecision {
        if self(error) {
            RetryDecision::Retry
        } else {
            RetryDecision::Stop
        }
    }
}

/// Runs an operation until it succeeds, the policy stops it, or the budget
/// is exhausted. The last error is always returned unchanged.
#[derive(Debug, Clone)]
pub struct RetryExecutor<P> {
    max_retries: MaxRetries,
    backoff: BackoffPolicy,
    policy: P,
}

impl<P> RetryExecutor<P> {
    pub fn new(max_retries: MaxRetries, backoff: BackoffPolicy, policy: P) -> Self {
        Self { max_retries, backoff, policy }
    }

    pub fn max_retries(&self) -> MaxRetries {
        self.max_retries
    }

    pub fn backoff(&self) -> &BackoffPolicy {
        &self.backoff
    }

    /// Delay before retry number `retry`, or `None` if `error` should be
    /// surfaced.
    fn next_delay<E>(&self, error: &E, retry: u32) -> Option<Duration>
    where
        P: RetryPolicy<E>,
        E: fmt::Display,
    {
        if self.policy.should_retry(error) == RetryDecision::Stop {
            debug!(error = %error, "error is not retryable");
            return None;
        }

        if !self.max_retries.allows(retry) {
            warn!(
                attempts = retry,
                max_retries = %self.max_retries,
                error = %error,
                "retry budget exhausted"
            );
            return None;
        }

        let delay = self.backoff.delay(retry);
        warn!(retry, delay_ms = delay.as_millis() as u64, error = %error, "retrying after failure");
        Some(delay)
    }

    /// Execute `operation` on the calling thread, sleeping between attempts.
    ///
    /// # Errors
    ///
    /// Returns the last error produced by `operation`.
    pub fn run_blocking<F, T, E>(&self, mut operation: F) -> Result<T, E>
    where
        P: RetryPolicy<E>,
        E: fmt::Display,
        F: FnMut() -> Result<T, E>,
    {
        let mut retry = 0_u32;
        loop {
            match operation() {
                Ok(value) => return Ok(value),
                Err(error) => {
                    retry = retry.saturating_add(1);
                    match self.next_delay(&error, retry) {
                        Some(delay) => std::thread::sleep(delay),
                        None => return Err(error),
                    }
                }
            }
        }
    }

    /// Execute `operation` asynchronously, yielding to the runtime between
    /// attempts.
    ///
    /// # Errors
    ///
    /// Returns the last error produced by `operation`.
    pub async fn run<F, Fut, T, E>(&self, mut operation: F) -> Result<T, E>
    where
        P: RetryPolicy<E>,
        E: fmt::Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut retry = 0_u32;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(error) => {
                    retry = retry.saturating_add(1);
                    match self.next_delay(&error, retry) {
                        Some(delay) => tokio::time::sleep(delay).await,
                        None => return Err(error),
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    fn fast_backoff() -> BackoffPolicy {
        BackoffPolicy::new(2.0, 60.0).unwrap().with_unit(Duration::from_micros(10))
    }

    fn always(_: &String) -> bool {
        true
    }

    fn never(_: &String) -> bool {
        false
    }

    #[test]
    fn test_max_retries_from_config() {
        assert_eq!(MaxRetries::from_config(-1).unwrap(), MaxRetries::Unlimited);
        assert_eq!(MaxRetries::from_config(0).unwrap(), MaxRetries::Limited(0));
        assert_eq!(MaxRetries::from_config(7).unwrap(), MaxRetries::Limited(7));
        assert_eq!(MaxRetries::from_config(-2).unwrap_err(), RetryError::InvalidMaxRetries(-2));
    }

    #[test]
    fn test_allows() {
        assert!(MaxRetries::Limited(2).allows(2));
        assert!(!MaxRetries::Limited(2).allows(3));
        assert!(!MaxRetries::Limited(0).allows(1));
        assert!(MaxRetries::Unlimited.allows(u32::MAX));
    }

    #[test]
    fn test_blocking_attempts_are_one_plus_budget() {
        let executor = RetryExecutor::new(MaxRetries::Limited(3), fast_backoff(), always);
        let calls = AtomicU32::new(0);

        let result: Result<(), String> = executor.run_blocking(|| {
            calls.fetch_add(1, Ordering::SeqCst);
            Err("unavailable".to_string())
        });

        assert_eq!(result.unwrap_err(), "unavailable");
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_blocking_stops_on_non_retryable() {
        let executor = RetryExecutor::new(MaxRetries::Limited(3), fast_backoff(), never);
        let calls = AtomicU32::new(0);

        let result: Result<(), String> = executor.run_blocking(|| {
            calls.fetch_add(1, Ordering::SeqCst);
            Err("bad request".to_string())
        });

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_async_succeeds_after_transient_failures() {
        let executor = RetryExecutor::new(MaxRetries::Limited(5), fast_backoff(), always);
        let calls = AtomicU32::new(0);

        let result = executor
            .run(|| {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err("flaky".to_string())
                    } else {
                        Ok(n)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_async_zero_budget_runs_once() {
        let executor = RetryExecutor::new(MaxRetries::Limited(0), fast_backoff(), always);
        let calls = AtomicU32::new(0);

        let result: Result<(), String> = executor
            .run(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err("down".to_string()) }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}

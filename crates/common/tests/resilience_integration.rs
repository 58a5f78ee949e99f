//! Integration tests for resilience module
//!
//! Exercises backoff and the retry executors the way the API client composes
//! them: a status-based policy wrapped around a fallible call.

#![cfg(feature = "runtime")]

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crucible_common::resilience::{BackoffPolicy, MaxRetries, RetryDecision, RetryExecutor, RetryPolicy};

/// Error shaped like an HTTP failure
#[derive(Debug, Clone, PartialEq)]
struct StatusError(u16);

impl std::fmt::Display for StatusError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "status {}", self.0)
    }
}

/// Retries only gateway-style statuses
struct GatewayPolicy;

impl RetryPolicy<StatusError> for GatewayPolicy {
    fn should_retry(&self, error: &StatusError) -> RetryDecision {
        if matches!(error.0, 502..=504) {
            RetryDecision::Retry
        } else {
            RetryDecision::Stop
        }
    }
}

fn millis_backoff() -> BackoffPolicy {
    BackoffPolicy::new(2.0, 60.0).expect("valid backoff").with_unit(Duration::from_millis(1))
}

/// Validates that a persistently failing call is attempted once plus the
/// retry budget and surfaces the final error unchanged.
///
/// # Test Steps
/// 1. Configure three retries with a millisecond backoff unit
/// 2. Fail every attempt with 503
/// 3. Verify four attempts were made and the error is the 503
#[tokio::test(flavor = "multi_thread")]
async fn test_budget_exhaustion_surfaces_last_error() {
    let executor = RetryExecutor::new(MaxRetries::Limited(3), millis_backoff(), GatewayPolicy);
    let attempts = Arc::new(AtomicU32::new(0));

    let result: Result<(), StatusError> = executor
        .run(|| {
            let attempts = Arc::clone(&attempts);
            async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err(StatusError(503))
            }
        })
        .await;

    assert_eq!(result.unwrap_err(), StatusError(503));
    assert_eq!(attempts.load(Ordering::SeqCst), 4);
}

/// Validates that the policy decision is consulted per error, so a
/// non-retryable error ends the loop even after retryable ones.
///
/// # Test Steps
/// 1. Return 502, then 400
/// 2. Verify the 400 is returned after exactly two attempts
#[test]
fn test_non_retryable_error_ends_loop() {
    let executor = RetryExecutor::new(MaxRetries::Unlimited, millis_backoff(), GatewayPolicy);
    let attempts = AtomicU32::new(0);

    let result: Result<(), StatusError> = executor.run_blocking(|| {
        match attempts.fetch_add(1, Ordering::SeqCst) {
            0 => Err(StatusError(502)),
            _ => Err(StatusError(400)),
        }
    });

    assert_eq!(result.unwrap_err(), StatusError(400));
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}

/// Validates that blocking retries actually wait between attempts.
///
/// # Test Steps
/// 1. Use a 1 ms unit so the first two delays are at least 2 ms and 4 ms
/// 2. Fail twice, then succeed
/// 3. Verify elapsed time covers both delays
#[test]
fn test_blocking_retry_sleeps_between_attempts() {
    let executor = RetryExecutor::new(MaxRetries::Limited(5), millis_backoff(), GatewayPolicy);
    let attempts = AtomicU32::new(0);
    let start = Instant::now();

    let result = executor.run_blocking(|| {
        if attempts.fetch_add(1, Ordering::SeqCst) < 2 {
            Err(StatusError(504))
        } else {
            Ok("done")
        }
    });

    assert_eq!(result.unwrap(), "done");
    assert!(start.elapsed() >= Duration::from_millis(6));
}

/// Validates the backoff envelope over many samples.
///
/// # Test Steps
/// 1. Sample delays for attempts 1..=30 repeatedly
/// 2. Verify each is within `[0, cap + base]`
/// 3. Verify the jitter-free curve is non-decreasing
#[test]
fn test_backoff_envelope() {
    let policy = BackoffPolicy::new(1.5, 20.0).expect("valid backoff");

    for _ in 0..50 {
        for attempt in 1..=30 {
            assert!(policy.delay(attempt) <= policy.max_delay());
        }
    }

    let curve: Vec<Duration> = (1..=30).map(|a| policy.delay_with(a, 0.0)).collect();
    assert!(curve.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(*curve.last().expect("non-empty"), Duration::from_secs(20));
}

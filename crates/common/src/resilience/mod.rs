//! Resilience patterns for transient failures
//!
//! - [`backoff`]: bounded exponential delay with additive jitter (foundation
//!   tier, pure)
//! - [`retry`]: blocking and async executors that apply a [`RetryPolicy`] and
//!   a [`BackoffPolicy`] around an operation (runtime tier)

pub mod backoff;
#[cfg(feature = "runtime")]
pub mod retry;

pub use backoff::{BackoffError, BackoffPolicy};
#[cfg(feature = "runtime")]
pub use retry::{MaxRetries, RetryDecision, RetryError, RetryExecutor, RetryPolicy};

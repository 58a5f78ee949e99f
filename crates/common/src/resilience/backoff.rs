//! Bounded exponential backoff with additive jitter
//!
//! For retry `attempt` (1 for the first retry), the delay in seconds is
//!
//! ```text
//! jitter = base * U[0, 1)
//! delay  = min(cap + jitter, base^attempt + jitter)
//! ```
//!
//! so it grows geometrically until it saturates just above `cap`, and never
//! exceeds `cap + base`.

use std::time::Duration;

use rand::Rng;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BackoffError {
    #[error("backoff base must be greater than 1.0, got {0}")]
    InvalidBase(f64),

    #[error("backoff cap must be a finite, non-negative number of seconds, got {0}")]
    InvalidCap(f64),
}

/// Retry delay policy.
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffPolicy {
    base: f64,
    cap: f64,
    unit: Duration,
}

impl BackoffPolicy {
    /// Policy with `base` and `cap` expressed in seconds.
    ///
    /// # Errors
    ///
    /// Returns [`BackoffError::InvalidBase`] if `base <= 1.0` (or NaN) and
    /// [`BackoffError::InvalidCap`] if `cap` is negative or not finite.
    pub fn new(base: f64, cap: f64) -> Result<Self, BackoffError> {
        if !(base > 1.0) || !base.is_finite() {
            return Err(BackoffError::InvalidBase(base));
        }
        if !(cap >= 0.0) || !cap.is_finite() {
            return Err(BackoffError::InvalidCap(cap));
        }
        Ok(Self { base, cap, unit: Duration::from_secs(1) })
    }

    /// Scale every delay by `unit` instead of one second.
    ///
    /// The growth curve is unchanged; tests use this to run retry loops in
    /// milliseconds.
    #[must_use]
    pub fn with_unit(mut self, unit: Duration) -> Self {
        self.unit = unit;
        self
    }

    pub fn base(&self) -> f64 {
        self.base
    }

    pub fn cap(&self) -> f64 {
        self.cap
    }

    /// Upper bound of any delay this policy produces.
    pub fn max_delay(&self) -> Duration {
        self.scale(self.cap + self.base)
    }

    /// Delay before retry `attempt`, with fresh jitter.
    pub fn delay(&self, attempt: u32) -> Duration {
        let sample: f64 = rand::thread_rng().gen();
        self.delay_with(attempt, sample)
    }

    /// Delay before retry `attempt` for a given jitter sample in `[0, 1)`.
    pub fn delay_with(&self, attempt: u32, sample: f64) -> Duration {
        let jitter = self.base * sample.clamp(0.0, 1.0);
        let exponential = self.base.powf(f64::from(attempt));
        self.scale((self.cap + jitter).min(exponential + jitter))
    }

    fn scale(&self, seconds: f64) -> Duration {
        Duration::try_from_secs_f64(seconds * self.unit.as_secs_f64()).unwrap_or(Duration::MAX)
    }
}

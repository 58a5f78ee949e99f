//! Shared utilities for Crucible crates.
//!
//! # Feature Tiers
//!
//! Enable cargo features to opt into the tiers you need:
//! - `foundation`: credential resolution, batching, backoff policy
//! - `observability`: tracing support (implied by `runtime`)
//! - `runtime`: retry executors, gzip helpers, on-disk LRU cache

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

// Foundation tier
// -----------------------------------------------------------------
#[cfg(feature = "foundation")]
pub mod credentials;
#[cfg(feature = "foundation")]
pub mod resilience;
#[cfg(feature = "foundation")]
pub mod utils;

// Runtime tier
// --------------------------------------------------------------------
#[cfg(feature = "runtime")]
pub mod cache;
#[cfg(feature = "runtime")]
pub mod compression;

// Re-export commonly used types
// ------------------------
#[cfg(feature = "runtime")]
pub use cache::{CacheConfig, CacheError, LocalCache};
#[cfg(feature = "foundation")]
pub use credentials::{CredentialError, CredentialSource, OverrideWarning, Resolved};
#[cfg(feature = "foundation")]
pub use resilience::{BackoffError, BackoffPolicy};
#[cfg(feature = "runtime")]
pub use resilience::{MaxRetries, RetryDecision, RetryError, RetryExecutor, RetryPolicy};
#[cfg(feature = "foundation")]
pub use utils::batched;

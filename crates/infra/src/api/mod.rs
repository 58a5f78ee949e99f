//! Resilient client for the Crucible compute API
//!
//! Every network-calling operation is composed the same way:
//!
//! ```text
//! retry( authenticated( |token| request(token) ) )
//! ```
//!
//! - The retry layer ([`RetryExecutor`](crucible_common::RetryExecutor)) owns
//!   the backoff budget and re-attempts connection failures and the
//!   retryable status codes.
//! - The authentication layer attaches the bearer token, exchanging
//!   credentials on first use and refreshing exactly once when a request is
//!   rejected with 401. That refresh does not consume the retry budget.
//!
//! [`AsyncClient`] and [`BlockingClient`] implement the same state machine;
//! only the way they wait (futures and a tokio mutex versus the calling
//! thread) differs.

pub mod auth;
pub mod blocking;
pub mod client;
mod context;
pub mod errors;
pub mod request;
pub mod settings;

pub use blocking::BlockingClient;
pub use client::{AsyncClient, AsyncSession};
pub use errors::{ClientError, ClientErrorCategory, RetryableStatus};
pub use request::{Compression, ResourceRequest};
pub use settings::{ClientSettings, ClientSettingsBuilder, SettingsSnapshot};

//! Observability infrastructure
//!
//! Library code only emits `tracing` events. Binaries and tests that want to
//! see them install a subscriber once through [`init_logging`].

pub mod logging;

pub use logging::{init_logging, LogFormat, LoggingConfig, LoggingError};

//! # Crucible Domain
//!
//! Data model shared by the API client and the result object store.
//!
//! This crate contains:
//! - Scope and ScopedKey identifiers with their lossless string forms
//! - Object store addressing types (ObjectLocation, ObjectRef, Route)
//! - Domain error types and Result definitions
//! - Configuration value types and constants
//!
//! ## Architecture
//! - No dependencies on other Crucible crates
//! - No I/O; every type here is a plain value

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;

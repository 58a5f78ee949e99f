//! # Crucible Infrastructure
//!
//! Infrastructure implementations of core ports.
//!
//! This crate contains:
//! - The resilient API client, in async and blocking flavours
//! - The filesystem blob backend for the object store
//! - Environment-driven settings loaders
//! - Logging initialisation
//!
//! ## Architecture
//! - Implements traits defined in `crucible-core`
//! - Contains all "impure" code (network, filesystem, global subscriber)

pub mod api;
pub mod config;
pub mod objectstore;
pub mod observability;

// Re-export commonly used items
pub use api::{
    AsyncClient, AsyncSession, BlockingClient, ClientError, ClientSettings, ClientSettingsBuilder,
    Compression, ResourceRequest,
};
pub use config::{load_object_store_settings, load_object_store_settings_with};
pub use objectstore::FsBlobBackend;
pub use observability::{init_logging, LogFormat, LoggingConfig, LoggingError};

//! # Crucible Core
//!
//! Ports and pure services - no network or platform dependencies.
//!
//! This crate contains:
//! - The [`Codec`] boundary for domain serialization
//! - The [`BlobBackend`] port and the [`ObjectStore`] service built on it
//! - An in-memory backend for tests and single-process use
//!
//! ## Architecture Principles
//! - Only depends on `crucible-common` and `crucible-domain`
//! - All external storage via the [`BlobBackend`] trait

pub mod codec;
pub mod objectstore;

pub use codec::{Codec, CodecError, JsonCodec};
pub use objectstore::{
    BlobBackend, ListPage, MemoryBlobBackend, ObjectStore, ResultAddress, StoreError,
};

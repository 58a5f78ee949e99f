//! Content-addressed result store
//!
//! [`ObjectStore`] places artifact bytes at locations derived from scope and
//! content identity over any [`BlobBackend`]. [`MemoryBlobBackend`] is the
//! in-process backend; the filesystem backend lives in `crucible-infra`.

pub mod memory;
pub mod ports;
pub mod store;

use std::io;

use crucible_domain::DomainError;
use thiserror::Error;

pub use memory::MemoryBlobBackend;
pub use ports::{BlobBackend, ListPage};
pub use store::{ObjectStore, ResultAddress};

/// Object store failures. The store never retries; callers decide.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("backend rejected write of '{key}' with status {status}")]
    WriteRejected { key: String, status: u16 },

    #[error("no object stored at '{0}'")]
    NotFound(String),

    #[error(transparent)]
    Validation(#[from] DomainError),

    #[error("object store backend error: {0}")]
    Backend(String),

    #[error("object store I/O error: {0}")]
    Io(#[from] io::Error),
}

//! Port interface for blob storage backends

use async_trait::async_trait;

use super::StoreError;

/// One page of a prefix listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListPage {
    /// Full backend keys, in ascending order.
    pub keys: Vec<String>,
    /// Continuation token for the next page, `None` on the last page.
    pub next: Option<String>,
}

/// Key-value blob container.
///
/// Keys are `/`-separated paths. Writes must be durable when `put` returns.
#[async_trait]
pub trait BlobBackend: Send + Sync {
    /// Create the container if it does not exist.
    async fn create_container(&self) -> Result<(), StoreError>;

    /// Remove the (empty) container.
    async fn delete_container(&self) -> Result<(), StoreError>;

    /// Write `bytes` at `key`, overwriting, and report the HTTP-style status.
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<u16, StoreError>;

    /// Read the object at `key`; [`StoreError::NotFound`] if absent.
    async fn get(&self, key: &str) -> Result<Vec<u8>, StoreError>;

    /// Metadata-only existence probe.
    async fn exists(&self, key: &str) -> Result<bool, StoreError>;

    /// Remove the object at `key`. Removing a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// One page of keys starting with `prefix`.
    async fn list(&self, prefix: &str, continuation: Option<String>) -> Result<ListPage, StoreError>;
}

//! In-memory blob backend

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;

use super::ports::{BlobBackend, ListPage};
use super::StoreError;

const DEFAULT_PAGE_SIZE: usize = 1000;

/// Process-local [`BlobBackend`] backed by an ordered map.
///
/// Behaves like a bucket: operations other than `create_container` fail
/// until it exists, and deleting it requires it to be empty.
#[derive(Debug)]
pub struct MemoryBlobBackend {
    container: RwLock<Option<BTreeMap<String, Vec<u8>>>>,
    page_size: usize,
    reject_status: Option<u16>,
    get_calls: AtomicUsize,
}

impl Default for MemoryBlobBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBlobBackend {
    pub fn new() -> Self {
        Self {
            container: RwLock::new(None),
            page_size: DEFAULT_PAGE_SIZE,
            reject_status: None,
            get_calls: AtomicUsize::new(0),
        }
    }

    /// Limit listing pages to `page_size` keys (at least one).
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Answer every `put` with `status` without storing anything.
    #[must_use]
    pub fn rejecting_writes(mut self, status: u16) -> Self {
        self.reject_status = Some(status);
        self
    }

    /// Number of `get` calls served so far.
    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::Relaxed)
    }

    pub fn container_exists(&self) -> bool {
        self.container.read().is_some()
    }

    pub fn len(&self) -> usize {
        self.container.read().as_ref().map_or(0, BTreeMap::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn missing_container() -> StoreError {
    StoreError::Backend("container does not exist".into())
}

#[async_trait]
impl BlobBackend for MemoryBlobBackend {
    async fn create_container(&self) -> Result<(), StoreError> {
        self.container.write().get_or_insert_with(BTreeMap::new);
        Ok(())
    }

    async fn delete_container(&self) -> Result<(), StoreError> {
        let mut container = self.container.write();
        match container.as_ref() {
            None => Err(missing_container()),
            Some(objects) if !objects.is_empty() => {
                Err(StoreError::Backend(format!("container is not empty ({} objects)", objects.len())))
            }
            Some(_) => {
                *container = None;
                Ok(())
            }
        }
    }

    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<u16, StoreError> {
        if let Some(status) = self.reject_status {
            return Ok(status);
        }
        let mut container = self.container.write();
        let objects = container.as_mut().ok_or_else(missing_container)?;
        objects.insert(key.to_owned(), bytes);
        Ok(200)
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        self.get_calls.fetch_add(1, Ordering::Relaxed);
        let container = self.container.read();
        let objects = container.as_ref().ok_or_else(missing_container)?;
        objects.get(key).cloned().ok_or_else(|| StoreError::NotFound(key.to_owned()))
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        let container = self.container.read();
        let objects = container.as_ref().ok_or_else(missing_container)?;
        Ok(objects.contains_key(key))
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut container = self.container.write();
        let objects = container.as_mut().ok_or_else(missing_container)?;
        objects.remove(key);
        Ok(())
    }

    async fn list(&self, prefix: &str, continuation: Option<String>) -> Result<ListPage, StoreError> {
        let container = self.container.read();
        let objects = container.as_ref().ok_or_else(missing_container)?;

        let start = match &continuation {
            Some(after) => Bound::Excluded(after.as_str()),
            None => Bound::Included(prefix),
        };

        let mut matching = objects
            .range::<str, _>((start, Bound::Unbounded))
            .map(|(key, _)| key)
            .skip_while(|key| key.as_str() < prefix)
            .take_while(|key| key.starts_with(prefix));

        let keys: Vec<String> = matching.by_ref().take(self.page_size).cloned().collect();
        let next = match matching.next() {
            Some(_) => keys.last().cloned(),
            None => None,
        };
        Ok(ListPage { keys, next })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_operations_require_container() {
        let backend = MemoryBlobBackend::new();
        assert!(backend.put("a", vec![1]).await.is_err());
        backend.create_container().await.unwrap();
        assert_eq!(backend.put("a", vec![1]).await.unwrap(), 200);
    }

    #[tokio::test]
    async fn test_list_paginates_within_prefix() {
        let backend = MemoryBlobBackend::new().with_page_size(2);
        backend.create_container().await.unwrap();
        for key in ["a/1", "a/2", "a/3", "b/1"] {
            backend.put(key, vec![]).await.unwrap();
        }

        let first = backend.list("a/", None).await.unwrap();
        assert_eq!(first.keys, vec!["a/1", "a/2"]);
        let second = backend.list("a/", first.next).await.unwrap();
        assert_eq!(second.keys, vec!["a/3"]);
        assert_eq!(second.next, None);
    }

    #[tokio::test]
    async fn test_delete_container_requires_empty() {
        let backend = MemoryBlobBackend::new();
        backend.create_container().await.unwrap();
        backend.put("k", vec![0]).await.unwrap();
        assert!(backend.delete_container().await.is_err());

        backend.delete("k").await.unwrap();
        backend.delete_container().await.unwrap();
        assert!(!backend.container_exists());
    }
}

use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use crucible_core::objectstore::{BlobBackend, ListPage, StoreError};
use crucible_domain::ObjectStoreSettings;
use tokio::fs;
use tracing::debug;

const DEFAULT_PAGE_SIZE: usize = 1000;
const TEMP_SUFFIX: &str = ".partial";

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Filesystem-based blob backend.
///
/// The container is a directory and each object is stored at
/// `{container}/{key}`. Writes go to a temporary sibling first and are renamed
/// into place, so readers never observe a partial object.
#[derive(Debug, Clone)]
pub struct FsBlobBackend {
    container: PathBuf,
    page_size: usize,
}

impl FsBlobBackend {
    /// Backend whose container is the directory `root/container`.
    pub fn new(root: impl AsRef<Path>, container: &str) -> Self {
        Self { container: root.as_ref().join(container), page_size: DEFAULT_PAGE_SIZE }
    }

    /// Backend for the bucket named in `settings`, rooted at `root`.
    ///
    /// The key prefix is applied by the object store, not the backend.
    pub fn from_settings(root: impl AsRef<Path>, settings: &ObjectStoreSettings) -> Self {
        Self::new(root, &settings.bucket)
    }

    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn container(&self) -> &Path {
        &self.container
    }

    fn key_to_path(&self, key: &str) -> Result<PathBuf, StoreError> {
        let relative = Path::new(key);
        let valid = !key.is_empty()
            && relative.components().all(|c| matches!(c, Component::Normal(_)))
            && !key.ends_with(TEMP_SUFFIX);
        if !valid {
            return Err(StoreError::Backend(format!("invalid object key '{key}'")));
        }
        Ok(self.container.join(relative))
    }

    async fn require_container(&self) -> Result<(), StoreError> {
        if fs::try_exists(&self.container).await? {
            Ok(())
        } else {
            Err(StoreError::Backend(format!(
                "container {} does not exist",
                self.container.display()
            )))
        }
    }

    /// Every object key below `directory`, unsorted.
    async fn walk(&self, directory: PathBuf) -> Result<Vec<String>, StoreError> {
        let mut keys = Vec::new();
        let mut pending = vec![directory];

        while let Some(dir) = pending.pop() {
            let mut entries = match fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if entry.file_type().await?.is_dir() {
                    pending.push(path);
                } else if let Some(key) = self.path_to_key(&path) {
                    keys.push(key);
                }
            }
        }
        Ok(keys)
    }

    fn path_to_key(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.container).ok()?;
        let parts: Vec<&str> = relative
            .components()
            .map(|c| c.as_os_str().to_str())
            .collect::<Option<Vec<_>>>()?;
        let key = parts.join("/");
        (!key.ends_with(TEMP_SUFFIX)).then_some(key)
    }

    /// Remove now-empty directories between `path` and the container.
    async fn prune_empty_parents(&self, path: &Path) {
        let mut current = path.parent();
        while let Some(dir) = current {
            if dir == self.container || fs::remove_dir(dir).await.is_err() {
                break;
            }
            current = dir.parent();
        }
    }
}

#[async_trait]
impl BlobBackend for FsBlobBackend {
    async fn create_container(&self) -> Result<(), StoreError> {
        fs::create_dir_all(&self.container).await?;
        Ok(())
    }

    async fn delete_container(&self) -> Result<(), StoreError> {
        self.require_container().await?;
        let remaining = self.walk(self.container.clone()).await?;
        if !remaining.is_empty() {
            return Err(StoreError::Backend(format!(
                "container is not empty ({} objects)",
                remaining.len()
            )));
        }
        fs::remove_dir_all(&self.container).await?;
        Ok(())
    }

    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<u16, StoreError> {
        self.require_container().await?;
        let path = self.key_to_path(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut temp = path.clone().into_os_string();
        temp.push(format!(".{}{TEMP_SUFFIX}", TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)));
        let temp = PathBuf::from(temp);

        fs::write(&temp, &bytes).await?;
        if let Err(e) = fs::rename(&temp, &path).await {
            let _ = fs::remove_file(&temp).await;
            return Err(e.into());
        }
        debug!(key, size = bytes.len(), "wrote object");
        Ok(200)
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        self.require_container().await?;
        let path = self.key_to_path(key)?;
        fs::read(&path).await.map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                StoreError::NotFound(key.to_owned())
            } else {
                StoreError::Io(e)
            }
        })
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        self.require_container().await?;
        let path = self.key_to_path(key)?;
        match fs::metadata(&path).await {
            Ok(metadata) => Ok(metadata.is_file()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.require_container().await?;
        let path = self.key_to_path(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => {
                self.prune_empty_parents(&path).await;
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn list(&self, prefix: &str, continuation: Option<String>) -> Result<ListPage, StoreError> {
        self.require_container().await?;

        // Only the directory holding the prefix can contain matches.
        let start = match prefix.rfind('/') {
            Some(end) => self.key_to_path(&prefix[..end])?,
            None => self.container.clone(),
        };

        let mut keys: Vec<String> = self
            .walk(start)
            .await?
            .into_iter()
            .filter(|key| key.starts_with(prefix))
            .filter(|key| continuation.as_deref().map_or(true, |after| key.as_str() > after))
            .collect();
        keys.sort_unstable();

        let next = if keys.len() > self.page_size {
            keys.truncate(self.page_size);
            keys.last().cloned()
        } else {
            None
        };
        Ok(ListPage { keys, next })
    }
}

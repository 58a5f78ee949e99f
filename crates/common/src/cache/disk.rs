//! Disk-resident LRU store
//!
//! Each entry is one file named by the SHA-256 of its key. An in-memory
//! [`LruCache`] tracks recency and per-entry sizes; it is rebuilt from file
//! modification times when a cache directory is reopened, and hits refresh the
//! file's mtime so that order survives restarts.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use lru::LruCache;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};
use url::form_urlencoded;

use super::config::{resolve_cache_dir, CacheConfig};
use super::stats::{CacheStats, MetricsCollector};
use super::CacheError;

/// Bounded, least-recently-used, on-disk byte store.
///
/// Safe to share across threads; file reads happen outside the index lock.
#[derive(Debug)]
pub struct LocalCache {
    store: Option<DiskStore>,
}

#[derive(Debug)]
struct DiskStore {
    directory: PathBuf,
    size_limit: u64,
    index: Mutex<Index>,
    metrics: MetricsCollector,
}

#[derive(Debug)]
struct Index {
    entries: LruCache<String, u64>,
    total_bytes: u64,
}

/// Canonical cache key for a resource path and its query parameters.
///
/// Parameters are sorted so that the key does not depend on call-site
/// ordering, and form-urlencoded so that a value containing `&` or `=` cannot
/// alias a different parameter list.
pub fn cache_key<K, V>(path: &str, params: &[(K, V)]) -> String
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut pairs: Vec<(&str, &str)> = params.iter().map(|(k, v)| (k.as_ref(), v.as_ref())).collect();
    pairs.sort_unstable();

    if pairs.is_empty() {
        return path.to_owned();
    }
    let query = form_urlencoded::Serializer::new(String::new()).extend_pairs(pairs).finish();
    format!("{path}?{query}")
}

fn entry_name(key: &str) -> String {
    hex::encode(Sha256::digest(key.as_bytes()))
}

fn is_entry_name(name: &str) -> bool {
    name.len() == 64 && name.bytes().all(|b| b.is_ascii_hexdigit())
}

impl LocalCache {
    /// Open (creating if needed) the cache described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::InvalidSizeLimit`] for a negative budget, even
    /// when the cache is disabled, and [`CacheError::Io`] if the directory
    /// cannot be created or scanned.
    pub fn open(config: &CacheConfig) -> Result<Self, CacheError> {
        let size_limit = config.validated_limit()?;
        if !config.enabled {
            return Ok(Self::disabled());
        }

        let directory = resolve_cache_dir(config.directory.as_deref())?;
        fs::create_dir_all(&directory)
            .map_err(|source| CacheError::Io { path: directory.clone(), source })?;

        let store = DiskStore::scan(directory, size_limit)?;
        debug!(
            directory = %store.directory.display(),
            entries = store.index.lock().entries.len(),
            size_limit,
            "opened local cache"
        );
        Ok(Self { store: Some(store) })
    }

    /// A cache that stores nothing.
    pub fn disabled() -> Self {
        Self { store: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.store.is_some()
    }

    pub fn directory(&self) -> Option<&Path> {
        self.store.as_ref().map(|s| s.directory.as_path())
    }

    /// Look up `key`, marking it most recently used on a hit.
    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.store.as_ref()?.get(key)
    }

    /// Store `value` under `key`, evicting least-recently-used entries until
    /// the budget is respected. Values larger than the whole budget are not
    /// stored.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Io`] if the entry cannot be written.
    pub fn put(&self, key: &str, value: &[u8]) -> Result<(), CacheError> {
        match &self.store {
            Some(store) => store.put(key, value),
            None => Ok(()),
        }
    }

    pub fn len(&self) -> usize {
        self.store.as_ref().map_or(0, |s| s.index.lock().entries.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes currently stored.
    pub fn total_size(&self) -> u64 {
        self.store.as_ref().map_or(0, |s| s.index.lock().total_bytes)
    }

    /// Remove every entry.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Io`] if an entry file cannot be removed.
    pub fn clear(&self) -> Result<(), CacheError> {
        let Some(store) = &self.store else {
            return Ok(());
        };

        let mut index = store.index.lock();
        while let Some((name, _)) = index.entries.pop_lru() {
            store.remove_file(&name)?;
        }
        index.total_bytes = 0;
        Ok(())
    }

    pub fn stats(&self) -> CacheStats {
        match &self.store {
            Some(store) => {
                let index = store.index.lock();
                store.metrics.snapshot(index.entries.len(), index.total_bytes, store.size_limit)
            }
            None => CacheStats::default(),
        }
    }
}

impl DiskStore {
    fn scan(directory: PathBuf, size_limit: u64) -> Result<Self, CacheError> {
        let io_err = |source| CacheError::Io { path: directory.clone(), source };

        let mut found: Vec<(SystemTime, String, u64)> = Vec::new();
        for entry in fs::read_dir(&directory).map_err(io_err)? {
            let entry = entry.map_err(io_err)?;
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if !is_entry_name(&name) {
                continue;
            }
            let metadata = entry.metadata().map_err(io_err)?;
            if !metadata.is_file() {
                continue;
            }
            let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
            found.push((modified, name, metadata.len()));
        }
        found.sort();

        let mut entries = LruCache::unbounded();
        let mut total_bytes = 0_u64;
        for (_, name, size) in found {
            total_bytes += size;
            entries.push(name, size);
        }

        let store = Self {
            directory,
            size_limit,
            index: Mutex::new(Index { entries, total_bytes }),
            metrics: MetricsCollector::default(),
        };
        {
            let mut index = store.index.lock();
            store.evict(&mut index)?;
        }
        Ok(store)
    }

    fn path(&self, name: &str) -> PathBuf {
        self.directory.join(name)
    }

    fn get(&self, key: &str) -> Option<Vec<u8>> {
        let name = entry_name(key);
        if self.index.lock().entries.get(&name).is_none() {
            self.metrics.record_miss();
            return None;
        }

        let path = self.path(&name);
        match fs::read(&path) {
            Ok(bytes) => {
                self.metrics.record_hit();
                touch(&path);
                Some(bytes)
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "dropping unreadable cache entry");
                let mut index = self.index.lock();
                if let Some(size) = index.entries.pop(&name) {
                    index.total_bytes = index.total_bytes.saturating_sub(size);
                }
                self.metrics.record_miss();
                None
            }
        }
    }

    fn put(&self, key: &str, value: &[u8]) -> Result<(), CacheError> {
        let size = value.len() as u64;
        if size > self.size_limit {
            debug!(size, size_limit = self.size_limit, "value exceeds cache budget; not stored");
            return Ok(());
        }

        let name = entry_name(key);
        let path = self.path(&name);
        let staged = self.stage(&path, value)?;

        // Rename under the index lock so a concurrent eviction of the previous
        // entry cannot remove the new file.
        let mut index = self.index.lock();
        staged
            .persist(&path)
            .map_err(|err| CacheError::Io { path: path.clone(), source: err.error })?;
        if let Some(previous) = index.entries.push(name.clone(), size).and_then(|(old, prev)| {
            (old == name).then_some(prev)
        }) {
            index.total_bytes = index.total_bytes.saturating_sub(previous);
        }
        index.total_bytes += size;
        self.metrics.record_insert();
        self.evict(&mut index)
    }

    fn stage(&self, path: &Path, value: &[u8]) -> Result<tempfile::NamedTempFile, CacheError> {
        let io_err = |source| CacheError::Io { path: path.to_path_buf(), source };

        let mut staged = tempfile::NamedTempFile::new_in(&self.directory).map_err(io_err)?;
        staged.write_all(value).map_err(io_err)?;
        Ok(staged)
    }

    fn evict(&self, index: &mut Index) -> Result<(), CacheError> {
        while index.total_bytes > self.size_limit {
            let Some((name, size)) = index.entries.pop_lru() else {
                break;
            };
            index.total_bytes = index.total_bytes.saturating_sub(size);
            self.remove_file(&name)?;
            self.metrics.record_eviction();
            debug!(entry = %name, size, "evicted cache entry");
        }
        Ok(())
    }

    fn remove_file(&self, name: &str) -> Result<(), CacheError> {
        let path = self.path(name);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(CacheError::Io { path, source }),
        }
    }
}

fn touch(path: &Path) {
    let result = fs::File::options()
        .write(true)
        .open(path)
        .and_then(|file| file.set_modified(SystemTime::now()));
    if let Err(err) = result {
        debug!(path = %path.display(), error = %err, "could not refresh cache entry mtime");
    }
}

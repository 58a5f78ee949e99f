//! Local on-disk cache for immutable resources
//!
//! [`LocalCache`] keeps raw response bodies of content-addressed resources so
//! that repeat fetches skip the network. Entries never expire; the only
//! removal policy is least-recently-used eviction once the configured byte
//! budget is exceeded.
//!
//! # Example
//!
//! ```no_run
//! use crucible_common::cache::{cache_key, CacheConfig, LocalCache};
//!
//! let cache = LocalCache::open(&CacheConfig::new().size_limit(64 * 1024 * 1024))?;
//! let key = cache_key("/transformations/Transformation-abc-o-c-p", &[("return_gufe", "true")]);
//!
//! if cache.get(&key).is_none() {
//!     cache.put(&key, br#"{"name": "t1"}"#)?;
//! }
//! # Ok::<(), crucible_common::cache::CacheError>(())
//! ```

use std::io;
use std::path::PathBuf;

use thiserror::Error;

mod config;
mod disk;
mod stats;

pub use config::{
    resolve_cache_dir, resolve_cache_dir_with, CacheConfig, CACHE_DIR_NAME, DEFAULT_SIZE_LIMIT,
};
pub use disk::{cache_key, LocalCache};
pub use stats::CacheStats;

/// Errors raised by the local cache
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache size limit must be non-negative, got {0}")]
    InvalidSizeLimit(i64),

    #[error("no cache directory given and neither XDG_CACHE_HOME nor a home directory is available")]
    NoCacheHome,

    #[error("cache I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

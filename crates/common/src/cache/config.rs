//! Local cache configuration and directory resolution

use std::path::{Path, PathBuf};

use super::CacheError;

/// Default byte budget (1 GiB).
pub const DEFAULT_SIZE_LIMIT: i64 = 1_073_741_824;

/// Subdirectory created under the platform cache home.
pub const CACHE_DIR_NAME: &str = "crucible";

/// Configuration for [`LocalCache`](super::LocalCache)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Explicit cache directory; resolved from the environment when `None`.
    pub directory: Option<PathBuf>,

    /// Total byte budget; must be non-negative even when disabled.
    pub size_limit: i64,

    /// When `false` every lookup misses and every insert is dropped.
    pub enabled: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { directory: None, size_limit: DEFAULT_SIZE_LIMIT, enabled: true }
    }
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.directory = Some(directory.into());
        self
    }

    #[must_use]
    pub fn size_limit(mut self, bytes: i64) -> Self {
        self.size_limit = bytes;
        self
    }

    #[must_use]
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Validated byte budget.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::InvalidSizeLimit`] if the limit is negative.
    pub fn validated_limit(&self) -> Result<u64, CacheError> {
        u64::try_from(self.size_limit).map_err(|_| CacheError::InvalidSizeLimit(self.size_limit))
    }
}

/// Resolve the cache directory from the process environment.
///
/// Order: `explicit`, then `$XDG_CACHE_HOME/crucible`, then
/// `~/.cache/crucible`.
///
/// # Errors
///
/// Returns [`CacheError::NoCacheHome`] if no candidate is available.
pub fn resolve_cache_dir(explicit: Option<&Path>) -> Result<PathBuf, CacheError> {
    resolve_cache_dir_with(
        explicit,
        std::env::var_os("XDG_CACHE_HOME").map(PathBuf::from),
        dirs::home_dir(),
    )
}

/// Resolve the cache directory from explicit inputs.
///
/// Relative results are anchored at the current working directory. An empty
/// `xdg_cache_home` is treated as unset.
///
/// # Errors
///
/// Returns [`CacheError::NoCacheHome`] if no candidate is available.
pub fn resolve_cache_dir_with(
    explicit: Option<&Path>,
    xdg_cache_home: Option<PathBuf>,
    home: Option<PathBuf>,
) -> Result<PathBuf, CacheError> {
    let directory = match explicit {
        Some(path) => path.to_path_buf(),
        None => match xdg_cache_home.filter(|p| !p.as_os_str().is_empty()) {
            Some(xdg) => xdg.join(CACHE_DIR_NAME),
            None => home.ok_or(CacheError::NoCacheHome)?.join(".cache").join(CACHE_DIR_NAME),
        },
    };

    if directory.is_absolute() {
        return Ok(directory);
    }

    let cwd = std::env::current_dir()
        .map_err(|source| CacheError::Io { path: directory.clone(), source })?;
    Ok(cwd.join(directory))
}

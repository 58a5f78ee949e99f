//! Object store backends backed by local resources
//!
//! Implements the `BlobBackend` port from `crucible-core`.

mod fs;

use std::path::Path;

use crucible_core::ObjectStore;
use crucible_domain::ObjectStoreSettings;

pub use fs::FsBlobBackend;

/// Object store over a filesystem backend described by `settings`.
pub fn open_fs_store(root: impl AsRef<Path>, settings: &ObjectStoreSettings) -> ObjectStore<FsBlobBackend> {
    ObjectStore::new(FsBlobBackend::from_settings(root, settings), settings.prefix.clone())
}

//! Content-addressed result store service

use chrono::Utc;
use crucible_common::utils::batched;
use crucible_domain::constants::STORE_CHECK_KEY;
use crucible_domain::{ContentKey, DomainError, ObjectLocation, ObjectRef, Route, Scope, ScopedKey};
use futures::future::try_join_all;
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use tracing::{debug, info, instrument, warn};

use super::ports::BlobBackend;
use super::StoreError;

/// Concurrent deletes issued per group during [`ObjectStore::reset`].
const RESET_BATCH_SIZE: usize = 100;

/// Where to find a stored result.
#[derive(Debug, Clone)]
pub enum ResultAddress {
    /// A location previously returned in an [`ObjectRef`].
    Location(ObjectLocation),
    /// Recompute the location from the producing entity and the artifact.
    Keys { entity: ScopedKey, artifact: ScopedKey, ok: bool },
}

/// Stores opaque artifact bytes under deterministic, scope-qualified paths.
///
/// Every location is relative to `prefix` inside the backend's container.
/// No client-side locking is done; concurrent pushes to one location resolve
/// as last-write-wins in the backend.
#[derive(Debug)]
pub struct ObjectStore<B> {
    backend: B,
    prefix: String,
}

enum Cursor {
    Start,
    Next(String),
    Done,
}

impl<B: BlobBackend> ObjectStore<B> {
    pub fn new(backend: B, prefix: impl Into<String>) -> Self {
        Self { backend, prefix: prefix.into() }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    fn backend_key(&self, location: &str) -> String {
        let prefix = self.prefix.trim_end_matches('/');
        if prefix.is_empty() {
            location.to_owned()
        } else {
            format!("{prefix}/{location}")
        }
    }

    fn location_of(&self, key: String) -> ObjectLocation {
        let prefix = self.prefix.trim_end_matches('/');
        if prefix.is_empty() {
            return ObjectLocation::new(key);
        }
        match key.strip_prefix(prefix).and_then(|rest| rest.strip_prefix('/')) {
            Some(rest) => ObjectLocation::new(rest),
            None => ObjectLocation::new(key),
        }
    }

    /// Ensure the backing container exists. Idempotent.
    ///
    /// # Errors
    ///
    /// Propagates backend failures.
    pub async fn initialize(&self) -> Result<(), StoreError> {
        self.backend.create_container().await
    }

    /// Store the bytes of an artifact produced for `entity`.
    ///
    /// Returns once the backend has durably accepted the write. Pushing the
    /// same inputs again overwrites the same location.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::WriteRejected`] if the backend reports a
    /// non-success status.
    #[instrument(skip_all, fields(entity = %entity, artifact = %artifact, ok = ok, size = bytes.len()))]
    pub async fn push(
        &self,
        entity: &ScopedKey,
        bytes: Vec<u8>,
        ok: bool,
        artifact: &ContentKey,
        creator: Option<&str>,
    ) -> Result<ObjectRef, StoreError> {
        let location = ObjectLocation::for_result(
            entity.scope(),
            entity.content_key(),
            Route::from_ok(ok),
            artifact,
        )?;

        self.store_bytes(location.as_str(), bytes).await?;
        info!(location = %location, "stored result");

        Ok(ObjectRef {
            location,
            obj_key: artifact.clone(),
            scope: entity.scope().clone(),
            ok,
            datetime_created: Utc::now(),
            creator: creator.map(str::to_owned),
        })
    }

    /// Read back the raw bytes of a stored result. No decoding is done.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Validation`] before touching the backend if the
    /// two keys of [`ResultAddress::Keys`] have different scopes, and
    /// [`StoreError::NotFound`] if nothing is stored there.
    pub async fn pull(&self, address: &ResultAddress) -> Result<Vec<u8>, StoreError> {
        let location = Self::resolve(address)?;
        debug!(location = %location, "pulling result");
        self.backend.get(&self.backend_key(location.as_str())).await
    }

    fn resolve(address: &ResultAddress) -> Result<ObjectLocation, StoreError> {
        match address {
            ResultAddress::Location(location) => Ok(location.clone()),
            ResultAddress::Keys { entity, artifact, ok } => {
                if entity.scope() != artifact.scope() {
                    return Err(DomainError::ScopeMismatch {
                        left: entity.scope().to_string(),
                        right: artifact.scope().to_string(),
                    }
                    .into());
                }
                Ok(ObjectLocation::for_result(
                    artifact.scope(),
                    entity.content_key(),
                    Route::from_ok(*ok),
                    artifact.content_key(),
                )?)
            }
        }
    }

    /// Whether an object is stored at `location`, without downloading it.
    ///
    /// # Errors
    ///
    /// Propagates backend failures.
    pub async fn exists(&self, location: &ObjectLocation) -> Result<bool, StoreError> {
        self.backend.exists(&self.backend_key(location.as_str())).await
    }

    /// Remove the object at `location`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if nothing is stored there.
    pub async fn delete(&self, location: &ObjectLocation) -> Result<(), StoreError> {
        self.delete_key(&self.backend_key(location.as_str())).await
    }

    async fn delete_key(&self, key: &str) -> Result<(), StoreError> {
        if !self.backend.exists(key).await? {
            return Err(StoreError::NotFound(key.to_owned()));
        }
        self.backend.delete(key).await
    }

    async fn store_bytes(&self, location: &str, bytes: Vec<u8>) -> Result<(), StoreError> {
        let key = self.backend_key(location);
        let status = self.backend.put(&key, bytes).await?;
        if !(200..300).contains(&status) {
            return Err(StoreError::WriteRejected { key, status });
        }
        Ok(())
    }

    /// Lazily list stored locations starting with `prefix`.
    ///
    /// Pages are fetched from the backend on demand, so dropping the stream
    /// early stops listing. Each call starts a fresh listing.
    pub fn iter_contents(&self, prefix: &str) -> BoxStream<'_, Result<ObjectLocation, StoreError>> {
        let filter = self.backend_key(prefix);

        stream::try_unfold(Cursor::Start, move |cursor| {
            let filter = filter.clone();
            async move {
                let continuation = match cursor {
                    Cursor::Done => return Ok(None),
                    Cursor::Start => None,
                    Cursor::Next(token) => Some(token),
                };

                let page = self.backend.list(&filter, continuation).await?;
                let next = page.next.map_or(Cursor::Done, Cursor::Next);
                let locations: Vec<Result<ObjectLocation, StoreError>> =
                    page.keys.into_iter().map(|key| Ok(self.location_of(key))).collect();
                Ok::<_, StoreError>(Some((stream::iter(locations), next)))
            }
        })
        .try_flatten()
        .boxed()
    }

    /// Lazily list every result stored under `scope`.
    pub fn iter_scope(&self, scope: &Scope) -> BoxStream<'_, Result<ObjectLocation, StoreError>> {
        self.iter_contents(&ObjectLocation::scope_prefix(scope))
    }

    /// Delete every object under this store's prefix, then the container.
    ///
    /// # Errors
    ///
    /// Propagates backend failures; objects deleted before the failure stay
    /// deleted.
    pub async fn reset(&self) -> Result<(), StoreError> {
        let locations: Vec<ObjectLocation> = self.iter_contents("").try_collect().await?;
        let count = locations.len();

        let groups =
            batched(locations, RESET_BATCH_SIZE).map_err(|e| StoreError::Backend(e.to_string()))?;
        for group in groups {
            try_join_all(group.iter().map(|location| {
                let key = self.backend_key(location.as_str());
                async move { self.backend.delete(&key).await }
            }))
            .await?;
        }

        self.backend.delete_container().await?;
        warn!(objects = count, prefix = %self.prefix, "object store reset");
        Ok(())
    }

    /// Write then delete a probe object; `false` if either step fails.
    pub async fn store_check(&self) -> bool {
        let result = async {
            self.store_bytes(STORE_CHECK_KEY, b"test_check".to_vec()).await?;
            self.delete_key(&self.backend_key(STORE_CHECK_KEY)).await
        }
        .await;

        match result {
            Ok(()) => true,
            Err(err) => {
                warn!(error = %err, "object store check failed");
                false
            }
        }
    }
}

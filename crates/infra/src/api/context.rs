//! State shared by every operation of one client

use crucible_common::{LocalCache, RetryExecutor};
use tracing::{debug, warn};
use url::Url;

use super::auth::TokenCache;
use super::errors::{ClientError, RetryableStatus};
use super::request::ResourceRequest;
use super::settings::ClientSettings;

#[derive(Debug)]
pub(crate) struct ClientContext {
    pub(crate) settings: ClientSettings,
    pub(crate) tokens: TokenCache,
    pub(crate) cache: LocalCache,
    pub(crate) retry: RetryExecutor<RetryableStatus>,
}

impl ClientContext {
    pub(crate) fn new(settings: ClientSettings) -> Result<Self, ClientError> {
        let cache = LocalCache::open(settings.cache())
            .map_err(|e| ClientError::Configuration(e.to_string()))?;
        let retry = RetryExecutor::new(
            settings.max_retries(),
            settings.backoff().clone(),
            RetryableStatus::default(),
        );

        Ok(Self { settings, tokens: TokenCache::new(), cache, retry })
    }

    pub(crate) fn url(&self, path: &str) -> Result<Url, ClientError> {
        super::request::join_url(self.settings.base_url(), path)
    }

    pub(crate) fn cached(&self, request: &ResourceRequest) -> Option<Vec<u8>> {
        let hit = self.cache.get(&request.cache_key());
        if hit.is_some() {
            debug!(path = request.path(), "local cache hit");
        }
        hit
    }

    /// Cache failures never fail the fetch that produced the body.
    pub(crate) fn remember(&self, request: &ResourceRequest, body: &[u8]) {
        if let Err(err) = self.cache.put(&request.cache_key(), body) {
            warn!(path = request.path(), error = %err, "failed to write local cache entry");
        }
    }
}

//! Client construction parameters
//!
//! Connection parameters (`api_url`, `identifier`, `key`) come from the
//! builder or, failing that, from `CRUCIBLE_URL`, `CRUCIBLE_ID` and
//! `CRUCIBLE_KEY`. Everything else has a default.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crucible_common::cache::CacheConfig;
use crucible_common::credentials::CredentialSource;
use crucible_common::{BackoffPolicy, MaxRetries};
use crucible_domain::constants::{
    DEFAULT_CACHE_SIZE_LIMIT, DEFAULT_MAX_RETRIES, DEFAULT_RETRY_BASE_SECONDS,
    DEFAULT_RETRY_MAX_SECONDS, ENV_API_URL, ENV_IDENTIFIER, ENV_KEY,
};
use serde::Serialize;
use tracing::warn;
use url::Url;

use super::errors::ClientError;

pub const API_URL: CredentialSource = CredentialSource::new("api_url", ENV_API_URL, "API URL");
pub const IDENTIFIER: CredentialSource =
    CredentialSource::new("identifier", ENV_IDENTIFIER, "identifier");
pub const KEY: CredentialSource = CredentialSource::new("key", ENV_KEY, "API key").secret();

/// Validated client configuration.
#[derive(Clone)]
pub struct ClientSettings {
    api_url: String,
    base_url: Url,
    identifier: String,
    key: String,
    cache: CacheConfig,
    max_retries: MaxRetries,
    backoff: BackoffPolicy,
    verify: bool,
}

/// Serializable view of [`ClientSettings`] with the key redacted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SettingsSnapshot {
    pub api_url: String,
    pub identifier: String,
    pub key: String,
    pub cache_directory: Option<PathBuf>,
    pub cache_size_limit: i64,
    pub use_local_cache: bool,
    pub max_retries: i64,
    pub retry_base_seconds: f64,
    pub retry_max_seconds: f64,
    pub verify: bool,
}

impl ClientSettings {
    pub fn builder() -> ClientSettingsBuilder {
        ClientSettingsBuilder::default()
    }

    /// The API URL as given.
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// The API URL normalised for joining resource paths.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub(crate) fn key(&self) -> &str {
        &self.key
    }

    pub fn cache(&self) -> &CacheConfig {
        &self.cache
    }

    pub fn max_retries(&self) -> MaxRetries {
        self.max_retries
    }

    pub fn backoff(&self) -> &BackoffPolicy {
        &self.backoff
    }

    pub fn verify(&self) -> bool {
        self.verify
    }

    pub fn settings(&self) -> SettingsSnapshot {
        SettingsSnapshot {
            api_url: self.api_url.clone(),
            identifier: self.identifier.clone(),
            key: "<redacted>".into(),
            cache_directory: self.cache.directory.clone(),
            cache_size_limit: self.cache.size_limit,
            use_local_cache: self.cache.enabled,
            max_retries: match self.max_retries {
                MaxRetries::Limited(n) => i64::from(n),
                MaxRetries::Unlimited => -1,
            },
            retry_base_seconds: self.backoff.base(),
            retry_max_seconds: self.backoff.cap(),
            verify: self.verify,
        }
    }
}

impl fmt::Debug for ClientSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientSettings")
            .field("api_url", &self.api_url)
            .field("identifier", &self.identifier)
            .field("key", &"<redacted>")
            .field("cache", &self.cache)
            .field("max_retries", &self.max_retries)
            .field("backoff", &self.backoff)
            .field("verify", &self.verify)
            .finish()
    }
}

/// Builder for [`ClientSettings`].
#[derive(Clone)]
pub struct ClientSettingsBuilder {
    api_url: Option<String>,
    identifier: Option<String>,
    key: Option<String>,
    cache_directory: Option<PathBuf>,
    cache_size_limit: i64,
    use_local_cache: bool,
    max_retries: i32,
    retry_base_seconds: f64,
    retry_max_seconds: f64,
    verify: bool,
    backoff_unit: Duration,
}

impl Default for ClientSettingsBuilder {
    fn default() -> Self {
        Self {
            api_url: None,
            identifier: None,
            key: None,
            cache_directory: None,
            cache_size_limit: DEFAULT_CACHE_SIZE_LIMIT,
            use_local_cache: true,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_base_seconds: DEFAULT_RETRY_BASE_SECONDS,
            retry_max_seconds: DEFAULT_RETRY_MAX_SECONDS,
            verify: true,
            backoff_unit: Duration::from_secs(1),
        }
    }
}

impl fmt::Debug for ClientSettingsBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientSettingsBuilder")
            .field("api_url", &self.api_url)
            .field("identifier", &self.identifier)
            .field("key", &self.key.as_ref().map(|_| "<redacted>"))
            .field("cache_directory", &self.cache_directory)
            .field("cache_size_limit", &self.cache_size_limit)
            .field("use_local_cache", &self.use_local_cache)
            .field("max_retries", &self.max_retries)
            .field("retry_base_seconds", &self.retry_base_seconds)
            .field("retry_max_seconds", &self.retry_max_seconds)
            .field("verify", &self.verify)
            .finish_non_exhaustive()
    }
}

impl ClientSettingsBuilder {
    pub fn api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = Some(api_url.into());
        self
    }

    pub fn identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn cache_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.cache_directory = Some(directory.into());
        self
    }

    /// Cache byte budget. Must be non-negative.
    pub fn cache_size_limit(mut self, bytes: i64) -> Self {
        self.cache_size_limit = bytes;
        self
    }

    pub fn use_local_cache(mut self, enabled: bool) -> Self {
        self.use_local_cache = enabled;
        self
    }

    /// Retries after the first attempt; `-1` retries forever.
    pub fn max_retries(mut self, max_retries: i32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Exponential backoff base. Must be greater than 1.
    pub fn retry_base_seconds(mut self, seconds: f64) -> Self {
        self.retry_base_seconds = seconds;
        self
    }

    pub fn retry_max_seconds(mut self, seconds: f64) -> Self {
        self.retry_max_seconds = seconds;
        self
    }

    /// Verify the server's TLS certificate.
    pub fn verify(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }

    /// Real duration of one backoff "second". Tests shrink this.
    pub fn backoff_unit(mut self, unit: Duration) -> Self {
        self.backoff_unit = unit;
        self
    }

    /// Validate against the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Configuration`] if a connection parameter is
    /// missing or any tunable is out of range.
    pub fn build(self) -> Result<ClientSettings, ClientError> {
        self.build_with(|var| std::env::var(var).ok())
    }

    /// Validate against an arbitrary environment lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Configuration`] if a connection parameter is
    /// missing or any tunable is out of range.
    pub fn build_with<F>(self, lookup: F) -> Result<ClientSettings, ClientError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut resolved = Vec::with_capacity(3);
        for (source, explicit) in
            [(API_URL, &self.api_url), (IDENTIFIER, &self.identifier), (KEY, &self.key)]
        {
            let value = source.resolve_with(explicit.as_deref(), &lookup)?;
            if let Some(warning) = &value.warning {
                warn!(parameter = warning.name, env_var = warning.env_var, "{}", warning);
            }
            resolved.push(value.value);
        }
        let [api_url, identifier, key]: [String; 3] = resolved
            .try_into()
            .map_err(|_| ClientError::Configuration("connection parameters incomplete".into()))?;

        let base_url = normalize_base_url(&api_url)?;

        if self.cache_size_limit < 0 {
            return Err(ClientError::Configuration(format!(
                "cache_size_limit must be non-negative, got {}",
                self.cache_size_limit
            )));
        }
        let mut cache =
            CacheConfig::new().size_limit(self.cache_size_limit).enabled(self.use_local_cache);
        if let Some(directory) = self.cache_directory {
            cache = cache.directory(directory);
        }

        let max_retries = MaxRetries::from_config(self.max_retries)
            .map_err(|e| ClientError::Configuration(e.to_string()))?;
        let backoff = BackoffPolicy::new(self.retry_base_seconds, self.retry_max_seconds)
            .map_err(|e| ClientError::Configuration(e.to_string()))?
            .with_unit(self.backoff_unit);

        Ok(ClientSettings {
            api_url,
            base_url,
            identifier,
            key,
            cache,
            max_retries,
            backoff,
            verify: self.verify,
        })
    }
}

/// Parse the API URL, ending its path with `/` so relative joins append.
fn normalize_base_url(api_url: &str) -> Result<Url, ClientError> {
    let mut url = Url::parse(api_url)
        .map_err(|e| ClientError::Configuration(format!("invalid API URL '{api_url}': {e}")))?;
    if url.cannot_be_a_base() {
        return Err(ClientError::Configuration(format!("API URL '{api_url}' cannot be a base")));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

//! Async API client
//!
//! [`AsyncClient`] holds configuration, the bearer token and the local
//! cache. Requests are issued from an [`AsyncSession`], which owns its own
//! connection pool for the duration of one scoped use: open one with
//! [`AsyncClient::session`] or run a closure with [`AsyncClient::with_session`],
//! and the pool is released when the session is dropped.
//!
//! Many operations may run concurrently on one session (or on several
//! sessions of one client). When they all find the token missing, exactly one
//! performs the credential exchange while the rest wait on the refresh lock.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use crucible_core::Codec;
use crucible_domain::ScopedKey;
use reqwest::header::{ACCEPT_ENCODING, CONTENT_ENCODING, CONTENT_TYPE};
use reqwest::{Client as ReqwestClient, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

use super::auth::{parse_token_response, token_form, IssuedToken, TOKEN_PATH};
use super::context::ClientContext;
use super::errors::ClientError;
use super::request::{
    encode_body, encode_object, finish_response, parse_json, parse_scoped_keys,
    parse_scoped_objects, Compression, ResourceRequest,
};
use super::settings::ClientSettings;

/// Liveness probe path (unauthenticated).
pub const INFO_PATH: &str = "info";

/// Deep health probe path (authenticated).
pub const CHECK_PATH: &str = "check";

#[derive(Debug)]
struct Shared {
    context: ClientContext,
    refresh_lock: Mutex<()>,
}

/// Async client for the compute API.
///
/// Cheap to clone; clones share the token and the cache.
#[derive(Debug, Clone)]
pub struct AsyncClient {
    shared: Arc<Shared>,
}

impl AsyncClient {
    /// Create a client and open its local cache.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Configuration`] if the cache directory cannot
    /// be prepared.
    pub fn new(settings: ClientSettings) -> Result<Self, ClientError> {
        let context = ClientContext::new(settings)?;
        info!(api_url = context.settings.api_url(), "created async client");
        Ok(Self { shared: Arc::new(Shared { context, refresh_lock: Mutex::new(()) }) })
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.shared.context.settings
    }

    /// Open a session with a fresh connection pool.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Configuration`] if the HTTP client cannot be
    /// built.
    pub fn session(&self) -> Result<AsyncSession, ClientError> {
        let http = ReqwestClient::builder()
            .danger_accept_invalid_certs(!self.settings().verify())
            .build()
            .map_err(|e| ClientError::Configuration(format!("failed to build HTTP client: {e}")))?;
        debug!("opened async session");
        Ok(AsyncSession { shared: Arc::clone(&self.shared), http })
    }

    /// Run `operation` with a session that is dropped when it completes,
    /// whether it succeeds or fails.
    ///
    /// # Errors
    ///
    /// Returns the session construction error or whatever `operation`
    /// returns.
    pub async fn with_session<F, Fut, T>(&self, operation: F) -> Result<T, ClientError>
    where
        F: FnOnce(AsyncSession) -> Fut,
        Fut: Future<Output = Result<T, ClientError>>,
    {
        let session = self.session()?;
        operation(session).await
    }
}

impl fmt::Display for AsyncClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AsyncClient('{}')", self.settings().api_url())
    }
}

/// One scoped use of an [`AsyncClient`].
#[derive(Debug)]
pub struct AsyncSession {
    shared: Arc<Shared>,
    http: ReqwestClient,
}

impl AsyncSession {
    fn context(&self) -> &ClientContext {
        &self.shared.context
    }

    /// Current token, exchanging credentials if there is none.
    async fn token(&self) -> Result<IssuedToken, ClientError> {
        if let Some(issued) = self.context().tokens.current() {
            return Ok(issued);
        }

        let _guard = self.shared.refresh_lock.lock().await;
        // Another operation may have refreshed while we waited.
        if let Some(issued) = self.context().tokens.current() {
            return Ok(issued);
        }

        let token = self.exchange().await?;
        Ok(self.context().tokens.store(token))
    }

    #[instrument(skip(self))]
    async fn exchange(&self) -> Result<String, ClientError> {
        let context = self.context();
        let url = context.url(TOKEN_PATH)?;
        debug!(url = %url, "exchanging credentials for a bearer token");

        let response = self
            .http
            .post(url)
            .form(&token_form(context.settings.identifier(), context.settings.key()))
            .send()
            .await?;
        let status = response.status();
        let body = response.bytes().await?;

        let token = parse_token_response(status, &body)?;
        info!("obtained bearer token");
        Ok(token)
    }

    /// Run `call` with the bearer token, refreshing once if it is rejected.
    async fn authenticated<F, Fut, T>(&self, call: F) -> Result<T, ClientError>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<T, ClientError>>,
    {
        let issued = self.token().await?;
        match call(issued.token).await {
            Err(err) if err.status_code() == Some(401) => {
                debug!(generation = issued.generation, "bearer token rejected, re-authenticating");
                self.context().tokens.invalidate(issued.generation);
                let fresh = self.token().await?;
                call(fresh.token).await
            }
            result => result,
        }
    }

    async fn execute(&self, request: RequestBuilder) -> Result<Vec<u8>, ClientError> {
        let response = request.send().await?;
        let status = response.status();
        let encoding = response
            .headers()
            .get(CONTENT_ENCODING)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        let body = response.bytes().await?.to_vec();
        debug!(%status, bytes = body.len(), "received response");
        finish_response(status, encoding.as_deref(), body)
    }

    async fn get_bytes(&self, request: &ResourceRequest) -> Result<Vec<u8>, ClientError> {
        let url = self.context().url(request.path())?;
        self.context()
            .retry
            .run(|| {
                self.authenticated(|token| {
                    let builder = self
                        .http
                        .get(url.clone())
                        .query(request.params())
                        .bearer_auth(token)
                        .header(ACCEPT_ENCODING, request.accept_encoding());
                    self.execute(builder)
                })
            })
            .await
    }

    async fn post_bytes(&self, path: &str, body: Vec<u8>, gzip: bool) -> Result<Vec<u8>, ClientError> {
        let url = self.context().url(path)?;
        self.context()
            .retry
            .run(|| {
                self.authenticated(|token| {
                    let mut builder = self
                        .http
                        .post(url.clone())
                        .bearer_auth(token)
                        .header(CONTENT_TYPE, "application/json")
                        .body(body.clone());
                    if gzip {
                        builder = builder.header(CONTENT_ENCODING, "gzip");
                    }
                    self.execute(builder)
                })
            })
            .await
    }

    /// Fetch a resource and decode its JSON body.
    ///
    /// # Arguments
    ///
    /// * `request` - Resource path, query parameters and encoding preference
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Api`] for a non-2xx response once retries are
    /// exhausted, [`ClientError::Connection`] for transport failures and
    /// [`ClientError::Serialization`] if the body does not decode.
    #[instrument(skip(self, request), fields(path = %request.path()))]
    pub async fn get_resource<T: DeserializeOwned>(
        &self,
        request: &ResourceRequest,
    ) -> Result<T, ClientError> {
        let body = self.get_bytes(request).await?;
        parse_json(&body)
    }

    /// Fetch a resource and decode its body through `codec`.
    ///
    /// # Errors
    ///
    /// As [`AsyncSession::get_resource`], with decode failures reported as
    /// [`ClientError::Codec`].
    #[instrument(skip(self, request, codec), fields(path = %request.path()))]
    pub async fn get_object<C: Codec>(
        &self,
        request: &ResourceRequest,
        codec: &C,
    ) -> Result<C::Item, ClientError> {
        let body = self.get_bytes(request).await?;
        Ok(codec.decode(&body)?)
    }

    /// Fetch an immutable resource through the local cache.
    ///
    /// Only use this for content-addressed resources: a cached body is
    /// returned without contacting the server.
    ///
    /// # Errors
    ///
    /// Same as [`AsyncSession::get_resource`] on a cache miss.
    #[instrument(skip(self, request), fields(path = %request.path()))]
    pub async fn get_resource_cached<T: DeserializeOwned>(
        &self,
        request: &ResourceRequest,
    ) -> Result<T, ClientError> {
        if let Some(body) = self.context().cached(request) {
            match parse_json(&body) {
                Ok(value) => return Ok(value),
                Err(err) => debug!(error = %err, "ignoring undecodable cache entry"),
            }
        }

        let body = self.get_bytes(request).await?;
        let value = parse_json(&body)?;
        self.context().remember(request, &body);
        Ok(value)
    }

    /// Fetch a listing of scoped keys.
    ///
    /// # Errors
    ///
    /// Same as [`AsyncSession::get_resource`]; a malformed key is a
    /// [`ClientError::Serialization`].
    #[instrument(skip(self, request), fields(path = %request.path()))]
    pub async fn query_scoped_keys(
        &self,
        request: &ResourceRequest,
    ) -> Result<Vec<ScopedKey>, ClientError> {
        let body = self.get_bytes(request).await?;
        parse_scoped_keys(&body)
    }

    /// Fetch a listing as full objects, decoding each through `codec`.
    ///
    /// # Errors
    ///
    /// Same as [`AsyncSession::query_scoped_keys`], plus
    /// [`ClientError::Codec`] if an object does not decode.
    #[instrument(skip(self, request, codec), fields(path = %request.path()))]
    pub async fn query_scoped_objects<C: Codec>(
        &self,
        request: &ResourceRequest,
        codec: &C,
    ) -> Result<Vec<(ScopedKey, C::Item)>, ClientError> {
        let request = request.clone().with_full_objects();
        let body = self.get_bytes(&request).await?;
        parse_scoped_objects(&body, codec)
    }

    /// Post a JSON payload and decode the JSON response.
    ///
    /// # Arguments
    ///
    /// * `path` - Resource path relative to the API URL
    /// * `payload` - Body, serialized as JSON
    /// * `compression` - Optional gzip of the body; identical payloads
    ///   compress to identical bytes
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Configuration`] before any I/O for an invalid
    /// compression level, otherwise as [`AsyncSession::get_resource`].
    #[instrument(skip_all, fields(path = %path))]
    pub async fn post_resource<P, R>(
        &self,
        path: &str,
        payload: &P,
        compression: Compression,
    ) -> Result<R, ClientError>
    where
        P: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let level = compression.level()?;
        let body = encode_body(payload, level)?;
        let response = self.post_bytes(path, body, level.is_some()).await?;
        parse_json(&response)
    }

    /// Post a domain object serialized through `codec` and decode the JSON
    /// response.
    ///
    /// # Errors
    ///
    /// As [`AsyncSession::post_resource`], plus [`ClientError::Codec`] if the
    /// object does not encode.
    #[instrument(skip_all, fields(path = %path))]
    pub async fn post_object<C: Codec>(
        &self,
        path: &str,
        item: &C::Item,
        codec: &C,
        compression: Compression,
    ) -> Result<Value, ClientError> {
        let level = compression.level()?;
        let body = encode_object(codec, item, level)?;
        let response = self.post_bytes(path, body, level.is_some()).await?;
        parse_json(&response)
    }

    /// Unauthenticated liveness probe.
    ///
    /// # Errors
    ///
    /// Returns the last error once retries are exhausted.
    #[instrument(skip(self))]
    pub async fn get_info(&self) -> Result<Value, ClientError> {
        let url = self.context().url(INFO_PATH)?;
        let body = self.context().retry.run(|| self.execute(self.http.get(url.clone()))).await?;
        parse_json(&body)
    }

    /// Authenticated probe confirming the service can reach its own
    /// dependencies. Only the status matters.
    ///
    /// # Errors
    ///
    /// Returns the last error once retries are exhausted.
    #[instrument(skip(self))]
    pub async fn api_check(&self) -> Result<(), ClientError> {
        self.get_bytes(&ResourceRequest::new(CHECK_PATH)).await.map(|_| ())
    }
}

//! Blocking API client
//!
//! Same state machine as [`AsyncClient`](super::AsyncClient), issued on the
//! calling thread. The client must not be created or dropped inside an async
//! runtime; use the async client there.

use std::fmt;

use crucible_core::Codec;
use crucible_domain::ScopedKey;
use parking_lot::Mutex;
use reqwest::blocking::{Client as ReqwestClient, RequestBuilder};
use reqwest::header::{ACCEPT_ENCODING, CONTENT_ENCODING, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, instrument};

use super::auth::{parse_token_response, token_form, IssuedToken, TOKEN_PATH};
use super::client::{CHECK_PATH, INFO_PATH};
use super::context::ClientContext;
use super::errors::ClientError;
use super::request::{
    encode_body, encode_object, finish_response, parse_json, parse_scoped_keys,
    parse_scoped_objects, Compression, ResourceRequest,
};
use super::settings::ClientSettings;

/// Blocking client for the compute API.
#[derive(Debug)]
pub struct BlockingClient {
    context: ClientContext,
    refresh_lock: Mutex<()>,
    http: ReqwestClient,
}

impl BlockingClient {
    /// Create a client, its connection pool and its local cache.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Configuration`] if the cache directory cannot
    /// be prepared or the HTTP client cannot be built.
    pub fn new(settings: ClientSettings) -> Result<Self, ClientError> {
        let http = ReqwestClient::builder()
            .danger_accept_invalid_certs(!settings.verify())
            .build()
            .map_err(|e| ClientError::Configuration(format!("failed to build HTTP client: {e}")))?;
        let context = ClientContext::new(settings)?;
        info!(api_url = context.settings.api_url(), "created blocking client");
        Ok(Self { context, refresh_lock: Mutex::new(()), http })
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.context.settings
    }

    fn token(&self) -> Result<IssuedToken, ClientError> {
        if let Some(issued) = self.context.tokens.current() {
            return Ok(issued);
        }

        let _guard = self.refresh_lock.lock();
        if let Some(issued) = self.context.tokens.current() {
            return Ok(issued);
        }

        let token = self.exchange()?;
        Ok(self.context.tokens.store(token))
    }

    #[instrument(skip(self))]
    fn exchange(&self) -> Result<String, ClientError> {
        let url = self.context.url(TOKEN_PATH)?;
        debug!(url = %url, "exchanging credentials for a bearer token");

        let response = self
            .http
            .post(url)
            .form(&token_form(self.context.settings.identifier(), self.context.settings.key()))
            .send()?;
        let status = response.status();
        let body = response.bytes()?;

        let token = parse_token_response(status, &body)?;
        info!("obtained bearer token");
        Ok(token)
    }

    fn authenticated<F, T>(&self, call: F) -> Result<T, ClientError>
    where
        F: Fn(String) -> Result<T, ClientError>,
    {
        let issued = self.token()?;
        match call(issued.token) {
            Err(err) if err.status_code() == Some(401) => {
                debug!(generation = issued.generation, "bearer token rejected, re-authenticating");
                self.context.tokens.invalidate(issued.generation);
                let fresh = self.token()?;
                call(fresh.token)
            }
            result => result,
        }
    }

    fn execute(request: RequestBuilder) -> Result<Vec<u8>, ClientError> {
        let response = request.send()?;
        let status = response.status();
        let encoding = response
            .headers()
            .get(CONTENT_ENCODING)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        let body = response.bytes()?.to_vec();
        debug!(%status, bytes = body.len(), "received response");
        finish_response(status, encoding.as_deref(), body)
    }

    fn get_bytes(&self, request: &ResourceRequest) -> Result<Vec<u8>, ClientError> {
        let url = self.context.url(request.path())?;
        self.context.retry.run_blocking(|| {
            self.authenticated(|token| {
                Self::execute(
                    self.http
                        .get(url.clone())
                        .query(request.params())
                        .bearer_auth(token)
                        .header(ACCEPT_ENCODING, request.accept_encoding()),
                )
            })
        })
    }

    /// Fetch a resource and decode its JSON body.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Api`] for a non-2xx response once retries are
    /// exhausted, [`ClientError::Connection`] for transport failures and
    /// [`ClientError::Serialization`] if the body does not decode.
    #[instrument(skip(self, request), fields(path = %request.path()))]
    pub fn get_resource<T: DeserializeOwned>(&self, request: &ResourceRequest) -> Result<T, ClientError> {
        parse_json(&self.get_bytes(request)?)
    }

    /// Fetch a resource and decode its body through `codec`.
    ///
    /// # Errors
    ///
    /// As [`BlockingClient::get_resource`], with decode failures reported as
    /// [`ClientError::Codec`].
    #[instrument(skip(self, request, codec), fields(path = %request.path()))]
    pub fn get_object<C: Codec>(
        &self,
        request: &ResourceRequest,
        codec: &C,
    ) -> Result<C::Item, ClientError> {
        Ok(codec.decode(&self.get_bytes(request)?)?)
    }

    /// Fetch an immutable resource through the local cache.
    ///
    /// # Errors
    ///
    /// Same as [`BlockingClient::get_resource`] on a cache miss.
    #[instrument(skip(self, request), fields(path = %request.path()))]
    pub fn get_resource_cached<T: DeserializeOwned>(
        &self,
        request: &ResourceRequest,
    ) -> Result<T, ClientError> {
        if let Some(body) = self.context.cached(request) {
            match parse_json(&body) {
                Ok(value) => return Ok(value),
                Err(err) => debug!(error = %err, "ignoring undecodable cache entry"),
            }
        }

        let body = self.get_bytes(request)?;
        let value = parse_json(&body)?;
        self.context.remember(request, &body);
        Ok(value)
    }

    /// Fetch a listing of scoped keys.
    ///
    /// # Errors
    ///
    /// Same as [`BlockingClient::get_resource`].
    #[instrument(skip(self, request), fields(path = %request.path()))]
    pub fn query_scoped_keys(&self, request: &ResourceRequest) -> Result<Vec<ScopedKey>, ClientError> {
        parse_scoped_keys(&self.get_bytes(request)?)
    }

    /// Fetch a listing as full objects, decoding each through `codec`.
    ///
    /// # Errors
    ///
    /// Same as [`BlockingClient::query_scoped_keys`], plus
    /// [`ClientError::Codec`] if an object does not decode.
    #[instrument(skip(self, request, codec), fields(path = %request.path()))]
    pub fn query_scoped_objects<C: Codec>(
        &self,
        request: &ResourceRequest,
        codec: &C,
    ) -> Result<Vec<(ScopedKey, C::Item)>, ClientError> {
        let request = request.clone().with_full_objects();
        parse_scoped_objects(&self.get_bytes(&request)?, codec)
    }

    /// Post a JSON payload and decode the JSON response.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Configuration`] before any I/O for an invalid
    /// compression level, otherwise as [`BlockingClient::get_resource`].
    #[instrument(skip_all, fields(path = %path))]
    pub fn post_resource<P, R>(
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
        parse_json(&self.post_bytes(path, body, level.is_some())?)
    }

    /// Post a domain object serialized through `codec` and decode the JSON
    /// response.
    ///
    /// # Errors
    ///
    /// As [`BlockingClient::post_resource`], plus [`ClientError::Codec`] if
    /// the object does not encode.
    #[instrument(skip_all, fields(path = %path))]
    pub fn post_object<C: Codec>(
        &self,
        path: &str,
        item: &C::Item,
        codec: &C,
        compression: Compression,
    ) -> Result<Value, ClientError> {
        let level = compression.level()?;
        let body = encode_object(codec, item, level)?;
        parse_json(&self.post_bytes(path, body, level.is_some())?)
    }

    fn post_bytes(&self, path: &str, body: Vec<u8>, gzip: bool) -> Result<Vec<u8>, ClientError> {
        let url = self.context.url(path)?;
        self.context.retry.run_blocking(|| {
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
                Self::execute(builder)
            })
        })
    }

    /// Unauthenticated liveness probe.
    ///
    /// # Errors
    ///
    /// Returns the last error once retries are exhausted.
    #[instrument(skip(self))]
    pub fn get_info(&self) -> Result<Value, ClientError> {
        let url = self.context.url(INFO_PATH)?;
        let body = self.context.retry.run_blocking(|| Self::execute(self.http.get(url.clone())))?;
        parse_json(&body)
    }

    /// Authenticated deep health probe.
    ///
    /// # Errors
    ///
    /// Returns the last error once retries are exhausted.
    #[instrument(skip(self))]
    pub fn api_check(&self) -> Result<(), ClientError> {
        self.get_bytes(&ResourceRequest::new(CHECK_PATH)).map(|_| ())
    }
}

impl fmt::Display for BlockingClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockingClient('{}')", self.settings().api_url())
    }
}

//! Request descriptions and response decoding shared by both clients
//!
//! Everything here is pure: building URLs, picking headers, decoding bodies
//! and classifying failures. The async and blocking clients only differ in
//! how they issue the request.

use crucible_common::cache::cache_key;
use crucible_common::compression::{gunzip, gzip_deterministic, MAX_LEVEL};
use crucible_core::Codec;
use crucible_domain::ScopedKey;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use url::Url;

use super::errors::ClientError;

/// Gzip level used by [`Compression::Default`].
pub const DEFAULT_LEVEL: u32 = 5;

/// Query parameter asking listing endpoints for full objects.
pub const FULL_OBJECTS_PARAM: &str = "return_gufe";

/// Request body compression for posts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Compression {
    #[default]
    Off,
    /// Gzip at level 5.
    Default,
    /// Gzip at an explicit level; 0 sends the body uncompressed.
    Level(u32),
}

impl Compression {
    /// Effective gzip level, `None` for an uncompressed body.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Configuration`] for levels above 9.
    pub fn level(self) -> Result<Option<u32>, ClientError> {
        match self {
            Self::Off | Self::Level(0) => Ok(None),
            Self::Default => Ok(Some(DEFAULT_LEVEL)),
            Self::Level(level) if level <= MAX_LEVEL => Ok(Some(level)),
            Self::Level(level) => Err(ClientError::Configuration(format!(
                "compression level must be between 0 and {MAX_LEVEL}, got {level}"
            ))),
        }
    }
}

impl From<bool> for Compression {
    fn from(enabled: bool) -> Self {
        if enabled {
            Self::Default
        } else {
            Self::Off
        }
    }
}

/// A GET against a resource path.
///
/// Parameters with no value are dropped when added, so the remote service
/// never sees them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRequest {
    path: String,
    params: Vec<(String, String)>,
    accept_gzip: bool,
}

impl ResourceRequest {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into(), params: Vec::new(), accept_gzip: false }
    }

    #[must_use]
    pub fn param(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.params.push((name.into(), value.to_string()));
        self
    }

    /// Add `name` only if `value` is present.
    #[must_use]
    pub fn param_opt<V: ToString>(self, name: impl Into<String>, value: Option<V>) -> Self {
        match value {
            Some(value) => self.param(name, value),
            None => self,
        }
    }

    /// Ask the server for a gzip-encoded response.
    #[must_use]
    pub fn accept_gzip(mut self, accept: bool) -> Self {
        self.accept_gzip = accept;
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    pub fn accepts_gzip(&self) -> bool {
        self.accept_gzip
    }

    /// `Accept-Encoding` header value.
    pub fn accept_encoding(&self) -> &'static str {
        if self.accept_gzip {
            "gzip"
        } else {
            "identity"
        }
    }

    /// Local cache key, independent of parameter order.
    pub fn cache_key(&self) -> String {
        cache_key(&self.path, &self.params)
    }

    pub(crate) fn with_full_objects(self) -> Self {
        self.param(FULL_OBJECTS_PARAM, true)
    }
}

/// Resolve a resource path against the API base URL.
pub(crate) fn join_url(base: &Url, path: &str) -> Result<Url, ClientError> {
    base.join(path.trim_start_matches('/'))
        .map_err(|e| ClientError::Configuration(format!("invalid resource path '{path}': {e}")))
}

/// Best-effort error detail: the JSON `detail` field, else the raw text.
pub(crate) fn extract_detail(body: &[u8]) -> String {
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(mut fields)) => match fields.remove("detail") {
            Some(Value::String(detail)) => detail,
            Some(detail) => detail.to_string(),
            None => String::from_utf8_lossy(body).into_owned(),
        },
        _ => String::from_utf8_lossy(body).into_owned(),
    }
}

pub(crate) fn api_error(status: StatusCode, body: &[u8]) -> ClientError {
    ClientError::Api {
        status_code: status.as_u16(),
        reason: status.canonical_reason().unwrap_or("Unknown").to_owned(),
        detail: extract_detail(body),
    }
}

/// Undo a `Content-Encoding: gzip` response encoding.
pub(crate) fn decode_content(encoding: Option<&str>, body: Vec<u8>) -> Result<Vec<u8>, ClientError> {
    match encoding {
        Some(encoding) if encoding.eq_ignore_ascii_case("gzip") => gunzip(&body)
            .map_err(|e| ClientError::Serialization(format!("invalid gzip response body: {e}"))),
        _ => Ok(body),
    }
}

/// Turn a completed response into its decoded body or an API error.
pub(crate) fn finish_response(
    status: StatusCode,
    encoding: Option<&str>,
    body: Vec<u8>,
) -> Result<Vec<u8>, ClientError> {
    if status.is_success() {
        return decode_content(encoding, body);
    }
    let body = match decode_content(encoding, body.clone()) {
        Ok(decoded) => decoded,
        Err(_) => body,
    };
    Err(api_error(status, &body))
}

pub(crate) fn parse_json<T: DeserializeOwned>(body: &[u8]) -> Result<T, ClientError> {
    Ok(serde_json::from_slice(body)?)
}

pub(crate) fn parse_scoped_keys(body: &[u8]) -> Result<Vec<ScopedKey>, ClientError> {
    let raw: Vec<String> = parse_json(body)?;
    raw.iter()
        .map(|key| key.parse::<ScopedKey>().map_err(|e| ClientError::Serialization(e.to_string())))
        .collect()
}

/// Decode a `{scoped key: serialized object}` mapping through `codec`.
pub(crate) fn parse_scoped_objects<C: Codec>(
    body: &[u8],
    codec: &C,
) -> Result<Vec<(ScopedKey, C::Item)>, ClientError> {
    let raw: serde_json::Map<String, Value> = parse_json(body)?;
    raw.into_iter()
        .map(|(key, object)| {
            let key =
                key.parse::<ScopedKey>().map_err(|e| ClientError::Serialization(e.to_string()))?;
            let item = codec.decode(&serde_json::to_vec(&object)?)?;
            Ok((key, item))
        })
        .collect()
}

/// Serialize a post payload as JSON, gzip-compressing it when `level` is set.
pub(crate) fn encode_body<T: Serialize + ?Sized>(
    payload: &T,
    level: Option<u32>,
) -> Result<Vec<u8>, ClientError> {
    compress_body(serde_json::to_vec(payload)?, level)
}

/// Serialize a domain object through `codec`, gzip-compressing it when
/// `level` is set.
pub(crate) fn encode_object<C: Codec>(
    codec: &C,
    item: &C::Item,
    level: Option<u32>,
) -> Result<Vec<u8>, ClientError> {
    compress_body(codec.encode(item)?, level)
}

fn compress_body(body: Vec<u8>, level: Option<u32>) -> Result<Vec<u8>, ClientError> {
    match level {
        None => Ok(body),
        Some(level) => gzip_deterministic(&body, level)
            .map_err(|e| ClientError::Serialization(format!("failed to compress body: {e}"))),
    }
}

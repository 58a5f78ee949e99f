//! Configuration value types
//!
//! Loading from the environment lives in `crucible-infra`; these are plain
//! values so every layer can carry them without pulling in I/O.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Connection parameters for the result object store backend.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectStoreSettings {
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub session_token: Option<String>,
    pub region: Option<String>,
    /// Container holding every stored object.
    pub bucket: String,
    /// Key prefix prepended to every object location.
    pub prefix: String,
}

impl ObjectStoreSettings {
    pub fn new(bucket: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            access_key_id: None,
            secret_access_key: None,
            session_token: None,
            region: None,
            bucket: bucket.into(),
            prefix: prefix.into(),
        }
    }
}

impl fmt::Debug for ObjectStoreSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |value: &Option<String>| value.as_ref().map(|_| "<redacted>");
        f.debug_struct("ObjectStoreSettings")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &redact(&self.secret_access_key))
            .field("session_token", &redact(&self.session_token))
            .field("region", &self.region)
            .field("bucket", &self.bucket)
            .field("prefix", &self.prefix)
            .finish()
    }
}

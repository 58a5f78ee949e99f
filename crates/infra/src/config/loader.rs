//! Object store settings loader
//!
//! ## Environment Variables
//! - `AWS_S3_BUCKET`: Container holding every stored object (required)
//! - `AWS_S3_PREFIX`: Key prefix for this deployment (required)
//! - `AWS_ACCESS_KEY_ID`: Access key id
//! - `AWS_SECRET_ACCESS_KEY`: Secret access key
//! - `AWS_SESSION_TOKEN`: Session token
//! - `AWS_DEFAULT_REGION`: Region
//!
//! Credentials are optional: the filesystem backend needs none.

use crucible_common::credentials::CredentialSource;
use crucible_domain::constants::{
    ENV_AWS_ACCESS_KEY_ID, ENV_AWS_DEFAULT_REGION, ENV_AWS_S3_BUCKET, ENV_AWS_S3_PREFIX,
    ENV_AWS_SECRET_ACCESS_KEY, ENV_AWS_SESSION_TOKEN,
};
use crucible_domain::{DomainError, ObjectStoreSettings};

const BUCKET: CredentialSource = CredentialSource::new("bucket", ENV_AWS_S3_BUCKET, "S3 bucket");
const PREFIX: CredentialSource = CredentialSource::new("prefix", ENV_AWS_S3_PREFIX, "S3 key prefix");
const ACCESS_KEY_ID: CredentialSource =
    CredentialSource::new("access_key_id", ENV_AWS_ACCESS_KEY_ID, "access key id");
const SECRET_ACCESS_KEY: CredentialSource =
    CredentialSource::new("secret_access_key", ENV_AWS_SECRET_ACCESS_KEY, "secret access key")
        .secret();
const SESSION_TOKEN: CredentialSource =
    CredentialSource::new("session_token", ENV_AWS_SESSION_TOKEN, "session token").secret();
const REGION: CredentialSource = CredentialSource::new("region", ENV_AWS_DEFAULT_REGION, "region");

/// Load object store settings from the process environment.
///
/// # Errors
/// Returns `DomainError::Config` if the bucket or prefix is not set.
pub fn load_object_store_settings() -> Result<ObjectStoreSettings, DomainError> {
    load_object_store_settings_with(|var| std::env::var(var).ok())
}

/// Load object store settings through an arbitrary environment lookup.
///
/// # Errors
/// Returns `DomainError::Config` if the bucket or prefix is not set.
pub fn load_object_store_settings_with<F>(lookup: F) -> Result<ObjectStoreSettings, DomainError>
where
    F: Fn(&str) -> Option<String>,
{
    let required = |source: CredentialSource| {
        source
            .resolve_with(None, &lookup)
            .map(|resolved| resolved.value)
            .map_err(|e| DomainError::Config(e.to_string()))
    };
    let optional = |source: CredentialSource| source.resolve_with(None, &lookup).ok().map(|r| r.value);

    let settings = ObjectStoreSettings {
        access_key_id: optional(ACCESS_KEY_ID),
        secret_access_key: optional(SECRET_ACCESS_KEY),
        session_token: optional(SESSION_TOKEN),
        region: optional(REGION),
        bucket: required(BUCKET)?,
        prefix: required(PREFIX)?,
    };
    tracing::info!(bucket = %settings.bucket, prefix = %settings.prefix, "object store settings loaded");
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn test_load_all_vars_set() {
        let settings = load_object_store_settings_with(env(&[
            ("AWS_S3_BUCKET", "results"),
            ("AWS_S3_PREFIX", "staging"),
            ("AWS_ACCESS_KEY_ID", "AKIDEXAMPLE"),
            ("AWS_SECRET_ACCESS_KEY", "secret"),
            ("AWS_SESSION_TOKEN", "token"),
            ("AWS_DEFAULT_REGION", "us-east-1"),
        ]))
        .unwrap();

        assert_eq!(settings.bucket, "results");
        assert_eq!(settings.prefix, "staging");
        assert_eq!(settings.access_key_id.as_deref(), Some("AKIDEXAMPLE"));
        assert_eq!(settings.secret_access_key.as_deref(), Some("secret"));
        assert_eq!(settings.region.as_deref(), Some("us-east-1"));
    }

    #[test]
    fn test_credentials_are_optional() {
        let settings =
            load_object_store_settings_with(env(&[("AWS_S3_BUCKET", "b"), ("AWS_S3_PREFIX", "")]))
                .unwrap();
        assert!(settings.access_key_id.is_none());
        assert!(settings.session_token.is_none());
        assert_eq!(settings.prefix, "");
    }

    #[test]
    fn test_missing_bucket() {
        let err = load_object_store_settings_with(env(&[("AWS_S3_PREFIX", "p")])).unwrap_err();
        match err {
            DomainError::Config(message) => assert!(message.contains("AWS_S3_BUCKET")),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}

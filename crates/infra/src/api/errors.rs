//! API client error types
//!
//! Provides error classification for client operations with retry metadata.

use crucible_common::credentials::CredentialError;
use crucible_common::{RetryDecision, RetryPolicy};
use crucible_core::CodecError;
use crucible_domain::constants::RETRYABLE_STATUS_CODES;
use thiserror::Error;

/// Categories of client errors for retry logic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientErrorCategory {
    /// Bad client construction or arguments - never retried
    Configuration,
    /// Transport failure (DNS, TCP, TLS) - always retryable
    Network,
    /// Non-2xx response - retryable only for the configured status codes
    Api,
    /// Credential exchange rejected - never retried
    Authentication,
    /// Response or payload could not be (de)serialized - never retried
    Data,
}

/// Client operation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Status Code {status_code} : {reason} : {detail}")]
    Api { status_code: u16, reason: String, detail: String },

    #[error("Authentication failed with status {status_code}: {detail}")]
    Authentication { status_code: u16, detail: String },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Codec error: {0}")]
    Codec(String),
}

impl ClientError {
    /// Get the error category for this error
    pub const fn category(&self) -> ClientErrorCategory {
        match self {
            Self::Configuration(_) => ClientErrorCategory::Configuration,
            Self::Connection(_) => ClientErrorCategory::Network,
            Self::Api { .. } => ClientErrorCategory::Api,
            Self::Authentication { .. } => ClientErrorCategory::Authentication,
            Self::Serialization(_) | Self::Codec(_) => ClientErrorCategory::Data,
        }
    }

    /// HTTP status of an API or authentication failure.
    pub const fn status_code(&self) -> Option<u16> {
        match self {
            Self::Api { status_code, .. } | Self::Authentication { status_code, .. } => {
                Some(*status_code)
            }
            _ => None,
        }
    }

    pub const fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_))
    }

    /// Whether the retry loop should try again after this error.
    pub fn is_retryable(&self, retry_codes: &[u16]) -> bool {
        match self {
            Self::Connection(_) => true,
            Self::Api { status_code, .. } => retry_codes.contains(status_code),
            _ => false,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_builder() {
            Self::Configuration(err.to_string())
        } else {
            Self::Connection(err.to_string())
        }
    }
}

impl From<CredentialError> for ClientError {
    fn from(err: CredentialError) -> Self {
        Self::Configuration(err.to_string())
    }
}

impl From<CodecError> for ClientError {
    fn from(err: CodecError) -> Self {
        Self::Codec(err.to_string())
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// [`RetryPolicy`] retrying connection failures and a fixed set of statuses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryableStatus {
    codes: Vec<u16>,
}

impl RetryableStatus {
    pub fn new(codes: impl Into<Vec<u16>>) -> Self {
        Self { codes: codes.into() }
    }

    pub fn codes(&self) -> &[u16] {
        &self.codes
    }
}

impl Default for RetryableStatus {
    fn default() -> Self {
        Self::new(RETRYABLE_STATUS_CODES)
    }
}

impl RetryPolicy<ClientError> for RetryableStatus {
    fn should_retry(&self, error: &ClientError) -> RetryDecision {
        if error.is_retryable(&self.codes) {
            RetryDecision::Retry
        } else {
            RetryDecision::Stop
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(status_code: u16) -> ClientError {
        ClientError::Api { status_code, reason: "reason".into(), detail: "detail".into() }
    }

    #[test]
    fn test_error_categories() {
        assert_eq!(
            ClientError::Configuration("x".into()).category(),
            ClientErrorCategory::Configuration
        );
        assert_eq!(ClientError::Connection("x".into()).category(), ClientErrorCategory::Network);
        assert_eq!(api(500).category(), ClientErrorCategory::Api);
        assert_eq!(ClientError::Codec("x".into()).category(), ClientErrorCategory::Data);
    }

    #[test]
    fn test_retryable_status_policy() {
        let policy = RetryableStatus::default();

        for code in [404, 502, 503, 504] {
            assert_eq!(policy.should_retry(&api(code)), RetryDecision::Retry);
        }
        for code in [400, 401, 403, 409, 500] {
            assert_eq!(policy.should_retry(&api(code)), RetryDecision::Stop);
        }
        assert_eq!(
            policy.should_retry(&ClientError::Connection("refused".into())),
            RetryDecision::Retry
        );
    }

    #[test]
    fn test_authentication_is_never_retried() {
        let err = ClientError::Authentication { status_code: 503, detail: "down".into() };
        assert!(!err.is_retryable(&RETRYABLE_STATUS_CODES));
        assert_eq!(err.status_code(), Some(503));
    }

    #[test]
    fn test_api_error_message_carries_status_and_detail() {
        let err = ClientError::Api {
            status_code: 404,
            reason: "Not Found".into(),
            detail: "no such transformation".into(),
        };
        assert_eq!(err.to_string(), "Status Code 404 : Not Found : no such transformation");
        assert_eq!(err.status_code(), Some(404));
        assert!(!err.is_connection());
    }
}

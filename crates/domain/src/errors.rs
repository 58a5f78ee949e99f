//! Error types used throughout the domain model

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation failures raised while constructing or combining domain values
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum DomainError {
    #[error("Invalid scoped key '{0}'")]
    InvalidScopedKey(String),

    #[error("Invalid scope: {0}")]
    InvalidScope(String),

    #[error("Invalid content key '{0}'")]
    InvalidContentKey(String),

    #[error("Scope mismatch: '{left}' differs from '{right}'")]
    ScopeMismatch { left: String, right: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for domain operations
pub type Result<T> = std::result::Result<T, DomainError>;

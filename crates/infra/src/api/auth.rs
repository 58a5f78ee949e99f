//! Bearer token state and the credential exchange
//!
//! The token moves between two states: absent (`NoToken`) and present
//! (`Valid`). A 401 from any authenticated request invalidates the token it
//! was sent with; the next caller to find it absent exchanges credentials
//! again. Each stored token carries a generation number so that a stale
//! invalidation never discards a newer token.

use parking_lot::RwLock;
use reqwest::StatusCode;
use serde::Deserialize;

use super::errors::ClientError;
use super::request::extract_detail;

/// Resource path of the credential exchange.
pub const TOKEN_PATH: &str = "token";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// A token together with the generation it was stored under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub token: String,
    pub generation: u64,
}

#[derive(Debug, Default)]
struct TokenState {
    token: Option<String>,
    generation: u64,
}

/// Shared bearer token slot.
#[derive(Debug, Default)]
pub struct TokenCache {
    state: RwLock<TokenState>,
}

impl TokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The current token, if one is held.
    pub fn current(&self) -> Option<IssuedToken> {
        let state = self.state.read();
        state
            .token
            .as_ref()
            .map(|token| IssuedToken { token: token.clone(), generation: state.generation })
    }

    /// Store a freshly exchanged token under a new generation.
    pub fn store(&self, token: String) -> IssuedToken {
        let mut state = self.state.write();
        state.generation += 1;
        state.token = Some(token.clone());
        IssuedToken { token, generation: state.generation }
    }

    /// Drop the token if it is still the one from `generation`.
    pub fn invalidate(&self, generation: u64) -> bool {
        let mut state = self.state.write();
        if state.generation == generation && state.token.is_some() {
            state.token = None;
            true
        } else {
            false
        }
    }

    /// Number of tokens stored so far.
    pub fn generation(&self) -> u64 {
        self.state.read().generation
    }
}

/// Form body of the credential exchange.
pub(crate) fn token_form<'a>(identifier: &'a str, key: &'a str) -> [(&'static str, &'a str); 2] {
    [("username", identifier), ("password", key)]
}

/// Interpret the credential exchange response.
///
/// Any non-2xx status is an authentication failure.
pub(crate) fn parse_token_response(status: StatusCode, body: &[u8]) -> Result<String, ClientError> {
    if !status.is_success() {
        return Err(ClientError::Authentication {
            status_code: status.as_u16(),
            detail: extract_detail(body),
        });
    }
    let response: TokenResponse = serde_json::from_slice(body).map_err(|e| {
        ClientError::Serialization(format!("token response missing access_token: {e}"))
    })?;
    Ok(response.access_token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_and_invalidate() {
        let tokens = TokenCache::new();
        assert!(tokens.current().is_none());

        let first = tokens.store("abc".into());
        assert_eq!(first.generation, 1);
        assert_eq!(tokens.current(), Some(first.clone()));

        assert!(tokens.invalidate(first.generation));
        assert!(tokens.current().is_none());
    }

    #[test]
    fn test_stale_invalidation_keeps_newer_token() {
        let tokens = TokenCache::new();
        let stale = tokens.store("old".into());
        tokens.invalidate(stale.generation);
        let fresh = tokens.store("new".into());

        assert!(!tokens.invalidate(stale.generation));
        assert_eq!(tokens.current(), Some(fresh));
    }

    #[test]
    fn test_token_response_parsing() {
        assert_eq!(
            parse_token_response(StatusCode::OK, br#"{"access_token": "abc", "token_type": "bearer"}"#)
                .unwrap(),
            "abc"
        );

        let err =
            parse_token_response(StatusCode::UNAUTHORIZED, br#"{"detail": "bad credentials"}"#)
                .unwrap_err();
        assert_eq!(
            err,
            ClientError::Authentication { status_code: 401, detail: "bad credentials".into() }
        );

        assert!(matches!(
            parse_token_response(StatusCode::OK, b"{}"),
            Err(ClientError::Serialization(_))
        ));
    }
}

//! Content-addressed identifiers.
//!
//! A [`ContentKey`] names an object by its qualified kind and a content-derived
//! token (`Transformation-3f9a...`). A [`ScopedKey`] pins a content key to a
//! specific [`Scope`], rendered as `<Kind>-<token>-<org>-<campaign>-<project>`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::KEY_DELIMITER;
use crate::errors::DomainError;
use crate::types::scope::Scope;

/// `<Kind>-<token>` identifier derived from object content.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentKey(String);

impl ContentKey {
    /// Build a key from its kind and token.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidContentKey`] if either part is empty or
    /// contains the key delimiter.
    pub fn new(kind: &str, token: &str) -> Result<Self, DomainError> {
        format!("{kind}{KEY_DELIMITER}{token}").parse()
    }

    /// Qualified kind name, e.g. `ProtocolDAGResult`.
    #[must_use]
    pub fn qualname(&self) -> &str {
        self.split().0
    }

    /// Content-derived token.
    #[must_use]
    pub fn token(&self) -> &str {
        self.split().1
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn split(&self) -> (&str, &str) {
        // Validated on construction to contain exactly one delimiter.
        self.0.split_once(KEY_DELIMITER).unwrap_or((&self.0, ""))
    }
}

impl fmt::Display for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ContentKey {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(KEY_DELIMITER).collect();
        match parts.as_slice() {
            [kind, token] if !kind.is_empty() && !token.is_empty() => Ok(Self(s.to_owned())),
            _ => Err(DomainError::InvalidContentKey(s.to_owned())),
        }
    }
}

impl AsRef<str> for ContentKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ContentKey {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ContentKey> for String {
    fn from(value: ContentKey) -> Self {
        value.0
    }
}

/// A [`ContentKey`] bound to a fully specified [`Scope`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ScopedKey {
    content: ContentKey,
    scope: Scope,
}

impl ScopedKey {
    /// Bind `content` to `scope`.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidScopedKey`] if `scope` has a wildcarded
    /// level.
    pub fn new(content: ContentKey, scope: Scope) -> Result<Self, DomainError> {
        if !scope.is_specific() {
            return Err(DomainError::InvalidScopedKey(format!("{content}-{scope}")));
        }
        Ok(Self { content, scope })
    }

    pub fn kind(&self) -> &str {
        self.content.qualname()
    }

    pub fn token(&self) -> &str {
        self.content.token()
    }

    pub fn content_key(&self) -> &ContentKey {
        &self.content
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Organization level; always present since the scope is specific.
    pub fn org(&self) -> &str {
        self.scope.to_tuple().0
    }

    pub fn campaign(&self) -> &str {
        self.scope.to_tuple().1
    }

    pub fn project(&self) -> &str {
        self.scope.to_tuple().2
    }
}

impl fmt::Display for ScopedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{KEY_DELIMITER}{}", self.content, self.scope)
    }
}

impl FromStr for ScopedKey {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || DomainError::InvalidScopedKey(s.to_owned());

        let parts: Vec<&str> = s.split(KEY_DELIMITER).collect();
        let [kind, token, org, campaign, project] = parts.as_slice() else {
            return Err(invalid());
        };

        let content = ContentKey::new(kind, token).map_err(|_| invalid())?;
        let scope = Scope::specific(org, campaign, project).map_err(|_| invalid())?;
        Self::new(content, scope)
    }
}

impl TryFrom<String> for ScopedKey {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ScopedKey> for String {
    fn from(value: ScopedKey) -> Self {
        value.to_string()
    }
}

//! Connection parameter resolution
//!
//! A [`CredentialSource`] describes one parameter (API URL, identifier, key,
//! ...) and the environment variable that may supply it. Resolution never
//! touches global state directly: [`CredentialSource::resolve_with`] takes the
//! environment lookup as a closure, and [`CredentialSource::resolve`] is the
//! thin wrapper that reads the process environment.
//!
//! An explicit value always wins. When the environment also carries a
//! different value, resolution succeeds with an [`OverrideWarning`] for the
//! caller to report.

use std::fmt;

use thiserror::Error;

/// Failure to resolve a required parameter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CredentialError {
    #[error("{human_name} not specified; pass it explicitly or set the environment variable {env_var}")]
    Missing { human_name: String, env_var: String },
}

/// A connection parameter that may come from an explicit value or the
/// environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CredentialSource {
    /// Parameter name as accepted by constructors, e.g. `api_url`.
    pub name: &'static str,
    /// Environment variable consulted when no explicit value is given.
    pub env_var: &'static str,
    /// Name used in error and warning messages.
    pub human_name: &'static str,
    /// Secret values are never rendered in warnings.
    pub secret: bool,
}

/// Resolved value plus an optional override notice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub value: String,
    pub warning: Option<OverrideWarning>,
}

/// An explicit value shadowed a differing environment value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverrideWarning {
    pub name: &'static str,
    pub env_var: &'static str,
    message: String,
}

impl OverrideWarning {
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for OverrideWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl CredentialSource {
    pub const fn new(name: &'static str, env_var: &'static str, human_name: &'static str) -> Self {
        Self { name, env_var, human_name, secret: false }
    }

    /// Mark the parameter as secret.
    #[must_use]
    pub const fn secret(mut self) -> Self {
        self.secret = true;
        self
    }

    /// Resolve against the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::Missing`] if neither source has a value.
    pub fn resolve(&self, explicit: Option<&str>) -> Result<Resolved, CredentialError> {
        self.resolve_with(explicit, |var| std::env::var(var).ok())
    }

    /// Resolve against an arbitrary environment lookup.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::Missing`] if neither source has a value.
    pub fn resolve_with<F>(&self, explicit: Option<&str>, lookup: F) -> Result<Resolved, CredentialError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let from_env = lookup(self.env_var);

        match (explicit, from_env) {
            (Some(value), Some(env_value)) if value != env_value => Ok(Resolved {
                value: value.to_owned(),
                warning: Some(self.override_warning(value, &env_value)),
            }),
            (Some(value), _) => Ok(Resolved { value: value.to_owned(), warning: None }),
            (None, Some(env_value)) => Ok(Resolved { value: env_value, warning: None }),
            (None, None) => Err(CredentialError::Missing {
                human_name: self.human_name.to_owned(),
                env_var: self.env_var.to_owned(),
            }),
        }
    }

    fn override_warning(&self, explicit: &str, env_value: &str) -> OverrideWarning {
        let message = if self.secret {
            format!(
                "{} passed explicitly overrides the value of environment variable {}",
                self.human_name, self.env_var
            )
        } else {
            format!(
                "{} '{explicit}' overrides environment variable {}='{env_value}'",
                self.human_name, self.env_var
            )
        };

        OverrideWarning { name: self.name, env_var: self.env_var, message }
    }
}

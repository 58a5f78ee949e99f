//! Hierarchical `(org, campaign, project)` scope.
//!
//! A scope is both an access boundary (enforced by the remote service) and a
//! namespacing component of object store paths. Each level may be wildcarded;
//! a wildcard may only be followed by further wildcards, so `org-*-*` is valid
//! while `*-campaign-*` is not.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::{KEY_DELIMITER, SCOPE_WILDCARD};
use crate::errors::DomainError;

/// `(org, campaign, project)` triple; `None` marks a wildcarded level.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Scope {
    org: Option<String>,
    campaign: Option<String>,
    project: Option<String>,
}

impl Scope {
    /// Build a scope, validating every specified component.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidScope`] if a component is empty or
    /// contains anything other than ASCII alphanumerics and underscores, or if
    /// a specific level follows a wildcarded one.
    pub fn new(
        org: Option<&str>,
        campaign: Option<&str>,
        project: Option<&str>,
    ) -> Result<Self, DomainError> {
        for component in [org, campaign, project].into_iter().flatten() {
            validate_component(component)?;
        }

        if (org.is_none() && campaign.is_some()) || (campaign.is_none() && project.is_some()) {
            return Err(DomainError::InvalidScope(format!(
                "a specific level cannot follow a wildcard: {}-{}-{}",
                org.unwrap_or(SCOPE_WILDCARD),
                campaign.unwrap_or(SCOPE_WILDCARD),
                project.unwrap_or(SCOPE_WILDCARD),
            )));
        }

        Ok(Self {
            org: org.map(str::to_owned),
            campaign: campaign.map(str::to_owned),
            project: project.map(str::to_owned),
        })
    }

    /// Fully specified scope.
    ///
    /// # Errors
    ///
    /// Same as [`Scope::new`].
    pub fn specific(org: &str, campaign: &str, project: &str) -> Result<Self, DomainError> {
        Self::new(Some(org), Some(campaign), Some(project))
    }

    /// Scope matching everything.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    pub fn org(&self) -> Option<&str> {
        self.org.as_deref()
    }

    pub fn campaign(&self) -> Option<&str> {
        self.campaign.as_deref()
    }

    pub fn project(&self) -> Option<&str> {
        self.project.as_deref()
    }

    /// `true` when no level is wildcarded.
    #[must_use]
    pub fn is_specific(&self) -> bool {
        self.org.is_some() && self.campaign.is_some() && self.project.is_some()
    }

    /// The three levels, wildcards rendered as `*`.
    #[must_use]
    pub fn to_tuple(&self) -> (&str, &str, &str) {
        (
            self.org.as_deref().unwrap_or(SCOPE_WILDCARD),
            self.campaign.as_deref().unwrap_or(SCOPE_WILDCARD),
            self.project.as_deref().unwrap_or(SCOPE_WILDCARD),
        )
    }

    /// Whether `other` falls inside this scope.
    ///
    /// A wildcarded level matches anything; a specific level must match
    /// exactly (a wildcard in `other` is not inside a specific level).
    #[must_use]
    pub fn contains(&self, other: &Scope) -> bool {
        fn level(mine: Option<&String>, theirs: Option<&String>) -> bool {
            match mine {
                None => true,
                Some(value) => theirs == Some(value),
            }
        }

        level(self.org.as_ref(), other.org.as_ref())
            && level(self.campaign.as_ref(), other.campaign.as_ref())
            && level(self.project.as_ref(), other.project.as_ref())
    }
}

fn validate_component(component: &str) -> Result<(), DomainError> {
    if component.is_empty() {
        return Err(DomainError::InvalidScope("scope components cannot be empty".into()));
    }
    if !component.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(DomainError::InvalidScope(format!(
            "'{component}' may contain only alphanumerics and underscores"
        )));
    }
    Ok(())
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (org, campaign, project) = self.to_tuple();
        write!(f, "{org}{KEY_DELIMITER}{campaign}{KEY_DELIMITER}{project}")
    }
}

impl FromStr for Scope {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(KEY_DELIMITER).collect();
        let [org, campaign, project] = parts.as_slice() else {
            return Err(DomainError::InvalidScope(format!(
                "'{s}' must have the form org-campaign-project"
            )));
        };

        Self::new(parse_level(org), parse_level(campaign), parse_level(project))
    }
}

fn parse_level(part: &str) -> Option<&str> {
    if part == SCOPE_WILDCARD {
        None
    } else {
        Some(part)
    }
}

impl TryFrom<String> for Scope {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Scope> for String {
    fn from(value: Scope) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_specific_scope_round_trips() {
        let scope = Scope::specific("acme", "binding_2024", "kinase").unwrap();
        assert_eq!(scope.to_string(), "acme-binding_2024-kinase");
        assert_eq!(scope.to_string().parse::<Scope>().unwrap(), scope);
        assert!(scope.is_specific());
    }

    #[test]
    fn test_wildcards_render_as_star() {
        let scope = Scope::new(Some("acme"), None, None).unwrap();
        assert_eq!(scope.to_string(), "acme-*-*");
        assert_eq!("acme-*-*".parse::<Scope>().unwrap(), scope);
        assert!(!scope.is_specific());
        assert_eq!(Scope::all().to_string(), "*-*-*");
    }

    #[test]
    fn test_specific_level_after_wildcard_is_rejected() {
        assert!(Scope::new(None, Some("campaign"), None).is_err());
        assert!("acme-*-kinase".parse::<Scope>().is_err());
    }

    #[test]
    fn test_invalid_components_are_rejected() {
        assert!(Scope::specific("ac me", "c", "p").is_err());
        assert!(Scope::specific("", "c", "p").is_err());
        assert!("a-b".parse::<Scope>().is_err());
        assert!("a-b-c-d".parse::<Scope>().is_err());
    }

    #[test]
    fn test_contains_respects_wildcards() {
        let org = Scope::new(Some("acme"), None, None).unwrap();
        let project = Scope::specific("acme", "c1", "p1").unwrap();
        let other = Scope::specific("globex", "c1", "p1").unwrap();

        assert!(Scope::all().contains(&project));
        assert!(org.contains(&project));
        assert!(!org.contains(&other));
        assert!(project.contains(&project));
        assert!(!project.contains(&org));
    }

    #[test]
    fn test_serde_uses_string_form() {
        let scope = Scope::specific("acme", "c1", "p1").unwrap();
        let json = serde_json::to_string(&scope).unwrap();
        assert_eq!(json, "\"acme-c1-p1\"");
        let back: Scope = serde_json::from_str(&json).unwrap();
        assert_eq!(back, scope);
    }
}

//! Object store addressing types

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{FAILURES_ROUTE, OBJECT_FILENAME, OBJECT_NAMESPACE, RESULTS_ROUTE};
use crate::errors::DomainError;
use crate::impl_wire_name_conversions;
use crate::types::scope::Scope;
use crate::types::scoped_key::ContentKey;

/// Routing segment separating successful results from failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Route {
    Results,
    Failures,
}

impl_wire_name_conversions!(Route {
    Results => RESULTS_ROUTE,
    Failures => FAILURES_ROUTE,
});

impl Route {
    /// `Results` for a successful artifact, `Failures` otherwise.
    #[must_use]
    pub const fn from_ok(ok: bool) -> Self {
        if ok {
            Self::Results
        } else {
            Self::Failures
        }
    }
}

/// Deterministic, backend-relative path of a stored artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectLocation(String);

impl ObjectLocation {
    /// Wrap an already computed location.
    pub fn new(location: impl Into<String>) -> Self {
        Self(location.into())
    }

    /// Location of an artifact produced for `entity` under `scope`.
    ///
    /// The layout is
    /// `protocoldagresult/<org>/<campaign>/<project>/<entity>/<route>/<artifact>/obj.json.zst`,
    /// so identical inputs always map to the same location.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidScope`] if `scope` has a wildcarded level.
    pub fn for_result(
        scope: &Scope,
        entity: &ContentKey,
        route: Route,
        artifact: &ContentKey,
    ) -> Result<Self, DomainError> {
        if !scope.is_specific() {
            return Err(DomainError::InvalidScope(format!(
                "object locations require a specific scope, got '{scope}'"
            )));
        }

        let (org, campaign, project) = scope.to_tuple();
        Ok(Self(
            [
                OBJECT_NAMESPACE,
                org,
                campaign,
                project,
                entity.as_str(),
                route.as_str(),
                artifact.as_str(),
                OBJECT_FILENAME,
            ]
            .join("/"),
        ))
    }

    /// Prefix under which every artifact of `scope` is stored.
    ///
    /// Wildcarded levels truncate the prefix, so `acme-*-*` lists everything in
    /// the `acme` organization.
    #[must_use]
    pub fn scope_prefix(scope: &Scope) -> String {
        let mut prefix = String::from(OBJECT_NAMESPACE);
        for level in [scope.org(), scope.campaign(), scope.project()].into_iter().map_while(|l| l) {
            prefix.push('/');
            prefix.push_str(level);
        }
        prefix.push('/');
        prefix
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ObjectLocation {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Durable pointer to a pushed artifact plus its provenance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRef {
    pub location: ObjectLocation,
    pub obj_key: ContentKey,
    pub scope: Scope,
    pub ok: bool,
    pub datetime_created: DateTime<Utc>,
    pub creator: Option<String>,
}

impl ObjectRef {
    #[must_use]
    pub const fn route(&self) -> Route {
        Route::from_ok(self.ok)
    }
}

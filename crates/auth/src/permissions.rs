use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Permission identifier (an OAuth2 scope).
///
/// Scopes are opaque strings of the form `resource:action`
/// (e.g. "individual:read"). The wildcard `"*"` grants every scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_wildcard(&self) -> bool {
        self.as_str() == "*"
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Scopes understood by the API.
pub mod scopes {
    use super::Permission;

    pub const INDIVIDUAL_READ: Permission = Permission::from_static("individual:read");
    pub const INDIVIDUAL_POST: Permission = Permission::from_static("individual:post");
    pub const INDIVIDUAL_PATCH: Permission = Permission::from_static("individual:patch");

    pub const ORGANISATION_READ: Permission = Permission::from_static("organisation:read");
    pub const ORGANISATION_POST: Permission = Permission::from_static("organisation:post");
    pub const ORGANISATION_PATCH: Permission = Permission::from_static("organisation:patch");

    pub const ROLE_READ: Permission = Permission::from_static("role:read");
    pub const ROLE_POST: Permission = Permission::from_static("role:post");

    pub const ADDRESS_READ: Permission = Permission::from_static("address:read");
}

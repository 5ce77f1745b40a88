use thiserror::Error;

use crate::{JwtClaims, Permission, PrincipalId};

/// The caller an authorization decision is made for.
///
/// The API builds one from verified token claims.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub principal_id: PrincipalId,
    pub scopes: Vec<Permission>,
}

impl Principal {
    pub fn new(principal_id: PrincipalId, scopes: Vec<Permission>) -> Self {
        Self { principal_id, scopes }
    }
}

impl From<&JwtClaims> for Principal {
    fn from(claims: &JwtClaims) -> Self {
        Self::new(claims.sub, claims.scopes())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: missing scope '{0}'")]
    Forbidden(String),
}

/// Check that a principal holds `required`, either exactly or through `"*"`.
pub fn authorize(principal: &Principal, required: &Permission) -> Result<(), AuthzError> {
    if principal.scopes.iter().any(|p| p.is_wildcard() || p == required) {
        Ok(())
    } else {
        tracing::debug!(
            principal = %principal.principal_id,
            required = %required,
            "scope check failed"
        );
        Err(AuthzError::Forbidden(required.as_str().to_string()))
    }
}

//! API-side scope guard.
//!
//! Handlers call this before touching a repository, so a forbidden request
//! never reaches storage.

use axum::http::StatusCode;
use axum::response::Response;

use partybook_auth::{AuthzError, Permission, authorize};

use crate::app::errors;
use crate::context::PrincipalContext;

/// Check that the request principal holds `scope`.
pub fn require_scope(principal: &PrincipalContext, scope: &Permission) -> Result<(), AuthzError> {
    authorize(principal.principal(), scope)
}

/// [`require_scope`], mapped to a 403 response.
pub fn guard(principal: &PrincipalContext, scope: &Permission) -> Result<(), Response> {
    require_scope(principal, scope)
        .map_err(|e| errors::json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string()))
}

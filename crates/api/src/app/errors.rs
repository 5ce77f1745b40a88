use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::{error, warn};

use partybook_core::DomainError;
use partybook_infra::RepositoryError;

/// Map a failed read to a response. Unknown ids become 404.
pub fn repository_error_to_response(err: RepositoryError) -> Response {
    if err.is_not_found() {
        return not_found();
    }
    match err {
        RepositoryError::Domain(DomainError::Validation(msg)) => {
            json_error(StatusCode::BAD_REQUEST, "validation_error", msg)
        }
        RepositoryError::Domain(DomainError::InvalidId(msg)) => {
            json_error(StatusCode::BAD_REQUEST, "invalid_id", msg)
        }
        RepositoryError::Domain(DomainError::InvariantViolation(msg)) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "invariant_violation", msg)
        }
        RepositoryError::Domain(DomainError::Conflict(msg)) => json_error(StatusCode::CONFLICT, "conflict", msg),
        other => {
            error!(error = %other, "repository failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "storage_error", other.to_string())
        }
    }
}

/// Create and update failures all surface as 400, whatever the cause.
pub fn bad_request(err: impl std::fmt::Display) -> Response {
    warn!(error = %err, "write rejected");
    json_error(StatusCode::BAD_REQUEST, "bad_request", err.to_string())
}

pub fn not_found() -> Response {
    json_error(StatusCode::NOT_FOUND, "not_found", "not found")
}

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_is_404() {
        assert_eq!(repository_error_to_response(RepositoryError::NotFound).status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn domain_rule_failures_are_client_errors() {
        let invalid = repository_error_to_response(RepositoryError::Domain(DomainError::invalid_id("RoleId: x")));
        assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);
        let conflict = repository_error_to_response(RepositoryError::Domain(DomainError::conflict("duplicate")));
        assert_eq!(conflict.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn storage_failure_is_500() {
        let response = repository_error_to_response(RepositoryError::Storage("pool closed".into()));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn bad_request_ignores_cause() {
        assert_eq!(bad_request(RepositoryError::NotFound).status(), StatusCode::BAD_REQUEST);
        assert_eq!(bad_request(DomainError::validation("empty")).status(), StatusCode::BAD_REQUEST);
    }
}

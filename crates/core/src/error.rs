//! Errors raised by domain rules, before anything touches storage.

use thiserror::Error;

pub type DomainResult<T> = Result<T, DomainError>;

/// A record or request broke a domain rule.
///
/// Missing records are a storage outcome and are reported by the
/// repositories, not here.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A field is empty or malformed (blank display name, non-digit ABN).
    #[error("validation failed: {0}")]
    Validation(String),

    /// Records are individually valid but inconsistent together
    /// (self-link, role pair pointing at the wrong party type).
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// An id failed to parse or is not positive.
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A write collided with an existing record.
    #[error("conflict: {0}")]
    Conflict(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }
}

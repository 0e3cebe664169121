//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Numeric input never produces one of these: unparseable amounts coerce to
/// zero. Errors cover structural wiring, posted-form decoding and the
/// server-side rules applied when a sale is saved.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. malformed management form, zero quantity).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A domain invariant was violated.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A structural piece of the form (template, management form) is absent.
    #[error("missing form element: {0}")]
    MissingElement(String),

    /// A requested row was not found.
    #[error("not found")]
    NotFound,
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

    pub fn missing_element(msg: impl Into<String>) -> Self {
        Self::MissingElement(msg.into())
    }

    pub fn not_found() -> Self {
        Self::NotFound
    }
}

//! Errors raised by pure booking rules.

use thiserror::Error;

pub type DomainResult<T> = Result<T, DomainError>;

/// A business rule said no.
///
/// Messages are written for the customer or admin who triggered the
/// operation; the application layer forwards them as-is. Authorization and
/// storage failures have their own error types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Malformed or out-of-range input (empty receiver name, rating 7, ...).
    #[error("validation failed: {0}")]
    Validation(String),

    /// The record exists but its state forbids the operation, e.g. paying
    /// a cancelled order.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// The command targets a record that was never created.
    #[error("not found")]
    NotFound,

    /// Stale version or duplicate creation.
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

    pub fn not_found() -> Self {
        Self::NotFound
    }

    /// The message without the category prefix, for showing to users.
    pub fn message(&self) -> &str {
        match self {
            DomainError::Validation(msg)
            | DomainError::InvariantViolation(msg)
            | DomainError::InvalidId(msg)
            | DomainError::Conflict(msg) => msg,
            DomainError::NotFound => "not found",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_drops_the_category_prefix() {
        let err = DomainError::invariant("DP already paid");
        assert_eq!(err.to_string(), "invariant violated: DP already paid");
        assert_eq!(err.message(), "DP already paid");
    }
}

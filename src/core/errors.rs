/*!
 * Error Types
 * Centralized error handling with thiserror, miette, and serde support
 *
 * Timeouts and cancellations are not errors here: blocking operations
 * report them as [`Outcome`](crate::core::sync::Outcome) values. This
 * module only covers arguments rejected at construction and broken
 * accounting invariants.
 */

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for fallible synchronizer operations
pub type SyncResult<T> = Result<T, SyncError>;

/// Synchronizer errors with serialization support
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum SyncError {
    #[error("Invalid argument: {0}")]
    #[diagnostic(
        code(sync::invalid_argument),
        help("The synchronizer was rejected at construction. Check initial and maximum values.")
    )]
    InvalidArgument(String),

    #[error("Invariant violation: {0}")]
    #[diagnostic(
        code(sync::invariant_violation),
        help("More units were released than were ever acquired. This is a bug in the caller.")
    )]
    InvariantViolation(String),
}

impl SyncError {
    /// Shorthand for an [`SyncError::InvalidArgument`]
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        SyncError::InvalidArgument(msg.into())
    }

    /// Shorthand for an [`SyncError::InvariantViolation`]
    pub fn invariant_violation(msg: impl Into<String>) -> Self {
        SyncError::InvariantViolation(msg.into())
    }

    /// Whether the error denotes a programming bug rather than bad input
    pub fn is_fatal(&self) -> bool {
        matches!(self, SyncError::InvariantViolation(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SyncError::invalid_argument("min 5 > max 3");
        assert_eq!(err.to_string(), "Invalid argument: min 5 > max 3");
        assert!(!err.is_fatal());

        let err = SyncError::invariant_violation("units 11 exceed max 10");
        assert!(err.is_fatal());
    }

    #[test]
    fn test_error_serialization() {
        let err = SyncError::invalid_argument("zero max");
        let json = serde_json::to_string(&err).unwrap();
        assert_eq!(
            json,
            r#"{"error_type":"invalid_argument","details":"zero max"}"#
        );

        let back: SyncError = serde_json::from_str(&json).unwrap();
        assert_eq!(back, err);
    }

    #[test]
    fn test_diagnostic_code() {
        let err = SyncError::invariant_violation("overflow");
        let code = err.code().map(|c| c.to_string());
        assert_eq!(code.as_deref(), Some("sync::invariant_violation"));
    }
}

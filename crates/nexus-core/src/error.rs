//! Unified error types for the nexus core library.
//!
//! This module provides a unified error type [`NexusError`] that covers all
//! failure modes across the nexus system.
//!
//! # Design Principles
//!
//! - **Specific variants**: Each error variant captures exactly one failure mode
//! - **Actionable messages**: Error messages guide callers toward resolution
//! - **HTTP-ready**: Error types include HTTP status codes and error codes
//!
//! Validation-category failures (`InvalidIdentifier`, `InvalidSignal`) are
//! recovered locally by the proximity validator into an INVALID outcome and
//! never reach API callers as errors. Conflict and persistence failures are
//! surfaced, since they mean the operation's effect is unknown or failed.

use std::path::PathBuf;
use thiserror::Error;

/// The unified error type for all nexus operations.
#[derive(Debug, Error)]
pub enum NexusError {
    // =========================================================================
    // VALIDATION ERRORS
    // =========================================================================
    /// A raw beacon identifier could not be normalized into canonical form.
    #[error("Invalid beacon identifier: {0}")]
    InvalidIdentifier(String),

    /// A raw signal reading could not be parsed as a number.
    #[error("Invalid signal reading: {0}")]
    InvalidSignal(String),

    // =========================================================================
    // SESSION & IDENTITY ERRORS
    // =========================================================================
    /// No active session matched the stop/status request.
    #[error("No active session found for host '{0}'")]
    SessionNotFound(String),

    /// The referenced host is not known to the identity store.
    #[error("Unknown host: '{0}'")]
    UnknownHost(String),

    /// The referenced participant is not known to the identity store.
    #[error("Unknown participant: '{0}'")]
    UnknownParticipant(String),

    // =========================================================================
    // STORAGE ERRORS
    // =========================================================================
    /// A concurrent mutation was detected during a storage commit.
    ///
    /// Surfaced only after internal retries are exhausted; the caller may
    /// retry the whole operation.
    #[error("Storage commit conflict: {0}")]
    StorageConflict(String),

    /// A write would violate a storage uniqueness constraint.
    ///
    /// Unlike [`NexusError::StorageConflict`] this is not transient; the
    /// same write fails the same way on every retry.
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// An error occurred while persisting or reading data.
    #[error("Persistence error: {0}")]
    PersistenceError(String),

    // =========================================================================
    // CONFIGURATION ERRORS
    // =========================================================================
    /// The configuration file was not found at the expected path.
    #[error("Configuration file not found at: {}", .0.display())]
    ConfigNotFound(PathBuf),

    /// The configuration file exists but could not be parsed.
    #[error("Failed to parse configuration: {0}")]
    ConfigParseError(String),

    /// The configuration was parsed but contains invalid values.
    #[error("Configuration validation failed: {0}")]
    ConfigValidationError(String),

    // =========================================================================
    // I/O ERRORS
    // =========================================================================
    /// A low-level I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// A specialized [`Result`] type for nexus operations.
pub type Result<T> = std::result::Result<T, NexusError>;

impl NexusError {
    /// Returns `true` if this error is a validation failure on caller input.
    ///
    /// Validation failures resolve to an INVALID proximity outcome and must
    /// never mutate state.
    #[inline]
    #[must_use]
    pub fn is_validation_error(&self) -> bool {
        matches!(self, Self::InvalidIdentifier(_) | Self::InvalidSignal(_))
    }

    /// Returns `true` if this error indicates a missing session or actor.
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::SessionNotFound(_) | Self::UnknownHost(_) | Self::UnknownParticipant(_)
        )
    }

    /// Returns `true` if this error is a transient commit conflict.
    #[inline]
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::StorageConflict(_))
    }

    /// Returns `true` if this error is related to configuration.
    #[inline]
    #[must_use]
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::ConfigNotFound(_) | Self::ConfigParseError(_) | Self::ConfigValidationError(_)
        )
    }

    /// Returns `true` if this error is related to I/O or persistence.
    #[inline]
    #[must_use]
    pub fn is_io_error(&self) -> bool {
        matches!(self, Self::PersistenceError(_) | Self::IoError(_))
    }

    /// Returns an HTTP-appropriate status code for this error.
    #[inline]
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - malformed input
            Self::InvalidIdentifier(_) | Self::InvalidSignal(_) => 400,

            // 404 Not Found
            Self::SessionNotFound(_)
            | Self::UnknownHost(_)
            | Self::UnknownParticipant(_)
            | Self::ConfigNotFound(_) => 404,

            // 409 Conflict - the write cannot coexist with committed state
            Self::StorageConflict(_) | Self::ConstraintViolation(_) => 409,

            // 422 Unprocessable Entity - semantic errors
            Self::ConfigParseError(_) | Self::ConfigValidationError(_) => 422,

            // 500 Internal Server Error - server-side issues
            Self::PersistenceError(_) | Self::IoError(_) => 500,
        }
    }

    /// Returns a machine-readable error code for API responses.
    #[inline]
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidIdentifier(_) => "INVALID_IDENTIFIER",
            Self::InvalidSignal(_) => "INVALID_SIGNAL",
            Self::SessionNotFound(_) => "SESSION_NOT_FOUND",
            Self::UnknownHost(_) => "UNKNOWN_HOST",
            Self::UnknownParticipant(_) => "UNKNOWN_PARTICIPANT",
            Self::StorageConflict(_) => "STORAGE_CONFLICT",
            Self::ConstraintViolation(_) => "CONSTRAINT_VIOLATION",
            Self::PersistenceError(_) => "PERSISTENCE_ERROR",
            Self::ConfigNotFound(_) => "CONFIG_NOT_FOUND",
            Self::ConfigParseError(_) => "CONFIG_PARSE_ERROR",
            Self::ConfigValidationError(_) => "CONFIG_VALIDATION_ERROR",
            Self::IoError(_) => "IO_ERROR",
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Error as IoErr, ErrorKind};

    #[test]
    fn test_validation_error_classification() {
        assert!(NexusError::InvalidIdentifier("zz".into()).is_validation_error());
        assert!(NexusError::InvalidSignal("abc".into()).is_validation_error());

        assert!(!NexusError::StorageConflict("race".into()).is_validation_error());
    }

    #[test]
    fn test_not_found_classification() {
        assert!(NexusError::SessionNotFound("host-1".into()).is_not_found());
        assert!(NexusError::UnknownHost("host-1".into()).is_not_found());
        assert!(NexusError::UnknownParticipant("p-1".into()).is_not_found());

        assert!(!NexusError::InvalidSignal("abc".into()).is_not_found());
    }

    #[test]
    fn test_conflict_classification() {
        assert!(NexusError::StorageConflict("stale version".into()).is_conflict());
        assert!(!NexusError::PersistenceError("disk full".into()).is_conflict());

        // Constraint breaches are permanent; they must not enter retry loops
        // keyed on is_conflict, and they are not I/O failures either.
        let err = NexusError::ConstraintViolation("two active sessions".into());
        assert!(!err.is_conflict());
        assert!(!err.is_io_error());
        assert_eq!(err.http_status_code(), 409);
    }

    #[test]
    fn test_config_error_classification() {
        assert!(NexusError::ConfigNotFound(PathBuf::from("/test")).is_config_error());
        assert!(NexusError::ConfigParseError("syntax error".into()).is_config_error());
        assert!(NexusError::ConfigValidationError("invalid value".into()).is_config_error());

        assert!(!NexusError::StorageConflict("race".into()).is_config_error());
    }

    #[test]
    fn test_io_error_classification() {
        assert!(NexusError::PersistenceError("disk full".into()).is_io_error());
        assert!(NexusError::IoError(IoErr::new(ErrorKind::NotFound, "test")).is_io_error());

        assert!(!NexusError::InvalidIdentifier("zz".into()).is_io_error());
    }

    #[test]
    fn test_http_status_codes() {
        assert_eq!(
            NexusError::InvalidIdentifier("zz".into()).http_status_code(),
            400
        );
        assert_eq!(
            NexusError::SessionNotFound("h".into()).http_status_code(),
            404
        );
        assert_eq!(
            NexusError::StorageConflict("race".into()).http_status_code(),
            409
        );
        assert_eq!(
            NexusError::ConfigParseError("error".into()).http_status_code(),
            422
        );
        assert_eq!(
            NexusError::PersistenceError("error".into()).http_status_code(),
            500
        );
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(
            NexusError::InvalidIdentifier("zz".into()).error_code(),
            "INVALID_IDENTIFIER"
        );
        assert_eq!(
            NexusError::StorageConflict("race".into()).error_code(),
            "STORAGE_CONFLICT"
        );
        assert_eq!(
            NexusError::ConstraintViolation("dup".into()).error_code(),
            "CONSTRAINT_VIOLATION"
        );
        assert_eq!(
            NexusError::ConfigNotFound(PathBuf::new()).error_code(),
            "CONFIG_NOT_FOUND"
        );
    }

    #[test]
    fn test_from_io_error() {
        let io_err = IoErr::new(ErrorKind::NotFound, "file not found");
        let nexus_err: NexusError = io_err.into();
        assert!(matches!(nexus_err, NexusError::IoError(_)));
        assert!(nexus_err.is_io_error());
    }

    #[test]
    fn test_error_display_messages() {
        let err = NexusError::InvalidIdentifier("ZZ-TOP".into());
        assert!(format!("{}", err).contains("ZZ-TOP"));

        let err = NexusError::SessionNotFound("host-42".into());
        assert!(format!("{}", err).contains("host-42"));
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<NexusError>();
        assert_sync::<NexusError>();
    }

    #[test]
    fn test_result_type_alias() {
        fn example_function() -> Result<i32> {
            Ok(42)
        }
        assert_eq!(example_function().unwrap(), 42);
    }
}

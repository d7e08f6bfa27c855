//! Error types for AS3 agent operations.
//!
//! This module defines the error types used throughout the AS3 crates.
//! All errors implement `std::error::Error` via `thiserror`.

use std::io;
use thiserror::Error;

/// Result type alias for AS3 agent operations.
pub type As3Result<T> = Result<T, As3Error>;

/// Errors that can occur during AS3 agent operations.
#[derive(Debug, Error)]
pub enum As3Error {
    /// The control plane runs an AS3 version older than the supported minimum.
    #[error(
        "AS3 version {found} is not supported; upgrade AS3 on BIG-IP to {required} or above"
    )]
    IncompatibleVersion {
        /// Numeric version reported by the control plane.
        found: f64,
        /// Minimum supported version.
        required: f64,
    },

    /// The version string reported by the control plane could not be parsed.
    #[error("Unable to parse AS3 version '{version}': {message}")]
    VersionParse {
        /// The raw version string.
        version: String,
        /// Error message.
        message: String,
    },

    /// A request to the control plane failed.
    #[error("Control plane request failed: {operation}: {message}")]
    ControlPlane {
        /// The operation that failed (e.g., "query_version", "post").
        operation: String,
        /// Error message.
        message: String,
    },

    /// Configuration validation error.
    #[error("Invalid configuration for {field}: {message}")]
    InvalidConfig {
        /// The field that failed validation.
        field: String,
        /// Error message.
        message: String,
    },

    /// The reference schema could not be loaded or compiled.
    #[error("Schema error: {message}")]
    Schema {
        /// Error message.
        message: String,
    },

    /// The dispatch queue was closed; no further declarations are accepted.
    #[error("Dispatch queue is closed")]
    QueueClosed,

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Internal error (unexpected state).
    #[error("Internal error: {message}")]
    Internal {
        /// Error message.
        message: String,
    },
}

impl As3Error {
    /// Creates a version parse error.
    pub fn version_parse(version: impl Into<String>, message: impl Into<String>) -> Self {
        Self::VersionParse {
            version: version.into(),
            message: message.into(),
        }
    }

    /// Creates a control plane error.
    pub fn control_plane(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ControlPlane {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Creates an invalid configuration error.
    pub fn invalid_config(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Creates a schema error.
    pub fn schema(message: impl Into<String>) -> Self {
        Self::Schema {
            message: message.into(),
        }
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this error indicates a transient condition
    /// that may succeed on retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, As3Error::ControlPlane { .. } | As3Error::Io(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = As3Error::control_plane("query_version", "connection refused");
        assert_eq!(
            err.to_string(),
            "Control plane request failed: query_version: connection refused"
        );
    }

    #[test]
    fn test_incompatible_version_display() {
        let err = As3Error::IncompatibleVersion {
            found: 3.19,
            required: 3.20,
        };
        assert!(err.to_string().contains("3.19"));
        assert!(err.to_string().contains("3.2"));
    }

    #[test]
    fn test_is_retryable() {
        assert!(As3Error::control_plane("post", "timeout").is_retryable());
        assert!(!As3Error::version_parse("x", "no separator").is_retryable());
        assert!(!As3Error::QueueClosed.is_retryable());
        assert!(!As3Error::internal("bug").is_retryable());
    }
}

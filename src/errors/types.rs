//! Error type definitions for the Groupie Tracker application
//!
//! This module defines all error types used throughout the application,
//! providing a hierarchical error system: source (single fetch), build
//! (whole aggregation), cache (publication) and the top-level `AppError`
//! returned by the query services and mapped to HTTP responses.

use std::time::Duration;
use thiserror::Error;

/// Top-level application error type
///
/// This enum represents all possible errors that can reach a caller of the
/// query layer. It uses `thiserror` to provide automatic error trait
/// implementations and proper error chaining.
#[derive(Error, Debug)]
pub enum AppError {
    /// Snapshot build errors
    #[error("Build error: {0}")]
    Build(#[from] BuildError),

    /// Snapshot cache errors
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    /// Validation errors
    #[error("Validation error: {message}")]
    Validation { message: String },

    /// Resource not found errors
    #[error("Not found: {resource} with id {id}")]
    NotFound { resource: String, id: String },
}

/// Errors produced by a single fetch against the remote source
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// Connection failures and unreadable bodies
    #[error("Transport failure: {url} - {message}")]
    Transport { url: String, message: String },

    /// Network connection timeouts
    #[error("Connection timeout: {url}")]
    Timeout { url: String },

    /// Non-2xx responses from the source
    #[error("HTTP error: {url} - status {status}")]
    Http { url: String, status: u16 },

    /// Malformed JSON or a body that does not fit the destination type
    #[error("Decode error: {url} - {message}")]
    Decode { url: String, message: String },
}

/// Errors that abort a snapshot build
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// The artist listing could not be fetched or decoded
    #[error("Artist listing unavailable: {0}")]
    Listing(#[source] SourceError),

    /// The build did not finish within the configured limit
    #[error("Build timed out after {limit:?}")]
    Timeout { limit: Duration },
}

/// Snapshot cache errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// No snapshot has been published yet
    #[error("No snapshot has been published yet")]
    NotReady,
}

/// Convenience methods for creating common error types
impl AppError {
    /// Create a validation error with a custom message
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a not found error for a specific resource
    pub fn not_found<R: Into<String>, I: Into<String>>(resource: R, id: I) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id: id.into(),
        }
    }
}

impl SourceError {
    /// Create a transport error
    pub fn transport<U: Into<String>, M: Into<String>>(url: U, message: M) -> Self {
        Self::Transport {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Create a timeout error
    pub fn timeout<U: Into<String>>(url: U) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Create an HTTP status error
    pub fn http<U: Into<String>>(url: U, status: u16) -> Self {
        Self::Http {
            url: url.into(),
            status,
        }
    }

    /// Create a decode error
    pub fn decode<U: Into<String>, M: Into<String>>(url: U, message: M) -> Self {
        Self::Decode {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Whether the failure happened before a body could be decoded
    pub fn is_transport(&self) -> bool {
        !matches!(self, Self::Decode { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_error_classification() {
        assert!(SourceError::transport("http://x", "refused").is_transport());
        assert!(SourceError::timeout("http://x").is_transport());
        assert!(SourceError::http("http://x", 503).is_transport());
        assert!(!SourceError::decode("http://x", "eof").is_transport());
    }

    #[test]
    fn test_build_error_wraps_source() {
        let err = BuildError::Listing(SourceError::http("http://x/artists", 500));
        assert_eq!(
            err.to_string(),
            "Artist listing unavailable: HTTP error: http://x/artists - status 500"
        );

        let app: AppError = err.into();
        assert!(matches!(app, AppError::Build(BuildError::Listing(_))));
    }

    #[test]
    fn test_build_timeout_reports_sub_second_limits() {
        let err = BuildError::Timeout {
            limit: Duration::from_millis(250),
        };
        assert_eq!(err.to_string(), "Build timed out after 250ms");

        let err = BuildError::Timeout {
            limit: Duration::from_secs(120),
        };
        assert_eq!(err.to_string(), "Build timed out after 120s");
    }
}

//! Error taxonomy shared by every layer of the client
//!
//! Transports are the only place that produce the four wire-level kinds
//! (`RequestTimeout`, `ConnectionFailed`, `InvalidResponse`, `Api`). Everything
//! above them passes these through untouched, so callers can match on
//! [`Error::kind`] instead of parsing messages.

use std::time::Duration;
use thiserror::Error;

/// Result type alias for client and transport operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed underlying cause.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Main error type.
#[derive(Debug, Error)]
pub enum Error {
    /// The transport's own timer fired before a response was obtained.
    #[error("Request timed out after {timeout:?}")]
    RequestTimeout {
        /// Timeout that was in effect for the request
        timeout: Duration,
    },

    /// DNS failure, refused connection, reset, TLS failure, or any other
    /// transport-level problem that is not a timeout.
    #[error("Connection failed: {message}")]
    ConnectionFailed {
        /// Human readable description
        message: String,
        /// Underlying error
        #[source]
        source: Option<BoxError>,
    },

    /// The response body could not be read, was not JSON, or did not match the
    /// expected shape.
    #[error("Invalid response: {message}")]
    InvalidResponse {
        /// Human readable description
        message: String,
        /// HTTP status of the offending response, if one was received
        status: Option<u16>,
        /// Underlying error
        #[source]
        source: Option<BoxError>,
    },

    /// The server returned a body flagged with `"object": "error"`.
    ///
    /// This is raised regardless of the HTTP status code.
    #[error("API error ({error_type}/{code}): {message}")]
    Api {
        /// HTTP status the error body arrived with
        status: u16,
        /// Error `type` field from the body
        error_type: String,
        /// Error `code` field from the body
        code: String,
        /// Error `message` field from the body
        message: String,
    },

    /// The active authentication cannot perform the requested operation.
    #[error("Capability error: {0}")]
    Capability(String),

    /// The request could not be built before dispatch.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Client construction failed.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Discriminant of [`Error`] for branching without destructuring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// See [`Error::RequestTimeout`]
    RequestTimeout,
    /// See [`Error::ConnectionFailed`]
    ConnectionFailed,
    /// See [`Error::InvalidResponse`]
    InvalidResponse,
    /// See [`Error::Api`]
    ApiError,
    /// See [`Error::Capability`]
    CapabilityError,
    /// See [`Error::InvalidRequest`]
    InvalidRequest,
    /// See [`Error::Configuration`]
    Configuration,
}

impl ErrorKind {
    /// Stable snake_case name of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::RequestTimeout => "request_timeout",
            ErrorKind::ConnectionFailed => "connection_failed",
            ErrorKind::InvalidResponse => "invalid_response",
            ErrorKind::ApiError => "api_error",
            ErrorKind::CapabilityError => "capability_error",
            ErrorKind::InvalidRequest => "invalid_request",
            ErrorKind::Configuration => "configuration",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Error {
    /// Build a `ConnectionFailed` error from an underlying cause.
    pub fn connection<E>(source: E) -> Self
    where
        E: Into<BoxError>,
    {
        let source = source.into();
        Error::ConnectionFailed {
            message: source.to_string(),
            source: Some(source),
        }
    }

    /// Build an `InvalidResponse` error from an underlying cause.
    pub fn invalid_response<E>(status: Option<u16>, source: E) -> Self
    where
        E: Into<BoxError>,
    {
        let source = source.into();
        Error::InvalidResponse {
            message: source.to_string(),
            status,
            source: Some(source),
        }
    }

    /// The kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::RequestTimeout { .. } => ErrorKind::RequestTimeout,
            Error::ConnectionFailed { .. } => ErrorKind::ConnectionFailed,
            Error::InvalidResponse { .. } => ErrorKind::InvalidResponse,
            Error::Api { .. } => ErrorKind::ApiError,
            Error::Capability(_) => ErrorKind::CapabilityError,
            Error::InvalidRequest(_) => ErrorKind::InvalidRequest,
            Error::Configuration(_) => ErrorKind::Configuration,
        }
    }

    /// API error code, if this is an API error.
    pub fn code(&self) -> Option<&str> {
        match self {
            Error::Api { code, .. } => Some(code),
            _ => None,
        }
    }

    /// API error type, if this is an API error.
    pub fn error_type(&self) -> Option<&str> {
        match self {
            Error::Api { error_type, .. } => Some(error_type),
            _ => None,
        }
    }

    /// HTTP status associated with this error, if a response was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api { status, .. } => Some(*status),
            Error::InvalidResponse { status, .. } => *status,
            _ => None,
        }
    }

    /// Whether this error is a request timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::RequestTimeout { .. })
    }
}

//! Structured logging helpers
//!
//! Every pipeline call is logged through this layer so field names stay
//! consistent: `method`, `path`, `transport`, `auth`, `status`, `elapsed_ms`,
//! `kind`.

use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::error::Error;

/// Request metadata for structured logging
#[derive(Debug, Clone)]
pub struct RequestMetadata {
    /// HTTP method (GET, POST, etc.)
    pub method: String,
    /// Request path
    pub path: String,
    /// Name of the transport handling the call
    pub transport: &'static str,
    /// Name of the authentication strategy in use
    pub auth: &'static str,
}

impl RequestMetadata {
    /// Create new request metadata
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            transport: "unknown",
            auth: "anonymous",
        }
    }

    /// Set the transport name
    pub fn with_transport(mut self, transport: &'static str) -> Self {
        self.transport = transport;
        self
    }

    /// Set the authentication strategy name
    pub fn with_auth(mut self, auth: &'static str) -> Self {
        self.auth = auth;
        self
    }

    /// Log request being dispatched
    pub fn log_request(&self) {
        debug!(
            method = %self.method,
            path = %self.path,
            transport = self.transport,
            auth = self.auth,
            "Dispatching request"
        );
    }
}

/// Response metadata for structured logging
#[derive(Debug, Clone)]
pub struct ResponseMetadata {
    /// HTTP status code, if a response was received
    pub status: Option<u16>,
    /// Time elapsed for the request
    pub elapsed: Duration,
}

impl ResponseMetadata {
    /// Create new response metadata
    pub fn new(status: Option<u16>, elapsed: Duration) -> Self {
        Self { status, elapsed }
    }

    /// Log successful response
    pub fn log_success(&self, request: &RequestMetadata) {
        info!(
            method = %request.method,
            path = %request.path,
            status = self.status,
            elapsed_ms = self.elapsed.as_millis(),
            "Request succeeded"
        );
    }

    /// Log failed request
    pub fn log_error(&self, request: &RequestMetadata, error: &Error) {
        warn!(
            method = %request.method,
            path = %request.path,
            status = self.status,
            elapsed_ms = self.elapsed.as_millis(),
            kind = error.kind().as_str(),
            error = %error,
            "Request failed"
        );
    }
}

/// Timer for measuring request duration
#[derive(Debug, Clone, Copy)]
pub struct RequestTimer {
    start: Instant,
}

impl RequestTimer {
    /// Start a new timer
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Get elapsed duration
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

/// Install a global `tracing` subscriber filtered by `RUST_LOG`.
///
/// Defaults to `carelink=info` when `RUST_LOG` is unset. Returns `false` if a
/// global subscriber was already installed.
#[cfg(feature = "trace")]
#[cfg_attr(docsrs, doc(cfg(feature = "trace")))]
pub fn init_tracing() -> bool {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("carelink=info,carelink_transport=info"));
    fmt().with_env_filter(filter).try_init().is_ok()
}

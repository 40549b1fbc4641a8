//! # Carelink
//!
//! Rust client for the Carelink healthcare platform API:
//! - Two transports, chosen once at construction: independent `reqwest` calls
//!   or pooled keep-alive `hyper` connections
//! - An ordered interceptor chain around every call
//! - API key, user session and anonymous authentication
//! - Lossless bracket-path query encoding and multipart uploads
//! - One error taxonomy for timeouts, connection failures, bad responses and
//!   API-reported errors
//! - Delegated member tokens signed with the account API key
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use carelink::prelude::*;
//! use chrono::{Duration, Utc};
//! use serde_json::{Value, json};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let client = Client::builder()
//!         .api_key("key_123", "sk_test_...")
//!         .transport_kind(TransportKind::Socket)
//!         .build()?;
//!
//!     let members = client
//!         .get::<Value>(
//!             "/v1/members",
//!             RequestArgs::new()
//!                 .query(&json!({"limit": 5}))?
//!                 .options(RequestOptions::new().expand(["data.primary_provider"])),
//!         )
//!         .await?;
//!     println!("{} ({:?})", members.status(), members.request_id());
//!
//!     let token = client.tokens().generate(
//!         GenerateTokenParams::new("mem_123", Utc::now() + Duration::hours(1))
//!             .scopes(["read:records"]),
//!     )?;
//!     println!("{}", token.as_str());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

use std::time::Duration;

// Re-export commonly used types
pub use auth::Authentication;
pub use client::{Client, ClientBuilder};
pub use config::{ClientConfig, ConnectionPoolConfig};
pub use error::{Error, ErrorKind, Result};
pub use pipeline::{
    Interceptor, Next, RequestArgs, RequestOptions, Response, ResponseMeta, TracingInterceptor,
};
pub use resources::{GenerateTokenParams, SignedToken, TokenClaims, Tokens};

// Module declarations
pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod observability;
pub mod pipeline;
pub mod resources;

// Re-export the wire layer for custom transports and multipart uploads
pub use carelink_transport::{
    self as transport, FilePart, MultipartBody, RequestBody, Transport, TransportKind,
    TransportRequest, TransportResponse,
};

// Re-export key dependencies for convenience
pub use async_trait::async_trait;
pub use serde_json::Value as JsonValue;

/// Prelude module for common imports
///
/// # Examples
///
/// ```rust
/// use carelink::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        Authentication, Client, ClientConfig, Error, ErrorKind, FilePart, GenerateTokenParams,
        Interceptor, MultipartBody, Next, RequestArgs, RequestOptions, Response, Result,
        TransportKind,
    };
}

/// SDK version, automatically updated from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default API base URL
pub const DEFAULT_BASE_URL: &str = "https://api.carelink.health";

/// Default timeout for a whole request
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert_eq!(VERSION, env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn test_constants() {
        assert_eq!(DEFAULT_BASE_URL, "https://api.carelink.health");
        assert_eq!(DEFAULT_TIMEOUT, Duration::from_secs(60));
    }
}

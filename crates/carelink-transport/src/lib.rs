//! Wire layer for the Carelink client
//!
//! Everything that touches bytes on the network lives here:
//!
//! - **Error taxonomy**: the single [`Error`] type every layer reports with
//! - **Encoding**: lossless bracket-path flattening of nested query values and
//!   multipart form encoding
//! - **Transport trait**: one raw HTTP exchange in, a decoded response out
//! - **Fetch transport**: independent requests through `reqwest`
//! - **Socket transport**: pooled keep-alive connections over `hyper`, with
//!   separate pools for plain and TLS connections
//!
//! # Usage
//!
//! ```rust,no_run
//! use carelink_transport::{TransportKind, TransportRequest, TransportSettings, build_transport};
//! use std::time::Duration;
//!
//! # async fn example() -> carelink_transport::Result<()> {
//! let transport = build_transport(TransportKind::Socket, &TransportSettings::default())?;
//! let mut request = TransportRequest::new(
//!     http::Method::GET,
//!     "https://api.carelink.health".parse().unwrap(),
//!     "/v1/members",
//!     Duration::from_secs(30),
//! );
//! request.query = carelink_transport::encoding::flatten(&serde_json::json!({"limit": 5}));
//! let response = transport.request(request).await?;
//! println!("{}", response.status);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod decode;
pub mod encoding;
pub mod error;
pub mod fetch;
pub mod multipart;
pub mod settings;
pub mod socket;
pub mod traits;

pub use error::{Error, ErrorKind, Result};
pub use fetch::FetchTransport;
pub use multipart::{FilePart, MultipartBody, MultipartForm};
pub use settings::{TransportKind, TransportSettings, build_transport};
pub use socket::SocketTransport;
pub use traits::{ContentType, RequestBody, Transport, TransportRequest, TransportResponse};

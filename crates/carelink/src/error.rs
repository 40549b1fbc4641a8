//! Error types for the Carelink client
//!
//! The client shares one taxonomy with its transports. Errors raised by a
//! transport reach the caller unchanged, so branch on [`Error::kind`] and
//! [`Error::code`]:
//!
//! ```rust
//! use carelink::{Error, ErrorKind};
//!
//! fn describe(error: &Error) -> &'static str {
//!     match error.kind() {
//!         ErrorKind::RequestTimeout => "timed out",
//!         ErrorKind::ApiError if error.code() == Some("member_not_found") => "no such member",
//!         ErrorKind::ApiError => "rejected",
//!         _ => "failed",
//!     }
//! }
//! ```

pub use carelink_transport::error::{BoxError, Error, ErrorKind, Result};

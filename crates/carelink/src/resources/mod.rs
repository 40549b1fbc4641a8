//! API resource sub-clients
//!
//! Each sub-client is built once by [`Client`](crate::Client) and holds the
//! shared [`Pipeline`](crate::pipeline::Pipeline). Resource calls go through
//! [`Client::request`](crate::Client::request) and its verb helpers.

pub mod tokens;

pub use tokens::{GenerateTokenParams, SignedToken, TokenClaims, Tokens};

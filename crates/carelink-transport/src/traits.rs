//! Transport trait and the request/response shapes it exchanges
//!
//! Every transport accepts the same [`TransportRequest`] (base URL, path,
//! method, headers, already-flattened query, body, timeout) and either returns
//! a decoded [`TransportResponse`] or one of the wire-level error kinds.

use async_trait::async_trait;
use http::{HeaderMap, Method, StatusCode};
use serde_json::Value;
use std::time::Duration;
use url::Url;

use crate::encoding::{self, QueryPairs};
use crate::error::{Error, Result};
use crate::multipart::MultipartBody;

/// Content-type tag of a request body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    /// `application/json`
    Json,
    /// `multipart/form-data`
    Multipart,
}

/// Request body prior to serialization.
#[derive(Debug)]
pub enum RequestBody {
    /// Serialized with `serde_json`
    Json(Value),
    /// Encoded as named form parts
    Multipart(MultipartBody),
}

impl RequestBody {
    /// The content-type tag of this body.
    pub fn content_type(&self) -> ContentType {
        match self {
            RequestBody::Json(_) => ContentType::Json,
            RequestBody::Multipart(_) => ContentType::Multipart,
        }
    }
}

impl From<Value> for RequestBody {
    fn from(value: Value) -> Self {
        RequestBody::Json(value)
    }
}

impl From<MultipartBody> for RequestBody {
    fn from(body: MultipartBody) -> Self {
        RequestBody::Multipart(body)
    }
}

/// One raw HTTP exchange as handed to a transport.
#[derive(Debug)]
pub struct TransportRequest {
    /// API base URL
    pub base_url: Url,
    /// Path relative to the base URL; may already carry a query string
    pub path: String,
    /// HTTP method
    pub method: Method,
    /// Headers, authentication included
    pub headers: HeaderMap,
    /// Flattened query parameters, in wire order
    pub query: QueryPairs,
    /// Optional body
    pub body: Option<RequestBody>,
    /// Time allowed for the whole exchange
    pub timeout: Duration,
}

impl TransportRequest {
    /// Create a request with no headers, query or body.
    pub fn new(method: Method, base_url: Url, path: impl Into<String>, timeout: Duration) -> Self {
        Self {
            base_url,
            path: path.into(),
            method,
            headers: HeaderMap::new(),
            query: Vec::new(),
            body: None,
            timeout,
        }
    }

    /// Content-type tag of the body, if any.
    pub fn content_type(&self) -> Option<ContentType> {
        self.body.as_ref().map(RequestBody::content_type)
    }

    /// Path with the serialized query appended.
    pub fn path_and_query(&self) -> String {
        encoding::append_query(&self.path, &encoding::serialize(&self.query))
    }

    /// Absolute URL: base URL, then path, then query.
    pub fn url(&self) -> Result<Url> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let path = self.path_and_query();
        let joined = if path.starts_with('/') {
            format!("{base}{path}")
        } else {
            format!("{base}/{path}")
        };
        Url::parse(&joined)
            .map_err(|e| Error::InvalidRequest(format!("Invalid URL '{joined}': {e}")))
    }
}

/// Decoded response returned by a transport.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    /// HTTP status code
    pub status: StatusCode,
    /// Response headers
    pub headers: HeaderMap,
    /// Decoded JSON body
    pub data: Value,
}

impl TransportResponse {
    /// Create a response.
    pub fn new(status: StatusCode, headers: HeaderMap, data: Value) -> Self {
        Self {
            status,
            headers,
            data,
        }
    }
}

/// Capability shared by every transport implementation.
#[async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug {
    /// Perform one HTTP exchange.
    ///
    /// # Errors
    ///
    /// Returns only `RequestTimeout`, `ConnectionFailed`, `InvalidResponse` or
    /// `Api` errors.
    async fn request(&self, request: TransportRequest) -> Result<TransportResponse>;

    /// Short transport name for logging.
    fn name(&self) -> &'static str;
}

//! Response envelope

use std::ops::{Deref, DerefMut};

use http::{HeaderMap, StatusCode};

/// Header the API uses to identify a request in its logs.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Transport details of a completed call.
#[derive(Debug, Clone)]
pub struct ResponseMeta {
    /// HTTP status code
    pub status: StatusCode,
    /// Response headers
    pub headers: HeaderMap,
}

/// Decoded payload together with the transport details it arrived with.
///
/// Derefs to the payload, so resource fields read directly off the envelope.
#[derive(Debug, Clone)]
pub struct Response<T> {
    /// Decoded payload
    pub value: T,
    /// Status and headers
    pub meta: ResponseMeta,
}

impl<T> Response<T> {
    /// Create an envelope.
    pub fn new(value: T, status: StatusCode, headers: HeaderMap) -> Self {
        Self {
            value,
            meta: ResponseMeta { status, headers },
        }
    }

    /// HTTP status code.
    pub fn status(&self) -> StatusCode {
        self.meta.status
    }

    /// Response headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.meta.headers
    }

    /// Value of the `x-request-id` header, if present.
    pub fn request_id(&self) -> Option<&str> {
        self.meta
            .headers
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
    }

    /// Discard the metadata.
    pub fn into_inner(self) -> T {
        self.value
    }

    /// Split into payload and metadata.
    pub fn into_parts(self) -> (T, ResponseMeta) {
        (self.value, self.meta)
    }

    /// Transform the payload, keeping the metadata.
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Response<U> {
        Response {
            value: f(self.value),
            meta: self.meta,
        }
    }
}

impl<T> Deref for Response<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T> DerefMut for Response<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.value
    }
}

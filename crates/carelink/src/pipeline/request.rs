//! Per-call arguments and options

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use carelink_transport::{MultipartBody, RequestBody};
use http::{HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;
use serde_json::Value;

use super::interceptor::Interceptor;
use crate::auth::Authentication;
use crate::error::{Error, Result};

/// Options that may be set at the client level and overridden per call.
///
/// Every field is optional; when two option sets are merged, a value present
/// in the later set wins. Headers are unioned, with same-named later values
/// replacing earlier ones.
#[derive(Clone, Default)]
pub struct RequestOptions {
    /// Timeout for the whole exchange
    pub timeout: Option<Duration>,
    /// Dot-paths the server should inline, sent as repeated `expand` entries
    pub expand: Option<Vec<String>>,
    /// Authentication to use instead of the client default
    pub authentication: Option<Authentication>,
    /// Extra headers
    pub headers: HeaderMap,
    /// Interceptor chain to run instead of the client's registered chain
    pub interceptors: Option<Vec<Arc<dyn Interceptor>>>,
}

impl RequestOptions {
    /// Empty options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the expansion paths.
    pub fn expand<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.expand = Some(paths.into_iter().map(Into::into).collect());
        self
    }

    /// Override the authentication for this call.
    pub fn authentication(mut self, authentication: Authentication) -> Self {
        self.authentication = Some(authentication);
        self
    }

    /// Add a header.
    ///
    /// # Errors
    ///
    /// Returns an error if the name or value is not a valid header.
    pub fn header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Result<Self> {
        let name_str = name.as_ref();
        let name = HeaderName::try_from(name_str)
            .map_err(|_| Error::InvalidRequest(format!("Invalid header name: {name_str}")))?;
        let value = HeaderValue::try_from(value.as_ref())
            .map_err(|_| Error::InvalidRequest(format!("Invalid value for header {name}")))?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// Replace the interceptor chain for this call.
    pub fn interceptors(mut self, interceptors: Vec<Arc<dyn Interceptor>>) -> Self {
        self.interceptors = Some(interceptors);
        self
    }

    /// Merge `overrides` on top of `self`.
    pub fn merge(&self, overrides: RequestOptions) -> RequestOptions {
        let mut headers = self.headers.clone();
        headers.extend(overrides.headers);

        RequestOptions {
            timeout: overrides.timeout.or(self.timeout),
            expand: overrides.expand.or_else(|| self.expand.clone()),
            authentication: overrides
                .authentication
                .or_else(|| self.authentication.clone()),
            headers,
            interceptors: overrides
                .interceptors
                .or_else(|| self.interceptors.clone()),
        }
    }
}

impl fmt::Debug for RequestOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestOptions")
            .field("timeout", &self.timeout)
            .field("expand", &self.expand)
            .field(
                "authentication",
                &self.authentication.as_ref().map(Authentication::name),
            )
            .field("headers", &self.headers.keys().collect::<Vec<_>>())
            .field(
                "interceptors",
                &self.interceptors.as_ref().map(|chain| {
                    chain.iter().map(|i| i.name()).collect::<Vec<_>>()
                }),
            )
            .finish()
    }
}

/// Arguments of one pipeline call.
#[derive(Debug, Default)]
pub struct RequestArgs {
    /// Nested query value, flattened to bracket paths on the wire
    pub query: Option<Value>,
    /// Request body
    pub body: Option<RequestBody>,
    /// Per-call options
    pub options: RequestOptions,
}

impl RequestArgs {
    /// No query, no body, default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the query from any serializable value.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be serialized to JSON.
    pub fn query<Q: Serialize + ?Sized>(mut self, query: &Q) -> Result<Self> {
        self.query = Some(to_value(query)?);
        Ok(self)
    }

    /// Set a JSON body from any serializable value.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be serialized to JSON.
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self> {
        self.body = Some(RequestBody::Json(to_value(body)?));
        Ok(self)
    }

    /// Set a multipart body.
    pub fn multipart(mut self, body: MultipartBody) -> Self {
        self.body = Some(RequestBody::Multipart(body));
        self
    }

    /// Set the per-call options.
    pub fn options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }
}

fn to_value<V: Serialize + ?Sized>(value: &V) -> Result<Value> {
    serde_json::to_value(value)
        .map_err(|e| Error::InvalidRequest(format!("Failed to serialize request: {e}")))
}

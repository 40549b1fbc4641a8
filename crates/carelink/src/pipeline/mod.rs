//! Request pipeline
//!
//! One [`Pipeline`] is shared by every sub-client of a [`Client`](crate::Client).
//! A call goes through these steps:
//!
//! 1. client defaults are merged with the per-call options
//! 2. the query is flattened and `expand` paths are appended
//! 3. the active authentication produces its headers
//! 4. the interceptor chain runs, ending in the transport
//! 5. the decoded body is wrapped in a [`Response`] envelope
//!
//! Errors from any step are returned unchanged.

pub mod interceptor;
pub mod request;
pub mod response;

pub use interceptor::{Interceptor, Next, TracingInterceptor};
pub use request::{RequestArgs, RequestOptions};
pub use response::{REQUEST_ID_HEADER, Response, ResponseMeta};

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use carelink_transport::encoding::{self, QueryPairs};
use carelink_transport::{Transport, TransportRequest};
use http::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

use crate::auth::Authentication;
use crate::error::{Error, Result};
use crate::observability::{RequestMetadata, RequestTimer, ResponseMetadata};

/// Query key carrying expansion paths.
pub const EXPAND_PARAM: &str = "expand";

/// Shared request execution state.
pub struct Pipeline {
    transport: Arc<dyn Transport>,
    base_url: Url,
    timeout: Duration,
    authentication: Authentication,
    interceptors: Vec<Arc<dyn Interceptor>>,
    default_options: RequestOptions,
}

impl Pipeline {
    /// Create a pipeline.
    pub fn new(
        transport: Arc<dyn Transport>,
        base_url: Url,
        timeout: Duration,
        authentication: Authentication,
    ) -> Self {
        Self {
            transport,
            base_url,
            timeout,
            authentication,
            interceptors: Vec::new(),
            default_options: RequestOptions::default(),
        }
    }

    /// Register the interceptor chain, in execution order.
    pub fn with_interceptors(mut self, interceptors: Vec<Arc<dyn Interceptor>>) -> Self {
        self.interceptors = interceptors;
        self
    }

    /// Set options applied to every call before per-call options.
    pub fn with_default_options(mut self, options: RequestOptions) -> Self {
        self.default_options = options;
        self
    }

    /// API base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Default timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Default authentication.
    pub fn authentication(&self) -> &Authentication {
        &self.authentication
    }

    /// Transport in use.
    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Execute one call and decode the body as `T`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRequest` if the request cannot be built, the
    /// transport's error unchanged if the exchange fails, or
    /// `InvalidResponse` if the body does not decode as `T`.
    pub async fn request<T>(
        &self,
        method: Method,
        path: &str,
        args: RequestArgs,
    ) -> Result<Response<T>>
    where
        T: DeserializeOwned,
    {
        let RequestArgs {
            query,
            body,
            options,
        } = args;
        let mut options = self.default_options.merge(options);
        let mut headers = std::mem::take(&mut options.headers);

        let timeout = options.timeout.unwrap_or(self.timeout);
        let authentication = options
            .authentication
            .as_ref()
            .unwrap_or(&self.authentication);
        let interceptors = options
            .interceptors
            .as_deref()
            .unwrap_or(self.interceptors.as_slice());

        // Auth headers go last so a stray default header cannot replace them
        headers.extend(authentication.create_headers()?);

        let mut request = TransportRequest::new(method, self.base_url.clone(), path, timeout);
        request.headers = headers;
        request.query = encode_query(query.as_ref(), options.expand.as_deref());
        request.body = body;

        let metadata = RequestMetadata::new(request.method.as_str(), path)
            .with_transport(self.transport.name())
            .with_auth(authentication.name());
        metadata.log_request();

        let timer = RequestTimer::start();
        let result = Next::new(self.transport.as_ref(), interceptors)
            .run(request)
            .await
            .and_then(|response| {
                let status = response.status;
                serde_json::from_value::<T>(response.data)
                    .map(|value| Response::new(value, status, response.headers))
                    .map_err(|e| Error::invalid_response(Some(status.as_u16()), e))
            });

        match &result {
            Ok(response) => {
                ResponseMetadata::new(Some(response.status().as_u16()), timer.elapsed())
                    .log_success(&metadata)
            }
            Err(error) => {
                ResponseMetadata::new(error.status(), timer.elapsed()).log_error(&metadata, error)
            }
        }
        result
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("transport", &self.transport.name())
            .field("base_url", &self.base_url.as_str())
            .field("timeout", &self.timeout)
            .field("authentication", &self.authentication.name())
            .field("interceptors", &self.interceptors.len())
            .field("default_options", &self.default_options)
            .finish()
    }
}

/// Flatten `query` and append one `expand` entry per path.
pub fn encode_query(query: Option<&Value>, expand: Option<&[String]>) -> QueryPairs {
    let mut pairs = query.map(encoding::flatten).unwrap_or_default();
    if let Some(paths) = expand {
        pairs.extend(
            paths
                .iter()
                .map(|path| (EXPAND_PARAM.to_string(), path.clone())),
        );
    }
    pairs
}

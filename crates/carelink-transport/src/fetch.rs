//! Fetch-style transport built on `reqwest`
//!
//! One request, one response: resolve the absolute URL, arm a timer for the
//! request timeout, send, read the whole body and classify it.

use crate::decode::decode_body;
use crate::error::{Error, Result};
use crate::multipart::MultipartForm;
use crate::settings::TransportSettings;
use crate::traits::{RequestBody, Transport, TransportRequest, TransportResponse};
use async_trait::async_trait;
use http::{HeaderValue, header};
use reqwest::Client as ReqwestClient;
use tracing::debug;

/// Transport that issues each request as an independent fetch.
///
/// Connection reuse is left to `reqwest`'s internal pool.
#[derive(Debug, Clone)]
pub struct FetchTransport {
    client: ReqwestClient,
}

impl FetchTransport {
    /// Create a transport with default settings.
    pub fn new() -> Result<Self> {
        Self::with_settings(&TransportSettings::default())
    }

    /// Create a transport with custom settings.
    pub fn with_settings(settings: &TransportSettings) -> Result<Self> {
        let client = ReqwestClient::builder()
            .connect_timeout(settings.connect_timeout)
            .pool_max_idle_per_host(settings.max_idle_per_host)
            .pool_idle_timeout(settings.idle_timeout)
            .user_agent(settings.user_agent.as_str())
            .build()
            .map_err(|e| Error::Configuration(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self { client })
    }

    /// Wrap an existing `reqwest` client.
    pub fn from_client(client: ReqwestClient) -> Self {
        Self { client }
    }

    fn build(&self, request: TransportRequest) -> Result<reqwest::RequestBuilder> {
        let url = request.url()?;
        let mut builder = self
            .client
            .request(request.method, url)
            .headers(request.headers);

        builder = match request.body {
            None => builder,
            Some(RequestBody::Json(value)) => {
                let body = serde_json::to_vec(&value)
                    .map_err(|e| Error::InvalidRequest(format!("Failed to serialize body: {e}")))?;
                builder
                    .header(header::CONTENT_TYPE, HeaderValue::from_static("application/json"))
                    .body(body)
            }
            // reqwest writes the boundary header itself
            Some(RequestBody::Multipart(body)) => {
                builder.multipart(MultipartForm::encode(body).into_reqwest_form()?)
            }
        };

        Ok(builder)
    }
}

#[async_trait]
impl Transport for FetchTransport {
    async fn request(&self, request: TransportRequest) -> Result<TransportResponse> {
        let timeout = request.timeout;
        let builder = self.build(request)?;

        let exchange = async {
            let response = builder
                .send()
                .await
                .map_err(|e| classify_send_error(e, timeout))?;

            let status = response.status();
            let headers = response.headers().clone();
            let body = response
                .bytes()
                .await
                .map_err(|e| Error::invalid_response(Some(status.as_u16()), e))?;

            debug!(status = status.as_u16(), body_size = body.len(), "Fetch response received");

            let data = decode_body(status, &body)?;
            Ok(TransportResponse::new(status, headers, data))
        };

        // Dropping the in-flight exchange aborts it
        match tokio::time::timeout(timeout, exchange).await {
            Ok(result) => result,
            Err(_) => Err(Error::RequestTimeout { timeout }),
        }
    }

    fn name(&self) -> &'static str {
        "fetch"
    }
}

fn classify_send_error(error: reqwest::Error, timeout: std::time::Duration) -> Error {
    if error.is_timeout() {
        Error::RequestTimeout { timeout }
    } else if error.is_builder() {
        Error::InvalidRequest(error.to_string())
    } else {
        Error::connection(error)
    }
}

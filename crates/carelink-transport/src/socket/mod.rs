//! Socket transport over long-lived keep-alive connections
//!
//! Two pools live for the lifetime of the transport, one for plain and one for
//! TLS connections, and are shared by every request in flight. Request bodies
//! are written only after the connection reports ready; multipart bodies are
//! streamed part by part instead of being buffered.

mod connector;
mod pool;

pub use connector::{PooledBody, Security, Target};
pub use pool::ConnectionPool;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::TryStreamExt;
use http::{HeaderMap, HeaderValue, Request, header};
use http_body_util::{BodyExt, Empty, Full, StreamBody};
use hyper::body::Frame;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::{Position, Url};

use crate::decode::decode_body;
use crate::error::{Error, Result};
use crate::multipart::MultipartForm;
use crate::settings::TransportSettings;
use crate::traits::{RequestBody, Transport, TransportRequest, TransportResponse};
use connector::{Connector, socket_error};

/// Transport backed by pooled HTTP/1.1 connections.
#[derive(Debug, Clone)]
pub struct SocketTransport {
    plain: Arc<ConnectionPool>,
    tls: Arc<ConnectionPool>,
    user_agent: HeaderValue,
}

impl SocketTransport {
    /// Create a transport with default settings.
    pub fn new() -> Result<Self> {
        Self::with_settings(&TransportSettings::default())
    }

    /// Create a transport with custom settings.
    pub fn with_settings(settings: &TransportSettings) -> Result<Self> {
        Self::with_tls_connector(settings, Connector::tls(settings.connect_timeout)?)
    }

    fn with_tls_connector(settings: &TransportSettings, tls: Connector) -> Result<Self> {
        let user_agent = HeaderValue::from_str(&settings.user_agent)
            .map_err(|e| Error::Configuration(format!("Invalid user agent: {e}")))?;

        Ok(Self {
            plain: Arc::new(ConnectionPool::new(
                Connector::plain(settings.connect_timeout),
                settings.max_idle_per_host,
                settings.idle_timeout,
            )),
            tls: Arc::new(ConnectionPool::new(
                tls,
                settings.max_idle_per_host,
                settings.idle_timeout,
            )),
            user_agent,
        })
    }

    /// Pool serving the given security level.
    pub fn pool(&self, security: Security) -> &ConnectionPool {
        match security {
            Security::Plain => &self.plain,
            Security::Tls => &self.tls,
        }
    }

    async fn exchange(&self, request: TransportRequest) -> Result<TransportResponse> {
        let timeout = request.timeout;
        let url = request.url()?;
        let (security, target) = resolve_target(&url)?;
        let http_request = self.build_request(&url, request)?;

        let pool = self.pool(security);
        let mut connection = pool.checkout(&target, timeout).await?;
        debug!(
            target = %target.key(),
            reused = connection.reused,
            "Writing request to socket"
        );

        let response = connection
            .sender
            .send_request(http_request)
            .await
            .map_err(|e| socket_error(e, timeout))?;

        let status = response.status();
        let headers = response.headers().clone();
        let mut incoming = response.into_body();

        let mut body = BytesMut::new();
        while let Some(frame) = incoming.frame().await {
            let frame = frame.map_err(|e| socket_error(e, timeout))?;
            if let Ok(chunk) = frame.into_data() {
                body.extend_from_slice(&chunk);
            }
        }

        pool.release(&target, connection).await;
        debug!(status = status.as_u16(), body_size = body.len(), "Socket response received");

        let data = decode_body(status, &body)?;
        Ok(TransportResponse::new(status, headers, data))
    }

    fn build_request(&self, url: &Url, request: TransportRequest) -> Result<Request<PooledBody>> {
        let mut headers: HeaderMap = request.headers;
        let body = match request.body {
            None => Empty::<Bytes>::new()
                .map_err(|never| match never {})
                .boxed_unsync(),
            Some(RequestBody::Json(value)) => {
                let bytes = serde_json::to_vec(&value)
                    .map_err(|e| Error::InvalidRequest(format!("Failed to serialize body: {e}")))?;
                headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
                Full::new(Bytes::from(bytes))
                    .map_err(|never| match never {})
                    .boxed_unsync()
            }
            Some(RequestBody::Multipart(body)) => {
                let form = MultipartForm::encode(body);
                headers.extend(form.headers()?);
                StreamBody::new(form.into_stream().map_ok(Frame::data)).boxed_unsync()
            }
        };

        if !headers.contains_key(header::USER_AGENT) {
            headers.insert(header::USER_AGENT, self.user_agent.clone());
        }
        let host = HeaderValue::from_str(&url[Position::BeforeHost..Position::AfterPort])
            .map_err(|e| Error::InvalidRequest(format!("Invalid host: {e}")))?;
        headers.insert(header::HOST, host);

        let mut builder = Request::builder()
            .method(request.method)
            .uri(&url[Position::BeforePath..Position::AfterQuery]);
        if let Some(request_headers) = builder.headers_mut() {
            *request_headers = headers;
        }
        builder
            .body(body)
            .map_err(|e| Error::InvalidRequest(format!("Failed to build request: {e}")))
    }
}

#[async_trait]
impl Transport for SocketTransport {
    async fn request(&self, request: TransportRequest) -> Result<TransportResponse> {
        let timeout: Duration = request.timeout;
        match tokio::time::timeout(timeout, self.exchange(request)).await {
            Ok(result) => result,
            Err(_) => Err(Error::RequestTimeout { timeout }),
        }
    }

    fn name(&self) -> &'static str {
        "socket"
    }
}

fn resolve_target(url: &Url) -> Result<(Security, Target)> {
    let security = Security::from_scheme(url.scheme()).ok_or_else(|| {
        Error::InvalidRequest(format!("Unsupported URL scheme '{}'", url.scheme()))
    })?;
    let host = url
        .host_str()
        .ok_or_else(|| Error::InvalidRequest(format!("URL '{url}' has no host")))?
        .trim_start_matches('[')
        .trim_end_matches(']')
        .to_string();
    let port = url
        .port_or_known_default()
        .ok_or_else(|| Error::InvalidRequest(format!("URL '{url}' has no port")))?;

    Ok((security, Target { host, port }))
}

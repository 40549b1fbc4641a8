//! Opening new connections: TCP connect, optional TLS handshake, HTTP/1 handshake

use bytes::Bytes;
use http_body_util::combinators::UnsyncBoxBody;
use hyper::client::conn::http1::{self, SendRequest};
use hyper_util::rt::TokioIo;
use std::{sync::Arc, time::Duration};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_rustls::{
    TlsConnector,
    rustls::{ClientConfig, RootCertStore, crypto::ring, pki_types::ServerName},
};
use tracing::debug;

use crate::error::{BoxError, Error, Result};

/// Body type sent over pooled connections.
pub type PooledBody = UnsyncBoxBody<Bytes, std::io::Error>;

/// Transport security level of a connection pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Security {
    /// Plain TCP (`http://`)
    Plain,
    /// TLS over TCP (`https://`)
    Tls,
}

impl Security {
    /// Security level implied by a URL scheme.
    pub fn from_scheme(scheme: &str) -> Option<Self> {
        match scheme {
            "http" => Some(Security::Plain),
            "https" => Some(Security::Tls),
            _ => None,
        }
    }
}

/// Host and port a connection is opened to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Target {
    /// Host name or address
    pub host: String,
    /// TCP port
    pub port: u16,
}

impl Target {
    /// Pool key for this target.
    pub fn key(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Opens connections for one security level.
#[derive(Clone)]
pub(crate) struct Connector {
    security: Security,
    tls: Option<TlsConnector>,
    connect_timeout: Duration,
}

impl std::fmt::Debug for Connector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connector")
            .field("security", &self.security)
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

impl Connector {
    pub(crate) fn plain(connect_timeout: Duration) -> Self {
        Self {
            security: Security::Plain,
            tls: None,
            connect_timeout,
        }
    }

    pub(crate) fn tls(connect_timeout: Duration) -> Result<Self> {
        let mut roots = RootCertStore::empty();
        roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        Self::tls_with_roots(connect_timeout, roots)
    }

    /// TLS connector trusting exactly `roots`.
    pub(crate) fn tls_with_roots(connect_timeout: Duration, roots: RootCertStore) -> Result<Self> {
        let mut config = ClientConfig::builder_with_provider(Arc::new(ring::default_provider()))
            .with_safe_default_protocol_versions()
            .map_err(|e| Error::Configuration(format!("Failed to configure TLS: {e}")))?
            .with_root_certificates(roots)
            .with_no_client_auth();
        config.alpn_protocols = vec![b"http/1.1".to_vec()];

        Ok(Self {
            security: Security::Tls,
            tls: Some(TlsConnector::from(Arc::new(config))),
            connect_timeout,
        })
    }

    pub(crate) fn security(&self) -> Security {
        self.security
    }

    /// Open a connection and complete every handshake.
    ///
    /// The returned sender has not been polled for readiness yet.
    pub(crate) async fn connect(
        &self,
        target: &Target,
        request_timeout: Duration,
    ) -> Result<SendRequest<PooledBody>> {
        let tcp = tokio::time::timeout(
            self.connect_timeout,
            TcpStream::connect((target.host.as_str(), target.port)),
        )
        .await
        .map_err(|_| Error::RequestTimeout {
            timeout: self.connect_timeout,
        })?
        .map_err(|e| socket_error(e, request_timeout))?;
        // Request bytes go out as soon as they are written
        tcp.set_nodelay(true)
            .map_err(|e| socket_error(e, request_timeout))?;

        match &self.tls {
            None => handshake(tcp, request_timeout).await,
            Some(tls) => {
                let server_name = ServerName::try_from(target.host.clone())
                    .map_err(|e| {
                        Error::connection(format!("Invalid server name '{}': {e}", target.host))
                    })?;
                let stream = tls
                    .connect(server_name, tcp)
                    .await
                    .map_err(|e| socket_error(e, request_timeout))?;
                debug!(host = %target.host, "TLS handshake complete");
                handshake(stream, request_timeout).await
            }
        }
    }
}

async fn handshake<S>(stream: S, request_timeout: Duration) -> Result<SendRequest<PooledBody>>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (sender, connection) = http1::handshake(TokioIo::new(stream))
        .await
        .map_err(|e| socket_error(e, request_timeout))?;

    tokio::spawn(async move {
        if let Err(e) = connection.await {
            debug!(error = %e, "Pooled connection closed with error");
        }
    });

    Ok(sender)
}

/// Classify a socket-level failure.
///
/// Timeouts are recognised by walking the error chain for an I/O `TimedOut`
/// or a hyper timeout; everything else is a connection failure.
pub(crate) fn socket_error<E>(error: E, timeout: Duration) -> Error
where
    E: Into<BoxError>,
{
    let error = error.into();
    if is_timeout(error.as_ref()) {
        Error::RequestTimeout { timeout }
    } else {
        Error::ConnectionFailed {
            message: error.to_string(),
            source: Some(error),
        }
    }
}

fn is_timeout(error: &(dyn std::error::Error + 'static)) -> bool {
    if let Some(io) = error.downcast_ref::<std::io::Error>() {
        if io.kind() == std::io::ErrorKind::TimedOut {
            return true;
        }
        // `io::Error::source` skips the wrapped error itself
        if let Some(inner) = io.get_ref()
            && is_timeout(inner)
        {
            return true;
        }
    }
    if let Some(hyper_err) = error.downcast_ref::<hyper::Error>()
        && hyper_err.is_timeout()
    {
        return true;
    }
    error.source().is_some_and(is_timeout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_security_from_scheme() {
        assert_eq!(Security::from_scheme("http"), Some(Security::Plain));
        assert_eq!(Security::from_scheme("https"), Some(Security::Tls));
        assert_eq!(Security::from_scheme("ftp"), None);
    }

    #[test]
    fn test_target_key() {
        let target = Target {
            host: "api.example.com".to_string(),
            port: 443,
        };
        assert_eq!(target.key(), "api.example.com:443");
    }

    #[test]
    fn test_socket_error_timeout() {
        let io = std::io::Error::new(std::io::ErrorKind::TimedOut, "timed out");
        let error = socket_error(io, Duration::from_secs(3));
        assert_eq!(error.kind(), ErrorKind::RequestTimeout);
    }

    #[test]
    fn test_socket_error_nested_timeout() {
        let inner = std::io::Error::new(std::io::ErrorKind::TimedOut, "read timed out");
        let outer = std::io::Error::other(inner);
        let error = socket_error(outer, Duration::from_secs(3));
        assert_eq!(error.kind(), ErrorKind::RequestTimeout);
    }

    #[test]
    fn test_socket_error_reset() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset by peer");
        let error = socket_error(io, Duration::from_secs(3));
        assert_eq!(error.kind(), ErrorKind::ConnectionFailed);
    }

    #[test]
    fn test_tls_connector_builds() {
        let connector = Connector::tls(Duration::from_secs(5)).unwrap();
        assert_eq!(connector.security(), Security::Tls);
        assert_eq!(Connector::plain(Duration::from_secs(5)).security(), Security::Plain);
    }
}

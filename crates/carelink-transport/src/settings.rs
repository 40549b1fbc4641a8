//! Transport selection and connection settings
//!
//! Which transport a client uses is decided once, from configuration, when the
//! client is built. Nothing probes the runtime per call.

use std::{fmt, str::FromStr, sync::Arc, time::Duration};

use crate::error::{Error, Result};
use crate::fetch::FetchTransport;
use crate::socket::SocketTransport;
use crate::traits::Transport;

/// Available transport implementations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportKind {
    /// Independent requests through `reqwest`
    #[default]
    Fetch,
    /// Long-lived keep-alive connection pools, one per security level
    Socket,
}

impl TransportKind {
    /// Lowercase name used in configuration.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportKind::Fetch => "fetch",
            TransportKind::Socket => "socket",
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransportKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fetch" => Ok(TransportKind::Fetch),
            "socket" => Ok(TransportKind::Socket),
            other => Err(Error::Configuration(format!(
                "Unknown transport '{other}'. Expected 'fetch' or 'socket'."
            ))),
        }
    }
}

/// Connection settings shared by both transports.
#[derive(Debug, Clone)]
pub struct TransportSettings {
    /// Time allowed for TCP connect (and TLS handshake for the socket transport)
    pub connect_timeout: Duration,
    /// Maximum idle connections kept per host
    pub max_idle_per_host: usize,
    /// Idle connections older than this are not reused
    pub idle_timeout: Duration,
    /// `User-Agent` header value
    pub user_agent: String,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            max_idle_per_host: 10,
            idle_timeout: Duration::from_secs(90),
            user_agent: format!("carelink-rust/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Build the transport for `kind`.
///
/// # Errors
///
/// Returns a configuration error if the underlying client cannot be created.
pub fn build_transport(
    kind: TransportKind,
    settings: &TransportSettings,
) -> Result<Arc<dyn Transport>> {
    Ok(match kind {
        TransportKind::Fetch => Arc::new(FetchTransport::with_settings(settings)?),
        TransportKind::Socket => Arc::new(SocketTransport::with_settings(settings)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("fetch", TransportKind::Fetch)]
    #[case("socket", TransportKind::Socket)]
    #[case(" Socket ", TransportKind::Socket)]
    fn test_parse_kind(#[case] input: &str, #[case] expected: TransportKind) {
        assert_eq!(input.parse::<TransportKind>().unwrap(), expected);
    }

    #[test]
    fn test_parse_unknown_kind() {
        let error = "carrier-pigeon".parse::<TransportKind>().unwrap_err();
        assert_eq!(error.kind(), crate::ErrorKind::Configuration);
    }

    #[test]
    fn test_build_selects_transport() {
        let settings = TransportSettings::default();
        assert_eq!(build_transport(TransportKind::Fetch, &settings).unwrap().name(), "fetch");
        assert_eq!(build_transport(TransportKind::Socket, &settings).unwrap().name(), "socket");
    }

    #[test]
    fn test_default_settings() {
        let settings = TransportSettings::default();
        assert_eq!(settings.max_idle_per_host, 10);
        assert!(settings.user_agent.starts_with("carelink-rust/"));
    }
}

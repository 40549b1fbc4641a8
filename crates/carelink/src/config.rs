//! Configuration for the Carelink client

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use carelink_transport::{TransportKind, TransportSettings};
use url::Url;

use crate::auth::Authentication;
use crate::error::{Error, Result};
use crate::pipeline::{Interceptor, RequestOptions};
use crate::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT};

/// Configuration for the Carelink client.
#[derive(Clone)]
pub struct ClientConfig {
    /// Default authentication
    pub authentication: Authentication,

    /// Base URL for the API; [`DEFAULT_BASE_URL`] when unset
    pub base_url: Option<String>,

    /// Default timeout for requests
    pub timeout: Duration,

    /// Transport used for every call
    pub transport: TransportKind,

    /// Options applied to every call before per-call options
    pub default_options: RequestOptions,

    /// Interceptor chain, in execution order
    pub interceptors: Vec<Arc<dyn Interceptor>>,

    /// Connection pool configuration
    pub connection_pool: ConnectionPoolConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            authentication: Authentication::Anonymous,
            base_url: None,
            timeout: DEFAULT_TIMEOUT,
            transport: TransportKind::default(),
            default_options: RequestOptions::default(),
            interceptors: Vec::new(),
            connection_pool: ConnectionPoolConfig::default(),
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("authentication", &self.authentication)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("transport", &self.transport)
            .field("default_options", &self.default_options)
            .field("interceptors", &self.interceptors.len())
            .field("connection_pool", &self.connection_pool)
            .finish()
    }
}

impl ClientConfig {
    /// Create a configuration using API key authentication.
    pub fn with_api_key(id: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            authentication: Authentication::api_key(id, secret),
            ..Default::default()
        }
    }

    /// Create a configuration using user session authentication.
    pub fn with_user_session(secret: impl Into<String>, live_mode: bool) -> Self {
        Self {
            authentication: Authentication::user_session(secret, live_mode),
            ..Default::default()
        }
    }

    /// Load configuration from environment variables.
    ///
    /// A `.env` file in the working directory is read first, if present.
    /// This will look for:
    /// - `CARELINK_API_KEY_ID` and `CARELINK_API_KEY_SECRET` for API key authentication
    /// - `CARELINK_USER_TOKEN` and `CARELINK_LIVE_MODE` for user session authentication
    /// - `CARELINK_BASE_URL` for the API base URL
    /// - `CARELINK_TIMEOUT` for request timeout (in seconds)
    /// - `CARELINK_TRANSPORT` for the transport (`fetch` or `socket`)
    ///
    /// # Errors
    ///
    /// Returns a configuration error if a variable is set to an unusable
    /// value, or if only half of an API key is present.
    #[cfg(feature = "env")]
    pub fn from_env() -> Result<Self> {
        use std::env;

        let _ = dotenvy::dotenv();
        let mut config = Self::default();

        // Authentication
        match (env::var("CARELINK_API_KEY_ID"), env::var("CARELINK_API_KEY_SECRET")) {
            (Ok(id), Ok(secret)) => {
                config.authentication = Authentication::api_key(id, secret);
            }
            (Ok(_), Err(_)) | (Err(_), Ok(_)) => {
                return Err(Error::Configuration(
                    "CARELINK_API_KEY_ID and CARELINK_API_KEY_SECRET must be set together"
                        .to_string(),
                ));
            }
            (Err(_), Err(_)) => {
                if let Ok(token) = env::var("CARELINK_USER_TOKEN") {
                    let live_mode = match env::var("CARELINK_LIVE_MODE") {
                        Ok(value) => parse_bool("CARELINK_LIVE_MODE", &value)?,
                        Err(_) => false,
                    };
                    config.authentication = Authentication::user_session(token, live_mode);
                }
            }
        }

        // Base URL
        if let Ok(base_url) = env::var("CARELINK_BASE_URL") {
            config.base_url = Some(base_url);
        }

        // Timeout
        if let Ok(timeout_str) = env::var("CARELINK_TIMEOUT") {
            let timeout_secs = timeout_str.trim().parse::<u64>().map_err(|_| {
                Error::Configuration(format!(
                    "CARELINK_TIMEOUT is not a number of seconds: {timeout_str}"
                ))
            })?;
            config.timeout = Duration::from_secs(timeout_secs);
        }

        // Transport
        if let Ok(transport) = env::var("CARELINK_TRANSPORT") {
            config.transport = transport.parse()?;
        }

        Ok(config)
    }

    /// Resolve and validate the base URL.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the URL is empty, unparseable, or not
    /// `http`/`https`.
    pub fn resolved_base_url(&self) -> Result<Url> {
        let raw = self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL).trim();
        if raw.is_empty() {
            return Err(Error::Configuration("Base URL cannot be empty".to_string()));
        }

        let url = Url::parse(raw)
            .map_err(|e| Error::Configuration(format!("Invalid base URL '{raw}': {e}")))?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            scheme => Err(Error::Configuration(format!(
                "Base URL scheme '{scheme}' is not supported. Use http or https."
            ))),
        }
    }
}

#[cfg(feature = "env")]
fn parse_bool(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" | "" => Ok(false),
        _ => Err(Error::Configuration(format!(
            "{name} must be true or false, got '{value}'"
        ))),
    }
}

/// Configuration for connection handling.
#[derive(Debug, Clone)]
pub struct ConnectionPoolConfig {
    /// Maximum number of idle connections per host
    pub max_idle_per_host: usize,

    /// Idle connection timeout
    pub idle_timeout: Duration,

    /// Time allowed to establish a connection
    pub connect_timeout: Duration,
}

impl Default for ConnectionPoolConfig {
    fn default() -> Self {
        let settings = TransportSettings::default();
        Self {
            max_idle_per_host: settings.max_idle_per_host,
            idle_timeout: settings.idle_timeout,
            connect_timeout: settings.connect_timeout,
        }
    }
}

impl From<&ConnectionPoolConfig> for TransportSettings {
    fn from(config: &ConnectionPoolConfig) -> Self {
        TransportSettings {
            connect_timeout: config.connect_timeout,
            max_idle_per_host: config.max_idle_per_host,
            idle_timeout: config.idle_timeout,
            ..TransportSettings::default()
        }
    }
}

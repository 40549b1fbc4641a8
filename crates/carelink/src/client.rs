//! Main client implementation for the Carelink API

use std::sync::Arc;
use std::time::Duration;

use carelink_transport::{Transport, TransportKind, TransportSettings, build_transport};
use http::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::{
    auth::Authentication,
    config::{ClientConfig, ConnectionPoolConfig},
    error::Result,
    pipeline::{Interceptor, Pipeline, RequestArgs, RequestOptions, Response},
    resources::Tokens,
};

/// Main client for interacting with the Carelink API.
///
/// Cloning is cheap; clones share one pipeline, one transport and its
/// connection pools.
///
/// # Example
///
/// ```rust,no_run
/// use carelink::{Client, RequestArgs};
/// use serde_json::{Value, json};
///
/// # async fn example() -> carelink::Result<()> {
/// let client = Client::builder()
///     .api_key("key_123", "sk_test_...")
///     .build()?;
///
/// let members = client
///     .get::<Value>("/v1/members", RequestArgs::new().query(&json!({"limit": 5}))?)
///     .await?;
/// println!("{:?} {}", members.request_id(), *members);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct Client {
    inner: Arc<ClientInner>,
}

#[derive(Debug)]
struct ClientInner {
    pipeline: Arc<Pipeline>,
    tokens: Tokens,
}

impl Client {
    /// Create a client authenticated with an API key.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport cannot be created.
    pub fn new(key_id: impl Into<String>, secret: impl Into<String>) -> Result<Self> {
        Self::builder().api_key(key_id, secret).build()
    }

    /// Create a new client builder for advanced configuration.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    /// Create a client from a configuration object.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the base URL is invalid or the
    /// transport cannot be created.
    pub fn from_config(config: ClientConfig) -> Result<Self> {
        Self::assemble(config, None)
    }

    /// Create a client from environment variables.
    ///
    /// See [`ClientConfig::from_env`].
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the environment is unusable.
    #[cfg(feature = "env")]
    pub fn from_env() -> Result<Self> {
        Self::from_config(ClientConfig::from_env()?)
    }

    fn assemble(config: ClientConfig, transport: Option<Arc<dyn Transport>>) -> Result<Self> {
        let base_url = config.resolved_base_url()?;
        let transport = match transport {
            Some(transport) => transport,
            None => build_transport(
                config.transport,
                &TransportSettings::from(&config.connection_pool),
            )?,
        };

        tracing::debug!(
            base_url = %base_url,
            transport = transport.name(),
            auth = config.authentication.name(),
            interceptors = config.interceptors.len(),
            "Building client"
        );

        let pipeline = Arc::new(
            Pipeline::new(transport, base_url, config.timeout, config.authentication)
                .with_interceptors(config.interceptors)
                .with_default_options(config.default_options),
        );

        Ok(Self {
            inner: Arc::new(ClientInner {
                tokens: Tokens::new(Arc::clone(&pipeline)),
                pipeline,
            }),
        })
    }

    /// Delegated token generation.
    pub fn tokens(&self) -> &Tokens {
        &self.inner.tokens
    }

    /// The shared request pipeline.
    pub fn pipeline(&self) -> &Pipeline {
        &self.inner.pipeline
    }

    /// Execute a call against any endpoint.
    ///
    /// # Errors
    ///
    /// Returns the pipeline's error unchanged.
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        args: RequestArgs,
    ) -> Result<Response<T>> {
        self.inner.pipeline.request(method, path, args).await
    }

    /// `GET` `path`.
    ///
    /// # Errors
    ///
    /// Returns the pipeline's error unchanged.
    pub async fn get<T>(&self, path: &str, args: RequestArgs) -> Result<Response<T>>
    where
        T: DeserializeOwned,
    {
        self.request(Method::GET, path, args).await
    }

    /// `POST` a JSON body to `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if `body` cannot be serialized, or the pipeline's
    /// error unchanged.
    pub async fn post<T, B>(
        &self,
        path: &str,
        body: &B,
        options: RequestOptions,
    ) -> Result<Response<T>>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let args = RequestArgs::new().json(body)?.options(options);
        self.request(Method::POST, path, args).await
    }

    /// `PATCH` a JSON body to `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if `body` cannot be serialized, or the pipeline's
    /// error unchanged.
    pub async fn patch<T, B>(
        &self,
        path: &str,
        body: &B,
        options: RequestOptions,
    ) -> Result<Response<T>>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let args = RequestArgs::new().json(body)?.options(options);
        self.request(Method::PATCH, path, args).await
    }

    /// `DELETE` `path`.
    ///
    /// # Errors
    ///
    /// Returns the pipeline's error unchanged.
    pub async fn delete<T>(&self, path: &str, options: RequestOptions) -> Result<Response<T>>
    where
        T: DeserializeOwned,
    {
        self.request(Method::DELETE, path, RequestArgs::new().options(options))
            .await
    }
}

/// Builder for creating a configured Client.
#[derive(Debug, Default)]
pub struct ClientBuilder {
    config: ClientConfig,
    transport: Option<Arc<dyn Transport>>,
}

impl ClientBuilder {
    /// Start from an existing configuration.
    pub fn from_config(config: ClientConfig) -> Self {
        Self {
            config,
            transport: None,
        }
    }

    /// Set the default authentication.
    pub fn authentication(mut self, authentication: Authentication) -> Self {
        self.config.authentication = authentication;
        self
    }

    /// Authenticate with an API key.
    pub fn api_key(self, key_id: impl Into<String>, secret: impl Into<String>) -> Self {
        self.authentication(Authentication::api_key(key_id, secret))
    }

    /// Authenticate with a user session.
    pub fn user_session(self, secret: impl Into<String>, live_mode: bool) -> Self {
        self.authentication(Authentication::user_session(secret, live_mode))
    }

    /// Set the base URL for the API.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.base_url = Some(base_url.into());
        self
    }

    /// Set the default timeout for requests.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Select the transport built at [`build`](Self::build).
    pub fn transport_kind(mut self, kind: TransportKind) -> Self {
        self.config.transport = kind;
        self
    }

    /// Use this transport instead of building one.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Register an interceptor at the end of the chain.
    pub fn interceptor(mut self, interceptor: impl Interceptor + 'static) -> Self {
        self.config.interceptors.push(Arc::new(interceptor));
        self
    }

    /// Set options applied to every call.
    pub fn default_options(mut self, options: RequestOptions) -> Self {
        self.config.default_options = options;
        self
    }

    /// Set connection pool configuration.
    pub fn connection_pool(mut self, config: ConnectionPoolConfig) -> Self {
        self.config.connection_pool = config;
        self
    }

    /// Build the client with the configured options.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the base URL is invalid or the
    /// transport cannot be created.
    pub fn build(self) -> Result<Client> {
        Client::assemble(self.config, self.transport)
    }
}

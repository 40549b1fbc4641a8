//! Interceptor chain
//!
//! Interceptors run strictly in registration order. Each receives the
//! in-flight request and a [`Next`] continuation; calling [`Next::run`]
//! proceeds to the following interceptor, and the last continuation invokes
//! the transport. An interceptor that returns without calling `next`
//! short-circuits the rest of the chain and the transport.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use carelink_transport::{Transport, TransportRequest, TransportResponse};

use crate::error::Result;
use crate::observability::RequestTimer;

/// A middleware unit in the request pipeline.
#[async_trait]
pub trait Interceptor: Send + Sync {
    /// Handle `request`, usually by calling `next.run(request)`.
    async fn intercept(
        &self,
        request: TransportRequest,
        next: Next<'_>,
    ) -> Result<TransportResponse>;

    /// Name used in logs.
    fn name(&self) -> &str {
        "interceptor"
    }
}

/// Continuation into the remainder of the chain.
#[derive(Clone, Copy)]
pub struct Next<'a> {
    transport: &'a dyn Transport,
    chain: &'a [Arc<dyn Interceptor>],
}

impl<'a> Next<'a> {
    pub(crate) fn new(transport: &'a dyn Transport, chain: &'a [Arc<dyn Interceptor>]) -> Self {
        Self { transport, chain }
    }

    /// Number of interceptors still to run before the transport.
    pub fn remaining(&self) -> usize {
        self.chain.len()
    }

    /// Pass `request` to the next interceptor, or to the transport when none
    /// are left.
    ///
    /// # Errors
    ///
    /// Returns whatever error the downstream interceptor or transport returns.
    pub async fn run(self, request: TransportRequest) -> Result<TransportResponse> {
        match self.chain.split_first() {
            Some((interceptor, rest)) => {
                tracing::debug!(interceptor = interceptor.name(), "Running interceptor");
                interceptor
                    .intercept(request, Next::new(self.transport, rest))
                    .await
            }
            None => self.transport.request(request).await,
        }
    }
}

impl fmt::Debug for Next<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next")
            .field("transport", &self.transport.name())
            .field("remaining", &self.chain.len())
            .finish()
    }
}

/// Interceptor that logs each request passing through the chain.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingInterceptor;

#[async_trait]
impl Interceptor for TracingInterceptor {
    async fn intercept(
        &self,
        request: TransportRequest,
        next: Next<'_>,
    ) -> Result<TransportResponse> {
        let method = request.method.clone();
        let path = request.path.clone();
        tracing::debug!(%method, %path, "Sending request");

        let timer = RequestTimer::start();
        let result = next.run(request).await;
        match &result {
            Ok(response) => tracing::debug!(
                %method,
                %path,
                status = response.status.as_u16(),
                elapsed_ms = timer.elapsed().as_millis(),
                "Received response"
            ),
            Err(error) => tracing::debug!(
                %method,
                %path,
                kind = error.kind().as_str(),
                elapsed_ms = timer.elapsed().as_millis(),
                "Request failed"
            ),
        }
        result
    }

    fn name(&self) -> &str {
        "tracing"
    }
}

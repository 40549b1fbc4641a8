//! Keep-alive connection pool for one security level

use hyper::client::conn::http1::SendRequest;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

use super::connector::{Connector, PooledBody, Security, Target, socket_error};
use crate::error::Result;

/// How long `release` waits for a connection to finish its previous exchange.
const RELEASE_READY_WAIT: Duration = Duration::from_millis(500);

struct IdleConnection {
    sender: SendRequest<PooledBody>,
    idle_since: Instant,
}

/// A connection checked out of the pool.
pub(crate) struct PooledConnection {
    pub(crate) sender: SendRequest<PooledBody>,
    pub(crate) reused: bool,
}

/// Idle connections keyed by `host:port`, shared by every in-flight request.
pub struct ConnectionPool {
    connector: Connector,
    idle: Mutex<HashMap<String, Vec<IdleConnection>>>,
    max_idle_per_host: usize,
    idle_timeout: Duration,
}

impl std::fmt::Debug for ConnectionPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionPool")
            .field("security", &self.connector.security())
            .field("max_idle_per_host", &self.max_idle_per_host)
            .field("idle_timeout", &self.idle_timeout)
            .finish()
    }
}

impl ConnectionPool {
    pub(crate) fn new(
        connector: Connector,
        max_idle_per_host: usize,
        idle_timeout: Duration,
    ) -> Self {
        Self {
            connector,
            idle: Mutex::new(HashMap::new()),
            max_idle_per_host,
            idle_timeout,
        }
    }

    /// Security level served by this pool.
    pub fn security(&self) -> Security {
        self.connector.security()
    }

    /// Number of idle connections currently held for `target`.
    pub async fn idle_count(&self, target: &Target) -> usize {
        self.idle
            .lock()
            .await
            .get(&target.key())
            .map_or(0, Vec::len)
    }

    /// Take a connection that is ready to accept a request.
    ///
    /// Idle connections are tried first. A fresh connection is only returned
    /// once its TCP (and TLS) handshake has finished and the HTTP layer reports
    /// ready, so no request bytes are ever written to a half-open socket.
    pub(crate) async fn checkout(
        &self,
        target: &Target,
        timeout: Duration,
    ) -> Result<PooledConnection> {
        while let Some(mut sender) = self.take_idle(target).await {
            if sender.is_ready() {
                debug!(target = %target.key(), "Reusing pooled connection");
                return Ok(PooledConnection { sender, reused: true });
            }
            // Finishing the previous response may still be in progress
            if sender.ready().await.is_ok() {
                debug!(target = %target.key(), "Reusing pooled connection after readiness wait");
                return Ok(PooledConnection { sender, reused: true });
            }
        }

        debug!(target = %target.key(), security = ?self.security(), "Opening new connection");
        let mut sender = self.connector.connect(target, timeout).await?;
        sender.ready().await.map_err(|e| socket_error(e, timeout))?;
        Ok(PooledConnection {
            sender,
            reused: false,
        })
    }

    /// Return a connection after its response body has been fully read.
    ///
    /// Only a connection that is open and ready for its next request goes
    /// back to the pool. One that is still winding down the previous
    /// exchange gets a short grace period; one the server closed is dropped.
    pub(crate) async fn release(&self, target: &Target, connection: PooledConnection) {
        let mut sender = connection.sender;
        if sender.is_closed() {
            return;
        }
        if !sender.is_ready() {
            match tokio::time::timeout(RELEASE_READY_WAIT, sender.ready()).await {
                Ok(Ok(())) => {}
                _ => {
                    debug!(target = %target.key(), "Dropping connection that is not ready");
                    return;
                }
            }
        }
        let mut idle = self.idle.lock().await;
        let entries = idle.entry(target.key()).or_default();
        if entries.len() < self.max_idle_per_host {
            entries.push(IdleConnection {
                sender,
                idle_since: Instant::now(),
            });
        }
    }

    async fn take_idle(&self, target: &Target) -> Option<SendRequest<PooledBody>> {
        let mut idle = self.idle.lock().await;
        let entries = idle.get_mut(&target.key())?;
        while let Some(entry) = entries.pop() {
            if entry.sender.is_closed() || entry.idle_since.elapsed() > self.idle_timeout {
                continue;
            }
            return Some(entry.sender);
        }
        None
    }
}

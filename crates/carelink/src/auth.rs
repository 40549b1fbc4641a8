//! Authentication strategies
//!
//! A client holds one default [`Authentication`]; a single request may
//! override it through its options. The value in use is only read while the
//! request is in flight, never mutated.

use http::{HeaderMap, HeaderValue, header};
use secrecy::{ExposeSecret, SecretString};

use crate::error::{Error, Result};

/// Header carrying the live-mode flag of a user session.
pub const LIVE_MODE_HEADER: &str = "x-carelink-live-mode";

/// Credential used to authenticate a request.
#[derive(Debug, Clone, Default)]
pub enum Authentication {
    /// No credentials; no headers are sent.
    #[default]
    Anonymous,

    /// Account-level API key.
    ApiKey {
        /// Key identifier, embedded in delegated tokens as `kid`
        id: String,
        /// Key secret, sent as the bearer token and used to sign delegated tokens
        secret: SecretString,
    },

    /// Session of an authenticated user.
    UserSession {
        /// Session token, sent as the bearer token
        secret: SecretString,
        /// Whether the session targets live (rather than test) data
        live_mode: bool,
    },
}

impl Authentication {
    /// No credentials.
    pub fn anonymous() -> Self {
        Authentication::Anonymous
    }

    /// API key authentication.
    pub fn api_key(id: impl Into<String>, secret: impl Into<String>) -> Self {
        Authentication::ApiKey {
            id: id.into(),
            secret: SecretString::new(secret.into().into_boxed_str()),
        }
    }

    /// User session authentication.
    pub fn user_session(secret: impl Into<String>, live_mode: bool) -> Self {
        Authentication::UserSession {
            secret: SecretString::new(secret.into().into_boxed_str()),
            live_mode,
        }
    }

    /// Short name of the strategy, safe to log.
    pub fn name(&self) -> &'static str {
        match self {
            Authentication::Anonymous => "anonymous",
            Authentication::ApiKey { .. } => "api_key",
            Authentication::UserSession { .. } => "user_session",
        }
    }

    /// Key id and secret when this is API key authentication.
    pub fn as_api_key(&self) -> Option<(&str, &SecretString)> {
        match self {
            Authentication::ApiKey { id, secret } => Some((id, secret)),
            _ => None,
        }
    }

    /// Headers this strategy adds to a request.
    ///
    /// # Errors
    ///
    /// Returns an error if a secret contains characters that are not valid in
    /// a header value.
    pub fn create_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        match self {
            Authentication::Anonymous => {}
            Authentication::ApiKey { secret, .. } => {
                headers.insert(header::AUTHORIZATION, bearer(secret)?);
            }
            Authentication::UserSession { secret, live_mode } => {
                headers.insert(header::AUTHORIZATION, bearer(secret)?);
                headers.insert(
                    LIVE_MODE_HEADER,
                    HeaderValue::from_static(if *live_mode { "true" } else { "false" }),
                );
            }
        }
        Ok(headers)
    }
}

fn bearer(secret: &SecretString) -> Result<HeaderValue> {
    let mut value = HeaderValue::from_str(&format!("Bearer {}", secret.expose_secret()))
        .map_err(|_| Error::InvalidRequest("Credential is not a valid header value".to_string()))?;
    value.set_sensitive(true);
    Ok(value)
}

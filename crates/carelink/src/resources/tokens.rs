//! Delegated member tokens
//!
//! An account holding an API key can mint a short-lived token that lets one
//! member act against the API with a limited set of scopes. The token is an
//! HS256 JWT keyed by the API key secret; its header carries the key id so the
//! server can pick the verification key.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

use crate::auth::Authentication;
use crate::error::{Error, Result};
use crate::pipeline::Pipeline;

/// Longest lifetime the API accepts for a delegated token, in seconds.
pub const MAX_TOKEN_LIFETIME_SECS: i64 = 24 * 60 * 60;

/// Parameters for [`Tokens::generate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateTokenParams {
    /// Member id the token acts as
    pub member: String,
    /// Expiry; truncated to whole seconds. Must be within 24 hours of now.
    pub expiration: DateTime<Utc>,
    /// Granted scopes; none when unset
    pub scopes: Option<Vec<String>>,
}

impl GenerateTokenParams {
    /// Parameters with no scopes.
    pub fn new(member: impl Into<String>, expiration: DateTime<Utc>) -> Self {
        Self {
            member: member.into(),
            expiration,
            scopes: None,
        }
    }

    /// Set the scopes.
    pub fn scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = Some(scopes.into_iter().map(Into::into).collect());
        self
    }
}

/// Claims carried by a delegated token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Member id
    pub sub: String,
    /// Issued at, seconds since the epoch
    pub iat: i64,
    /// Expiry, seconds since the epoch
    pub exp: i64,
    /// Granted scopes
    pub scopes: Vec<String>,
}

/// A signed delegated token.
#[derive(Debug, Clone)]
pub struct SignedToken {
    /// Compact JWT (`header.payload.signature`)
    pub token: String,
    /// Id of the API key that signed it
    pub key_id: String,
    /// Claims it carries
    pub claims: TokenClaims,
}

impl SignedToken {
    /// The compact token string.
    pub fn as_str(&self) -> &str {
        &self.token
    }
}

/// Token generation sub-client.
#[derive(Debug, Clone)]
pub struct Tokens {
    pipeline: Arc<Pipeline>,
}

impl Tokens {
    pub(crate) fn new(pipeline: Arc<Pipeline>) -> Self {
        Self { pipeline }
    }

    /// Sign a delegated token for a member.
    ///
    /// No network call is made.
    ///
    /// # Errors
    ///
    /// Returns a capability error if the client is not authenticated with an
    /// API key.
    pub fn generate(&self, params: GenerateTokenParams) -> Result<SignedToken> {
        sign(self.pipeline.authentication(), params, Utc::now())
    }
}

/// Sign `params` with the API key of `authentication`, issued at `now`.
///
/// # Errors
///
/// Returns a capability error, before any signing, unless `authentication`
/// is an API key.
pub fn sign(
    authentication: &Authentication,
    params: GenerateTokenParams,
    now: DateTime<Utc>,
) -> Result<SignedToken> {
    let Some((key_id, secret)) = authentication.as_api_key() else {
        return Err(Error::Capability(format!(
            "Generating member tokens requires API key authentication, not {}",
            authentication.name()
        )));
    };

    let claims = TokenClaims {
        sub: params.member,
        iat: now.timestamp(),
        exp: params.expiration.timestamp(),
        scopes: params.scopes.unwrap_or_default(),
    };

    if claims.exp - claims.iat > MAX_TOKEN_LIFETIME_SECS {
        tracing::warn!(
            member = %claims.sub,
            lifetime_secs = claims.exp - claims.iat,
            "Token expiry is more than 24 hours away; the API may reject it"
        );
    }

    let mut header = Header::new(Algorithm::HS256);
    header.kid = Some(key_id.to_string());

    let key = EncodingKey::from_secret(secret.expose_secret().as_bytes());
    let token = jsonwebtoken::encode(&header, &claims, &key)
        .map_err(|e| Error::InvalidRequest(format!("Failed to sign token: {e}")))?;

    tracing::debug!(
        member = %claims.sub,
        key_id,
        scopes = claims.scopes.len(),
        "Signed member token"
    );

    Ok(SignedToken {
        token,
        key_id: key_id.to_string(),
        claims,
    })
}

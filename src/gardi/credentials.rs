//! Password hashing and bearer-token primitives.
//!
//! Passwords are digested with SHA-256 before bcrypt, reducing arbitrarily
//! long input to a fixed 64-char hex string; bcrypt truncates at 72 bytes
//! and its cost is length-independent, so the pre-digest keeps behavior
//! uniform while the slow stage still dominates brute-force cost. The
//! stored hash embeds bcrypt's random salt and cost factor.
//!
//! Tokens are HS256-signed claim sets with a fixed time-to-live. Expiry is
//! the only invalidation mechanism; there is no refresh or revocation.

use crate::gardi::errors::AuthError;
use crate::gardi::store::UserRole;
use chrono::Utc;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

/// Signing algorithm is fixed for the process lifetime.
const ALGORITHM: Algorithm = Algorithm::HS256;

/// Two-stage hash: fixed-size digest, then a slow salted adaptive hash.
///
/// # Errors
/// Propagates bcrypt failures as internal errors.
pub fn hash_password(plaintext: &str) -> Result<String, AuthError> {
    let digest = sha256_hex(plaintext);
    bcrypt::hash(digest, bcrypt::DEFAULT_COST).map_err(|err| anyhow::Error::new(err).into())
}

/// Recompute the digest and verify it with bcrypt's constant-time
/// comparison. A mismatch is `Ok(false)`; only unexpected hashing failures
/// are errors, and they are never reinterpreted as bad credentials.
///
/// # Errors
/// Propagates bcrypt failures as internal errors.
pub fn verify_password(plaintext: &str, stored_hash: &str) -> Result<bool, AuthError> {
    let digest = sha256_hex(plaintext);
    bcrypt::verify(digest, stored_hash).map_err(|err| anyhow::Error::new(err).into())
}

fn sha256_hex(plaintext: &str) -> String {
    format!("{:x}", Sha256::digest(plaintext.as_bytes()))
}

/// Signed claim set carried by an access token.
///
/// Known claims stay typed; `extra` is the extension slot for
/// forward-compatible custom claims.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject identifier, opaque to this crate.
    pub sub: String,
    /// Unix timestamp; set by the signer at issuance.
    pub exp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<UserRole>,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl AccessClaims {
    #[must_use]
    pub fn new(sub: impl Into<String>) -> Self {
        Self {
            sub: sub.into(),
            exp: 0,
            role: None,
            extra: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_role(mut self, role: UserRole) -> Self {
        self.role = Some(role);
        self
    }

    #[must_use]
    pub fn with_claim(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
        self.extra.insert(name.into(), value);
        self
    }
}

/// HS256 token mint and validator. Holds only the immutable keys, so it can
/// be shared across requests without coordination.
pub struct TokenSigner {
    encoding: EncodingKey,
    decoding: DecodingKey,
    default_ttl: Duration,
}

impl fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSigner")
            .field("default_ttl", &self.default_ttl)
            .finish_non_exhaustive()
    }
}

impl TokenSigner {
    /// # Errors
    /// Returns `AuthError::Configuration` when the secret is empty.
    pub fn new(secret: &SecretString, default_ttl: Duration) -> Result<Self, AuthError> {
        let secret = secret.expose_secret();
        if secret.is_empty() {
            return Err(AuthError::Configuration(
                "token secret is empty or unset".to_string(),
            ));
        }

        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            default_ttl,
        })
    }

    #[must_use]
    pub const fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Issue a signed token expiring `ttl` from now.
    ///
    /// # Errors
    /// Propagates signing failures as internal errors.
    pub fn issue(&self, mut claims: AccessClaims, ttl: Duration) -> Result<String, AuthError> {
        claims.exp = Utc::now().timestamp() + i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);

        encode(&Header::new(ALGORITHM), &claims, &self.encoding)
            .map_err(|err| anyhow::Error::new(err).into())
    }

    /// Issue with the configured time-to-live.
    ///
    /// # Errors
    /// Propagates signing failures as internal errors.
    pub fn issue_default(&self, claims: AccessClaims) -> Result<String, AuthError> {
        self.issue(claims, self.default_ttl)
    }

    /// Decode and verify a token, returning its claims unmodified. Expiry is
    /// checked with zero leeway, so a token is valid only strictly before
    /// its `exp`. Looking the subject up in a store is the caller's job.
    ///
    /// # Errors
    /// `TokenExpired` when past expiry; `TokenInvalid` for anything else a
    /// forged, truncated, or claim-less token can produce.
    pub fn validate(&self, token: &str) -> Result<AccessClaims, AuthError> {
        let mut validation = Validation::new(ALGORITHM);
        validation.leeway = 0;

        decode::<AccessClaims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|err| match err.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::TokenInvalid,
            })
    }
}

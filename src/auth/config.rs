//! Token configuration, loaded once at startup and never mutated.

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

pub const DEFAULT_ACCESS_TOKEN_TTL_SECONDS: i64 = 24 * 60 * 60;
pub const DEFAULT_REFRESH_TOKEN_TTL_SECONDS: i64 = 7 * 24 * 60 * 60;

// Upper bound keeps `issued_at + ttl` far away from chrono's representable range.
const MAX_TTL_SECONDS: i64 = 10 * 365 * 24 * 60 * 60;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("access token secret must not be empty")]
    EmptySecret,
    #[error("{0} token TTL must be positive and at most ten years")]
    TtlOutOfRange(&'static str),
    #[error("access token TTL must be shorter than refresh token TTL")]
    TtlOrder,
}

#[derive(Clone, Debug)]
pub struct AuthConfig {
    access_token_secret: SecretString,
    access_token_ttl_seconds: i64,
    refresh_token_ttl_seconds: i64,
    token_issuer: Option<String>,
}

impl AuthConfig {
    #[must_use]
    pub fn new(access_token_secret: SecretString) -> Self {
        Self {
            access_token_secret,
            access_token_ttl_seconds: DEFAULT_ACCESS_TOKEN_TTL_SECONDS,
            refresh_token_ttl_seconds: DEFAULT_REFRESH_TOKEN_TTL_SECONDS,
            token_issuer: None,
        }
    }

    #[must_use]
    pub fn with_access_token_ttl_seconds(mut self, seconds: i64) -> Self {
        self.access_token_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_refresh_token_ttl_seconds(mut self, seconds: i64) -> Self {
        self.refresh_token_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_token_issuer(mut self, issuer: Option<String>) -> Self {
        self.token_issuer = issuer.filter(|value| !value.trim().is_empty());
        self
    }

    /// Check the invariants the token issuer relies on.
    ///
    /// # Errors
    /// Returns an error if the secret is empty or a TTL is out of range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.access_token_secret.expose_secret().is_empty() {
            return Err(ConfigError::EmptySecret);
        }
        if !(1..=MAX_TTL_SECONDS).contains(&self.access_token_ttl_seconds) {
            return Err(ConfigError::TtlOutOfRange("access"));
        }
        if !(1..=MAX_TTL_SECONDS).contains(&self.refresh_token_ttl_seconds) {
            return Err(ConfigError::TtlOutOfRange("refresh"));
        }
        if self.access_token_ttl_seconds >= self.refresh_token_ttl_seconds {
            return Err(ConfigError::TtlOrder);
        }
        Ok(())
    }

    #[must_use]
    pub fn access_token_secret(&self) -> &SecretString {
        &self.access_token_secret
    }

    #[must_use]
    pub fn access_token_ttl_seconds(&self) -> i64 {
        self.access_token_ttl_seconds
    }

    #[must_use]
    pub fn refresh_token_ttl_seconds(&self) -> i64 {
        self.refresh_token_ttl_seconds
    }

    #[must_use]
    pub fn token_issuer(&self) -> Option<&str> {
        self.token_issuer.as_deref()
    }
}

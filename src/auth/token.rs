//! Access token signing/verification and opaque refresh token generation.

use base64ct::{Base64UrlUnpadded, Encoding};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::{rngs::OsRng, RngCore};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::config::{AuthConfig, ConfigError};
use super::error::AuthError;
use crate::directory::Identity;

const REFRESH_TOKEN_BYTES: usize = 32;

/// JWT claims embedded in every access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    /// Subject, the directory user id.
    pub sub: String,
    pub username: String,
    /// Role names as the directory reported them at issuance.
    pub roles: Vec<String>,
    pub iat: i64,
    pub exp: i64,
    /// Unique token id.
    pub jti: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
}

/// A freshly minted token value and its validity window.
#[derive(Clone)]
pub struct IssuedToken {
    pub value: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl fmt::Debug for IssuedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssuedToken")
            .field("value", &"[REDACTED]")
            .field("issued_at", &self.issued_at)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Mints access and refresh tokens with the configured lifetimes.
///
/// The HMAC key lives only here; refresh tokens are random and share nothing
/// with it.
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
    issuer: Option<String>,
}

impl fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .field("issuer", &self.issuer)
            .finish_non_exhaustive()
    }
}

impl TokenIssuer {
    /// # Errors
    /// Returns an error if the configuration is invalid (empty secret, bad TTLs).
    pub fn new(config: &AuthConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let secret = config.access_token_secret().expose_secret().as_bytes();
        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            access_ttl: Duration::seconds(config.access_token_ttl_seconds()),
            refresh_ttl: Duration::seconds(config.refresh_token_ttl_seconds()),
            issuer: config.token_issuer().map(ToString::to_string),
        })
    }

    #[must_use]
    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    #[must_use]
    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    /// Sign an HS256 access token for `identity`.
    ///
    /// # Errors
    /// Returns [`AuthError::SigningFailure`] if the token cannot be encoded.
    pub fn issue_access(&self, identity: &Identity) -> Result<IssuedToken, AuthError> {
        let issued_at = now_whole_seconds();
        let expires_at = issued_at + self.access_ttl;

        let claims = AccessTokenClaims {
            sub: identity.user_id.clone(),
            username: identity.username.clone(),
            roles: identity.roles.clone(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
            jti: Uuid::new_v4().to_string(),
            iss: self.issuer.clone(),
        };

        let value = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(AuthError::SigningFailure)?;

        Ok(IssuedToken {
            value,
            issued_at,
            expires_at,
        })
    }

    /// Generate an opaque refresh token: 32 bytes from the OS RNG, base64url
    /// without padding.
    ///
    /// # Errors
    /// Returns [`AuthError::EntropyFailure`] if the OS RNG is unavailable.
    pub fn issue_refresh(&self) -> Result<IssuedToken, AuthError> {
        let mut bytes = [0u8; REFRESH_TOKEN_BYTES];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(AuthError::EntropyFailure)?;

        let issued_at = now_whole_seconds();
        Ok(IssuedToken {
            value: Base64UrlUnpadded::encode_string(&bytes),
            issued_at,
            expires_at: issued_at + self.refresh_ttl,
        })
    }

    /// Verify signature, expiry and (when configured) issuer of an access token.
    ///
    /// Stateless: no store lookup is involved.
    ///
    /// # Errors
    /// Returns [`AuthError::AccessTokenExpired`] or [`AuthError::AccessTokenInvalid`].
    pub fn verify_access(&self, token: &str) -> Result<AccessTokenClaims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["sub", "exp", "iat"]);
        if let Some(issuer) = &self.issuer {
            validation.set_issuer(&[issuer]);
        }

        jsonwebtoken::decode::<AccessTokenClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|err| match err.kind() {
                ErrorKind::ExpiredSignature => AuthError::AccessTokenExpired,
                _ => AuthError::AccessTokenInvalid(err.to_string()),
            })
    }
}

// JWT timestamps are whole seconds; truncating keeps `expires_at - issued_at`
// exactly equal to the configured TTL on both tokens and stored rows.
fn now_whole_seconds() -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::from_timestamp(now.timestamp(), 0).unwrap_or(now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;
    use std::collections::HashSet;

    fn issuer_with(secret: &str) -> TokenIssuer {
        let config = AuthConfig::new(SecretString::from(secret.to_string()))
            .with_access_token_ttl_seconds(900)
            .with_refresh_token_ttl_seconds(3600);
        TokenIssuer::new(&config).expect("valid config")
    }

    fn alice() -> Identity {
        Identity {
            user_id: "alice-id".into(),
            username: "alice".into(),
            roles: vec!["admin".into(), "user".into()],
        }
    }

    #[test]
    fn access_token_round_trip() {
        let issuer = issuer_with("s3cret");
        let token = issuer.issue_access(&alice()).expect("signed");
        let claims = issuer.verify_access(&token.value).expect("verified");

        assert_eq!(claims.sub, "alice-id");
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.roles, vec!["admin".to_string(), "user".to_string()]);
        assert_eq!(claims.iss, None);
        assert_eq!(claims.exp - claims.iat, 900);
        assert_eq!(claims.iat, token.issued_at.timestamp());
        assert_eq!(claims.exp, token.expires_at.timestamp());
    }

    #[test]
    fn access_token_rejected_under_other_secret() {
        let token = issuer_with("s3cret").issue_access(&alice()).expect("signed");
        let result = issuer_with("another").verify_access(&token.value);
        assert!(matches!(result, Err(AuthError::AccessTokenInvalid(_))));
    }

    #[test]
    fn tampered_access_token_is_rejected() {
        let issuer = issuer_with("s3cret");
        let token = issuer.issue_access(&alice()).expect("signed");
        let tampered = format!("{}x", token.value);
        assert!(issuer.verify_access(&tampered).is_err());
    }

    #[test]
    fn expired_access_token_is_reported_as_expired() {
        let issuer = issuer_with("s3cret");
        let now = Utc::now().timestamp();
        let claims = AccessTokenClaims {
            sub: "alice-id".into(),
            username: "alice".into(),
            roles: Vec::new(),
            iat: now - 120,
            exp: now - 60,
            jti: Uuid::new_v4().to_string(),
            iss: None,
        };
        let token = jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"s3cret"),
        )
        .expect("encode");

        assert!(matches!(
            issuer.verify_access(&token),
            Err(AuthError::AccessTokenExpired)
        ));
    }

    #[test]
    fn issuer_claim_is_enforced_when_configured() {
        let config = AuthConfig::new(SecretString::from("s3cret".to_string()))
            .with_token_issuer(Some("https://auth.example.dev".into()));
        let issuer = TokenIssuer::new(&config).expect("valid config");

        let token = issuer.issue_access(&alice()).expect("signed");
        let claims = issuer.verify_access(&token.value).expect("verified");
        assert_eq!(claims.iss.as_deref(), Some("https://auth.example.dev"));

        // Same secret, no issuer claim.
        let foreign = issuer_with("s3cret").issue_access(&alice()).expect("signed");
        assert!(issuer.verify_access(&foreign.value).is_err());
    }

    #[test]
    fn jti_is_unique() {
        let issuer = issuer_with("s3cret");
        let first = issuer.issue_access(&alice()).expect("signed");
        let second = issuer.issue_access(&alice()).expect("signed");
        let c1 = issuer.verify_access(&first.value).expect("verified");
        let c2 = issuer.verify_access(&second.value).expect("verified");
        assert_ne!(c1.jti, c2.jti);
    }

    #[test]
    fn refresh_token_is_url_safe_and_long() {
        let token = issuer_with("s3cret").issue_refresh().expect("refresh");
        // 32 bytes -> 43 base64url characters, no padding.
        assert_eq!(token.value.len(), 43);
        assert!(token
            .value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        assert_eq!(token.expires_at - token.issued_at, Duration::seconds(3600));
    }

    #[test]
    fn refresh_tokens_do_not_repeat() {
        let issuer = issuer_with("s3cret");
        let values: HashSet<String> = (0..64)
            .map(|_| issuer.issue_refresh().expect("refresh").value)
            .collect();
        assert_eq!(values.len(), 64);
    }

    #[test]
    fn refresh_token_carries_no_claims() {
        let issuer = issuer_with("s3cret");
        let token = issuer.issue_refresh().expect("refresh");
        assert!(!token.value.contains('.'));
        assert!(issuer.verify_access(&token.value).is_err());
    }

    #[test]
    fn debug_output_redacts_token_values() {
        let token = issuer_with("s3cret").issue_refresh().expect("refresh");
        let rendered = format!("{token:?}");
        assert!(!rendered.contains(&token.value));
        assert!(rendered.contains("[REDACTED]"));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = AuthConfig::new(SecretString::from(String::new()));
        assert!(matches!(
            TokenIssuer::new(&config),
            Err(ConfigError::EmptySecret)
        ));
    }
}

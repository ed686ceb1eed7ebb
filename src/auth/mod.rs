//! Token lifecycle core: credential verification, token issuance and the
//! login / rotate / revoke flows.
//!
//! A refresh token lineage moves `Active -> Rotated | Expired | Revoked`, all
//! terminal. `Active -> Rotated` only happens through a committed rotation unit of
//! work. Expiry is checked when a token is read; the purge worker only reclaims
//! storage.

pub mod config;
pub mod credentials;
pub mod error;
pub mod purge;
pub mod service;
pub mod token;

pub use config::{AuthConfig, ConfigError};
pub use credentials::CredentialVerifier;
pub use error::{AuthError, ErrorClass};
pub use service::{AuthService, Authenticator, Tokens};
pub use token::{AccessTokenClaims, IssuedToken, TokenIssuer};

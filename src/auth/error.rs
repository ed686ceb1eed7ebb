//! Authentication error taxonomy.
//!
//! `Display` carries the full detail and is only meant for server-side logs.
//! Callers outside the service see [`AuthError::public_message`], which collapses
//! every credential failure into one message and every refresh token failure into
//! another.

use thiserror::Error;

use crate::directory::DirectoryError;
use crate::store::StoreError;

const INVALID_CREDENTIALS: &str = "invalid credentials";
const INVALID_REFRESH_TOKEN: &str = "invalid refresh token";
const INVALID_ACCESS_TOKEN: &str = "invalid access token";
const COULD_NOT_ISSUE: &str = "could not issue refresh token";
const INTERNAL: &str = "internal error";
const UNAVAILABLE: &str = "service temporarily unavailable";

/// Outcome class of a failed call, used to pick the transport status.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorClass {
    Unauthenticated,
    Unavailable,
    Internal,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredential,

    #[error("refresh token not found")]
    TokenNotFound,

    #[error("refresh token expired")]
    TokenExpired,

    #[error("refresh token owner {0} no longer exists")]
    SubjectNotFound(String),

    #[error("access token expired")]
    AccessTokenExpired,

    #[error("invalid access token: {0}")]
    AccessTokenInvalid(String),

    #[error("failed to sign access token: {0}")]
    SigningFailure(jsonwebtoken::errors::Error),

    #[error("failed to generate refresh token: {0}")]
    EntropyFailure(rand::Error),

    #[error("password hash verification failed: {0}")]
    HashFailure(String),

    #[error("refresh token persistence failed: {0}")]
    PersistenceFailure(StoreError),

    #[error("refresh token storage failed: {0}")]
    StorageFailure(StoreError),

    #[error("identity directory unavailable: {0}")]
    UpstreamUnavailable(DirectoryError),
}

impl AuthError {
    #[must_use]
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::InvalidCredential
            | Self::TokenNotFound
            | Self::TokenExpired
            | Self::SubjectNotFound(_)
            | Self::AccessTokenExpired
            | Self::AccessTokenInvalid(_) => ErrorClass::Unauthenticated,
            Self::UpstreamUnavailable(_) => ErrorClass::Unavailable,
            Self::SigningFailure(_)
            | Self::EntropyFailure(_)
            | Self::HashFailure(_)
            | Self::PersistenceFailure(_)
            | Self::StorageFailure(_) => ErrorClass::Internal,
        }
    }

    /// Message safe to return to the caller.
    #[must_use]
    pub fn public_message(&self) -> &'static str {
        match self {
            Self::InvalidCredential => INVALID_CREDENTIALS,
            Self::TokenNotFound | Self::TokenExpired | Self::SubjectNotFound(_) => {
                INVALID_REFRESH_TOKEN
            }
            Self::AccessTokenExpired | Self::AccessTokenInvalid(_) => INVALID_ACCESS_TOKEN,
            Self::PersistenceFailure(_) => COULD_NOT_ISSUE,
            Self::SigningFailure(_)
            | Self::EntropyFailure(_)
            | Self::HashFailure(_)
            | Self::StorageFailure(_) => INTERNAL,
            Self::UpstreamUnavailable(_) => UNAVAILABLE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refresh_token_failures_share_one_public_message() {
        let errors = [
            AuthError::TokenNotFound,
            AuthError::TokenExpired,
            AuthError::SubjectNotFound("user-1".into()),
        ];
        for err in &errors {
            assert_eq!(err.class(), ErrorClass::Unauthenticated);
            assert_eq!(err.public_message(), "invalid refresh token");
        }
    }

    #[test]
    fn internal_failures_do_not_leak_detail() {
        let err = AuthError::PersistenceFailure(StoreError::DuplicateKey);
        assert_eq!(err.class(), ErrorClass::Internal);
        assert_eq!(err.public_message(), "could not issue refresh token");
        assert!(err.to_string().contains("already exists"));

        let err = AuthError::StorageFailure(StoreError::DuplicateKey);
        assert_eq!(err.class(), ErrorClass::Internal);
        assert_eq!(err.public_message(), "internal error");

        let err = AuthError::HashFailure("invalid argon2 hash: salt".into());
        assert_eq!(err.class(), ErrorClass::Internal);
        assert_eq!(err.public_message(), "internal error");
    }

    #[test]
    fn upstream_failures_are_unavailable() {
        let err = AuthError::UpstreamUnavailable(DirectoryError::Status { status: 502 });
        assert_eq!(err.class(), ErrorClass::Unavailable);
        assert_eq!(err.public_message(), "service temporarily unavailable");
    }
}

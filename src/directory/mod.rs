//! Identity Directory client contract.
//!
//! The directory owns usernames, password hashes and role assignments. This
//! service only reads from it: credentials during login and the current identity
//! of a refresh token owner during rotation.

use secrecy::SecretString;
use std::sync::Arc;
use thiserror::Error;

use crate::BoxFuture;

pub mod http;

pub use http::HttpIdentityDirectory;

/// Identity claims as the directory reports them right now.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    pub username: String,
    pub roles: Vec<String>,
}

/// Stored password hash plus the identity it belongs to.
#[derive(Clone, Debug)]
pub struct Credentials {
    pub password_hash: SecretString,
    pub identity: Identity,
}

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("identity directory request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("identity directory answered with status {status}")]
    Status { status: u16 },

    #[error("invalid identity directory URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("identity directory URL cannot be used as a base")]
    CannotBeABase,
}

/// Read-only view of the Identity Directory.
///
/// Unknown users are `Ok(None)`; `Err` is reserved for the directory being
/// unreachable or misbehaving.
pub trait IdentityDirectory: Send + Sync {
    fn get_credentials<'a>(
        &'a self,
        username: &'a str,
    ) -> BoxFuture<'a, Result<Option<Credentials>, DirectoryError>>;

    fn get_user_by_id<'a>(
        &'a self,
        user_id: &'a str,
    ) -> BoxFuture<'a, Result<Option<Identity>, DirectoryError>>;
}

impl<T: IdentityDirectory + ?Sized> IdentityDirectory for Arc<T> {
    fn get_credentials<'a>(
        &'a self,
        username: &'a str,
    ) -> BoxFuture<'a, Result<Option<Credentials>, DirectoryError>> {
        (**self).get_credentials(username)
    }

    fn get_user_by_id<'a>(
        &'a self,
        user_id: &'a str,
    ) -> BoxFuture<'a, Result<Option<Identity>, DirectoryError>> {
        (**self).get_user_by_id(user_id)
    }
}

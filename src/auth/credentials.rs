//! Password verification against the Identity Directory.
//!
//! Both bcrypt (`$2a$`, `$2b$`, `$2y$`) and Argon2 PHC hashes are accepted.
//! Hash comparison is CPU bound and runs on the blocking pool.

use argon2::{password_hash::Error as PasswordHashError, Argon2, PasswordHash, PasswordVerifier};
use once_cell::sync::Lazy;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, instrument};

use super::error::AuthError;
use crate::directory::{Identity, IdentityDirectory};

/// Work factor the Identity Directory hashes passwords with.
pub const DIRECTORY_BCRYPT_COST: u32 = 10;

// Compared against when the username is unknown so that both failure paths cost
// one hash comparison at the directory's work factor.
static DUMMY_HASH: Lazy<Option<String>> = Lazy::new(|| {
    bcrypt::hash("dummy-password-for-unknown-users", DIRECTORY_BCRYPT_COST).ok()
});

#[derive(Debug)]
pub struct CredentialVerifier<D> {
    directory: D,
}

impl<D: IdentityDirectory> CredentialVerifier<D> {
    #[must_use]
    pub fn new(directory: D) -> Self {
        let _ = Lazy::force(&DUMMY_HASH);
        Self { directory }
    }

    #[must_use]
    pub fn directory(&self) -> &D {
        &self.directory
    }

    /// Resolve `username` and check `password` against the stored hash.
    ///
    /// # Errors
    /// - [`AuthError::InvalidCredential`] for an unknown user or a wrong password.
    /// - [`AuthError::UpstreamUnavailable`] when the directory cannot be reached.
    /// - [`AuthError::HashFailure`] when the stored hash is malformed.
    #[instrument(skip(self, password))]
    pub async fn verify(&self, username: &str, password: &SecretString) -> Result<Identity, AuthError> {
        let credentials = self
            .directory
            .get_credentials(username)
            .await
            .map_err(AuthError::UpstreamUnavailable)?;

        let Some(credentials) = credentials else {
            debug!("unknown username");
            let password = password.clone();
            let _ = tokio::task::spawn_blocking(move || match DUMMY_HASH.as_deref() {
                Some(hash) => verify_password(&password, hash),
                None => Ok(false),
            })
            .await;
            return Err(AuthError::InvalidCredential);
        };

        let hash = credentials.password_hash;
        let password = password.clone();
        let matches = tokio::task::spawn_blocking(move || {
            verify_password(&password, hash.expose_secret())
        })
        .await
        .map_err(|err| AuthError::HashFailure(format!("verification task failed: {err}")))??;

        if !matches {
            debug!("password mismatch");
            return Err(AuthError::InvalidCredential);
        }

        Ok(credentials.identity)
    }
}

/// Compare a plaintext password with a bcrypt or Argon2 hash.
///
/// Returns `Ok(false)` on mismatch and an error only for malformed hashes.
///
/// # Errors
/// Returns [`AuthError::HashFailure`] if the hash cannot be parsed.
pub fn verify_password(password: &SecretString, hash: &str) -> Result<bool, AuthError> {
    let password = password.expose_secret().as_bytes();

    if hash.starts_with("$argon2") {
        let parsed = PasswordHash::new(hash)
            .map_err(|err| AuthError::HashFailure(format!("invalid argon2 hash: {err}")))?;
        return match Argon2::default().verify_password(password, &parsed) {
            Ok(()) => Ok(true),
            Err(PasswordHashError::Password) => Ok(false),
            Err(err) => Err(AuthError::HashFailure(format!("argon2 verify error: {err}"))),
        };
    }

    bcrypt::verify(password, hash)
        .map_err(|err| AuthError::HashFailure(format!("invalid bcrypt hash: {err}")))
}

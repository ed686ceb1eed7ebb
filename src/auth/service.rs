//! Login, refresh token rotation and revocation.

use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::Serialize;
use std::fmt;
use tracing::{debug, error, info, instrument, warn};

use super::config::{AuthConfig, ConfigError};
use super::credentials::CredentialVerifier;
use super::error::{AuthError, ErrorClass};
use super::token::{IssuedToken, TokenIssuer};
use crate::directory::{Identity, IdentityDirectory};
use crate::store::{self, RefreshToken, RefreshTokenStore, StoreError};
use crate::BoxFuture;

/// Token pair handed back to the client.
#[derive(Clone, Serialize)]
pub struct Tokens {
    pub access_token: String,
    pub access_token_expires_at: DateTime<Utc>,
    pub refresh_token: String,
    pub refresh_token_expires_at: DateTime<Utc>,
}

impl Tokens {
    fn new(access: IssuedToken, refresh: IssuedToken) -> Self {
        Self {
            access_token: access.value,
            access_token_expires_at: access.expires_at,
            refresh_token: refresh.value,
            refresh_token_expires_at: refresh.expires_at,
        }
    }
}

impl fmt::Debug for Tokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tokens")
            .field("access_token", &"[REDACTED]")
            .field("access_token_expires_at", &self.access_token_expires_at)
            .field("refresh_token", &"[REDACTED]")
            .field("refresh_token_expires_at", &self.refresh_token_expires_at)
            .finish()
    }
}

/// The public token lifecycle operations.
pub trait Authenticator: Send + Sync {
    /// Verify credentials and issue a fresh token pair.
    fn login<'a>(
        &'a self,
        username: &'a str,
        password: &'a SecretString,
    ) -> BoxFuture<'a, Result<Tokens, AuthError>>;

    /// Exchange a live refresh token for a new pair, consuming it.
    fn rotate_refresh_token<'a>(
        &'a self,
        refresh_token: &'a str,
    ) -> BoxFuture<'a, Result<Tokens, AuthError>>;

    /// Forget a refresh token. Unknown tokens are not an error.
    fn revoke<'a>(&'a self, refresh_token: &'a str) -> BoxFuture<'a, Result<(), AuthError>>;
}

#[derive(Debug)]
pub struct AuthService<D, S> {
    verifier: CredentialVerifier<D>,
    issuer: TokenIssuer,
    store: S,
}

impl<D, S> AuthService<D, S>
where
    D: IdentityDirectory,
    S: RefreshTokenStore,
{
    /// # Errors
    /// Returns an error if the token configuration is invalid.
    pub fn new(config: &AuthConfig, directory: D, store: S) -> Result<Self, ConfigError> {
        Ok(Self {
            verifier: CredentialVerifier::new(directory),
            issuer: TokenIssuer::new(config)?,
            store,
        })
    }

    #[must_use]
    pub fn issuer(&self) -> &TokenIssuer {
        &self.issuer
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    #[must_use]
    pub fn verifier(&self) -> &CredentialVerifier<D> {
        &self.verifier
    }

    fn issue_pair(&self, identity: &Identity) -> Result<(IssuedToken, IssuedToken), AuthError> {
        let access = self.issuer.issue_access(identity)?;
        let refresh = self.issuer.issue_refresh()?;
        Ok((access, refresh))
    }

    #[instrument(skip(self, password))]
    async fn login_flow(&self, username: &str, password: &SecretString) -> Result<Tokens, AuthError> {
        let identity = self.verifier.verify(username, password).await?;
        let (access, refresh) = self.issue_pair(&identity)?;

        let record = RefreshToken::new(
            refresh.value.clone(),
            identity.user_id.clone(),
            refresh.issued_at,
            refresh.expires_at,
        );
        self.store
            .save(&record)
            .await
            .map_err(AuthError::PersistenceFailure)?;

        info!(user_id = %identity.user_id, "login succeeded");
        Ok(Tokens::new(access, refresh))
    }

    #[instrument(skip_all)]
    async fn rotate_flow(&self, refresh_token: &str) -> Result<Tokens, AuthError> {
        let current = match self.store.get(refresh_token).await {
            Ok(current) => current,
            Err(StoreError::NotFound) => return Err(AuthError::TokenNotFound),
            Err(err) => return Err(AuthError::StorageFailure(err)),
        };

        // Checked before the directory is contacted.
        if current.is_expired_at(Utc::now()) {
            return Err(AuthError::TokenExpired);
        }

        let identity = self
            .verifier
            .directory()
            .get_user_by_id(&current.user_id)
            .await
            .map_err(AuthError::UpstreamUnavailable)?
            .ok_or_else(|| AuthError::SubjectNotFound(current.user_id.clone()))?;

        let (access, refresh) = self.issue_pair(&identity)?;
        let successor = RefreshToken::new(
            refresh.value.clone(),
            current.user_id.clone(),
            refresh.issued_at,
            refresh.expires_at,
        );

        match store::rotate(&self.store, refresh_token, &successor).await {
            Ok(()) => {}
            Err(StoreError::NotFound) => {
                warn!(user_id = %current.user_id, "refresh token was rotated concurrently");
                return Err(AuthError::TokenNotFound);
            }
            Err(err) => return Err(AuthError::PersistenceFailure(err)),
        }

        info!(user_id = %current.user_id, "refresh token rotated");
        Ok(Tokens::new(access, refresh))
    }

    #[instrument(skip_all)]
    async fn revoke_flow(&self, refresh_token: &str) -> Result<(), AuthError> {
        match self.store.revoke(refresh_token).await {
            Ok(()) => {
                info!("refresh token revoked");
                Ok(())
            }
            Err(StoreError::NotFound) => {
                debug!("revoke of unknown refresh token");
                Ok(())
            }
            Err(err) => Err(AuthError::StorageFailure(err)),
        }
    }
}

fn log_failure(operation: &'static str, err: &AuthError) {
    match err.class() {
        ErrorClass::Unauthenticated => debug!(operation, "rejected: {err}"),
        ErrorClass::Unavailable => warn!(operation, "upstream failure: {err}"),
        ErrorClass::Internal => error!(operation, "internal failure: {err}"),
    }
}

impl<D, S> Authenticator for AuthService<D, S>
where
    D: IdentityDirectory,
    S: RefreshTokenStore,
{
    fn login<'a>(
        &'a self,
        username: &'a str,
        password: &'a SecretString,
    ) -> BoxFuture<'a, Result<Tokens, AuthError>> {
        Box::pin(async move {
            self.login_flow(username, password)
                .await
                .inspect_err(|err| log_failure("login", err))
        })
    }

    fn rotate_refresh_token<'a>(
        &'a self,
        refresh_token: &'a str,
    ) -> BoxFuture<'a, Result<Tokens, AuthError>> {
        Box::pin(async move {
            self.rotate_flow(refresh_token)
                .await
                .inspect_err(|err| log_failure("rotate", err))
        })
    }

    fn revoke<'a>(&'a self, refresh_token: &'a str) -> BoxFuture<'a, Result<(), AuthError>> {
        Box::pin(async move {
            self.revoke_flow(refresh_token)
                .await
                .inspect_err(|err| log_failure("revoke", err))
        })
    }
}

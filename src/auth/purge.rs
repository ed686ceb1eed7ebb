//! Background reclamation of expired refresh tokens.
//!
//! Expiry is enforced at read time; this worker only keeps the store from
//! growing without bound.

use chrono::Utc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info};

use crate::store::{RefreshTokenStore, StoreError};

/// Delete every refresh token that has expired as of now.
///
/// # Errors
/// Returns the store error if the purge fails.
pub async fn purge_once<S>(store: &S) -> Result<u64, StoreError>
where
    S: RefreshTokenStore + ?Sized,
{
    store.purge_expired(Utc::now()).await
}

/// Spawn a background task that purges expired refresh tokens every `interval`.
pub fn spawn_purge_worker<S>(store: S, interval: Duration) -> tokio::task::JoinHandle<()>
where
    S: RefreshTokenStore + 'static,
{
    tokio::spawn(async move {
        loop {
            sleep(interval).await;

            match purge_once(&store).await {
                Ok(0) => debug!("no expired refresh tokens to purge"),
                Ok(purged) => info!(purged, "purged expired refresh tokens"),
                Err(err) => error!("refresh token purge failed: {err}"),
            }
        }
    })
}

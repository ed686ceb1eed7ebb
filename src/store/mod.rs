//! Refresh token persistence.
//!
//! A refresh token row is a bearer credential: whoever presents the value may
//! rotate it exactly once. Rotation is expressed as delete-then-insert inside a
//! single [`UnitOfWork`], and the delete count is the concurrency guard: only
//! the caller whose delete removed exactly one row may insert the successor.

use chrono::{DateTime, Utc};
use std::{fmt, sync::Arc};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::BoxFuture;

pub mod memory;
pub mod postgres;

pub use memory::MemoryRefreshTokenStore;
pub use postgres::PgRefreshTokenStore;

#[derive(Clone, PartialEq, Eq)]
pub struct RefreshToken {
    pub id: Uuid,
    pub value: String,
    pub user_id: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl RefreshToken {
    #[must_use]
    pub fn new(
        value: String,
        user_id: String,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            value,
            user_id,
            issued_at,
            expires_at,
        }
    }

    /// A token is still usable at exactly `expires_at`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

impl fmt::Debug for RefreshToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshToken")
            .field("id", &self.id)
            .field("value", &"[REDACTED]")
            .field("user_id", &self.user_id)
            .field("issued_at", &self.issued_at)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("refresh token not found")]
    NotFound,

    #[error("refresh token already exists")]
    DuplicateKey,

    #[error("storage backend error: {0}")]
    Backend(#[from] sqlx::Error),
}

/// A transactional scope over the store.
///
/// Dropping a unit without committing discards every change made through it.
pub trait UnitOfWork: Send {
    /// Delete the row holding `value`, returning how many rows were removed.
    fn delete_by_value<'a>(&'a mut self, value: &'a str) -> BoxFuture<'a, Result<u64, StoreError>>;

    fn insert<'a>(&'a mut self, token: &'a RefreshToken) -> BoxFuture<'a, Result<(), StoreError>>;

    fn commit(self: Box<Self>) -> BoxFuture<'static, Result<(), StoreError>>;

    fn rollback(self: Box<Self>) -> BoxFuture<'static, Result<(), StoreError>>;
}

pub trait RefreshTokenStore: Send + Sync {
    fn save<'a>(&'a self, token: &'a RefreshToken) -> BoxFuture<'a, Result<(), StoreError>>;

    /// Look up a token by its value; [`StoreError::NotFound`] when absent.
    fn get<'a>(&'a self, value: &'a str) -> BoxFuture<'a, Result<RefreshToken, StoreError>>;

    fn delete_by_id(&self, id: Uuid) -> BoxFuture<'_, Result<(), StoreError>>;

    /// Remove a token by value; [`StoreError::NotFound`] when absent.
    fn revoke<'a>(&'a self, value: &'a str) -> BoxFuture<'a, Result<(), StoreError>>;

    /// Delete every token whose `expires_at` is before `now`.
    fn purge_expired(&self, now: DateTime<Utc>) -> BoxFuture<'_, Result<u64, StoreError>>;

    /// Cheap liveness probe for health checks.
    fn ping(&self) -> BoxFuture<'_, Result<(), StoreError>>;

    fn begin(&self) -> BoxFuture<'_, Result<Box<dyn UnitOfWork>, StoreError>>;
}

impl<T: RefreshTokenStore + ?Sized> RefreshTokenStore for Arc<T> {
    fn save<'a>(&'a self, token: &'a RefreshToken) -> BoxFuture<'a, Result<(), StoreError>> {
        (**self).save(token)
    }

    fn get<'a>(&'a self, value: &'a str) -> BoxFuture<'a, Result<RefreshToken, StoreError>> {
        (**self).get(value)
    }

    fn delete_by_id(&self, id: Uuid) -> BoxFuture<'_, Result<(), StoreError>> {
        (**self).delete_by_id(id)
    }

    fn revoke<'a>(&'a self, value: &'a str) -> BoxFuture<'a, Result<(), StoreError>> {
        (**self).revoke(value)
    }

    fn purge_expired(&self, now: DateTime<Utc>) -> BoxFuture<'_, Result<u64, StoreError>> {
        (**self).purge_expired(now)
    }

    fn ping(&self) -> BoxFuture<'_, Result<(), StoreError>> {
        (**self).ping()
    }

    fn begin(&self) -> BoxFuture<'_, Result<Box<dyn UnitOfWork>, StoreError>> {
        (**self).begin()
    }
}

/// Atomically replace `old_value` with `successor`.
///
/// Exactly one of any number of concurrent callers presenting the same
/// `old_value` succeeds; the others get [`StoreError::NotFound`] and leave no
/// trace. On any failure the old token survives.
///
/// # Errors
/// Returns [`StoreError::NotFound`] if `old_value` was already gone, or the
/// backend error that aborted the unit of work.
pub async fn rotate<S>(store: &S, old_value: &str, successor: &RefreshToken) -> Result<(), StoreError>
where
    S: RefreshTokenStore + ?Sized,
{
    let mut unit = store.begin().await?;

    let deleted = match unit.delete_by_value(old_value).await {
        Ok(deleted) => deleted,
        Err(err) => {
            discard(unit).await;
            return Err(err);
        }
    };

    if deleted != 1 {
        debug!(deleted, "refresh token already consumed");
        discard(unit).await;
        return Err(StoreError::NotFound);
    }

    if let Err(err) = unit.insert(successor).await {
        discard(unit).await;
        return Err(err);
    }

    unit.commit().await
}

async fn discard(unit: Box<dyn UnitOfWork>) {
    if let Err(err) = unit.rollback().await {
        debug!("rollback failed: {err}");
    }
}

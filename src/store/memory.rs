//! In-process refresh token store, selected with a `memory://` DSN.
//!
//! A unit of work holds the map lock until it commits or is dropped, so units
//! are fully serialized. Changes are applied eagerly and undone from a log when
//! the unit ends without a commit.

use chrono::{DateTime, Utc};
use std::{collections::HashMap, sync::Arc};
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use super::{RefreshToken, RefreshTokenStore, StoreError, UnitOfWork};
use crate::BoxFuture;

type Tokens = HashMap<String, RefreshToken>;

#[derive(Clone, Debug, Default)]
pub struct MemoryRefreshTokenStore {
    tokens: Arc<Mutex<Tokens>>,
}

impl MemoryRefreshTokenStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored tokens, expired ones included.
    pub async fn len(&self) -> usize {
        self.tokens.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tokens.lock().await.is_empty()
    }

    pub async fn tokens_for_user(&self, user_id: &str) -> Vec<RefreshToken> {
        self.tokens
            .lock()
            .await
            .values()
            .filter(|token| token.user_id == user_id)
            .cloned()
            .collect()
    }
}

fn insert_into(tokens: &mut Tokens, token: &RefreshToken) -> Result<(), StoreError> {
    if tokens.contains_key(&token.value) || tokens.values().any(|stored| stored.id == token.id) {
        return Err(StoreError::DuplicateKey);
    }
    tokens.insert(token.value.clone(), token.clone());
    Ok(())
}

impl RefreshTokenStore for MemoryRefreshTokenStore {
    fn save<'a>(&'a self, token: &'a RefreshToken) -> BoxFuture<'a, Result<(), StoreError>> {
        Box::pin(async move {
            let mut tokens = self.tokens.lock().await;
            insert_into(&mut tokens, token)
        })
    }

    fn get<'a>(&'a self, value: &'a str) -> BoxFuture<'a, Result<RefreshToken, StoreError>> {
        Box::pin(async move {
            self.tokens
                .lock()
                .await
                .get(value)
                .cloned()
                .ok_or(StoreError::NotFound)
        })
    }

    fn delete_by_id(&self, id: Uuid) -> BoxFuture<'_, Result<(), StoreError>> {
        Box::pin(async move {
            let mut tokens = self.tokens.lock().await;
            let before = tokens.len();
            tokens.retain(|_, token| token.id != id);
            if tokens.len() == before {
                return Err(StoreError::NotFound);
            }
            Ok(())
        })
    }

    fn revoke<'a>(&'a self, value: &'a str) -> BoxFuture<'a, Result<(), StoreError>> {
        Box::pin(async move {
            self.tokens
                .lock()
                .await
                .remove(value)
                .map(|_| ())
                .ok_or(StoreError::NotFound)
        })
    }

    fn purge_expired(&self, now: DateTime<Utc>) -> BoxFuture<'_, Result<u64, StoreError>> {
        Box::pin(async move {
            let mut tokens = self.tokens.lock().await;
            let before = tokens.len();
            tokens.retain(|_, token| !token.is_expired_at(now));
            Ok((before - tokens.len()) as u64)
        })
    }

    fn ping(&self) -> BoxFuture<'_, Result<(), StoreError>> {
        Box::pin(async { Ok(()) })
    }

    fn begin(&self) -> BoxFuture<'_, Result<Box<dyn UnitOfWork>, StoreError>> {
        Box::pin(async move {
            let guard = Arc::clone(&self.tokens).lock_owned().await;
            Ok(Box::new(MemoryUnit {
                tokens: guard,
                undo: Vec::new(),
            }) as Box<dyn UnitOfWork>)
        })
    }
}

enum Undo {
    Restore(RefreshToken),
    Remove(String),
}

struct MemoryUnit {
    tokens: OwnedMutexGuard<Tokens>,
    undo: Vec<Undo>,
}

impl Drop for MemoryUnit {
    fn drop(&mut self) {
        while let Some(step) = self.undo.pop() {
            match step {
                Undo::Restore(token) => {
                    self.tokens.insert(token.value.clone(), token);
                }
                Undo::Remove(value) => {
                    self.tokens.remove(&value);
                }
            }
        }
    }
}

impl UnitOfWork for MemoryUnit {
    fn delete_by_value<'a>(&'a mut self, value: &'a str) -> BoxFuture<'a, Result<u64, StoreError>> {
        Box::pin(async move {
            match self.tokens.remove(value) {
                Some(token) => {
                    self.undo.push(Undo::Restore(token));
                    Ok(1)
                }
                None => Ok(0),
            }
        })
    }

    fn insert<'a>(&'a mut self, token: &'a RefreshToken) -> BoxFuture<'a, Result<(), StoreError>> {
        Box::pin(async move {
            insert_into(&mut self.tokens, token)?;
            self.undo.push(Undo::Remove(token.value.clone()));
            Ok(())
        })
    }

    fn commit(mut self: Box<Self>) -> BoxFuture<'static, Result<(), StoreError>> {
        self.undo.clear();
        Box::pin(async { Ok(()) })
    }

    fn rollback(self: Box<Self>) -> BoxFuture<'static, Result<(), StoreError>> {
        drop(self);
        Box::pin(async { Ok(()) })
    }
}

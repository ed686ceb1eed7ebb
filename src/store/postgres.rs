//! `PostgreSQL` refresh token store.
//!
//! Token values never reach the database; rows are keyed by the SHA-256 digest
//! of the value. Rotation runs in a `READ COMMITTED` transaction: a concurrent
//! `DELETE` of the same row blocks on the row lock and then sees zero rows.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use sqlx::{postgres::PgRow, Connection, PgPool, Postgres, Row, Transaction};
use tracing::{info_span, Instrument};
use uuid::Uuid;

use super::{RefreshToken, RefreshTokenStore, StoreError, UnitOfWork};
use crate::BoxFuture;

const SCHEMA: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/sql/schema.sql"));

const INSERT: &str = r"
    INSERT INTO refresh_tokens (id, token_hash, user_id, issued_at, expires_at)
    VALUES ($1, $2, $3, $4, $5)
";
const DELETE_BY_HASH: &str = "DELETE FROM refresh_tokens WHERE token_hash = $1";

#[derive(Clone, Debug)]
pub struct PgRefreshTokenStore {
    pool: PgPool,
}

impl PgRefreshTokenStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create the `refresh_tokens` table and its indexes if missing.
    ///
    /// # Errors
    /// Returns an error if the schema cannot be applied.
    pub async fn migrate(&self) -> Result<()> {
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "CREATE",
            db.statement = "sql/schema.sql"
        );
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to apply refresh token schema")?;
        Ok(())
    }
}

/// Digest stored in place of the token value.
pub(crate) fn hash_token(value: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(value.as_bytes());
    hasher.finalize().to_vec()
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

fn map_insert_error(err: sqlx::Error) -> StoreError {
    if is_unique_violation(&err) {
        StoreError::DuplicateKey
    } else {
        StoreError::Backend(err)
    }
}

fn token_from_row(row: &PgRow, value: &str) -> Result<RefreshToken, sqlx::Error> {
    Ok(RefreshToken {
        id: row.try_get("id")?,
        value: value.to_string(),
        user_id: row.try_get("user_id")?,
        issued_at: row.try_get("issued_at")?,
        expires_at: row.try_get("expires_at")?,
    })
}

fn query_span(operation: &'static str, statement: &'static str) -> tracing::Span {
    info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = operation,
        db.statement = statement
    )
}

impl RefreshTokenStore for PgRefreshTokenStore {
    fn save<'a>(&'a self, token: &'a RefreshToken) -> BoxFuture<'a, Result<(), StoreError>> {
        Box::pin(async move {
            sqlx::query(INSERT)
                .bind(token.id)
                .bind(hash_token(&token.value))
                .bind(&token.user_id)
                .bind(token.issued_at)
                .bind(token.expires_at)
                .execute(&self.pool)
                .instrument(query_span("INSERT", INSERT))
                .await
                .map_err(map_insert_error)?;
            Ok(())
        })
    }

    fn get<'a>(&'a self, value: &'a str) -> BoxFuture<'a, Result<RefreshToken, StoreError>> {
        Box::pin(async move {
            let query = r"
                SELECT id, user_id, issued_at, expires_at
                FROM refresh_tokens
                WHERE token_hash = $1
            ";
            let row = sqlx::query(query)
                .bind(hash_token(value))
                .fetch_optional(&self.pool)
                .instrument(query_span("SELECT", query))
                .await?;

            let row = row.ok_or(StoreError::NotFound)?;
            Ok(token_from_row(&row, value)?)
        })
    }

    fn delete_by_id(&self, id: Uuid) -> BoxFuture<'_, Result<(), StoreError>> {
        Box::pin(async move {
            let query = "DELETE FROM refresh_tokens WHERE id = $1";
            let result = sqlx::query(query)
                .bind(id)
                .execute(&self.pool)
                .instrument(query_span("DELETE", query))
                .await?;
            if result.rows_affected() == 0 {
                return Err(StoreError::NotFound);
            }
            Ok(())
        })
    }

    fn revoke<'a>(&'a self, value: &'a str) -> BoxFuture<'a, Result<(), StoreError>> {
        Box::pin(async move {
            let result = sqlx::query(DELETE_BY_HASH)
                .bind(hash_token(value))
                .execute(&self.pool)
                .instrument(query_span("DELETE", DELETE_BY_HASH))
                .await?;
            if result.rows_affected() == 0 {
                return Err(StoreError::NotFound);
            }
            Ok(())
        })
    }

    fn purge_expired(&self, now: DateTime<Utc>) -> BoxFuture<'_, Result<u64, StoreError>> {
        Box::pin(async move {
            let query = "DELETE FROM refresh_tokens WHERE expires_at < $1";
            let result = sqlx::query(query)
                .bind(now)
                .execute(&self.pool)
                .instrument(query_span("DELETE", query))
                .await?;
            Ok(result.rows_affected())
        })
    }

    fn ping(&self) -> BoxFuture<'_, Result<(), StoreError>> {
        Box::pin(async move {
            let mut conn = self.pool.acquire().await?;
            let span = info_span!("db.ping", db.system = "postgresql", db.operation = "PING");
            conn.ping().instrument(span).await?;
            Ok(())
        })
    }

    fn begin(&self) -> BoxFuture<'_, Result<Box<dyn UnitOfWork>, StoreError>> {
        Box::pin(async move {
            let tx = self.pool.begin().await?;
            Ok(Box::new(PgUnit { tx }) as Box<dyn UnitOfWork>)
        })
    }
}

/// Rolls back on drop unless committed.
struct PgUnit {
    tx: Transaction<'static, Postgres>,
}

impl UnitOfWork for PgUnit {
    fn delete_by_value<'a>(&'a mut self, value: &'a str) -> BoxFuture<'a, Result<u64, StoreError>> {
        Box::pin(async move {
            let result = sqlx::query(DELETE_BY_HASH)
                .bind(hash_token(value))
                .execute(&mut *self.tx)
                .instrument(query_span("DELETE", DELETE_BY_HASH))
                .await?;
            Ok(result.rows_affected())
        })
    }

    fn insert<'a>(&'a mut self, token: &'a RefreshToken) -> BoxFuture<'a, Result<(), StoreError>> {
        Box::pin(async move {
            sqlx::query(INSERT)
                .bind(token.id)
                .bind(hash_token(&token.value))
                .bind(&token.user_id)
                .bind(token.issued_at)
                .bind(token.expires_at)
                .execute(&mut *self.tx)
                .instrument(query_span("INSERT", INSERT))
                .await
                .map_err(map_insert_error)?;
            Ok(())
        })
    }

    fn commit(self: Box<Self>) -> BoxFuture<'static, Result<(), StoreError>> {
        Box::pin(async move { Ok(self.tx.commit().await?) })
    }

    fn rollback(self: Box<Self>) -> BoxFuture<'static, Result<(), StoreError>> {
        Box::pin(async move { Ok(self.tx.rollback().await?) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::error::{DatabaseError, ErrorKind};
    use std::{borrow::Cow, error::Error as StdError, fmt};

    #[test]
    fn hash_token_is_stable_sha256() {
        let first = hash_token("token");
        assert_eq!(first.len(), 32);
        assert_eq!(first, hash_token("token"));
        assert_ne!(first, hash_token("other"));
    }

    #[test]
    fn schema_is_idempotent() {
        assert!(SCHEMA.contains("CREATE TABLE IF NOT EXISTS refresh_tokens"));
        assert!(!SCHEMA.contains("CREATE TABLE refresh_tokens"));
        assert!(!SCHEMA.contains("CREATE INDEX refresh"));
    }

    #[derive(Debug)]
    struct TestDbError {
        code: Option<&'static str>,
    }

    impl fmt::Display for TestDbError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "test database error")
        }
    }

    impl StdError for TestDbError {}

    impl DatabaseError for TestDbError {
        fn message(&self) -> &'static str {
            "test database error"
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            self.code.map(Cow::Borrowed)
        }

        fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> ErrorKind {
            ErrorKind::UniqueViolation
        }
    }

    #[test]
    fn unique_violation_maps_to_duplicate_key() {
        let err = sqlx::Error::Database(Box::new(TestDbError {
            code: Some("23505"),
        }));
        assert!(matches!(map_insert_error(err), StoreError::DuplicateKey));

        let err = sqlx::Error::Database(Box::new(TestDbError {
            code: Some("40001"),
        }));
        assert!(matches!(map_insert_error(err), StoreError::Backend(_)));

        assert!(matches!(
            map_insert_error(sqlx::Error::RowNotFound),
            StoreError::Backend(_)
        ));
    }
}

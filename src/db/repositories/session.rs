//! Session repository
//!
//! Database operations for browser sessions.
//!
//! This module provides:
//! - `SessionRepository` trait defining the interface for session data access
//! - `SqlxSessionRepository` implementing the trait for SQLite and MySQL
//!
//! Sessions are keyed by user: storing a session for a user who already has
//! one replaces the old token hash in place.

use crate::db::{Backend, DynDatabasePool};
use crate::models::{Session, User};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

use super::user::{row_to_user_mysql, row_to_user_sqlite};

/// Session repository trait
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Insert the user's session, or replace the token hash of the existing one
    async fn upsert(&self, user_id: i64, token_hash: &str) -> Result<Session>;

    /// Find the user owning the session with this token hash
    async fn get_user_by_token_hash(&self, token_hash: &str) -> Result<Option<User>>;

    /// Delete the session with this token hash (no error if absent)
    async fn delete_by_token_hash(&self, token_hash: &str) -> Result<()>;
}

/// SQLx-based session repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxSessionRepository {
    pool: DynDatabasePool,
}

impl SqlxSessionRepository {
    /// Create a new SQLx session repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn SessionRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl SessionRepository for SqlxSessionRepository {
    async fn upsert(&self, user_id: i64, token_hash: &str) -> Result<Session> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => upsert_session_sqlite(pool, user_id, token_hash).await,
            Backend::Mysql(pool) => upsert_session_mysql(pool, user_id, token_hash).await,
        }
    }

    async fn get_user_by_token_hash(&self, token_hash: &str) -> Result<Option<User>> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => get_user_by_token_hash_sqlite(pool, token_hash).await,
            Backend::Mysql(pool) => get_user_by_token_hash_mysql(pool, token_hash).await,
        }
    }

    async fn delete_by_token_hash(&self, token_hash: &str) -> Result<()> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => {
                sqlx::query("DELETE FROM sessions WHERE token_hash = ?")
                    .bind(token_hash)
                    .execute(pool)
                    .await
                    .context("Failed to delete session")?;
            }
            Backend::Mysql(pool) => {
                sqlx::query("DELETE FROM sessions WHERE token_hash = ?")
                    .bind(token_hash)
                    .execute(pool)
                    .await
                    .context("Failed to delete session")?;
            }
        }
        Ok(())
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn upsert_session_sqlite(
    pool: &SqlitePool,
    user_id: i64,
    token_hash: &str,
) -> Result<Session> {
    let now = Utc::now();
    let row = sqlx::query(
        r#"
        INSERT INTO sessions (user_id, token_hash, created_at)
        VALUES (?, ?, ?)
        ON CONFLICT(user_id) DO UPDATE SET
            token_hash = excluded.token_hash,
            created_at = excluded.created_at
        RETURNING id
        "#,
    )
    .bind(user_id)
    .bind(token_hash)
    .bind(now)
    .fetch_one(pool)
    .await
    .context("Failed to upsert session")?;

    Ok(Session {
        id: row.get("id"),
        user_id,
        token: None,
        token_hash: token_hash.to_string(),
        created_at: now,
    })
}

async fn get_user_by_token_hash_sqlite(
    pool: &SqlitePool,
    token_hash: &str,
) -> Result<Option<User>> {
    let row = sqlx::query(
        r#"
        SELECT users.id, users.email, users.password_hash, users.created_at
        FROM sessions
        JOIN users ON users.id = sessions.user_id
        WHERE sessions.token_hash = ?
        "#,
    )
    .bind(token_hash)
    .fetch_optional(pool)
    .await
    .context("Failed to look up session")?;

    Ok(row.as_ref().map(row_to_user_sqlite))
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn upsert_session_mysql(pool: &MySqlPool, user_id: i64, token_hash: &str) -> Result<Session> {
    let now = Utc::now();
    // LAST_INSERT_ID(id) makes the existing row's id visible on the update path
    let result = sqlx::query(
        r#"
        INSERT INTO sessions (user_id, token_hash, created_at)
        VALUES (?, ?, ?)
        ON DUPLICATE KEY UPDATE
            token_hash = VALUES(token_hash),
            created_at = VALUES(created_at),
            id = LAST_INSERT_ID(id)
        "#,
    )
    .bind(user_id)
    .bind(token_hash)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to upsert session")?;

    Ok(Session {
        id: result.last_insert_id() as i64,
        user_id,
        token: None,
        token_hash: token_hash.to_string(),
        created_at: now,
    })
}

async fn get_user_by_token_hash_mysql(pool: &MySqlPool, token_hash: &str) -> Result<Option<User>> {
    let row = sqlx::query(
        r#"
        SELECT users.id, users.email, users.password_hash, users.created_at
        FROM sessions
        JOIN users ON users.id = sessions.user_id
        WHERE sessions.token_hash = ?
        "#,
    )
    .bind(token_hash)
    .fetch_optional(pool)
    .await
    .context("Failed to look up session")?;

    Ok(row.as_ref().map(row_to_user_mysql))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxUserRepository, UserRepository};
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_repo() -> (SqlxUserRepository, SqlxSessionRepository) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        (
            SqlxUserRepository::new(pool.clone()),
            SqlxSessionRepository::new(pool),
        )
    }

    #[tokio::test]
    async fn test_upsert_and_resolve_session() {
        let (users, repo) = setup_test_repo().await;
        let user = users.create("jo@example.com", "hash").await.unwrap();

        let session = repo.upsert(user.id, "digest-1").await.expect("Failed to upsert");
        assert_eq!(session.user_id, user.id);

        let found = repo
            .get_user_by_token_hash("digest-1")
            .await
            .expect("Failed to look up session")
            .expect("Session not found");
        assert_eq!(found.id, user.id);
    }

    #[tokio::test]
    async fn test_upsert_replaces_previous_session() {
        let (users, repo) = setup_test_repo().await;
        let user = users.create("jo@example.com", "hash").await.unwrap();

        let first = repo.upsert(user.id, "digest-1").await.unwrap();
        let second = repo.upsert(user.id, "digest-2").await.unwrap();

        assert_eq!(first.id, second.id);
        assert!(repo.get_user_by_token_hash("digest-1").await.unwrap().is_none());
        assert!(repo.get_user_by_token_hash("digest-2").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_by_token_hash_is_idempotent() {
        let (users, repo) = setup_test_repo().await;
        let user = users.create("jo@example.com", "hash").await.unwrap();
        repo.upsert(user.id, "digest-1").await.unwrap();

        repo.delete_by_token_hash("digest-1").await.expect("Failed to delete");
        repo.delete_by_token_hash("digest-1").await.expect("Second delete should succeed");

        assert!(repo.get_user_by_token_hash("digest-1").await.unwrap().is_none());
    }
}

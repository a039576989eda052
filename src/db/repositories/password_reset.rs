//! Password reset repository
//!
//! Database operations for pending password resets. Each user has at most
//! one pending reset; requesting another one replaces it.

use crate::db::{Backend, DynDatabasePool};
use crate::models::{PasswordReset, User};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

use super::user::{row_to_user_mysql, row_to_user_sqlite};

/// Password reset repository trait
#[async_trait]
pub trait PasswordResetRepository: Send + Sync {
    /// Store the user's pending reset, replacing any previous one
    async fn upsert(
        &self,
        user_id: i64,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<PasswordReset>;

    /// Find a pending reset and its user by token hash. Expiry is not checked.
    async fn find_by_token_hash(&self, token_hash: &str) -> Result<Option<(PasswordReset, User)>>;

    /// Delete the user's pending reset
    async fn delete_by_user(&self, user_id: i64) -> Result<()>;

    /// Delete every reset that expired before `now`. Returns the number removed.
    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64>;
}

/// SQLx-based password reset repository implementation
pub struct SqlxPasswordResetRepository {
    pool: DynDatabasePool,
}

impl SqlxPasswordResetRepository {
    /// Create a new SQLx password reset repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn PasswordResetRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl PasswordResetRepository for SqlxPasswordResetRepository {
    async fn upsert(
        &self,
        user_id: i64,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<PasswordReset> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => upsert_reset_sqlite(pool, user_id, token_hash, expires_at).await,
            Backend::Mysql(pool) => upsert_reset_mysql(pool, user_id, token_hash, expires_at).await,
        }
    }

    async fn find_by_token_hash(&self, token_hash: &str) -> Result<Option<(PasswordReset, User)>> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => {
                let row = sqlx::query(FIND_BY_TOKEN_HASH_SQL)
                    .bind(token_hash)
                    .fetch_optional(pool)
                    .await
                    .context("Failed to find password reset")?;
                Ok(row.map(|row| (row_to_reset_sqlite(&row), row_to_user_sqlite(&row))))
            }
            Backend::Mysql(pool) => {
                let row = sqlx::query(FIND_BY_TOKEN_HASH_SQL)
                    .bind(token_hash)
                    .fetch_optional(pool)
                    .await
                    .context("Failed to find password reset")?;
                Ok(row.map(|row| (row_to_reset_mysql(&row), row_to_user_mysql(&row))))
            }
        }
    }

    async fn delete_by_user(&self, user_id: i64) -> Result<()> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => {
                sqlx::query("DELETE FROM password_resets WHERE user_id = ?")
                    .bind(user_id)
                    .execute(pool)
                    .await
                    .context("Failed to delete password reset")?;
            }
            Backend::Mysql(pool) => {
                sqlx::query("DELETE FROM password_resets WHERE user_id = ?")
                    .bind(user_id)
                    .execute(pool)
                    .await
                    .context("Failed to delete password reset")?;
            }
        }
        Ok(())
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let result = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query("DELETE FROM password_resets WHERE expires_at < ?")
                .bind(now)
                .execute(pool)
                .await
                .context("Failed to delete expired password resets")?
                .rows_affected(),
            Backend::Mysql(pool) => sqlx::query("DELETE FROM password_resets WHERE expires_at < ?")
                .bind(now)
                .execute(pool)
                .await
                .context("Failed to delete expired password resets")?
                .rows_affected(),
        };
        Ok(result)
    }
}

// The user columns keep their plain names so the user row mappers apply
const FIND_BY_TOKEN_HASH_SQL: &str = r#"
    SELECT password_resets.id AS reset_id, password_resets.token_hash, password_resets.expires_at,
           users.id, users.email, users.password_hash, users.created_at
    FROM password_resets
    JOIN users ON users.id = password_resets.user_id
    WHERE password_resets.token_hash = ?
"#;

// ============================================================================
// SQLite implementations
// ============================================================================

async fn upsert_reset_sqlite(
    pool: &SqlitePool,
    user_id: i64,
    token_hash: &str,
    expires_at: DateTime<Utc>,
) -> Result<PasswordReset> {
    let row = sqlx::query(
        r#"
        INSERT INTO password_resets (user_id, token_hash, expires_at)
        VALUES (?, ?, ?)
        ON CONFLICT(user_id) DO UPDATE SET
            token_hash = excluded.token_hash,
            expires_at = excluded.expires_at
        RETURNING id
        "#,
    )
    .bind(user_id)
    .bind(token_hash)
    .bind(expires_at)
    .fetch_one(pool)
    .await
    .context("Failed to upsert password reset")?;

    Ok(PasswordReset {
        id: row.get("id"),
        user_id,
        token: None,
        token_hash: token_hash.to_string(),
        expires_at,
    })
}

fn row_to_reset_sqlite(row: &sqlx::sqlite::SqliteRow) -> PasswordReset {
    PasswordReset {
        id: row.get("reset_id"),
        user_id: row.get("id"),
        token: None,
        token_hash: row.get("token_hash"),
        expires_at: row.get("expires_at"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn upsert_reset_mysql(
    pool: &MySqlPool,
    user_id: i64,
    token_hash: &str,
    expires_at: DateTime<Utc>,
) -> Result<PasswordReset> {
    let result = sqlx::query(
        r#"
        INSERT INTO password_resets (user_id, token_hash, expires_at)
        VALUES (?, ?, ?)
        ON DUPLICATE KEY UPDATE
            token_hash = VALUES(token_hash),
            expires_at = VALUES(expires_at),
            id = LAST_INSERT_ID(id)
        "#,
    )
    .bind(user_id)
    .bind(token_hash)
    .bind(expires_at)
    .execute(pool)
    .await
    .context("Failed to upsert password reset")?;

    Ok(PasswordReset {
        id: result.last_insert_id() as i64,
        user_id,
        token: None,
        token_hash: token_hash.to_string(),
        expires_at,
    })
}

fn row_to_reset_mysql(row: &sqlx::mysql::MySqlRow) -> PasswordReset {
    PasswordReset {
        id: row.get("reset_id"),
        user_id: row.get("id"),
        token: None,
        token_hash: row.get("token_hash"),
        expires_at: row.get("expires_at"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxUserRepository, UserRepository};
    use crate::db::{create_test_pool, migrations};
    use chrono::Duration;

    async fn setup_test_repo() -> (SqlxUserRepository, SqlxPasswordResetRepository) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        (
            SqlxUserRepository::new(pool.clone()),
            SqlxPasswordResetRepository::new(pool),
        )
    }

    #[tokio::test]
    async fn test_upsert_and_find() {
        let (users, repo) = setup_test_repo().await;
        let user = users.create("jo@example.com", "hash").await.unwrap();
        let expires_at = Utc::now() + Duration::minutes(10);

        let reset = repo.upsert(user.id, "digest", expires_at).await.unwrap();
        assert!(reset.id > 0);

        let (found, owner) = repo
            .find_by_token_hash("digest")
            .await
            .expect("Failed to find reset")
            .expect("Reset not found");
        assert_eq!(found.id, reset.id);
        assert_eq!(found.user_id, user.id);
        assert_eq!(owner.email, "jo@example.com");
        assert!(!found.is_expired());
    }

    #[tokio::test]
    async fn test_second_request_replaces_first() {
        let (users, repo) = setup_test_repo().await;
        let user = users.create("jo@example.com", "hash").await.unwrap();
        let expires_at = Utc::now() + Duration::minutes(10);

        repo.upsert(user.id, "first", expires_at).await.unwrap();
        repo.upsert(user.id, "second", expires_at).await.unwrap();

        assert!(repo.find_by_token_hash("first").await.unwrap().is_none());
        assert!(repo.find_by_token_hash("second").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_by_user() {
        let (users, repo) = setup_test_repo().await;
        let user = users.create("jo@example.com", "hash").await.unwrap();
        repo.upsert(user.id, "digest", Utc::now() + Duration::minutes(10))
            .await
            .unwrap();

        repo.delete_by_user(user.id).await.unwrap();

        assert!(repo.find_by_token_hash("digest").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_expired_keeps_pending() {
        let (users, repo) = setup_test_repo().await;
        let old = users.create("old@example.com", "hash").await.unwrap();
        let fresh = users.create("fresh@example.com", "hash").await.unwrap();
        let now = Utc::now();
        repo.upsert(old.id, "old", now - Duration::minutes(1)).await.unwrap();
        repo.upsert(fresh.id, "fresh", now + Duration::minutes(10)).await.unwrap();

        let removed = repo.delete_expired(now).await.unwrap();

        assert_eq!(removed, 1);
        assert!(repo.find_by_token_hash("old").await.unwrap().is_none());
        assert!(repo.find_by_token_hash("fresh").await.unwrap().is_some());
    }
}

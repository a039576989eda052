//! API token repository
//!
//! Database operations for named bearer tokens. The UUID is stored as its
//! hyphenated text form on both backends.

use crate::db::{Backend, DynDatabasePool};
use crate::models::ApiToken;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;
use uuid::Uuid;

/// API token repository trait
#[async_trait]
pub trait TokenRepository: Send + Sync {
    /// Insert a token
    async fn create(&self, token: &ApiToken) -> Result<()>;

    /// List a user's tokens ordered by name
    async fn list_by_user(&self, user_id: i64) -> Result<Vec<ApiToken>>;

    /// Stamp `last_used` on the token and return its owner, if the token exists
    async fn touch(&self, uuid: Uuid, now: DateTime<Utc>) -> Result<Option<i64>>;

    /// Delete one of the user's tokens. Returns false if the user owns no such token.
    async fn delete(&self, user_id: i64, uuid: Uuid) -> Result<bool>;
}

/// SQLx-based token repository implementation
pub struct SqlxTokenRepository {
    pool: DynDatabasePool,
}

impl SqlxTokenRepository {
    /// Create a new SQLx token repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn TokenRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl TokenRepository for SqlxTokenRepository {
    async fn create(&self, token: &ApiToken) -> Result<()> {
        let sql = r#"
            INSERT INTO tokens (uuid, user_id, name, last_used, created_at)
            VALUES (?, ?, ?, ?, ?)
        "#;
        match self.pool.backend() {
            Backend::Sqlite(pool) => {
                sqlx::query(sql)
                    .bind(token.uuid.to_string())
                    .bind(token.user_id)
                    .bind(&token.name)
                    .bind(token.last_used)
                    .bind(token.created_at)
                    .execute(pool)
                    .await
                    .context("Failed to create token")?;
            }
            Backend::Mysql(pool) => {
                sqlx::query(sql)
                    .bind(token.uuid.to_string())
                    .bind(token.user_id)
                    .bind(&token.name)
                    .bind(token.last_used)
                    .bind(token.created_at)
                    .execute(pool)
                    .await
                    .context("Failed to create token")?;
            }
        }
        Ok(())
    }

    async fn list_by_user(&self, user_id: i64) -> Result<Vec<ApiToken>> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => list_tokens_sqlite(pool, user_id).await,
            Backend::Mysql(pool) => list_tokens_mysql(pool, user_id).await,
        }
    }

    async fn touch(&self, uuid: Uuid, now: DateTime<Utc>) -> Result<Option<i64>> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => touch_token_sqlite(pool, uuid, now).await,
            Backend::Mysql(pool) => touch_token_mysql(pool, uuid, now).await,
        }
    }

    async fn delete(&self, user_id: i64, uuid: Uuid) -> Result<bool> {
        let sql = "DELETE FROM tokens WHERE uuid = ? AND user_id = ?";
        let affected = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(sql)
                .bind(uuid.to_string())
                .bind(user_id)
                .execute(pool)
                .await
                .context("Failed to delete token")?
                .rows_affected(),
            Backend::Mysql(pool) => sqlx::query(sql)
                .bind(uuid.to_string())
                .bind(user_id)
                .execute(pool)
                .await
                .context("Failed to delete token")?
                .rows_affected(),
        };
        Ok(affected > 0)
    }
}

fn parse_uuid(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).with_context(|| format!("Invalid token uuid in database: {}", raw))
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn list_tokens_sqlite(pool: &SqlitePool, user_id: i64) -> Result<Vec<ApiToken>> {
    let rows = sqlx::query(
        r#"
        SELECT uuid, user_id, name, last_used, created_at
        FROM tokens
        WHERE user_id = ?
        ORDER BY name, created_at
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .context("Failed to list tokens")?;

    rows.iter()
        .map(|row| {
            Ok(ApiToken {
                uuid: parse_uuid(row.get("uuid"))?,
                user_id: row.get("user_id"),
                name: row.get("name"),
                last_used: row.get("last_used"),
                created_at: row.get("created_at"),
            })
        })
        .collect()
}

async fn touch_token_sqlite(pool: &SqlitePool, uuid: Uuid, now: DateTime<Utc>) -> Result<Option<i64>> {
    let row = sqlx::query("UPDATE tokens SET last_used = ? WHERE uuid = ? RETURNING user_id")
        .bind(now)
        .bind(uuid.to_string())
        .fetch_optional(pool)
        .await
        .context("Failed to touch token")?;

    Ok(row.map(|row| row.get("user_id")))
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn list_tokens_mysql(pool: &MySqlPool, user_id: i64) -> Result<Vec<ApiToken>> {
    let rows = sqlx::query(
        r#"
        SELECT uuid, user_id, name, last_used, created_at
        FROM tokens
        WHERE user_id = ?
        ORDER BY name, created_at
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .context("Failed to list tokens")?;

    rows.iter()
        .map(|row| {
            Ok(ApiToken {
                uuid: parse_uuid(row.get("uuid"))?,
                user_id: row.get("user_id"),
                name: row.get("name"),
                last_used: row.get("last_used"),
                created_at: row.get("created_at"),
            })
        })
        .collect()
}

async fn touch_token_mysql(pool: &MySqlPool, uuid: Uuid, now: DateTime<Utc>) -> Result<Option<i64>> {
    let uuid = uuid.to_string();
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    sqlx::query("UPDATE tokens SET last_used = ? WHERE uuid = ?")
        .bind(now)
        .bind(&uuid)
        .execute(&mut *tx)
        .await
        .context("Failed to touch token")?;

    let row = sqlx::query("SELECT user_id FROM tokens WHERE uuid = ?")
        .bind(&uuid)
        .fetch_optional(&mut *tx)
        .await
        .context("Failed to read token owner")?;

    tx.commit().await.context("Failed to commit transaction")?;

    Ok(row.map(|row| row.get("user_id")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxUserRepository, UserRepository};
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_repo() -> (SqlxUserRepository, SqlxTokenRepository) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        (
            SqlxUserRepository::new(pool.clone()),
            SqlxTokenRepository::new(pool),
        )
    }

    #[tokio::test]
    async fn test_create_and_list_sorted_by_name() {
        let (users, repo) = setup_test_repo().await;
        let user = users.create("jo@example.com", "hash").await.unwrap();

        repo.create(&ApiToken::new(user.id, "laptop")).await.unwrap();
        repo.create(&ApiToken::new(user.id, "cli")).await.unwrap();

        let tokens = repo.list_by_user(user.id).await.unwrap();
        let names: Vec<&str> = tokens.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["cli", "laptop"]);
        assert!(tokens.iter().all(|t| t.last_used.is_none()));
    }

    #[tokio::test]
    async fn test_touch_sets_last_used() {
        let (users, repo) = setup_test_repo().await;
        let user = users.create("jo@example.com", "hash").await.unwrap();
        let token = ApiToken::new(user.id, "cli");
        repo.create(&token).await.unwrap();

        let owner = repo.touch(token.uuid, Utc::now()).await.unwrap();
        assert_eq!(owner, Some(user.id));

        let tokens = repo.list_by_user(user.id).await.unwrap();
        assert!(tokens[0].last_used.is_some());
    }

    #[tokio::test]
    async fn test_touch_unknown_token() {
        let (_, repo) = setup_test_repo().await;
        assert_eq!(repo.touch(Uuid::new_v4(), Utc::now()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_delete_is_scoped_to_owner() {
        let (users, repo) = setup_test_repo().await;
        let jo = users.create("jo@example.com", "hash").await.unwrap();
        let min = users.create("min@example.com", "hash").await.unwrap();
        let token = ApiToken::new(jo.id, "cli");
        repo.create(&token).await.unwrap();

        assert!(!repo.delete(min.id, token.uuid).await.unwrap());
        assert!(repo.delete(jo.id, token.uuid).await.unwrap());
        assert!(repo.list_by_user(jo.id).await.unwrap().is_empty());
    }
}

//! User repository
//!
//! Database operations for users.
//!
//! This module provides:
//! - `UserRepository` trait defining the interface for user data access
//! - `SqlxUserRepository` implementing the trait for SQLite and MySQL
//!
//! Emails are stored exactly as given; callers normalize them first.

use crate::db::{Backend, DynDatabasePool};
use crate::models::User;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// User repository trait
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a user. Fails with a unique violation if the email is taken.
    async fn create(&self, email: &str, password_hash: &str) -> Result<User>;

    /// Get user by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<User>>;

    /// Get user by email
    async fn get_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Replace a user's password hash. Returns false if no such user exists.
    async fn update_password_hash(&self, id: i64, password_hash: &str) -> Result<bool>;
}

/// SQLx-based user repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxUserRepository {
    pool: DynDatabasePool,
}

impl SqlxUserRepository {
    /// Create a new SQLx user repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn UserRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl UserRepository for SqlxUserRepository {
    async fn create(&self, email: &str, password_hash: &str) -> Result<User> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => create_user_sqlite(pool, email, password_hash).await,
            Backend::Mysql(pool) => create_user_mysql(pool, email, password_hash).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<User>> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => get_user_by_id_sqlite(pool, id).await,
            Backend::Mysql(pool) => get_user_by_id_mysql(pool, id).await,
        }
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => get_user_by_email_sqlite(pool, email).await,
            Backend::Mysql(pool) => get_user_by_email_mysql(pool, email).await,
        }
    }

    async fn update_password_hash(&self, id: i64, password_hash: &str) -> Result<bool> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => update_password_hash_sqlite(pool, id, password_hash).await,
            Backend::Mysql(pool) => update_password_hash_mysql(pool, id, password_hash).await,
        }
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_user_sqlite(pool: &SqlitePool, email: &str, password_hash: &str) -> Result<User> {
    let now = Utc::now();
    let result = sqlx::query(
        r#"
        INSERT INTO users (email, password_hash, created_at)
        VALUES (?, ?, ?)
        "#,
    )
    .bind(email)
    .bind(password_hash)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create user")?;

    Ok(User {
        id: result.last_insert_rowid(),
        email: email.to_string(),
        password_hash: password_hash.to_string(),
        created_at: now,
    })
}

async fn get_user_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<User>> {
    let row = sqlx::query("SELECT id, email, password_hash, created_at FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get user by ID")?;

    Ok(row.as_ref().map(row_to_user_sqlite))
}

async fn get_user_by_email_sqlite(pool: &SqlitePool, email: &str) -> Result<Option<User>> {
    let row = sqlx::query("SELECT id, email, password_hash, created_at FROM users WHERE email = ?")
        .bind(email)
        .fetch_optional(pool)
        .await
        .context("Failed to get user by email")?;

    Ok(row.as_ref().map(row_to_user_sqlite))
}

async fn update_password_hash_sqlite(
    pool: &SqlitePool,
    id: i64,
    password_hash: &str,
) -> Result<bool> {
    let result = sqlx::query("UPDATE users SET password_hash = ? WHERE id = ?")
        .bind(password_hash)
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to update password hash")?;

    Ok(result.rows_affected() > 0)
}

/// Map a SQLite row selected with `id, email, password_hash, created_at`
pub(crate) fn row_to_user_sqlite(row: &sqlx::sqlite::SqliteRow) -> User {
    User {
        id: row.get("id"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        created_at: row.get("created_at"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_user_mysql(pool: &MySqlPool, email: &str, password_hash: &str) -> Result<User> {
    let now = Utc::now();
    let result = sqlx::query(
        r#"
        INSERT INTO users (email, password_hash, created_at)
        VALUES (?, ?, ?)
        "#,
    )
    .bind(email)
    .bind(password_hash)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create user")?;

    Ok(User {
        id: result.last_insert_id() as i64,
        email: email.to_string(),
        password_hash: password_hash.to_string(),
        created_at: now,
    })
}

async fn get_user_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<User>> {
    let row = sqlx::query("SELECT id, email, password_hash, created_at FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get user by ID")?;

    Ok(row.as_ref().map(row_to_user_mysql))
}

async fn get_user_by_email_mysql(pool: &MySqlPool, email: &str) -> Result<Option<User>> {
    let row = sqlx::query("SELECT id, email, password_hash, created_at FROM users WHERE email = ?")
        .bind(email)
        .fetch_optional(pool)
        .await
        .context("Failed to get user by email")?;

    Ok(row.as_ref().map(row_to_user_mysql))
}

async fn update_password_hash_mysql(
    pool: &MySqlPool,
    id: i64,
    password_hash: &str,
) -> Result<bool> {
    let result = sqlx::query("UPDATE users SET password_hash = ? WHERE id = ?")
        .bind(password_hash)
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to update password hash")?;

    Ok(result.rows_affected() > 0)
}

/// Map a MySQL row selected with `id, email, password_hash, created_at`
pub(crate) fn row_to_user_mysql(row: &sqlx::mysql::MySqlRow) -> User {
    User {
        id: row.get("id"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        created_at: row.get("created_at"),
    }
}

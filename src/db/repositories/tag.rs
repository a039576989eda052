//! Tag repository
//!
//! Tags are identified by their unique name and linked to articles through
//! `article_tags`.

use crate::db::{Backend, DynDatabasePool};
use crate::models::Tag;
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySql, MySqlPool, Row, Sqlite, SqlitePool, Transaction};
use std::sync::Arc;

/// Tag repository trait
#[async_trait]
pub trait TagRepository: Send + Sync {
    /// Return the tag with this name, creating it if needed
    async fn get_or_create(&self, name: &str) -> Result<Tag>;

    /// Names of the tags linked to an article, ordered by name
    async fn list_names_for_article(&self, article_id: i64) -> Result<Vec<String>>;

    /// Replace the article's tags with `names`.
    ///
    /// Names are trimmed; blank and repeated names are skipped.
    async fn set_article_tags(&self, article_id: i64, names: &[String]) -> Result<()>;
}

/// SQLx-based tag repository implementation
pub struct SqlxTagRepository {
    pool: DynDatabasePool,
}

impl SqlxTagRepository {
    /// Create a new SQLx tag repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn TagRepository> {
        Arc::new(Self::new(pool))
    }
}

/// Trim names and drop blanks and duplicates, keeping first-seen order
pub fn clean_tag_names(names: &[String]) -> Vec<String> {
    let mut cleaned: Vec<String> = Vec::new();
    for name in names {
        let name = name.trim();
        if !name.is_empty() && !cleaned.iter().any(|n| n == name) {
            cleaned.push(name.to_string());
        }
    }
    cleaned
}

#[async_trait]
impl TagRepository for SqlxTagRepository {
    async fn get_or_create(&self, name: &str) -> Result<Tag> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => {
                let mut tx = pool.begin().await.context("Failed to begin transaction")?;
                let tag = get_or_create_tag_sqlite(&mut tx, name).await?;
                tx.commit().await.context("Failed to commit transaction")?;
                Ok(tag)
            }
            Backend::Mysql(pool) => {
                let mut tx = pool.begin().await.context("Failed to begin transaction")?;
                let tag = get_or_create_tag_mysql(&mut tx, name).await?;
                tx.commit().await.context("Failed to commit transaction")?;
                Ok(tag)
            }
        }
    }

    async fn list_names_for_article(&self, article_id: i64) -> Result<Vec<String>> {
        let sql = r#"
            SELECT t.name
            FROM tags t
            INNER JOIN article_tags atg ON atg.tag_id = t.id
            WHERE atg.article_id = ?
            ORDER BY t.name ASC
        "#;
        match self.pool.backend() {
            Backend::Sqlite(pool) => {
                let rows = sqlx::query(sql)
                    .bind(article_id)
                    .fetch_all(pool)
                    .await
                    .context("Failed to list article tags")?;
                Ok(rows.iter().map(|row| row.get("name")).collect())
            }
            Backend::Mysql(pool) => {
                let rows = sqlx::query(sql)
                    .bind(article_id)
                    .fetch_all(pool)
                    .await
                    .context("Failed to list article tags")?;
                Ok(rows.iter().map(|row| row.get("name")).collect())
            }
        }
    }

    async fn set_article_tags(&self, article_id: i64, names: &[String]) -> Result<()> {
        let names = clean_tag_names(names);
        match self.pool.backend() {
            Backend::Sqlite(pool) => set_article_tags_sqlite(pool, article_id, &names).await,
            Backend::Mysql(pool) => set_article_tags_mysql(pool, article_id, &names).await,
        }
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn get_or_create_tag_sqlite(tx: &mut Transaction<'_, Sqlite>, name: &str) -> Result<Tag> {
    sqlx::query("INSERT OR IGNORE INTO tags (name) VALUES (?)")
        .bind(name)
        .execute(&mut **tx)
        .await
        .context("Failed to insert tag")?;

    let row = sqlx::query("SELECT id, parent_id, name FROM tags WHERE name = ?")
        .bind(name)
        .fetch_one(&mut **tx)
        .await
        .context("Failed to get tag by name")?;

    Ok(Tag {
        id: row.get("id"),
        parent_id: row.get("parent_id"),
        name: row.get("name"),
    })
}

async fn set_article_tags_sqlite(pool: &SqlitePool, article_id: i64, names: &[String]) -> Result<()> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    sqlx::query("DELETE FROM article_tags WHERE article_id = ?")
        .bind(article_id)
        .execute(&mut *tx)
        .await
        .context("Failed to clear article tags")?;

    for name in names {
        let tag = get_or_create_tag_sqlite(&mut tx, name).await?;
        sqlx::query("INSERT OR IGNORE INTO article_tags (article_id, tag_id) VALUES (?, ?)")
            .bind(article_id)
            .bind(tag.id)
            .execute(&mut *tx)
            .await
            .context("Failed to link tag")?;
    }

    tx.commit().await.context("Failed to commit transaction")?;
    Ok(())
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn get_or_create_tag_mysql(tx: &mut Transaction<'_, MySql>, name: &str) -> Result<Tag> {
    sqlx::query("INSERT IGNORE INTO tags (name) VALUES (?)")
        .bind(name)
        .execute(&mut **tx)
        .await
        .context("Failed to insert tag")?;

    let row = sqlx::query("SELECT id, parent_id, name FROM tags WHERE name = ?")
        .bind(name)
        .fetch_one(&mut **tx)
        .await
        .context("Failed to get tag by name")?;

    Ok(Tag {
        id: row.get("id"),
        parent_id: row.get("parent_id"),
        name: row.get("name"),
    })
}

async fn set_article_tags_mysql(pool: &MySqlPool, article_id: i64, names: &[String]) -> Result<()> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    sqlx::query("DELETE FROM article_tags WHERE article_id = ?")
        .bind(article_id)
        .execute(&mut *tx)
        .await
        .context("Failed to clear article tags")?;

    for name in names {
        let tag = get_or_create_tag_mysql(&mut tx, name).await?;
        sqlx::query("INSERT IGNORE INTO article_tags (article_id, tag_id) VALUES (?, ?)")
            .bind(article_id)
            .bind(tag.id)
            .execute(&mut *tx)
            .await
            .context("Failed to link tag")?;
    }

    tx.commit().await.context("Failed to commit transaction")?;
    Ok(())
}

//! Article repository
//!
//! Database operations for article rows. Association collections (tags,
//! vocabulary, grammar) live in their own repositories; rows returned here
//! have them empty.

use crate::db::{Backend, DynDatabasePool};
use crate::models::Article;
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;
use uuid::Uuid;

const ARTICLE_COLUMNS: &str = "id, uuid, slug, headline, content, published, source_url, \
    source_author, source_publication, accessed_at, published_at, created_at, updated_at";

/// Article repository trait
#[async_trait]
pub trait ArticleRepository: Send + Sync {
    /// Insert an article. The `id` of the input is ignored; the stored row is returned.
    async fn create(&self, article: &Article) -> Result<Article>;

    /// Get article by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Article>>;

    /// Get article by slug
    async fn get_by_slug(&self, slug: &str) -> Result<Option<Article>>;

    /// Get article by UUID
    async fn get_by_uuid(&self, uuid: Uuid) -> Result<Option<Article>>;

    /// Overwrite every column of the article with `article.id`.
    /// Returns false if no such article exists.
    async fn update(&self, article: &Article) -> Result<bool>;

    /// Delete an article. Association rows go with it.
    async fn delete(&self, id: i64) -> Result<bool>;

    /// Count all articles
    async fn count(&self) -> Result<i64>;

    /// List articles, newest access first
    async fn list(&self, offset: i64, limit: i64) -> Result<Vec<Article>>;
}

/// SQLx-based article repository implementation
pub struct SqlxArticleRepository {
    pool: DynDatabasePool,
}

impl SqlxArticleRepository {
    /// Create a new SQLx article repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ArticleRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl ArticleRepository for SqlxArticleRepository {
    async fn create(&self, article: &Article) -> Result<Article> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => create_article_sqlite(pool, article).await,
            Backend::Mysql(pool) => create_article_mysql(pool, article).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Article>> {
        let sql = format!("SELECT {} FROM articles WHERE id = ?", ARTICLE_COLUMNS);
        match self.pool.backend() {
            Backend::Sqlite(pool) => {
                let row = sqlx::query(&sql)
                    .bind(id)
                    .fetch_optional(pool)
                    .await
                    .context("Failed to get article by ID")?;
                row.as_ref().map(row_to_article_sqlite).transpose()
            }
            Backend::Mysql(pool) => {
                let row = sqlx::query(&sql)
                    .bind(id)
                    .fetch_optional(pool)
                    .await
                    .context("Failed to get article by ID")?;
                row.as_ref().map(row_to_article_mysql).transpose()
            }
        }
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Article>> {
        let sql = format!("SELECT {} FROM articles WHERE slug = ?", ARTICLE_COLUMNS);
        match self.pool.backend() {
            Backend::Sqlite(pool) => {
                let row = sqlx::query(&sql)
                    .bind(slug)
                    .fetch_optional(pool)
                    .await
                    .context("Failed to get article by slug")?;
                row.as_ref().map(row_to_article_sqlite).transpose()
            }
            Backend::Mysql(pool) => {
                let row = sqlx::query(&sql)
                    .bind(slug)
                    .fetch_optional(pool)
                    .await
                    .context("Failed to get article by slug")?;
                row.as_ref().map(row_to_article_mysql).transpose()
            }
        }
    }

    async fn get_by_uuid(&self, uuid: Uuid) -> Result<Option<Article>> {
        let sql = format!("SELECT {} FROM articles WHERE uuid = ?", ARTICLE_COLUMNS);
        match self.pool.backend() {
            Backend::Sqlite(pool) => {
                let row = sqlx::query(&sql)
                    .bind(uuid.to_string())
                    .fetch_optional(pool)
                    .await
                    .context("Failed to get article by UUID")?;
                row.as_ref().map(row_to_article_sqlite).transpose()
            }
            Backend::Mysql(pool) => {
                let row = sqlx::query(&sql)
                    .bind(uuid.to_string())
                    .fetch_optional(pool)
                    .await
                    .context("Failed to get article by UUID")?;
                row.as_ref().map(row_to_article_mysql).transpose()
            }
        }
    }

    async fn update(&self, article: &Article) -> Result<bool> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => update_article_sqlite(pool, article).await,
            Backend::Mysql(pool) => update_article_mysql(pool, article).await,
        }
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let affected = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query("DELETE FROM articles WHERE id = ?")
                .bind(id)
                .execute(pool)
                .await
                .context("Failed to delete article")?
                .rows_affected(),
            Backend::Mysql(pool) => sqlx::query("DELETE FROM articles WHERE id = ?")
                .bind(id)
                .execute(pool)
                .await
                .context("Failed to delete article")?
                .rows_affected(),
        };
        Ok(affected > 0)
    }

    async fn count(&self) -> Result<i64> {
        let count = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query("SELECT COUNT(*) as count FROM articles")
                .fetch_one(pool)
                .await
                .context("Failed to count articles")?
                .get("count"),
            Backend::Mysql(pool) => sqlx::query("SELECT COUNT(*) as count FROM articles")
                .fetch_one(pool)
                .await
                .context("Failed to count articles")?
                .get("count"),
        };
        Ok(count)
    }

    async fn list(&self, offset: i64, limit: i64) -> Result<Vec<Article>> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => list_articles_sqlite(pool, offset, limit).await,
            Backend::Mysql(pool) => list_articles_mysql(pool, offset, limit).await,
        }
    }
}

fn parse_uuid(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).with_context(|| format!("Invalid article uuid in database: {}", raw))
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_article_sqlite(pool: &SqlitePool, article: &Article) -> Result<Article> {
    let result = sqlx::query(
        r#"
        INSERT INTO articles (uuid, slug, headline, content, published, source_url, source_author,
                              source_publication, accessed_at, published_at, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(article.uuid.to_string())
    .bind(&article.slug)
    .bind(&article.headline)
    .bind(&article.content)
    .bind(article.published)
    .bind(&article.source_url)
    .bind(&article.source_author)
    .bind(&article.source_publication)
    .bind(article.accessed_at)
    .bind(article.published_at)
    .bind(article.created_at)
    .bind(article.updated_at)
    .execute(pool)
    .await
    .context("Failed to create article")?;

    Ok(Article {
        id: result.last_insert_rowid(),
        ..article.clone()
    })
}

async fn update_article_sqlite(pool: &SqlitePool, article: &Article) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE articles
        SET uuid = ?, slug = ?, headline = ?, content = ?, published = ?, source_url = ?,
            source_author = ?, source_publication = ?, accessed_at = ?, published_at = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(article.uuid.to_string())
    .bind(&article.slug)
    .bind(&article.headline)
    .bind(&article.content)
    .bind(article.published)
    .bind(&article.source_url)
    .bind(&article.source_author)
    .bind(&article.source_publication)
    .bind(article.accessed_at)
    .bind(article.published_at)
    .bind(article.updated_at)
    .bind(article.id)
    .execute(pool)
    .await
    .context("Failed to update article")?;

    Ok(result.rows_affected() > 0)
}

async fn list_articles_sqlite(pool: &SqlitePool, offset: i64, limit: i64) -> Result<Vec<Article>> {
    let sql = format!(
        "SELECT {} FROM articles ORDER BY accessed_at DESC, id DESC LIMIT ? OFFSET ?",
        ARTICLE_COLUMNS
    );
    let rows = sqlx::query(&sql)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
        .context("Failed to list articles")?;

    rows.iter().map(row_to_article_sqlite).collect()
}

fn row_to_article_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Article> {
    Ok(Article {
        id: row.get("id"),
        uuid: parse_uuid(row.get("uuid"))?,
        slug: row.get("slug"),
        headline: row.get("headline"),
        content: row.get("content"),
        published: row.get("published"),
        source_url: row.get("source_url"),
        source_author: row.get("source_author"),
        source_publication: row.get("source_publication"),
        accessed_at: row.get("accessed_at"),
        published_at: row.get("published_at"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        tags: Vec::new(),
        vocabulary: Vec::new(),
        grammar: Vec::new(),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_article_mysql(pool: &MySqlPool, article: &Article) -> Result<Article> {
    let result = sqlx::query(
        r#"
        INSERT INTO articles (uuid, slug, headline, content, published, source_url, source_author,
                              source_publication, accessed_at, published_at, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(article.uuid.to_string())
    .bind(&article.slug)
    .bind(&article.headline)
    .bind(&article.content)
    .bind(article.published)
    .bind(&article.source_url)
    .bind(&article.source_author)
    .bind(&article.source_publication)
    .bind(article.accessed_at)
    .bind(article.published_at)
    .bind(article.created_at)
    .bind(article.updated_at)
    .execute(pool)
    .await
    .context("Failed to create article")?;

    Ok(Article {
        id: result.last_insert_id() as i64,
        ..article.clone()
    })
}

async fn update_article_mysql(pool: &MySqlPool, article: &Article) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE articles
        SET uuid = ?, slug = ?, headline = ?, content = ?, published = ?, source_url = ?,
            source_author = ?, source_publication = ?, accessed_at = ?, published_at = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(article.uuid.to_string())
    .bind(&article.slug)
    .bind(&article.headline)
    .bind(&article.content)
    .bind(article.published)
    .bind(&article.source_url)
    .bind(&article.source_author)
    .bind(&article.source_publication)
    .bind(article.accessed_at)
    .bind(article.published_at)
    .bind(article.updated_at)
    .bind(article.id)
    .execute(pool)
    .await
    .context("Failed to update article")?;

    // MySQL reports zero affected rows when nothing changed, so check existence
    if result.rows_affected() > 0 {
        return Ok(true);
    }
    let exists = sqlx::query("SELECT 1 FROM articles WHERE id = ?")
        .bind(article.id)
        .fetch_optional(pool)
        .await
        .context("Failed to check article")?;
    Ok(exists.is_some())
}

async fn list_articles_mysql(pool: &MySqlPool, offset: i64, limit: i64) -> Result<Vec<Article>> {
    let sql = format!(
        "SELECT {} FROM articles ORDER BY accessed_at DESC, id DESC LIMIT ? OFFSET ?",
        ARTICLE_COLUMNS
    );
    let rows = sqlx::query(&sql)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
        .context("Failed to list articles")?;

    rows.iter().map(row_to_article_mysql).collect()
}

fn row_to_article_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Article> {
    Ok(Article {
        id: row.get("id"),
        uuid: parse_uuid(row.get("uuid"))?,
        slug: row.get("slug"),
        headline: row.get("headline"),
        content: row.get("content"),
        published: row.get("published"),
        source_url: row.get("source_url"),
        source_author: row.get("source_author"),
        source_publication: row.get("source_publication"),
        accessed_at: row.get("accessed_at"),
        published_at: row.get("published_at"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        tags: Vec::new(),
        vocabulary: Vec::new(),
        grammar: Vec::new(),
    })
}

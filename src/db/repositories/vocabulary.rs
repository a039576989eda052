//! Vocabulary repository
//!
//! Database operations for vocabulary entries and their links to articles.

use crate::db::{Backend, DynDatabasePool};
use crate::models::{Vocabulary, VocabularyInput};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Vocabulary repository trait
#[async_trait]
pub trait VocabularyRepository: Send + Sync {
    /// Get vocabulary by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Vocabulary>>;

    /// Insert an entry. Fails with a unique violation if the word exists.
    async fn create(&self, input: &VocabularyInput) -> Result<Vocabulary>;

    /// Return the entry for `input.word`, inserting `input` if there is none.
    ///
    /// The insert ignores conflicts, so concurrent callers all end up with the
    /// same row.
    async fn get_or_create(&self, input: &VocabularyInput) -> Result<Vocabulary>;

    /// Replace every column of an entry. Returns false if it does not exist.
    async fn update(&self, id: i64, input: &VocabularyInput) -> Result<bool>;

    /// Delete an entry and its article links
    async fn delete(&self, id: i64) -> Result<bool>;

    /// Count all entries
    async fn count(&self) -> Result<i64>;

    /// List entries, newest first
    async fn list(&self, offset: i64, limit: i64) -> Result<Vec<Vocabulary>>;

    /// Entries linked to an article, ordered by word
    async fn list_for_article(&self, article_id: i64) -> Result<Vec<Vocabulary>>;

    /// Replace the article's links with exactly `vocabulary_ids`
    async fn set_article_vocabulary(&self, article_id: i64, vocabulary_ids: &[i64]) -> Result<()>;
}

/// SQLx-based vocabulary repository implementation
pub struct SqlxVocabularyRepository {
    pool: DynDatabasePool,
}

impl SqlxVocabularyRepository {
    /// Create a new SQLx vocabulary repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn VocabularyRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl VocabularyRepository for SqlxVocabularyRepository {
    async fn get_by_id(&self, id: i64) -> Result<Option<Vocabulary>> {
        let sql = "SELECT id, word, definition, examples, translation_en FROM vocabulary WHERE id = ?";
        match self.pool.backend() {
            Backend::Sqlite(pool) => {
                let row = sqlx::query(sql)
                    .bind(id)
                    .fetch_optional(pool)
                    .await
                    .context("Failed to get vocabulary by ID")?;
                Ok(row.as_ref().map(row_to_vocabulary_sqlite))
            }
            Backend::Mysql(pool) => {
                let row = sqlx::query(sql)
                    .bind(id)
                    .fetch_optional(pool)
                    .await
                    .context("Failed to get vocabulary by ID")?;
                Ok(row.as_ref().map(row_to_vocabulary_mysql))
            }
        }
    }

    async fn create(&self, input: &VocabularyInput) -> Result<Vocabulary> {
        let sql = r#"
            INSERT INTO vocabulary (word, definition, examples, translation_en)
            VALUES (?, ?, ?, ?)
        "#;
        let id = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(sql)
                .bind(&input.word)
                .bind(&input.definition)
                .bind(&input.examples)
                .bind(&input.translation_en)
                .execute(pool)
                .await
                .context("Failed to create vocabulary")?
                .last_insert_rowid(),
            Backend::Mysql(pool) => sqlx::query(sql)
                .bind(&input.word)
                .bind(&input.definition)
                .bind(&input.examples)
                .bind(&input.translation_en)
                .execute(pool)
                .await
                .context("Failed to create vocabulary")?
                .last_insert_id() as i64,
        };

        Ok(Vocabulary {
            id,
            word: input.word.clone(),
            definition: input.definition.clone(),
            examples: input.examples.clone(),
            translation_en: input.translation_en.clone(),
        })
    }

    async fn get_or_create(&self, input: &VocabularyInput) -> Result<Vocabulary> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => get_or_create_vocabulary_sqlite(pool, input).await,
            Backend::Mysql(pool) => get_or_create_vocabulary_mysql(pool, input).await,
        }
    }

    async fn update(&self, id: i64, input: &VocabularyInput) -> Result<bool> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => update_vocabulary_sqlite(pool, id, input).await,
            Backend::Mysql(pool) => update_vocabulary_mysql(pool, id, input).await,
        }
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let affected = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query("DELETE FROM vocabulary WHERE id = ?")
                .bind(id)
                .execute(pool)
                .await
                .context("Failed to delete vocabulary")?
                .rows_affected(),
            Backend::Mysql(pool) => sqlx::query("DELETE FROM vocabulary WHERE id = ?")
                .bind(id)
                .execute(pool)
                .await
                .context("Failed to delete vocabulary")?
                .rows_affected(),
        };
        Ok(affected > 0)
    }

    async fn count(&self) -> Result<i64> {
        let count = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query("SELECT COUNT(*) as count FROM vocabulary")
                .fetch_one(pool)
                .await
                .context("Failed to count vocabulary")?
                .get("count"),
            Backend::Mysql(pool) => sqlx::query("SELECT COUNT(*) as count FROM vocabulary")
                .fetch_one(pool)
                .await
                .context("Failed to count vocabulary")?
                .get("count"),
        };
        Ok(count)
    }

    async fn list(&self, offset: i64, limit: i64) -> Result<Vec<Vocabulary>> {
        let sql = r#"
            SELECT id, word, definition, examples, translation_en
            FROM vocabulary
            ORDER BY id DESC
            LIMIT ? OFFSET ?
        "#;
        match self.pool.backend() {
            Backend::Sqlite(pool) => {
                let rows = sqlx::query(sql)
                    .bind(limit)
                    .bind(offset)
                    .fetch_all(pool)
                    .await
                    .context("Failed to list vocabulary")?;
                Ok(rows.iter().map(row_to_vocabulary_sqlite).collect())
            }
            Backend::Mysql(pool) => {
                let rows = sqlx::query(sql)
                    .bind(limit)
                    .bind(offset)
                    .fetch_all(pool)
                    .await
                    .context("Failed to list vocabulary")?;
                Ok(rows.iter().map(row_to_vocabulary_mysql).collect())
            }
        }
    }

    async fn list_for_article(&self, article_id: i64) -> Result<Vec<Vocabulary>> {
        let sql = r#"
            SELECT v.id, v.word, v.definition, v.examples, v.translation_en
            FROM vocabulary v
            INNER JOIN article_vocabulary av ON av.vocabulary_id = v.id
            WHERE av.article_id = ?
            ORDER BY v.word ASC
        "#;
        match self.pool.backend() {
            Backend::Sqlite(pool) => {
                let rows = sqlx::query(sql)
                    .bind(article_id)
                    .fetch_all(pool)
                    .await
                    .context("Failed to list article vocabulary")?;
                Ok(rows.iter().map(row_to_vocabulary_sqlite).collect())
            }
            Backend::Mysql(pool) => {
                let rows = sqlx::query(sql)
                    .bind(article_id)
                    .fetch_all(pool)
                    .await
                    .context("Failed to list article vocabulary")?;
                Ok(rows.iter().map(row_to_vocabulary_mysql).collect())
            }
        }
    }

    async fn set_article_vocabulary(&self, article_id: i64, vocabulary_ids: &[i64]) -> Result<()> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => set_article_vocabulary_sqlite(pool, article_id, vocabulary_ids).await,
            Backend::Mysql(pool) => set_article_vocabulary_mysql(pool, article_id, vocabulary_ids).await,
        }
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn get_vocabulary_by_word_sqlite(pool: &SqlitePool, word: &str) -> Result<Option<Vocabulary>> {
    let row = sqlx::query(
        "SELECT id, word, definition, examples, translation_en FROM vocabulary WHERE word = ?",
    )
    .bind(word)
    .fetch_optional(pool)
    .await
    .context("Failed to get vocabulary by word")?;

    Ok(row.as_ref().map(row_to_vocabulary_sqlite))
}

async fn get_or_create_vocabulary_sqlite(pool: &SqlitePool, input: &VocabularyInput) -> Result<Vocabulary> {
    if let Some(existing) = get_vocabulary_by_word_sqlite(pool, &input.word).await? {
        return Ok(existing);
    }

    sqlx::query(
        r#"
        INSERT INTO vocabulary (word, definition, examples, translation_en)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(word) DO NOTHING
        "#,
    )
    .bind(&input.word)
    .bind(&input.definition)
    .bind(&input.examples)
    .bind(&input.translation_en)
    .execute(pool)
    .await
    .context("Failed to insert vocabulary")?;

    get_vocabulary_by_word_sqlite(pool, &input.word)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Vocabulary '{}' missing after insert", input.word))
}

async fn update_vocabulary_sqlite(pool: &SqlitePool, id: i64, input: &VocabularyInput) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE vocabulary
        SET word = ?, definition = ?, examples = ?, translation_en = ?
        WHERE id = ?
        "#,
    )
    .bind(&input.word)
    .bind(&input.definition)
    .bind(&input.examples)
    .bind(&input.translation_en)
    .bind(id)
    .execute(pool)
    .await
    .context("Failed to update vocabulary")?;

    Ok(result.rows_affected() > 0)
}

async fn set_article_vocabulary_sqlite(
    pool: &SqlitePool,
    article_id: i64,
    vocabulary_ids: &[i64],
) -> Result<()> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    sqlx::query("DELETE FROM article_vocabulary WHERE article_id = ?")
        .bind(article_id)
        .execute(&mut *tx)
        .await
        .context("Failed to clear article vocabulary")?;

    for vocabulary_id in vocabulary_ids {
        sqlx::query("INSERT OR IGNORE INTO article_vocabulary (article_id, vocabulary_id) VALUES (?, ?)")
            .bind(article_id)
            .bind(vocabulary_id)
            .execute(&mut *tx)
            .await
            .context("Failed to link vocabulary")?;
    }

    tx.commit().await.context("Failed to commit transaction")?;
    Ok(())
}

fn row_to_vocabulary_sqlite(row: &sqlx::sqlite::SqliteRow) -> Vocabulary {
    Vocabulary {
        id: row.get("id"),
        word: row.get("word"),
        definition: row.get("definition"),
        examples: row.get("examples"),
        translation_en: row.get("translation_en"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn get_vocabulary_by_word_mysql(pool: &MySqlPool, word: &str) -> Result<Option<Vocabulary>> {
    let row = sqlx::query(
        "SELECT id, word, definition, examples, translation_en FROM vocabulary WHERE word = ?",
    )
    .bind(word)
    .fetch_optional(pool)
    .await
    .context("Failed to get vocabulary by word")?;

    Ok(row.as_ref().map(row_to_vocabulary_mysql))
}

async fn get_or_create_vocabulary_mysql(pool: &MySqlPool, input: &VocabularyInput) -> Result<Vocabulary> {
    if let Some(existing) = get_vocabulary_by_word_mysql(pool, &input.word).await? {
        return Ok(existing);
    }

    sqlx::query(
        r#"
        INSERT IGNORE INTO vocabulary (word, definition, examples, translation_en)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(&input.word)
    .bind(&input.definition)
    .bind(&input.examples)
    .bind(&input.translation_en)
    .execute(pool)
    .await
    .context("Failed to insert vocabulary")?;

    get_vocabulary_by_word_mysql(pool, &input.word)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Vocabulary '{}' missing after insert", input.word))
}

async fn update_vocabulary_mysql(pool: &MySqlPool, id: i64, input: &VocabularyInput) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE vocabulary
        SET word = ?, definition = ?, examples = ?, translation_en = ?
        WHERE id = ?
        "#,
    )
    .bind(&input.word)
    .bind(&input.definition)
    .bind(&input.examples)
    .bind(&input.translation_en)
    .bind(id)
    .execute(pool)
    .await
    .context("Failed to update vocabulary")?;

    // Unchanged rows count as unaffected on MySQL
    if result.rows_affected() > 0 {
        return Ok(true);
    }
    vocabulary_exists_mysql(pool, id).await
}

async fn vocabulary_exists_mysql(pool: &MySqlPool, id: i64) -> Result<bool> {
    let row = sqlx::query("SELECT 1 FROM vocabulary WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to check vocabulary")?;
    Ok(row.is_some())
}

async fn set_article_vocabulary_mysql(
    pool: &MySqlPool,
    article_id: i64,
    vocabulary_ids: &[i64],
) -> Result<()> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    sqlx::query("DELETE FROM article_vocabulary WHERE article_id = ?")
        .bind(article_id)
        .execute(&mut *tx)
        .await
        .context("Failed to clear article vocabulary")?;

    for vocabulary_id in vocabulary_ids {
        sqlx::query("INSERT IGNORE INTO article_vocabulary (article_id, vocabulary_id) VALUES (?, ?)")
            .bind(article_id)
            .bind(vocabulary_id)
            .execute(&mut *tx)
            .await
            .context("Failed to link vocabulary")?;
    }

    tx.commit().await.context("Failed to commit transaction")?;
    Ok(())
}

fn row_to_vocabulary_mysql(row: &sqlx::mysql::MySqlRow) -> Vocabulary {
    Vocabulary {
        id: row.get("id"),
        word: row.get("word"),
        definition: row.get("definition"),
        examples: row.get("examples"),
        translation_en: row.get("translation_en"),
    }
}

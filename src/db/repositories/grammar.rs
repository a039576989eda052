//! Grammar repository
//!
//! Grammar points and their links to articles. A link carries the sentence
//! from the article that shows the grammar point in use.

use crate::db::{Backend, DynDatabasePool};
use crate::models::{ArticleGrammar, Grammar, GrammarInput};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::Row;
use std::sync::Arc;

/// Grammar repository trait
#[async_trait]
pub trait GrammarRepository: Send + Sync {
    /// Get grammar point by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Grammar>>;

    /// Insert a grammar point
    async fn create(&self, input: &GrammarInput) -> Result<Grammar>;

    /// Grammar points linked to an article, in title order
    async fn list_for_article(&self, article_id: i64) -> Result<Vec<ArticleGrammar>>;

    /// Link a grammar point to an article, replacing the example on an existing link
    async fn attach(&self, article_id: i64, grammar_id: i64, article_example: Option<&str>) -> Result<()>;
}

/// SQLx-based grammar repository implementation
pub struct SqlxGrammarRepository {
    pool: DynDatabasePool,
}

impl SqlxGrammarRepository {
    /// Create a new SQLx grammar repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn GrammarRepository> {
        Arc::new(Self::new(pool))
    }
}

macro_rules! row_to_grammar {
    ($row:expr) => {
        Grammar {
            id: $row.get("id"),
            title: $row.get("title"),
            explanation: $row.get("explanation"),
            explanation_short: $row.get("explanation_short"),
            examples: $row.get("examples"),
            practice: $row.get("practice"),
        }
    };
}

#[async_trait]
impl GrammarRepository for SqlxGrammarRepository {
    async fn get_by_id(&self, id: i64) -> Result<Option<Grammar>> {
        let sql = r#"
            SELECT id, title, explanation, explanation_short, examples, practice
            FROM grammar
            WHERE id = ?
        "#;
        match self.pool.backend() {
            Backend::Sqlite(pool) => {
                let row = sqlx::query(sql)
                    .bind(id)
                    .fetch_optional(pool)
                    .await
                    .context("Failed to get grammar by ID")?;
                Ok(row.map(|row| row_to_grammar!(row)))
            }
            Backend::Mysql(pool) => {
                let row = sqlx::query(sql)
                    .bind(id)
                    .fetch_optional(pool)
                    .await
                    .context("Failed to get grammar by ID")?;
                Ok(row.map(|row| row_to_grammar!(row)))
            }
        }
    }

    async fn create(&self, input: &GrammarInput) -> Result<Grammar> {
        let sql = r#"
            INSERT INTO grammar (title, explanation, explanation_short, examples, practice)
            VALUES (?, ?, ?, ?, ?)
        "#;
        let id = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(sql)
                .bind(&input.title)
                .bind(&input.explanation)
                .bind(&input.explanation_short)
                .bind(&input.examples)
                .bind(&input.practice)
                .execute(pool)
                .await
                .context("Failed to create grammar")?
                .last_insert_rowid(),
            Backend::Mysql(pool) => sqlx::query(sql)
                .bind(&input.title)
                .bind(&input.explanation)
                .bind(&input.explanation_short)
                .bind(&input.examples)
                .bind(&input.practice)
                .execute(pool)
                .await
                .context("Failed to create grammar")?
                .last_insert_id() as i64,
        };

        Ok(Grammar {
            id,
            title: input.title.clone(),
            explanation: input.explanation.clone(),
            explanation_short: input.explanation_short.clone(),
            examples: input.examples.clone(),
            practice: input.practice.clone(),
        })
    }

    async fn list_for_article(&self, article_id: i64) -> Result<Vec<ArticleGrammar>> {
        let sql = r#"
            SELECT g.id, g.title, g.explanation, g.explanation_short, g.examples, g.practice,
                   ag.article_example
            FROM grammar g
            INNER JOIN article_grammar ag ON ag.grammar_id = g.id
            WHERE ag.article_id = ?
            ORDER BY g.title ASC, g.id ASC
        "#;
        match self.pool.backend() {
            Backend::Sqlite(pool) => {
                let rows = sqlx::query(sql)
                    .bind(article_id)
                    .fetch_all(pool)
                    .await
                    .context("Failed to list article grammar")?;
                Ok(rows
                    .iter()
                    .map(|row| ArticleGrammar {
                        grammar: row_to_grammar!(row),
                        article_example: row.get("article_example"),
                    })
                    .collect())
            }
            Backend::Mysql(pool) => {
                let rows = sqlx::query(sql)
                    .bind(article_id)
                    .fetch_all(pool)
                    .await
                    .context("Failed to list article grammar")?;
                Ok(rows
                    .iter()
                    .map(|row| ArticleGrammar {
                        grammar: row_to_grammar!(row),
                        article_example: row.get("article_example"),
                    })
                    .collect())
            }
        }
    }

    async fn attach(&self, article_id: i64, grammar_id: i64, article_example: Option<&str>) -> Result<()> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => {
                sqlx::query(
                    r#"
                    INSERT INTO article_grammar (article_id, grammar_id, article_example)
                    VALUES (?, ?, ?)
                    ON CONFLICT(article_id, grammar_id) DO UPDATE SET
                        article_example = excluded.article_example
                    "#,
                )
                .bind(article_id)
                .bind(grammar_id)
                .bind(article_example)
                .execute(pool)
                .await
                .context("Failed to attach grammar")?;
            }
            Backend::Mysql(pool) => {
                sqlx::query(
                    r#"
                    INSERT INTO article_grammar (article_id, grammar_id, article_example)
                    VALUES (?, ?, ?)
                    ON DUPLICATE KEY UPDATE article_example = VALUES(article_example)
                    "#,
                )
                .bind(article_id)
                .bind(grammar_id)
                .bind(article_example)
                .execute(pool)
                .await
                .context("Failed to attach grammar")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::article::tests::sample_article;
    use crate::db::repositories::{ArticleRepository, SqlxArticleRepository};
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_repo() -> (SqlxArticleRepository, SqlxGrammarRepository) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        (
            SqlxArticleRepository::new(pool.clone()),
            SqlxGrammarRepository::new(pool),
        )
    }

    fn input(title: &str) -> GrammarInput {
        GrammarInput {
            title: title.to_string(),
            explanation_short: Some("short".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let (_, repo) = setup_test_repo().await;

        let created = repo.create(&input("-아/어서")).await.unwrap();
        let found = repo.get_by_id(created.id).await.unwrap().expect("Grammar not found");

        assert_eq!(found.title, "-아/어서");
        assert_eq!(found.explanation_short.as_deref(), Some("short"));
        assert!(found.explanation.is_none());
        assert!(repo.get_by_id(created.id + 1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_attach_upserts_example() {
        let (articles, repo) = setup_test_repo().await;
        let article = articles.create(&sample_article("abc")).await.unwrap();
        let grammar = repo.create(&input("-고 싶다")).await.unwrap();

        repo.attach(article.id, grammar.id, Some("가고 싶어요")).await.unwrap();
        repo.attach(article.id, grammar.id, Some("먹고 싶어요")).await.unwrap();

        let linked = repo.list_for_article(article.id).await.unwrap();
        assert_eq!(linked.len(), 1);
        assert_eq!(linked[0].grammar.id, grammar.id);
        assert_eq!(linked[0].article_example.as_deref(), Some("먹고 싶어요"));
    }
}

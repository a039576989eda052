//! Article service
//!
//! Business logic for articles:
//! - create, read, update and delete with validation
//! - slug and UUID generation
//! - hydration of tags, vocabulary and grammar for reading views
//! - replacing an article's vocabulary list

use crate::db::is_unique_violation;
use crate::db::repositories::{
    ArticleRepository, GrammarRepository, TagRepository, VocabularyRepository,
};
use crate::models::{
    Article, ArticleGrammar, ArticleInput, Grammar, GrammarInput, ListParams, PagedResult,
    Vocabulary,
};
use crate::services::secrets::{random_string, SLUG_BYTES};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

/// Error types for article service operations
#[derive(Debug, thiserror::Error)]
pub enum ArticleServiceError {
    /// Article not found
    #[error("Article not found: {0}")]
    NotFound(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Slug or UUID collides with another article
    #[error("Article already exists: {0}")]
    Duplicate(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Generate a random article slug
pub fn generate_slug() -> anyhow::Result<String> {
    random_string(SLUG_BYTES)
}

/// Article service
pub struct ArticleService {
    repo: Arc<dyn ArticleRepository>,
    tag_repo: Arc<dyn TagRepository>,
    vocabulary_repo: Arc<dyn VocabularyRepository>,
    grammar_repo: Arc<dyn GrammarRepository>,
}

impl ArticleService {
    /// Create a new article service
    pub fn new(
        repo: Arc<dyn ArticleRepository>,
        tag_repo: Arc<dyn TagRepository>,
        vocabulary_repo: Arc<dyn VocabularyRepository>,
        grammar_repo: Arc<dyn GrammarRepository>,
    ) -> Self {
        Self {
            repo,
            tag_repo,
            vocabulary_repo,
            grammar_repo,
        }
    }

    /// Get an article row by ID, without associations
    pub async fn get(&self, id: i64) -> Result<Article, ArticleServiceError> {
        self.repo
            .get_by_id(id)
            .await?
            .ok_or_else(|| ArticleServiceError::NotFound(format!("id {}", id)))
    }

    /// Get an article by slug with tags, vocabulary and grammar
    pub async fn get_by_slug(&self, slug: &str) -> Result<Article, ArticleServiceError> {
        let article = self
            .repo
            .get_by_slug(slug)
            .await?
            .ok_or_else(|| ArticleServiceError::NotFound(format!("slug {}", slug)))?;
        self.hydrate(article).await
    }

    /// Get an article by UUID with tags, vocabulary and grammar
    pub async fn get_by_uuid(&self, uuid: Uuid) -> Result<Article, ArticleServiceError> {
        let article = self
            .repo
            .get_by_uuid(uuid)
            .await?
            .ok_or_else(|| ArticleServiceError::NotFound(format!("uuid {}", uuid)))?;
        self.hydrate(article).await
    }

    /// Fill in the association collections of an article row
    pub async fn hydrate(&self, mut article: Article) -> Result<Article, ArticleServiceError> {
        article.tags = self.tag_repo.list_names_for_article(article.id).await?;
        article.vocabulary = self.vocabulary_repo.list_for_article(article.id).await?;
        article.grammar = self.grammar_repo.list_for_article(article.id).await?;
        Ok(article)
    }

    /// Create an article
    ///
    /// Slug and UUID are generated unless supplied and `accessed_at`
    /// defaults to now. Tags in the input are linked after insert.
    pub async fn create(&self, input: ArticleInput) -> Result<Article, ArticleServiceError> {
        validate_input(&input)?;

        let now = Utc::now();
        let slug = match input.slug {
            Some(slug) => slug.trim().to_string(),
            None => generate_slug()?,
        };
        let article = Article {
            id: 0,
            uuid: input.uuid.unwrap_or_else(Uuid::new_v4),
            slug,
            headline: input.headline.trim().to_string(),
            content: input.content,
            published: input.published,
            source_url: none_if_blank(input.source_url),
            source_author: none_if_blank(input.source_author),
            source_publication: none_if_blank(input.source_publication),
            accessed_at: input.accessed_at.unwrap_or(now),
            published_at: input.published_at,
            created_at: now,
            updated_at: now,
            tags: Vec::new(),
            vocabulary: Vec::new(),
            grammar: Vec::new(),
        };

        let mut created = self.repo.create(&article).await.map_err(map_unique)?;

        if let Some(tags) = input.tags {
            self.tag_repo.set_article_tags(created.id, &tags).await?;
            created.tags = self.tag_repo.list_names_for_article(created.id).await?;
        }

        tracing::info!("Created article {} ({})", created.id, created.slug);
        Ok(created)
    }

    /// Replace an article's columns. Last writer wins.
    ///
    /// Slug and UUID are kept unless the input supplies new ones, and so is
    /// `accessed_at`. Tags are replaced only when the input has a list.
    pub async fn update(&self, id: i64, input: ArticleInput) -> Result<Article, ArticleServiceError> {
        validate_input(&input)?;
        let existing = self.get(id).await?;

        let article = Article {
            id,
            uuid: input.uuid.unwrap_or(existing.uuid),
            slug: input
                .slug
                .map(|s| s.trim().to_string())
                .unwrap_or(existing.slug),
            headline: input.headline.trim().to_string(),
            content: input.content,
            published: input.published,
            source_url: none_if_blank(input.source_url),
            source_author: none_if_blank(input.source_author),
            source_publication: none_if_blank(input.source_publication),
            accessed_at: input.accessed_at.unwrap_or(existing.accessed_at),
            published_at: input.published_at,
            created_at: existing.created_at,
            updated_at: Utc::now(),
            tags: Vec::new(),
            vocabulary: Vec::new(),
            grammar: Vec::new(),
        };

        if !self.repo.update(&article).await.map_err(map_unique)? {
            // Deleted between the read and the write
            return Err(ArticleServiceError::NotFound(format!("id {}", id)));
        }
        if let Some(tags) = input.tags {
            self.tag_repo.set_article_tags(id, &tags).await?;
        }

        let mut updated = article;
        updated.tags = self.tag_repo.list_names_for_article(id).await?;
        Ok(updated)
    }

    /// Delete an article and its association rows
    pub async fn delete(&self, id: i64) -> Result<(), ArticleServiceError> {
        if !self.repo.delete(id).await? {
            return Err(ArticleServiceError::NotFound(format!("id {}", id)));
        }
        tracing::info!("Deleted article {}", id);
        Ok(())
    }

    /// One page of articles, most recently accessed first
    pub async fn list_page(&self, params: &ListParams) -> Result<PagedResult<Article>, ArticleServiceError> {
        let total = self.repo.count().await?;
        let items = self.repo.list(params.offset(), params.limit()).await?;
        Ok(PagedResult::new(items, total, params))
    }

    /// Vocabulary linked to an article, ordered by word
    pub async fn vocabulary(&self, article_id: i64) -> Result<Vec<Vocabulary>, ArticleServiceError> {
        self.get(article_id).await?;
        Ok(self.vocabulary_repo.list_for_article(article_id).await?)
    }

    /// Replace the article's vocabulary with exactly these entries
    pub async fn set_vocabulary(
        &self,
        article_id: i64,
        vocabulary_ids: &[i64],
    ) -> Result<Vec<Vocabulary>, ArticleServiceError> {
        self.get(article_id).await?;

        let mut ids: Vec<i64> = Vec::with_capacity(vocabulary_ids.len());
        for &id in vocabulary_ids {
            if ids.contains(&id) {
                continue;
            }
            if self.vocabulary_repo.get_by_id(id).await?.is_none() {
                return Err(ArticleServiceError::Validation(format!(
                    "Unknown vocabulary id {}",
                    id
                )));
            }
            ids.push(id);
        }

        self.vocabulary_repo
            .set_article_vocabulary(article_id, &ids)
            .await?;
        Ok(self.vocabulary_repo.list_for_article(article_id).await?)
    }

    /// Create a grammar point
    pub async fn create_grammar(&self, input: GrammarInput) -> Result<Grammar, ArticleServiceError> {
        if input.title.trim().is_empty() {
            return Err(ArticleServiceError::Validation(
                "Grammar title is required".to_string(),
            ));
        }
        Ok(self.grammar_repo.create(&input).await?)
    }

    /// Link a grammar point to an article with the sentence that shows it
    pub async fn attach_grammar(
        &self,
        article_id: i64,
        grammar_id: i64,
        article_example: Option<&str>,
    ) -> Result<Vec<ArticleGrammar>, ArticleServiceError> {
        self.get(article_id).await?;
        if self.grammar_repo.get_by_id(grammar_id).await?.is_none() {
            return Err(ArticleServiceError::NotFound(format!("grammar {}", grammar_id)));
        }
        self.grammar_repo
            .attach(article_id, grammar_id, article_example)
            .await?;
        Ok(self.grammar_repo.list_for_article(article_id).await?)
    }
}

fn validate_input(input: &ArticleInput) -> Result<(), ArticleServiceError> {
    if input.headline.trim().is_empty() {
        return Err(ArticleServiceError::Validation(
            "Headline is required".to_string(),
        ));
    }
    if matches!(&input.slug, Some(slug) if slug.trim().is_empty()) {
        return Err(ArticleServiceError::Validation(
            "Slug cannot be blank".to_string(),
        ));
    }
    Ok(())
}

fn none_if_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn map_unique(err: anyhow::Error) -> ArticleServiceError {
    if is_unique_violation(&err) {
        ArticleServiceError::Duplicate("slug or uuid is already in use".to_string())
    } else {
        ArticleServiceError::Internal(err)
    }
}

//! Vocabulary service

use crate::db::is_unique_violation;
use crate::db::repositories::VocabularyRepository;
use crate::models::{ListParams, PagedResult, Vocabulary, VocabularyInput};
use std::sync::Arc;

/// Error types for vocabulary operations
#[derive(Debug, thiserror::Error)]
pub enum VocabularyServiceError {
    #[error("Vocabulary not found: {0}")]
    NotFound(i64),

    #[error("Validation error: {0}")]
    Validation(String),

    /// Another entry already has this word
    #[error("Word already exists: {0}")]
    Duplicate(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Vocabulary service
pub struct VocabularyService {
    repo: Arc<dyn VocabularyRepository>,
}

impl VocabularyService {
    pub fn new(repo: Arc<dyn VocabularyRepository>) -> Self {
        Self { repo }
    }

    pub async fn get(&self, id: i64) -> Result<Vocabulary, VocabularyServiceError> {
        self.repo
            .get_by_id(id)
            .await?
            .ok_or(VocabularyServiceError::NotFound(id))
    }

    pub async fn create(&self, input: VocabularyInput) -> Result<Vocabulary, VocabularyServiceError> {
        let input = clean_input(input)?;
        self.repo.create(&input).await.map_err(|e| {
            if is_unique_violation(&e) {
                VocabularyServiceError::Duplicate(input.word.clone())
            } else {
                VocabularyServiceError::Internal(e)
            }
        })
    }

    /// Look a word up, creating a placeholder entry when it is new
    pub async fn get_or_create(&self, word: &str) -> Result<Vocabulary, VocabularyServiceError> {
        let input = clean_input(VocabularyInput::placeholder(word))?;
        Ok(self.repo.get_or_create(&input).await?)
    }

    pub async fn update(&self, id: i64, input: VocabularyInput) -> Result<Vocabulary, VocabularyServiceError> {
        let input = clean_input(input)?;
        let updated = self.repo.update(id, &input).await.map_err(|e| {
            if is_unique_violation(&e) {
                VocabularyServiceError::Duplicate(input.word.clone())
            } else {
                VocabularyServiceError::Internal(e)
            }
        })?;
        if !updated {
            return Err(VocabularyServiceError::NotFound(id));
        }
        self.get(id).await
    }

    pub async fn delete(&self, id: i64) -> Result<(), VocabularyServiceError> {
        if !self.repo.delete(id).await? {
            return Err(VocabularyServiceError::NotFound(id));
        }
        Ok(())
    }

    /// One page of entries, newest first
    pub async fn list_page(&self, params: &ListParams) -> Result<PagedResult<Vocabulary>, VocabularyServiceError> {
        let total = self.repo.count().await?;
        let items = self.repo.list(params.offset(), params.limit()).await?;
        Ok(PagedResult::new(items, total, params))
    }
}

fn clean_input(mut input: VocabularyInput) -> Result<VocabularyInput, VocabularyServiceError> {
    input.word = input.word.trim().to_string();
    if input.word.is_empty() {
        return Err(VocabularyServiceError::Validation(
            "Word is required".to_string(),
        ));
    }
    Ok(input)
}

//! Article model
//!
//! This module provides:
//! - `Article` entity representing a reading article
//! - `ArticleInput` accepted by create and full-replace updates

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ArticleGrammar, Vocabulary};

/// Article entity
///
/// The association collections (`tags`, `vocabulary`, `grammar`) are only
/// populated by hydrating fetches; plain row fetches leave them empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    /// Unique identifier
    pub id: i64,
    /// Public identifier used by the API
    pub uuid: Uuid,
    /// Short random identifier used in page URLs
    pub slug: String,
    pub headline: String,
    pub content: String,
    pub published: bool,
    /// Where the text was taken from
    pub source_url: Option<String>,
    pub source_author: Option<String>,
    pub source_publication: Option<String>,
    /// When the source was accessed; lists are ordered by this
    pub accessed_at: DateTime<Utc>,
    /// When the source was originally published
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub vocabulary: Vec<Vocabulary>,
    #[serde(default)]
    pub grammar: Vec<ArticleGrammar>,
}

impl Article {
    /// Relative URL of the public reading page
    pub fn path(&self) -> String {
        format!("/a/{}", self.slug)
    }
}

/// Input for creating an article or replacing all of its columns
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArticleInput {
    pub headline: String,
    pub content: String,
    #[serde(default)]
    pub published: bool,
    #[serde(default)]
    pub source_url: Option<String>,
    #[serde(default)]
    pub source_author: Option<String>,
    #[serde(default)]
    pub source_publication: Option<String>,
    /// Defaults to now on create and is kept on update when absent
    #[serde(default)]
    pub accessed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    /// Generated when absent on create, kept when absent on update
    #[serde(default)]
    pub slug: Option<String>,
    /// Generated when absent on create, kept when absent on update
    #[serde(default)]
    pub uuid: Option<Uuid>,
    /// Replaces the article's tags when present
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

impl ArticleInput {
    /// Create input with just the required fields set
    pub fn new(headline: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            headline: headline.into(),
            content: content.into(),
            ..Default::default()
        }
    }
}

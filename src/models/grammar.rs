//! Grammar models

use serde::{Deserialize, Serialize};

/// A grammar point that can be annotated on articles
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Grammar {
    pub id: i64,
    pub title: String,
    pub explanation: Option<String>,
    pub explanation_short: Option<String>,
    pub examples: Option<String>,
    pub practice: Option<String>,
}

/// Input for creating a grammar point
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GrammarInput {
    pub title: String,
    #[serde(default)]
    pub explanation: Option<String>,
    #[serde(default)]
    pub explanation_short: Option<String>,
    #[serde(default)]
    pub examples: Option<String>,
    #[serde(default)]
    pub practice: Option<String>,
}

/// A grammar point as used by one article, with the sentence from that
/// article that demonstrates it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleGrammar {
    #[serde(flatten)]
    pub grammar: Grammar,
    pub article_example: Option<String>,
}

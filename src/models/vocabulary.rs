//! Vocabulary model

use serde::{Deserialize, Serialize};

/// Definition stored for words created on demand before anyone fills them in
pub const VOCABULARY_PLACEHOLDER_DEFINITION: &str = "incomplete: todo call tool";

/// A vocabulary entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vocabulary {
    pub id: i64,
    pub word: String,
    pub definition: Option<String>,
    pub examples: Option<String>,
    pub translation_en: Option<String>,
}

/// Input for creating or replacing a vocabulary entry
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VocabularyInput {
    pub word: String,
    #[serde(default)]
    pub definition: Option<String>,
    #[serde(default)]
    pub examples: Option<String>,
    #[serde(default)]
    pub translation_en: Option<String>,
}

impl VocabularyInput {
    /// Input for a word nobody has described yet
    pub fn placeholder(word: impl Into<String>) -> Self {
        Self {
            word: word.into(),
            definition: Some(VOCABULARY_PLACEHOLDER_DEFINITION.to_string()),
            examples: None,
            translation_en: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nullable_fields_serialize_as_null() {
        let vocab = Vocabulary {
            id: 1,
            word: "대박".to_string(),
            definition: None,
            examples: None,
            translation_en: Some("awesome".to_string()),
        };
        let json = serde_json::to_value(&vocab).unwrap();
        assert!(json["definition"].is_null());
        assert_eq!(json["translation_en"], "awesome");
    }
}

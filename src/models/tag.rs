//! Tag model

use serde::{Deserialize, Serialize};

/// Tag entity. Tags may be nested under a parent tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub parent_id: Option<i64>,
    pub name: String,
}

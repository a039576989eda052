//! API token model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Named bearer credential a user creates from their profile.
///
/// The UUID itself is the secret presented as `Authorization: Bearer <uuid>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiToken {
    pub uuid: Uuid,
    pub user_id: i64,
    pub name: String,
    /// Set every time the token authenticates a request
    pub last_used: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl ApiToken {
    /// Create a new, never used token
    pub fn new(user_id: i64, name: impl Into<String>) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            user_id,
            name: name.into(),
            last_used: None,
            created_at: Utc::now(),
        }
    }
}

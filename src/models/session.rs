//! Session model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Browser session bound to one user.
///
/// Only the digest of the session token is persisted. The plaintext token is
/// present only on the value returned when the session is issued.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Row ID
    pub id: i64,
    /// Associated user ID
    pub user_id: i64,
    /// Plaintext token, only set right after creation
    #[serde(skip)]
    pub token: Option<String>,
    /// SHA-256 digest of the token (base64url)
    #[serde(skip_serializing)]
    pub token_hash: String,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

//! Password reset model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Pending password reset for one user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordReset {
    /// Row ID
    pub id: i64,
    /// User the reset belongs to
    pub user_id: i64,
    /// Plaintext token, only set right after creation
    #[serde(skip)]
    pub token: Option<String>,
    /// SHA-256 digest of the token (base64url)
    #[serde(skip_serializing)]
    pub token_hash: String,
    /// Moment after which the token is rejected
    pub expires_at: DateTime<Utc>,
}

impl PasswordReset {
    /// Check if the reset token has expired
    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }
}

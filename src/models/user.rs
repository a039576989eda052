//! User model
//!
//! Users are identified by a normalized email address and authenticate with
//! a bcrypt password hash.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A registered account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier
    pub id: i64,
    /// Email address (unique, stored normalized)
    pub email: String,
    /// Password hash (bcrypt)
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

/// Lowercase and trim an email address so lookups and the unique index agree
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Jo@Example.COM "), "jo@example.com");
        assert_eq!(normalize_email("a@b.c"), "a@b.c");
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let user = User {
            id: 7,
            email: "jo@example.com".to_string(),
            password_hash: "$2b$12$secret".to_string(),
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["email"], "jo@example.com");
    }
}

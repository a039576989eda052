//! Session service
//!
//! Issues opaque session tokens and maps them back to users. Only the
//! SHA-256 digest of a token is stored, so a leaked table cannot be replayed.

use crate::db::repositories::SessionRepository;
use crate::models::{Session, User};
use crate::services::secrets::{hash_token, random_string, SESSION_TOKEN_BYTES};
use std::sync::Arc;

/// Error types for session service operations
#[derive(Debug, thiserror::Error)]
pub enum SessionServiceError {
    /// No session matches the token
    #[error("Session not found")]
    NotFound,

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Session service
pub struct SessionService {
    session_repo: Arc<dyn SessionRepository>,
}

impl SessionService {
    /// Create a new session service
    pub fn new(session_repo: Arc<dyn SessionRepository>) -> Self {
        Self { session_repo }
    }

    /// Start a session for the user, replacing any session they already had.
    ///
    /// The returned session carries the plaintext token; it is not
    /// recoverable afterwards.
    pub async fn create(&self, user_id: i64) -> Result<Session, SessionServiceError> {
        let token = random_string(SESSION_TOKEN_BYTES)?;
        let mut session = self.session_repo.upsert(user_id, &hash_token(&token)).await?;
        session.token = Some(token);
        Ok(session)
    }

    /// Resolve a session token to its user
    pub async fn user(&self, token: &str) -> Result<User, SessionServiceError> {
        self.session_repo
            .get_user_by_token_hash(&hash_token(token))
            .await?
            .ok_or(SessionServiceError::NotFound)
    }

    /// End the session for this token. Unknown tokens are ignored.
    pub async fn delete(&self, token: &str) -> Result<(), SessionServiceError> {
        self.session_repo.delete_by_token_hash(&hash_token(token)).await?;
        Ok(())
    }
}

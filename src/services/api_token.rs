//! API token service
//!
//! Named bearer tokens a user creates for scripts and tools. Unlike
//! sessions, a user may hold many tokens at once.

use crate::db::repositories::TokenRepository;
use crate::models::ApiToken;
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

/// Longest accepted token name, in characters
pub const MAX_TOKEN_NAME_LENGTH: usize = 255;

/// Error types for API token operations
#[derive(Debug, thiserror::Error)]
pub enum ApiTokenServiceError {
    #[error("Validation error: {0}")]
    Validation(String),

    /// Unknown token, or a token the caller does not own
    #[error("Token not found")]
    NotFound,

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// API token service
pub struct ApiTokenService {
    token_repo: Arc<dyn TokenRepository>,
}

impl ApiTokenService {
    pub fn new(token_repo: Arc<dyn TokenRepository>) -> Self {
        Self { token_repo }
    }

    /// The user's tokens, ordered by name
    pub async fn list(&self, user_id: i64) -> Result<Vec<ApiToken>, ApiTokenServiceError> {
        Ok(self.token_repo.list_by_user(user_id).await?)
    }

    /// Create a named token for the user
    pub async fn create(&self, user_id: i64, name: &str) -> Result<ApiToken, ApiTokenServiceError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ApiTokenServiceError::Validation(
                "Token name is required".to_string(),
            ));
        }
        if name.chars().count() > MAX_TOKEN_NAME_LENGTH {
            return Err(ApiTokenServiceError::Validation(format!(
                "Token name must be at most {} characters",
                MAX_TOKEN_NAME_LENGTH
            )));
        }

        let token = ApiToken::new(user_id, name);
        self.token_repo.create(&token).await?;
        Ok(token)
    }

    /// Resolve a presented token to its owner's user ID, recording the use
    pub async fn resolve(&self, uuid: Uuid) -> Result<i64, ApiTokenServiceError> {
        self.token_repo
            .touch(uuid, Utc::now())
            .await?
            .ok_or(ApiTokenServiceError::NotFound)
    }

    /// Delete one of the user's tokens
    pub async fn delete(&self, user_id: i64, uuid: Uuid) -> Result<(), ApiTokenServiceError> {
        if !self.token_repo.delete(user_id, uuid).await? {
            return Err(ApiTokenServiceError::NotFound);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxTokenRepository, SqlxUserRepository, UserRepository};
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_service() -> (Arc<dyn UserRepository>, ApiTokenService) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        (
            SqlxUserRepository::boxed(pool.clone()),
            ApiTokenService::new(SqlxTokenRepository::boxed(pool)),
        )
    }

    #[tokio::test]
    async fn test_create_and_resolve() {
        let (users, service) = setup_test_service().await;
        let user = users.create("jo@example.com", "hash").await.unwrap();

        let token = service.create(user.id, "  laptop ").await.unwrap();
        assert_eq!(token.name, "laptop");
        assert!(token.last_used.is_none());

        assert_eq!(service.resolve(token.uuid).await.unwrap(), user.id);
        let listed = service.list(user.id).await.unwrap();
        assert!(listed[0].last_used.is_some());
    }

    #[tokio::test]
    async fn test_blank_name_rejected() {
        let (users, service) = setup_test_service().await;
        let user = users.create("jo@example.com", "hash").await.unwrap();

        assert!(matches!(
            service.create(user.id, "   ").await,
            Err(ApiTokenServiceError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_resolve_unknown() {
        let (_, service) = setup_test_service().await;
        assert!(matches!(
            service.resolve(Uuid::new_v4()).await,
            Err(ApiTokenServiceError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_delete_by_non_owner_has_no_effect() {
        let (users, service) = setup_test_service().await;
        let owner = users.create("jo@example.com", "hash").await.unwrap();
        let other = users.create("min@example.com", "hash").await.unwrap();
        let token = service.create(owner.id, "cli").await.unwrap();

        assert!(matches!(
            service.delete(other.id, token.uuid).await,
            Err(ApiTokenServiceError::NotFound)
        ));
        assert_eq!(service.resolve(token.uuid).await.unwrap(), owner.id);

        service.delete(owner.id, token.uuid).await.unwrap();
        assert!(service.resolve(token.uuid).await.is_err());
    }
}

//! User service
//!
//! Registration, credential checks and password changes. Emails are
//! normalized (trimmed, lowercased) before every lookup and insert.

use crate::db::is_unique_violation;
use crate::db::repositories::UserRepository;
use crate::models::{normalize_email, User};
use crate::services::password::{hash_password, is_password_acceptable, verify_password};
use anyhow::Context;
use std::sync::Arc;

/// Error types for user service operations
#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    /// The email is already registered
    #[error("Email is already taken")]
    EmailTaken,

    /// Password too short
    #[error("Password must be at least 8 characters")]
    PasswordInsecure,

    /// Unknown email or wrong password; the two are never distinguished
    #[error("Invalid email or password")]
    InvalidAuth,

    /// Malformed input
    #[error("Validation error: {0}")]
    Validation(String),

    /// No user with the given ID
    #[error("User not found")]
    NotFound,

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// User service for accounts and password credentials
pub struct UserService {
    user_repo: Arc<dyn UserRepository>,
    bcrypt_cost: u32,
}

impl UserService {
    /// Create a new user service hashing at the given bcrypt cost
    pub fn new(user_repo: Arc<dyn UserRepository>, bcrypt_cost: u32) -> Self {
        Self {
            user_repo,
            bcrypt_cost,
        }
    }

    /// Register a new user
    ///
    /// # Errors
    ///
    /// - `Validation` if the email has no `@`
    /// - `PasswordInsecure` if the password is shorter than 8 characters
    /// - `EmailTaken` if the normalized email is already registered
    pub async fn create_user(&self, email: &str, password: &str) -> Result<User, UserServiceError> {
        let email = normalize_email(email);
        if !email.contains('@') {
            return Err(UserServiceError::Validation(
                "A valid email address is required".to_string(),
            ));
        }
        if !is_password_acceptable(password) {
            return Err(UserServiceError::PasswordInsecure);
        }

        let password_hash = self.hash(password).await?;

        match self.user_repo.create(&email, &password_hash).await {
            Ok(user) => Ok(user),
            Err(e) if is_unique_violation(&e) => Err(UserServiceError::EmailTaken),
            Err(e) => Err(UserServiceError::Internal(e)),
        }
    }

    /// Check an email and password pair and return the matching user
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<User, UserServiceError> {
        let email = normalize_email(email);
        let user = self
            .user_repo
            .get_by_email(&email)
            .await?
            .ok_or(UserServiceError::InvalidAuth)?;

        let hash = user.password_hash.clone();
        let password = password.to_string();
        let valid = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
            .await
            .context("Password verification task failed")??;

        if !valid {
            return Err(UserServiceError::InvalidAuth);
        }
        Ok(user)
    }

    /// Set a new password for a user
    pub async fn update_password(&self, user_id: i64, password: &str) -> Result<(), UserServiceError> {
        if !is_password_acceptable(password) {
            return Err(UserServiceError::PasswordInsecure);
        }
        let password_hash = self.hash(password).await?;
        if !self.user_repo.update_password_hash(user_id, &password_hash).await? {
            return Err(UserServiceError::NotFound);
        }
        Ok(())
    }

    /// Get user by ID
    pub async fn get_by_id(&self, id: i64) -> Result<User, UserServiceError> {
        self.user_repo
            .get_by_id(id)
            .await?
            .ok_or(UserServiceError::NotFound)
    }

    /// Get user by email, normalizing it first
    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>, UserServiceError> {
        Ok(self.user_repo.get_by_email(&normalize_email(email)).await?)
    }

    // bcrypt is CPU bound; keep it off the async workers
    async fn hash(&self, password: &str) -> Result<String, UserServiceError> {
        let password = password.to_string();
        let cost = self.bcrypt_cost;
        let hash = tokio::task::spawn_blocking(move || hash_password(&password, cost))
            .await
            .context("Password hashing task failed")??;
        Ok(hash)
    }
}

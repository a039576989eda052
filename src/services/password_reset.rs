//! Password reset service
//!
//! A reset is a short random token mailed (here: logged) to the user. The
//! token stays redeemable until [`PasswordResetService::complete`] removes it,
//! which callers do only after the new password is stored.

use crate::db::repositories::{PasswordResetRepository, UserRepository};
use crate::models::{normalize_email, PasswordReset, User};
use crate::services::secrets::{hash_token, random_string, RESET_TOKEN_BYTES};
use anyhow::anyhow;
use chrono::{Duration, Utc};
use std::sync::Arc;

/// Default lifetime of a reset token
pub const DEFAULT_RESET_MINUTES: i64 = 10;

/// Error types for password reset operations
#[derive(Debug, thiserror::Error)]
pub enum PasswordResetError {
    /// No user has this email
    #[error("No user with that email")]
    UnknownEmail,

    /// The token does not match a pending reset
    #[error("Password reset token is invalid")]
    TokenInvalid,

    /// The token matched but is past its expiry
    #[error("Password reset token has expired")]
    TokenExpired,

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Password reset service
pub struct PasswordResetService {
    reset_repo: Arc<dyn PasswordResetRepository>,
    user_repo: Arc<dyn UserRepository>,
    duration: Duration,
}

impl PasswordResetService {
    /// Create a new password reset service with the given token lifetime
    pub fn new(
        reset_repo: Arc<dyn PasswordResetRepository>,
        user_repo: Arc<dyn UserRepository>,
        duration: Duration,
    ) -> Self {
        Self {
            reset_repo,
            user_repo,
            duration,
        }
    }

    /// Start a reset for the user with this email.
    ///
    /// The returned reset carries the plaintext token. Any earlier pending
    /// reset for the same user stops working.
    pub async fn create(&self, email: &str) -> Result<PasswordReset, PasswordResetError> {
        let user = self
            .user_repo
            .get_by_email(&normalize_email(email))
            .await?
            .ok_or(PasswordResetError::UnknownEmail)?;

        let token = random_string(RESET_TOKEN_BYTES)?;
        let expires_at = Utc::now()
            .checked_add_signed(self.duration)
            .ok_or_else(|| anyhow!("Reset expiry overflows: {:?}", self.duration))?;
        let mut reset = self
            .reset_repo
            .upsert(user.id, &hash_token(&token), expires_at)
            .await?;
        reset.token = Some(token);
        Ok(reset)
    }

    /// Check a reset token and return the user it was issued to.
    ///
    /// The reset stays pending; call [`Self::complete`] once the password has
    /// been changed.
    pub async fn verify(&self, token: &str) -> Result<User, PasswordResetError> {
        let (reset, user) = self
            .reset_repo
            .find_by_token_hash(&hash_token(token))
            .await?
            .ok_or(PasswordResetError::TokenInvalid)?;

        if reset.is_expired() {
            return Err(PasswordResetError::TokenExpired);
        }
        Ok(user)
    }

    /// Spend the user's pending reset so its token cannot be used again
    pub async fn complete(&self, user_id: i64) -> Result<(), PasswordResetError> {
        self.reset_repo.delete_by_user(user_id).await?;
        Ok(())
    }

    /// Remove resets that can no longer be redeemed. Returns how many were removed.
    pub async fn purge_expired(&self) -> Result<u64, PasswordResetError> {
        Ok(self.reset_repo.delete_expired(Utc::now()).await?)
    }
}

//! Password hashing module
//!
//! Passwords are stored as bcrypt hashes. The work factor is supplied by the
//! caller (see `security.bcrypt_cost`) so tests can run at the minimum cost.

use anyhow::{Context, Result};

/// Minimum accepted password length, in characters
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Hash a password with bcrypt at the given cost.
///
/// A fresh random salt is generated for every call, and the returned string
/// embeds the algorithm version, the cost and the salt.
///
/// # Example
///
/// ```ignore
/// use daebak::services::password::hash_password;
///
/// let hash = hash_password("my_secure_password", bcrypt::DEFAULT_COST)?;
/// assert!(hash.starts_with("$2b$"));
/// ```
pub fn hash_password(password: &str, cost: u32) -> Result<String> {
    bcrypt::hash(password, cost).context("Password hashing failed")
}

/// Verify a password against a stored hash.
///
/// Returns `Ok(false)` on a mismatch and an error only when the stored hash
/// cannot be parsed.
pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    bcrypt::verify(password, hash).context("Password verification error")
}

/// Whether a password satisfies the minimum length rule
pub fn is_password_acceptable(password: &str) -> bool {
    password.chars().count() >= MIN_PASSWORD_LENGTH
}

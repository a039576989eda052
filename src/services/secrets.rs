//! Random bearer secrets and their stored digests
//!
//! Session and password reset tokens are random byte strings encoded as
//! unpadded base64url. Only `hash_token(token)` is ever written to the
//! database, so a leaked table does not yield usable credentials.

use anyhow::{anyhow, Result};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use sha2::{Digest, Sha256};

/// Random bytes in a session token
pub const SESSION_TOKEN_BYTES: usize = 32;

/// Random bytes in a password reset token
pub const RESET_TOKEN_BYTES: usize = 8;

/// Random bytes in an article slug
pub const SLUG_BYTES: usize = 8;

/// Fill `n` bytes from the operating system RNG
pub fn random_bytes(n: usize) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; n];
    getrandom::fill(&mut buf).map_err(|e| anyhow!("Failed to read from the system RNG: {}", e))?;
    Ok(buf)
}

/// `n` random bytes encoded as unpadded base64url
pub fn random_string(n: usize) -> Result<String> {
    Ok(URL_SAFE_NO_PAD.encode(random_bytes(n)?))
}

/// Digest stored in place of a bearer token
pub fn hash_token(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    URL_SAFE_NO_PAD.encode(digest)
}

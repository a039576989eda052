//! Signed session cookie
//!
//! The `session` cookie carries `<token>.<hmac>` where `<hmac>` is the
//! unpadded base64url HMAC-SHA256 of the token under the configured secret.
//! A cookie whose MAC does not verify is treated as absent.

use anyhow::{anyhow, Result};
use axum::http::{header, HeaderMap};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "session";

/// Signs and verifies session cookie values
#[derive(Clone)]
pub struct CookieSigner {
    mac: HmacSha256,
    secure: bool,
}

impl CookieSigner {
    /// Create a signer keyed with `secret`.
    ///
    /// `secure` adds the `Secure` attribute to issued cookies.
    pub fn new(secret: &[u8], secure: bool) -> Result<Self> {
        let mac = HmacSha256::new_from_slice(secret)
            .map_err(|e| anyhow!("Invalid cookie secret: {}", e))?;
        Ok(Self { mac, secure })
    }

    /// Cookie value for a session token
    pub fn sign(&self, token: &str) -> String {
        let mut mac = self.mac.clone();
        mac.update(token.as_bytes());
        let tag = mac.finalize().into_bytes();
        format!("{}.{}", token, URL_SAFE_NO_PAD.encode(tag))
    }

    /// Recover the session token from a cookie value, if the MAC verifies
    pub fn verify(&self, value: &str) -> Option<String> {
        let (token, tag) = value.rsplit_once('.')?;
        if token.is_empty() {
            return None;
        }
        let tag = URL_SAFE_NO_PAD.decode(tag).ok()?;

        let mut mac = self.mac.clone();
        mac.update(token.as_bytes());
        mac.verify_slice(&tag).ok()?;
        Some(token.to_string())
    }

    /// `Set-Cookie` value that stores a session token
    pub fn session_cookie(&self, token: &str) -> String {
        let mut cookie = format!(
            "{}={}; Path=/; HttpOnly; SameSite=Strict",
            SESSION_COOKIE,
            self.sign(token)
        );
        if self.secure {
            cookie.push_str("; Secure");
        }
        cookie
    }

    /// `Set-Cookie` value that removes the session cookie
    pub fn clear_cookie(&self) -> String {
        let mut cookie = format!(
            "{}=; Path=/; HttpOnly; SameSite=Strict; Max-Age=0",
            SESSION_COOKIE
        );
        if self.secure {
            cookie.push_str("; Secure");
        }
        cookie
    }

    /// Verified session token from the request's `Cookie` headers
    pub fn session_token(&self, headers: &HeaderMap) -> Option<String> {
        read_cookie(headers, SESSION_COOKIE).and_then(|value| self.verify(&value))
    }
}

/// Raw value of the named cookie
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .find_map(|pair| {
            let (key, value) = pair.trim().split_once('=')?;
            (key == name).then(|| value.to_string())
        })
}

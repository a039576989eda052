//! Errors that carry a message safe to show to visitors
//!
//! Internal errors often contain SQL, file paths or other details that must
//! not reach a browser. Wrapping one in [`PublicError`] attaches the text a
//! page may display while keeping the original as the error source for logs.

use std::fmt::Display;

/// Fallback text for errors without a public message
pub const GENERIC_ERROR_MESSAGE: &str = "Something went wrong.";

/// An error with a display-safe message and the internal cause behind it
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct PublicError {
    message: String,
    #[source]
    source: anyhow::Error,
}

impl PublicError {
    /// Wrap `source`, showing `message` to the visitor
    pub fn new(message: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        Self {
            message: message.into(),
            source: source.into(),
        }
    }

    /// Public message with no deeper cause than the message itself
    pub fn message_only(message: impl Display) -> Self {
        let message = message.to_string();
        Self {
            source: anyhow::anyhow!(message.clone()),
            message,
        }
    }

    /// The display-safe message
    pub fn public(&self) -> &str {
        &self.message
    }
}

/// Find the first public message in an error chain
pub fn public_message_of(err: &anyhow::Error) -> Option<&str> {
    err.chain()
        .find_map(|e| e.downcast_ref::<PublicError>())
        .map(PublicError::public)
}

/// Public message of an error chain, or the generic fallback
pub fn public_message_or_generic(err: &anyhow::Error) -> &str {
    public_message_of(err).unwrap_or(GENERIC_ERROR_MESSAGE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_public_message_found_through_context() {
        let inner = anyhow::anyhow!("UNIQUE constraint failed: users.email");
        let public = PublicError::new("That email address is already taken.", inner);
        let wrapped: anyhow::Result<()> = Err(anyhow::Error::new(public));
        let err = wrapped.context("registration failed").unwrap_err();

        assert_eq!(
            public_message_of(&err),
            Some("That email address is already taken.")
        );
    }

    #[test]
    fn test_internal_errors_get_generic_message() {
        let err = anyhow::anyhow!("connection reset");
        assert_eq!(public_message_of(&err), None);
        assert_eq!(public_message_or_generic(&err), GENERIC_ERROR_MESSAGE);
    }

    #[test]
    fn test_source_is_kept() {
        let public = PublicError::new("Try again.", anyhow::anyhow!("disk full"));
        let source = std::error::Error::source(&public).map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("disk full"));
    }
}

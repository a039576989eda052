//! View rendering error types

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;

/// Errors raised while building or rendering pages
#[derive(Debug, Error)]
pub enum ViewError {
    /// An embedded template failed to parse
    #[error("Template error: {0}")]
    Template(#[from] tera::Error),

    /// Rendering a page failed
    #[error("Failed to render '{template}': {message}")]
    Render { template: String, message: String },
}

impl IntoResponse for ViewError {
    fn into_response(self) -> Response {
        tracing::error!("{}", self);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Html("Sorry, something went wrong"),
        )
            .into_response()
    }
}

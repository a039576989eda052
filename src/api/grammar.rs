//! Grammar API endpoints
//!
//! - POST /api/grammar - Create a grammar point (requires auth)

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::post, Json, Router};

use crate::api::middleware::{ApiError, AppState};
use crate::models::GrammarInput;

/// Build grammar routes (requires auth middleware)
pub fn router() -> Router<AppState> {
    Router::new().route("/", post(create_grammar))
}

async fn create_grammar(
    State(state): State<AppState>,
    Json(input): Json<GrammarInput>,
) -> Result<impl IntoResponse, ApiError> {
    let grammar = state.article_service.create_grammar(input).await?;
    Ok((StatusCode::CREATED, Json(grammar)))
}

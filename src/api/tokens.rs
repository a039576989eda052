//! API token endpoints
//!
//! All routes act on the signed-in user's own tokens:
//! - GET /api/tokens
//! - POST /api/tokens
//! - DELETE /api/tokens/{uuid}

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::middleware::{ApiError, AppState, CurrentUser};
use crate::models::ApiToken;
use crate::services::ApiTokenServiceError;

/// Request body for creating a token
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateTokenRequest {
    pub name: String,
}

/// Build token routes (requires auth middleware)
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_tokens).post(create_token))
        .route("/{uuid}", delete(delete_token))
}

async fn list_tokens(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<ApiToken>>, ApiError> {
    Ok(Json(state.token_service.list(user.id).await?))
}

async fn create_token(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(body): Json<CreateTokenRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let token = state.token_service.create(user.id, &body.name).await?;
    Ok((StatusCode::CREATED, Json(token)))
}

async fn delete_token(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(uuid): Path<String>,
) -> Result<StatusCode, ApiError> {
    let uuid = Uuid::parse_str(&uuid).map_err(|_| ApiTokenServiceError::NotFound)?;
    state.token_service.delete(user.id, uuid).await?;
    Ok(StatusCode::NO_CONTENT)
}

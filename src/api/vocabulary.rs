//! Vocabulary API endpoints
//!
//! - GET /api/vocabulary?page&page_size
//! - GET /api/vocabulary/{id}
//! - POST /api/vocabulary (auth)
//! - POST /api/vocabulary/get-or-create (auth)
//! - PUT, DELETE /api/vocabulary/{id} (auth)

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::common::PaginationQuery;
use crate::api::middleware::{ApiError, AppState};
use crate::models::{PagedResult, Vocabulary, VocabularyInput};

/// Request body for get-or-create
#[derive(Debug, Serialize, Deserialize)]
pub struct WordRequest {
    pub word: String,
}

/// Build public vocabulary routes
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_vocabulary))
        .route("/{id}", get(get_vocabulary))
}

/// Build vocabulary write routes (requires auth middleware)
pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_vocabulary))
        .route("/get-or-create", post(get_or_create_vocabulary))
        .route("/{id}", put(update_vocabulary).delete(delete_vocabulary))
}

async fn list_vocabulary(
    State(state): State<AppState>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<PagedResult<Vocabulary>>, ApiError> {
    Ok(Json(state.vocabulary_service.list_page(&query.params()).await?))
}

async fn get_vocabulary(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Vocabulary>, ApiError> {
    Ok(Json(state.vocabulary_service.get(id).await?))
}

async fn create_vocabulary(
    State(state): State<AppState>,
    Json(input): Json<VocabularyInput>,
) -> Result<impl IntoResponse, ApiError> {
    let vocabulary = state.vocabulary_service.create(input).await?;
    Ok((StatusCode::CREATED, Json(vocabulary)))
}

async fn get_or_create_vocabulary(
    State(state): State<AppState>,
    Json(body): Json<WordRequest>,
) -> Result<Json<Vocabulary>, ApiError> {
    Ok(Json(state.vocabulary_service.get_or_create(&body.word).await?))
}

async fn update_vocabulary(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<VocabularyInput>,
) -> Result<Json<Vocabulary>, ApiError> {
    Ok(Json(state.vocabulary_service.update(id, input).await?))
}

async fn delete_vocabulary(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.vocabulary_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

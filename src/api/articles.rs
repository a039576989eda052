//! Article API endpoints
//!
//! Public reads:
//! - GET /api/articles?page&page_size
//! - GET /api/articles/{id}
//! - GET /api/articles/slug/{slug}
//! - GET /api/articles/uuid/{uuid}
//! - GET /api/articles/{id}/vocabulary
//!
//! Writes require a signed-in user:
//! - POST /api/articles
//! - PUT, DELETE /api/articles/{id}
//! - PUT /api/articles/{id}/vocabulary
//! - PUT /api/articles/{id}/grammar/{grammar_id}

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::common::PaginationQuery;
use crate::api::middleware::{ApiError, AppState};
use crate::models::{Article, ArticleGrammar, ArticleInput, PagedResult, Vocabulary};
use crate::services::ArticleServiceError;

/// Request body for replacing an article's vocabulary
#[derive(Debug, Serialize, Deserialize)]
pub struct SetVocabularyRequest {
    pub vocabulary_ids: Vec<i64>,
}

/// Request body for attaching a grammar point
#[derive(Debug, Serialize, Deserialize)]
pub struct AttachGrammarRequest {
    #[serde(default)]
    pub article_example: Option<String>,
}

/// Build public article routes
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_articles))
        .route("/{id}", get(get_article))
        .route("/slug/{slug}", get(get_article_by_slug))
        .route("/uuid/{uuid}", get(get_article_by_uuid))
        .route("/{id}/vocabulary", get(get_vocabulary))
}

/// Build article write routes (requires auth middleware)
pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_article))
        .route("/{id}", put(update_article).delete(delete_article))
        .route("/{id}/vocabulary", put(set_vocabulary))
        .route("/{id}/grammar/{grammar_id}", put(attach_grammar))
}

async fn list_articles(
    State(state): State<AppState>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<PagedResult<Article>>, ApiError> {
    Ok(Json(state.article_service.list_page(&query.params()).await?))
}

async fn get_article(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Article>, ApiError> {
    Ok(Json(state.article_service.get(id).await?))
}

async fn get_article_by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<Article>, ApiError> {
    Ok(Json(state.article_service.get_by_slug(&slug).await?))
}

async fn get_article_by_uuid(
    State(state): State<AppState>,
    Path(uuid): Path<String>,
) -> Result<Json<Article>, ApiError> {
    let parsed =
        Uuid::parse_str(&uuid).map_err(|_| ArticleServiceError::NotFound(uuid.clone()))?;
    Ok(Json(state.article_service.get_by_uuid(parsed).await?))
}

async fn create_article(
    State(state): State<AppState>,
    Json(input): Json<ArticleInput>,
) -> Result<impl IntoResponse, ApiError> {
    let article = state.article_service.create(input).await?;
    Ok((StatusCode::CREATED, Json(article)))
}

async fn update_article(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<ArticleInput>,
) -> Result<Json<Article>, ApiError> {
    Ok(Json(state.article_service.update(id, input).await?))
}

async fn delete_article(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.article_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn get_vocabulary(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<Vocabulary>>, ApiError> {
    Ok(Json(state.article_service.vocabulary(id).await?))
}

async fn set_vocabulary(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<SetVocabularyRequest>,
) -> Result<Json<Vec<Vocabulary>>, ApiError> {
    Ok(Json(
        state
            .article_service
            .set_vocabulary(id, &body.vocabulary_ids)
            .await?,
    ))
}

async fn attach_grammar(
    State(state): State<AppState>,
    Path((id, grammar_id)): Path<(i64, i64)>,
    Json(body): Json<AttachGrammarRequest>,
) -> Result<Json<Vec<ArticleGrammar>>, ApiError> {
    Ok(Json(
        state
            .article_service
            .attach_grammar(id, grammar_id, body.article_example.as_deref())
            .await?,
    ))
}

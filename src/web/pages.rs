//! Public reading pages

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tera::Context as TeraContext;

use crate::api::middleware::{AppState, MaybeUser};
use crate::models::{Article, ListParams};
use crate::services::ArticleServiceError;
use crate::views::ViewError;
use crate::web::{failure_toast, not_found, render};

/// GET / - the newest articles
pub async fn home(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
) -> Result<Response, ViewError> {
    let mut toasts = Vec::new();
    let articles = match state.article_service.list_page(&ListParams::default()).await {
        Ok(page) => page.items,
        Err(e) => {
            toasts.push(failure_toast(e.into()));
            Vec::new()
        }
    };

    let mut context = TeraContext::new();
    context.insert("articles", &articles);
    Ok(render(&state, "home.html", context, user.as_ref(), &toasts)?.into_response())
}

/// GET /a/{slug} - one article with its vocabulary and grammar
pub async fn article(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Path(slug): Path<String>,
) -> Result<Response, ViewError> {
    let article = match state.article_service.get_by_slug(&slug).await {
        Ok(article) => article,
        Err(ArticleServiceError::NotFound(_)) => return not_found(&state, user.as_ref()),
        Err(e) => {
            let toasts = [failure_toast(e.into())];
            let mut context = TeraContext::new();
            context.insert("articles", &Vec::<Article>::new());
            let page = render(&state, "home.html", context, user.as_ref(), &toasts)?;
            return Ok((StatusCode::INTERNAL_SERVER_ERROR, page).into_response());
        }
    };

    let mut context = TeraContext::new();
    context.insert("article", &article);
    Ok(render(&state, "article.html", context, user.as_ref(), &[])?.into_response())
}

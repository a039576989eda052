//! Server-rendered pages
//!
//! Public pages, the account pages under `/users` and the article editor
//! under `/admin`. Member pages redirect anonymous visitors to the login
//! page instead of answering 401.

pub mod admin;
pub mod pages;
pub mod users;

use axum::{
    http::StatusCode,
    middleware as axum_middleware,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Router,
};
use tera::Context as TeraContext;

use crate::api::middleware::{require_user, AppState};
use crate::errors::public_message_of;
use crate::models::User;
use crate::views::{Toast, ViewError};

/// Build the page router
pub fn router() -> Router<AppState> {
    let member_routes = Router::new()
        .route("/users/me", get(users::me))
        .route("/users/me/tokens", post(users::create_token))
        .route("/users/me/tokens/delete", post(users::delete_token))
        .route(
            "/admin/articles/new",
            get(admin::new_article).post(admin::create_article),
        )
        .route(
            "/admin/articles/{id}",
            get(admin::edit_article).post(admin::update_article),
        )
        .route_layer(axum_middleware::from_fn(require_user));

    Router::new()
        .route("/", get(pages::home))
        .route("/a/{slug}", get(pages::article))
        .route("/users/register", get(users::register_page).post(users::register))
        .route("/users/login", get(users::login_page).post(users::login))
        .route("/users/logout", get(users::logout))
        .route("/users/forgot", get(users::forgot_page).post(users::forgot))
        .route("/users/reset", get(users::reset_page).post(users::reset))
        .merge(member_routes)
}

/// Render a template into an HTML response
pub(crate) fn render(
    state: &AppState,
    template: &str,
    context: TeraContext,
    user: Option<&User>,
    toasts: &[Toast],
) -> Result<Html<String>, ViewError> {
    Ok(Html(state.views.render(template, context, user, toasts)?))
}

/// 404 page
pub(crate) fn not_found(state: &AppState, user: Option<&User>) -> Result<Response, ViewError> {
    let page = render(state, "not_found.html", TeraContext::new(), user, &[])?;
    Ok((StatusCode::NOT_FOUND, page).into_response())
}

/// Toast for a failed action; failures without a public message are logged
pub(crate) fn failure_toast(err: anyhow::Error) -> Toast {
    if public_message_of(&err).is_none() {
        tracing::error!("Request failed: {:#}", err);
    }
    Toast::from_error(&err)
}

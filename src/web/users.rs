//! Account pages
//!
//! Registration, login, logout, password reset and the token list on the
//! profile page. Failed actions re-render the form with an error toast.

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap},
    response::{IntoResponse, Redirect, Response},
    Form,
};
use serde::Deserialize;
use tera::Context as TeraContext;
use uuid::Uuid;

use crate::api::auth::send_reset_link;
use crate::api::middleware::{
    AppState, CurrentUser, MaybeUser, INVALID_CREDENTIALS_MESSAGE, INVALID_RESET_MESSAGE,
};
use crate::errors::PublicError;
use crate::models::User;
use crate::services::password::is_password_acceptable;
use crate::services::{ApiTokenServiceError, PasswordResetError, UserServiceError};
use crate::views::{Toast, ViewError};
use crate::web::{failure_toast, render};

#[derive(Debug, Deserialize)]
pub struct CredentialsForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct EmailForm {
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct TokenQuery {
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ResetForm {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct TokenNameForm {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct TokenUuidForm {
    #[serde(default)]
    pub uuid: String,
}

/// Attach the visitor-facing message to a user service failure
fn user_failure(err: UserServiceError) -> anyhow::Error {
    match err {
        UserServiceError::Internal(e) => e,
        UserServiceError::InvalidAuth => PublicError::new(INVALID_CREDENTIALS_MESSAGE, err).into(),
        UserServiceError::EmailTaken => {
            PublicError::new("That email address is already taken.", err).into()
        }
        UserServiceError::Validation(msg) => PublicError::message_only(msg).into(),
        other => PublicError::new(other.to_string(), other).into(),
    }
}

fn reset_failure(err: PasswordResetError) -> anyhow::Error {
    match err {
        PasswordResetError::Internal(e) => e,
        other => PublicError::new(INVALID_RESET_MESSAGE, other).into(),
    }
}

/// Redirect home with a fresh session cookie
fn signed_in_redirect(cookie: String) -> Response {
    ([(header::SET_COOKIE, cookie)], Redirect::to("/")).into_response()
}

fn email_context(email: &str) -> TeraContext {
    let mut context = TeraContext::new();
    context.insert("email", email);
    context
}

/// GET /users/register
pub async fn register_page(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
) -> Result<Response, ViewError> {
    Ok(render(&state, "users/register.html", email_context(""), user.as_ref(), &[])?.into_response())
}

/// POST /users/register
pub async fn register(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Form(form): Form<CredentialsForm>,
) -> Result<Response, ViewError> {
    let result = match state.user_service.create_user(&form.email, &form.password).await {
        Ok(created) => state
            .start_session(created.id)
            .await
            .map_err(anyhow::Error::from),
        Err(e) => Err(user_failure(e)),
    };

    match result {
        Ok(cookie) => Ok(signed_in_redirect(cookie)),
        Err(e) => {
            let toasts = [failure_toast(e)];
            let context = email_context(&form.email);
            Ok(render(&state, "users/register.html", context, user.as_ref(), &toasts)?.into_response())
        }
    }
}

/// GET /users/login
pub async fn login_page(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
) -> Result<Response, ViewError> {
    Ok(render(&state, "users/login.html", email_context(""), user.as_ref(), &[])?.into_response())
}

/// POST /users/login
pub async fn login(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Form(form): Form<CredentialsForm>,
) -> Result<Response, ViewError> {
    let result = match state.user_service.authenticate(&form.email, &form.password).await {
        Ok(found) => state.start_session(found.id).await.map_err(anyhow::Error::from),
        Err(e) => Err(user_failure(e)),
    };

    match result {
        Ok(cookie) => Ok(signed_in_redirect(cookie)),
        Err(e) => {
            let toasts = [failure_toast(e)];
            let context = email_context(&form.email);
            Ok(render(&state, "users/login.html", context, user.as_ref(), &toasts)?.into_response())
        }
    }
}

/// GET /users/logout
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Some(token) = state.cookies.session_token(&headers) {
        if let Err(e) = state.session_service.delete(&token).await {
            tracing::error!("Failed to delete session: {}", e);
        }
    }
    (
        [(header::SET_COOKIE, state.cookies.clear_cookie())],
        Redirect::to("/"),
    )
        .into_response()
}

fn forgot_context(sent: bool) -> TeraContext {
    let mut context = TeraContext::new();
    context.insert("sent", &sent);
    context
}

/// GET /users/forgot
pub async fn forgot_page(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
) -> Result<Response, ViewError> {
    Ok(render(&state, "users/forgot.html", forgot_context(false), user.as_ref(), &[])?.into_response())
}

/// POST /users/forgot
///
/// Renders the "sent" state whether or not the email has an account.
pub async fn forgot(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Form(form): Form<EmailForm>,
) -> Result<Response, ViewError> {
    send_reset_link(&state, &form.email).await;
    Ok(render(&state, "users/forgot.html", forgot_context(true), user.as_ref(), &[])?.into_response())
}

fn reset_context(token: &str) -> TeraContext {
    let mut context = TeraContext::new();
    context.insert("token", token);
    context
}

/// GET /users/reset?token=
pub async fn reset_page(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Query(query): Query<TokenQuery>,
) -> Result<Response, ViewError> {
    let token = query.token.unwrap_or_default();
    Ok(render(&state, "users/reset.html", reset_context(&token), user.as_ref(), &[])?.into_response())
}

/// POST /users/reset
///
/// The token comes from the form, or from the query string when the form
/// does not carry one.
pub async fn reset(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Query(query): Query<TokenQuery>,
    Form(form): Form<ResetForm>,
) -> Result<Response, ViewError> {
    let token = form
        .token
        .filter(|t| !t.is_empty())
        .or(query.token)
        .unwrap_or_default();

    match reset_password(&state, &token, &form.password).await {
        Ok(cookie) => Ok(signed_in_redirect(cookie)),
        Err(e) => {
            let toasts = [failure_toast(e)];
            Ok(render(&state, "users/reset.html", reset_context(&token), user.as_ref(), &toasts)?.into_response())
        }
    }
}

async fn reset_password(state: &AppState, token: &str, password: &str) -> anyhow::Result<String> {
    if !is_password_acceptable(password) {
        return Err(user_failure(UserServiceError::PasswordInsecure));
    }
    let resets = &state.password_reset_service;
    let user = resets.verify(token).await.map_err(reset_failure)?;
    state
        .user_service
        .update_password(user.id, password)
        .await
        .map_err(user_failure)?;
    // Spent only once the new password is stored
    resets.complete(user.id).await.map_err(reset_failure)?;
    tracing::info!("Password reset for user {}", user.id);
    Ok(state.start_session(user.id).await?)
}

/// Profile page with the user's API tokens
async fn render_me(state: &AppState, user: &User, mut toasts: Vec<Toast>) -> Result<Response, ViewError> {
    let tokens = match state.token_service.list(user.id).await {
        Ok(tokens) => tokens,
        Err(e) => {
            toasts.push(failure_toast(e.into()));
            Vec::new()
        }
    };
    let mut context = TeraContext::new();
    context.insert("tokens", &tokens);
    Ok(render(state, "users/me.html", context, Some(user), &toasts)?.into_response())
}

/// GET /users/me
pub async fn me(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Response, ViewError> {
    render_me(&state, &user, Vec::new()).await
}

/// POST /users/me/tokens
pub async fn create_token(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Form(form): Form<TokenNameForm>,
) -> Result<Response, ViewError> {
    match state.token_service.create(user.id, &form.name).await {
        Ok(_) => Ok(Redirect::to("/users/me").into_response()),
        Err(ApiTokenServiceError::Validation(msg)) => {
            let toast = failure_toast(PublicError::message_only(msg).into());
            render_me(&state, &user, vec![toast]).await
        }
        Err(e) => render_me(&state, &user, vec![failure_toast(e.into())]).await,
    }
}

/// POST /users/me/tokens/delete
///
/// Unknown tokens and tokens of other users are ignored.
pub async fn delete_token(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Form(form): Form<TokenUuidForm>,
) -> Response {
    if let Ok(uuid) = Uuid::parse_str(form.uuid.trim()) {
        match state.token_service.delete(user.id, uuid).await {
            Ok(()) | Err(ApiTokenServiceError::NotFound) => {}
            Err(e) => tracing::error!("Failed to delete token: {}", e),
        }
    }
    Redirect::to("/users/me").into_response()
}

//! Authentication API endpoints
//!
//! Handles HTTP requests for user authentication:
//! - POST /api/auth/register - Create an account and sign in
//! - POST /api/auth/login - Sign in
//! - POST /api/auth/logout - Sign out
//! - GET /api/auth/me - Current user
//! - POST /api/auth/forgot - Start a password reset
//! - POST /api/auth/reset - Finish a password reset and sign in

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::middleware::{ApiError, AppState, CurrentUser};
use crate::models::User;
use crate::services::password::is_password_acceptable;
use crate::services::{PasswordResetError, UserServiceError};

/// Request body for register and login
#[derive(Debug, Serialize, Deserialize)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

/// Request body for starting a password reset
#[derive(Debug, Serialize, Deserialize)]
pub struct ForgotRequest {
    pub email: String,
}

/// Request body for finishing a password reset
#[derive(Debug, Serialize, Deserialize)]
pub struct ResetRequest {
    pub token: String,
    pub password: String,
}

/// Response carrying the signed-in user
#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponse {
    pub user: User,
}

/// Build protected auth routes (requires auth middleware)
pub fn protected_router() -> Router<AppState> {
    Router::new().route("/me", get(me))
}

/// Build public auth routes (no auth required)
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/forgot", post(forgot))
        .route("/reset", post(reset))
}

/// POST /api/auth/register
async fn register(
    State(state): State<AppState>,
    Json(body): Json<CredentialsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .user_service
        .create_user(&body.email, &body.password)
        .await?;
    let cookie = state.start_session(user.id).await?;
    tracing::info!("Registered user {}", user.id);

    Ok((
        StatusCode::CREATED,
        [(header::SET_COOKIE, cookie)],
        Json(UserResponse { user }),
    ))
}

/// POST /api/auth/login
async fn login(
    State(state): State<AppState>,
    Json(body): Json<CredentialsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .user_service
        .authenticate(&body.email, &body.password)
        .await?;
    let cookie = state.start_session(user.id).await?;

    Ok(([(header::SET_COOKIE, cookie)], Json(UserResponse { user })))
}

/// POST /api/auth/logout
///
/// Ends the session named by the cookie, if any, and clears the cookie.
async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(token) = state.cookies.session_token(&headers) {
        state.session_service.delete(&token).await?;
    }
    Ok((
        StatusCode::NO_CONTENT,
        [(header::SET_COOKIE, state.cookies.clear_cookie())],
    ))
}

/// GET /api/auth/me
async fn me(CurrentUser(user): CurrentUser) -> Json<UserResponse> {
    Json(UserResponse { user })
}

/// POST /api/auth/forgot
///
/// Always answers 202 so callers cannot tell which emails have accounts.
async fn forgot(State(state): State<AppState>, Json(body): Json<ForgotRequest>) -> StatusCode {
    send_reset_link(&state, &body.email).await;
    StatusCode::ACCEPTED
}

/// POST /api/auth/reset
async fn reset(
    State(state): State<AppState>,
    Json(body): Json<ResetRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if !is_password_acceptable(&body.password) {
        return Err(UserServiceError::PasswordInsecure.into());
    }

    let user = state.password_reset_service.verify(&body.token).await?;
    state
        .user_service
        .update_password(user.id, &body.password)
        .await?;
    // Spent only once the new password is stored
    state.password_reset_service.complete(user.id).await?;
    let cookie = state.start_session(user.id).await?;
    tracing::info!("Password reset for user {}", user.id);

    Ok(([(header::SET_COOKIE, cookie)], Json(UserResponse { user })))
}

/// Create a reset for `email` and log the link. Failures are logged only.
pub(crate) async fn send_reset_link(state: &AppState, email: &str) {
    match state.password_reset_service.create(email).await {
        Ok(reset) => {
            if let Some(token) = reset.token {
                tracing::info!(
                    "Password reset link for user {}: {}",
                    reset.user_id,
                    state.reset_link(&token)
                );
            }
        }
        Err(PasswordResetError::UnknownEmail) => {
            tracing::debug!("Password reset requested for an unknown email");
        }
        Err(e) => tracing::error!("Failed to create password reset: {}", e),
    }
}

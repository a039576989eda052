//! API middleware and shared request plumbing
//!
//! Contains:
//! - `AppState`, the services shared by every handler
//! - `ApiError`, the JSON error envelope and its mapping from service errors
//! - identity resolution (session cookie, then bearer token, then anonymous)
//! - guards for routes that need a signed-in user

use anyhow::anyhow;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use uuid::Uuid;

use crate::api::cookie::CookieSigner;
use crate::config::Config;
use crate::db::repositories::{
    SqlxArticleRepository, SqlxGrammarRepository, SqlxPasswordResetRepository,
    SqlxSessionRepository, SqlxTagRepository, SqlxTokenRepository, SqlxUserRepository,
    SqlxVocabularyRepository,
};
use crate::db::DynDatabasePool;
use crate::errors::GENERIC_ERROR_MESSAGE;
use crate::models::User;
use crate::services::{
    ApiTokenService, ApiTokenServiceError, ArticleService, ArticleServiceError,
    PasswordResetError, PasswordResetService, SessionService, SessionServiceError, UserService,
    UserServiceError, VocabularyService, VocabularyServiceError,
};
use crate::views::Views;

/// Message shown for any failed login
pub const INVALID_CREDENTIALS_MESSAGE: &str = "That email or password is incorrect.";

/// Message shown for any unusable password reset token
pub const INVALID_RESET_MESSAGE: &str = "The password reset token is invalid or expired.";

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub user_service: Arc<UserService>,
    pub session_service: Arc<SessionService>,
    pub password_reset_service: Arc<PasswordResetService>,
    pub token_service: Arc<ApiTokenService>,
    pub article_service: Arc<ArticleService>,
    pub vocabulary_service: Arc<VocabularyService>,
    pub views: Arc<Views>,
    pub cookies: Arc<CookieSigner>,
    /// Public base URL used in password reset links
    pub base_url: Arc<str>,
}

impl AppState {
    /// Wire repositories and services over a migrated pool
    pub fn new(pool: DynDatabasePool, config: &Config, cookie_secret: &[u8]) -> anyhow::Result<Self> {
        let user_repo = SqlxUserRepository::boxed(pool.clone());
        let reset_duration = chrono::Duration::minutes(config.security.password_reset_minutes);

        Ok(Self {
            user_service: Arc::new(UserService::new(
                user_repo.clone(),
                config.security.bcrypt_cost,
            )),
            session_service: Arc::new(SessionService::new(SqlxSessionRepository::boxed(
                pool.clone(),
            ))),
            password_reset_service: Arc::new(PasswordResetService::new(
                SqlxPasswordResetRepository::boxed(pool.clone()),
                user_repo,
                reset_duration,
            )),
            token_service: Arc::new(ApiTokenService::new(SqlxTokenRepository::boxed(
                pool.clone(),
            ))),
            article_service: Arc::new(ArticleService::new(
                SqlxArticleRepository::boxed(pool.clone()),
                SqlxTagRepository::boxed(pool.clone()),
                SqlxVocabularyRepository::boxed(pool.clone()),
                SqlxGrammarRepository::boxed(pool.clone()),
            )),
            vocabulary_service: Arc::new(VocabularyService::new(SqlxVocabularyRepository::boxed(
                pool,
            ))),
            views: Arc::new(Views::new()?),
            cookies: Arc::new(CookieSigner::new(
                cookie_secret,
                config.security.secure_cookies,
            )?),
            base_url: Arc::from(config.server.base_url.trim_end_matches('/')),
        })
    }

    /// Start a session for the user and return the `Set-Cookie` value
    pub async fn start_session(&self, user_id: i64) -> Result<String, SessionServiceError> {
        let session = self.session_service.create(user_id).await?;
        let token = session
            .token
            .ok_or_else(|| anyhow!("Session was created without a token"))?;
        Ok(self.cookies.session_cookie(&token))
    }

    /// Link that redeems a password reset token
    pub fn reset_link(&self, token: &str) -> String {
        format!("{}/users/reset?token={}", self.base_url, token)
    }
}

/// The user a request is acting as
///
/// Inserted into request extensions by [`identify`]; absent for anonymous
/// requests. Extracting it rejects anonymous requests with 401.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// The current user if there is one
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<User>);

impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))
    }
}

impl<S: Send + Sync> FromRequestParts<S> for MaybeUser {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(
            parts.extensions.get::<CurrentUser>().map(|c| c.0.clone()),
        ))
    }
}

/// Error response for API errors
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
            },
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("UNAUTHORIZED", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", message)
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new("CONFLICT", message)
    }

    /// Log the full chain and answer with the generic message
    pub fn internal(err: anyhow::Error) -> Self {
        tracing::error!("Internal error: {:#}", err);
        Self::new("INTERNAL_ERROR", GENERIC_ERROR_MESSAGE)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.error.code.as_str() {
            "UNAUTHORIZED" => StatusCode::UNAUTHORIZED,
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "VALIDATION_ERROR" => StatusCode::BAD_REQUEST,
            "CONFLICT" => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(self)).into_response()
    }
}

impl From<UserServiceError> for ApiError {
    fn from(err: UserServiceError) -> Self {
        match err {
            UserServiceError::EmailTaken => Self::conflict("That email address is already taken."),
            UserServiceError::PasswordInsecure => Self::validation_error(err.to_string()),
            UserServiceError::InvalidAuth => Self::unauthorized(INVALID_CREDENTIALS_MESSAGE),
            UserServiceError::Validation(msg) => Self::validation_error(msg),
            UserServiceError::NotFound => Self::not_found(err.to_string()),
            UserServiceError::Internal(e) => Self::internal(e),
        }
    }
}

impl From<SessionServiceError> for ApiError {
    fn from(err: SessionServiceError) -> Self {
        match err {
            SessionServiceError::NotFound => Self::unauthorized("Authentication required"),
            SessionServiceError::Internal(e) => Self::internal(e),
        }
    }
}

impl From<PasswordResetError> for ApiError {
    fn from(err: PasswordResetError) -> Self {
        match err {
            PasswordResetError::UnknownEmail => Self::not_found(err.to_string()),
            PasswordResetError::TokenInvalid | PasswordResetError::TokenExpired => {
                Self::validation_error(INVALID_RESET_MESSAGE)
            }
            PasswordResetError::Internal(e) => Self::internal(e),
        }
    }
}

impl From<ApiTokenServiceError> for ApiError {
    fn from(err: ApiTokenServiceError) -> Self {
        match err {
            ApiTokenServiceError::Validation(msg) => Self::validation_error(msg),
            ApiTokenServiceError::NotFound => Self::not_found(err.to_string()),
            ApiTokenServiceError::Internal(e) => Self::internal(e),
        }
    }
}

impl From<ArticleServiceError> for ApiError {
    fn from(err: ArticleServiceError) -> Self {
        match err {
            ArticleServiceError::NotFound(_) => Self::not_found(err.to_string()),
            ArticleServiceError::Validation(msg) => Self::validation_error(msg),
            ArticleServiceError::Duplicate(_) => Self::conflict(err.to_string()),
            ArticleServiceError::Internal(e) => Self::internal(e),
        }
    }
}

impl From<VocabularyServiceError> for ApiError {
    fn from(err: VocabularyServiceError) -> Self {
        match err {
            VocabularyServiceError::NotFound(_) => Self::not_found(err.to_string()),
            VocabularyServiceError::Validation(msg) => Self::validation_error(msg),
            VocabularyServiceError::Duplicate(_) => Self::conflict(err.to_string()),
            VocabularyServiceError::Internal(e) => Self::internal(e),
        }
    }
}

/// Token from an `Authorization: Bearer <token>` header
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}

/// Resolve the acting user: session cookie first, then bearer token
async fn resolve_user(state: &AppState, headers: &HeaderMap) -> Option<User> {
    if let Some(token) = state.cookies.session_token(headers) {
        match state.session_service.user(&token).await {
            Ok(user) => return Some(user),
            Err(SessionServiceError::NotFound) => {}
            Err(e) => tracing::error!("Failed to resolve session: {}", e),
        }
    }

    let uuid = Uuid::parse_str(bearer_token(headers)?).ok()?;
    let user_id = match state.token_service.resolve(uuid).await {
        Ok(user_id) => user_id,
        Err(ApiTokenServiceError::NotFound) => return None,
        Err(e) => {
            tracing::error!("Failed to resolve API token: {}", e);
            return None;
        }
    };
    match state.user_service.get_by_id(user_id).await {
        Ok(user) => Some(user),
        Err(e) => {
            tracing::error!("Token owner {} could not be loaded: {}", user_id, e);
            None
        }
    }
}

/// Identity middleware, run on every request
pub async fn identify(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    if let Some(user) = resolve_user(&state, request.headers()).await {
        request.extensions_mut().insert(CurrentUser(user));
    }
    next.run(request).await
}

/// Reject anonymous API requests with 401
pub async fn require_auth(request: Request, next: Next) -> Result<Response, ApiError> {
    if request.extensions().get::<CurrentUser>().is_none() {
        return Err(ApiError::unauthorized("Authentication required"));
    }
    Ok(next.run(request).await)
}

/// Send anonymous page requests to the login page
pub async fn require_user(request: Request, next: Next) -> Response {
    if request.extensions().get::<CurrentUser>().is_none() {
        return (StatusCode::FOUND, [(header::LOCATION, "/users/login")]).into_response();
    }
    next.run(request).await
}

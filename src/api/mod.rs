//! API layer - HTTP handlers and routing
//!
//! This module contains the JSON API served under `/api`:
//! - Auth endpoints (register, login, logout, password reset)
//! - API token endpoints
//! - Article endpoints, including vocabulary and grammar links
//! - Vocabulary and grammar endpoints
//!
//! The server-rendered pages live in [`crate::web`] and share the same
//! state, identity middleware and error mapping.

pub mod articles;
pub mod auth;
pub mod common;
pub mod cookie;
pub mod grammar;
pub mod middleware;
pub mod tokens;
pub mod vocabulary;

use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use cookie::CookieSigner;
pub use middleware::{ApiError, AppState, CurrentUser, MaybeUser};

/// Build the JSON API router
pub fn build_api_router() -> Router<AppState> {
    // Routes that need a signed-in user
    let protected_routes = Router::new()
        .nest("/auth", auth::protected_router())
        .nest("/tokens", tokens::router())
        .nest("/articles", articles::protected_router())
        .nest("/vocabulary", vocabulary::protected_router())
        .nest("/grammar", grammar::router())
        .route_layer(axum_middleware::from_fn(middleware::require_auth));

    // Public routes
    Router::new()
        .nest("/auth", auth::public_router())
        .nest("/articles", articles::public_router())
        .nest("/vocabulary", vocabulary::public_router())
        .merge(protected_routes)
}

/// Build the complete router with middleware
pub fn build_router(state: AppState, cors_origin: &str) -> Router {
    let mut cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::COOKIE])
        .allow_credentials(true);
    match cors_origin.parse::<HeaderValue>() {
        Ok(origin) => cors = cors.allow_origin(origin),
        Err(_) => tracing::warn!("Ignoring invalid CORS origin '{}'", cors_origin),
    }

    Router::new()
        .nest("/api", build_api_router())
        .merge(crate::web::router())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(axum_middleware::from_fn_with_state(
                    state.clone(),
                    middleware::identify,
                )),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests;

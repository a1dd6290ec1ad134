//! API layer - HTTP handlers and routing
//!
//! This module contains all HTTP endpoints of the Moonglade blog:
//! - Public JSON API under `/api`
//! - Admin JSON API under `/api/admin` (session required)
//! - Root resources: sitemap, robots.txt, theme stylesheet, health check

pub mod admin;
pub mod auth;
pub mod categories;
pub mod comments;
pub mod common;
pub mod mentions;
pub mod middleware;
pub mod navigation;
pub mod pages;
pub mod posts;
pub mod site;
pub mod stats;
pub mod tags;

use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    Router,
};
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

pub use middleware::{ApiError, AppState, AuthenticatedUser, ClientInfo};

/// Build the `/api` router
pub fn build_api_router(state: AppState) -> Router<AppState> {
    let admin_routes = Router::new()
        .nest("/admin/posts", posts::admin_router())
        .nest("/admin/categories", categories::admin_router())
        .nest("/admin/tags", tags::admin_router())
        .nest("/admin/pages", pages::admin_router())
        .nest("/admin/comments", comments::admin_router())
        .nest("/admin/mentions", mentions::admin_router())
        .nest("/admin/auth", auth::protected_router())
        .nest("/admin/accounts", auth::accounts_router())
        .nest("/admin", navigation::admin_router().merge(admin::router()))
        .route_layer(axum_middleware::from_fn_with_state(
            state,
            middleware::require_auth,
        ));

    Router::new()
        .nest("/posts", posts::router())
        .nest("/post", posts::post_router())
        .nest("/categories", categories::router())
        .nest("/tags", tags::router())
        .nest("/pages", pages::router())
        .nest("/comments", comments::router())
        .nest("/stats", stats::router())
        .nest("/site", site::router())
        .nest("/auth", auth::public_router())
        .merge(navigation::router())
        .merge(mentions::router())
        .merge(admin_routes)
}

/// Build the complete router with middleware
pub fn build_router(state: AppState, cors_origin: &str) -> Router {
    let mut cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::COOKIE])
        .allow_credentials(true);
    match cors_origin.parse::<HeaderValue>() {
        Ok(origin) => cors = cors.allow_origin(origin),
        Err(e) => tracing::warn!("Ignoring invalid CORS origin {:?}: {}", cors_origin, e),
    }

    Router::new()
        .nest("/api", build_api_router(state.clone()))
        .merge(site::root_router())
        .layer(cors)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

//! Site info and root-level resources
//!
//! - GET /api/site - Public blog information
//! - GET /sitemap.xml
//! - GET /robots.txt
//! - GET /theme.css - Active theme variables plus custom CSS
//! - GET /health

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Serialize;

use crate::api::middleware::{ApiError, AppState};
use crate::services::blog_config::SidebarPosition;

/// Public site information
#[derive(Debug, Serialize)]
pub struct SiteInfoResponse {
    pub version: &'static str,
    pub site_title: String,
    pub owner_name: String,
    pub description: String,
    pub short_description: String,
    pub copyright: String,
    pub time_zone_utc_offset: String,
    pub sidebar_position: SidebarPosition,
    pub footer_custom_html: String,
    pub posts_per_page: u32,
    pub show_calloutsection: bool,
    pub calloutsection_html: String,
    pub enable_comments: bool,
    pub enable_gravatar: bool,
    pub enable_webmention: bool,
    pub enable_pingback: bool,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: bool,
}

/// Site info route, nested under `/site`
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(site_info))
}

/// Routes served at the site root
pub fn root_router() -> Router<AppState> {
    Router::new()
        .route("/sitemap.xml", get(sitemap))
        .route("/robots.txt", get(robots_txt))
        .route("/theme.css", get(theme_css))
        .route("/health", get(health))
}

/// GET /api/site
async fn site_info(State(state): State<AppState>) -> Json<SiteInfoResponse> {
    let settings = state.config.all().await;
    Json(SiteInfoResponse {
        version: env!("CARGO_PKG_VERSION"),
        site_title: settings.general.site_title,
        owner_name: settings.general.owner_name,
        description: settings.general.description,
        short_description: settings.general.short_description,
        copyright: settings.general.copyright,
        time_zone_utc_offset: settings.general.time_zone_utc_offset,
        sidebar_position: settings.general.sidebar_position,
        footer_custom_html: settings.general.footer_custom_html,
        posts_per_page: settings.content.posts_per_page,
        show_calloutsection: settings.content.show_calloutsection,
        calloutsection_html: settings.content.calloutsection_html,
        enable_comments: settings.comment.enable_comments,
        enable_gravatar: settings.comment.enable_gravatar,
        enable_webmention: settings.advanced.enable_webmention,
        enable_pingback: settings.advanced.enable_pingback,
    })
}

/// GET /sitemap.xml
async fn sitemap(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let xml = state.sitemap.sitemap().await?;
    Ok(([(header::CONTENT_TYPE, "application/xml; charset=utf-8")], xml))
}

/// GET /robots.txt
async fn robots_txt(State(state): State<AppState>) -> impl IntoResponse {
    let text = state.sitemap.robots_txt().await;
    ([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], text)
}

/// GET /theme.css
async fn theme_css(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let css = state.themes.render_css().await?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/css; charset=utf-8"),
            (header::CACHE_CONTROL, "public, max-age=300"),
        ],
        css,
    ))
}

/// GET /health
async fn health(State(state): State<AppState>) -> impl IntoResponse {
    match state.pool.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "ok",
                database: true,
            }),
        ),
        Err(e) => {
            tracing::warn!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "degraded",
                    database: false,
                }),
            )
        }
    }
}

//! Page API endpoints
//!
//! - GET /api/pages - Published page segments
//! - GET /api/pages/{slug} - Published page by slug
//! - /api/admin/pages - CRUD over all pages

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};

use crate::api::middleware::{ApiError, AppState};
use crate::models::{Page, PageInput, PageSegment};

/// Public page routes, nested under `/pages`
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_published))
        .route("/{slug}", get(get_by_slug))
}

/// Admin page routes, nested under `/admin/pages`
pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/", get(admin_list).post(create_page))
        .route("/{id}", get(get_by_id).put(update_page).delete(delete_page))
}

/// GET /api/pages
async fn list_published(State(state): State<AppState>) -> Result<Json<Vec<PageSegment>>, ApiError> {
    Ok(Json(state.pages.list_segments().await?))
}

/// GET /api/pages/{slug}
async fn get_by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<Page>, ApiError> {
    Ok(Json(state.pages.get_published_by_slug(&slug).await?))
}

/// GET /api/admin/pages
async fn admin_list(State(state): State<AppState>) -> Result<Json<Vec<PageSegment>>, ApiError> {
    Ok(Json(state.pages.list().await?))
}

/// GET /api/admin/pages/{id}
async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Page>, ApiError> {
    Ok(Json(state.pages.get_by_id(id).await?))
}

/// POST /api/admin/pages
async fn create_page(
    State(state): State<AppState>,
    Json(input): Json<PageInput>,
) -> Result<(StatusCode, Json<Page>), ApiError> {
    let page = state.pages.create(input).await?;
    Ok((StatusCode::CREATED, Json(page)))
}

/// PUT /api/admin/pages/{id}
async fn update_page(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<PageInput>,
) -> Result<Json<Page>, ApiError> {
    Ok(Json(state.pages.update(id, input).await?))
}

/// DELETE /api/admin/pages/{id}
async fn delete_page(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.pages.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

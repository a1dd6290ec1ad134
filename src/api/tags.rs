//! Tag API endpoints
//!
//! - GET /api/tags - All tags
//! - GET /api/tags/cloud?limit= - Tags with post counts, most used first
//! - GET /api/admin/tags/names - Display names for autocomplete
//! - /api/admin/tags - Create, rename, delete

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use serde::Deserialize;

use crate::api::middleware::{ApiError, AppState};
use crate::models::{Tag, TagWithCount};

/// Query parameters for the tag cloud
#[derive(Debug, Deserialize)]
pub struct CloudQuery {
    #[serde(default = "default_cloud_limit")]
    pub limit: usize,
}

fn default_cloud_limit() -> usize {
    50
}

/// Body for creating or renaming a tag
#[derive(Debug, Deserialize)]
pub struct TagRequest {
    pub display_name: String,
}

/// Public tag routes, nested under `/tags`
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_tags))
        .route("/cloud", get(tag_cloud))
}

/// Admin tag routes, nested under `/admin/tags`
pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_tags).post(create_tag))
        .route("/names", get(tag_names))
        .route("/{id}", put(update_tag).delete(delete_tag))
}

/// GET /api/tags
async fn list_tags(State(state): State<AppState>) -> Result<Json<Vec<Tag>>, ApiError> {
    Ok(Json(state.tags.list().await?))
}

/// GET /api/admin/tags/names
async fn tag_names(State(state): State<AppState>) -> Result<Json<Vec<String>>, ApiError> {
    Ok(Json(state.tags.names().await?))
}

/// GET /api/tags/cloud
async fn tag_cloud(
    State(state): State<AppState>,
    Query(query): Query<CloudQuery>,
) -> Result<Json<Vec<TagWithCount>>, ApiError> {
    Ok(Json(state.tags.cloud(query.limit.clamp(1, 500)).await?))
}

/// POST /api/admin/tags
async fn create_tag(
    State(state): State<AppState>,
    Json(body): Json<TagRequest>,
) -> Result<(StatusCode, Json<Tag>), ApiError> {
    let tag = state.tags.create(&body.display_name).await?;
    Ok((StatusCode::CREATED, Json(tag)))
}

/// PUT /api/admin/tags/{id}
async fn update_tag(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<TagRequest>,
) -> Result<Json<Tag>, ApiError> {
    Ok(Json(state.tags.update(id, &body.display_name).await?))
}

/// DELETE /api/admin/tags/{id}
async fn delete_tag(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.tags.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

//! Category API endpoints
//!
//! - GET /api/categories - Categories with post counts
//! - GET /api/categories/{route_name} - Single category
//! - /api/admin/categories - CRUD

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};

use crate::api::middleware::{ApiError, AppState};
use crate::models::{Category, CategoryInput, CategoryWithCount};

/// Public category routes, nested under `/categories`
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_categories))
        .route("/{route_name}", get(get_category))
}

/// Admin category routes, nested under `/admin/categories`
pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/", get(admin_list).post(create_category))
        .route(
            "/{id}",
            get(get_by_id).put(update_category).delete(delete_category),
        )
}

/// GET /api/categories
async fn list_categories(
    State(state): State<AppState>,
) -> Result<Json<Vec<CategoryWithCount>>, ApiError> {
    Ok(Json(state.categories.list_with_counts().await?))
}

/// GET /api/categories/{route_name}
async fn get_category(
    State(state): State<AppState>,
    Path(route_name): Path<String>,
) -> Result<Json<Category>, ApiError> {
    Ok(Json(state.categories.get_by_route_name(&route_name).await?))
}

/// GET /api/admin/categories
async fn admin_list(State(state): State<AppState>) -> Result<Json<Vec<Category>>, ApiError> {
    Ok(Json(state.categories.list().await?))
}

/// GET /api/admin/categories/{id}
async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Category>, ApiError> {
    Ok(Json(state.categories.get_by_id(id).await?))
}

/// POST /api/admin/categories
async fn create_category(
    State(state): State<AppState>,
    Json(input): Json<CategoryInput>,
) -> Result<(StatusCode, Json<Category>), ApiError> {
    let category = state.categories.create(input).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

/// PUT /api/admin/categories/{id}
async fn update_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<CategoryInput>,
) -> Result<Json<Category>, ApiError> {
    Ok(Json(state.categories.update(id, input).await?))
}

/// DELETE /api/admin/categories/{id}
async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.categories.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

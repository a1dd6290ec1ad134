//! Admin API endpoints
//!
//! - GET /api/admin/dashboard - Content counters
//! - GET /api/admin/settings - Every settings section
//! - GET|PUT /api/admin/settings/{section} - One section
//! - /api/admin/themes - Theme list, create, delete, activate
//! - GET|DELETE /api/admin/activity - Activity log
//! - DELETE /api/admin/cache[/{partition}] - Cache invalidation

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::Value;

use crate::api::common::{default_page, AffectedResponse, ListResponse};
use crate::api::middleware::{ApiError, AppState};
use crate::cache::{CacheLayer, CachePartition};
use crate::models::{ActivityLog, EventType, ListParams, Theme, ThemeInput};
use crate::services::{BlogSettings, DashboardStats};

#[derive(Debug, Deserialize)]
pub struct ActivityQuery {
    #[serde(default)]
    pub event_type: Option<EventType>,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default)]
    pub per_page: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct ClearActivityQuery {
    /// Keep entries newer than this many days; everything goes when absent
    #[serde(default)]
    pub older_than_days: Option<u32>,
}

/// Admin routes, merged under `/admin`
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/settings", get(all_settings))
        .route("/settings/{section}", get(get_settings).put(save_settings))
        .route("/themes", get(list_themes).post(create_theme))
        .route("/themes/{id}", get(get_theme).delete(delete_theme))
        .route("/themes/{id}/activate", post(activate_theme))
        .route("/activity", get(list_activity).delete(clear_activity))
        .route("/cache", delete(clear_cache))
        .route("/cache/{partition}", delete(clear_cache_partition))
}

/// GET /api/admin/dashboard
async fn dashboard(State(state): State<AppState>) -> Result<Json<DashboardStats>, ApiError> {
    Ok(Json(state.dashboard.stats().await?))
}

// ============================================================================
// Settings
// ============================================================================

/// GET /api/admin/settings
async fn all_settings(State(state): State<AppState>) -> Json<BlogSettings> {
    Json(state.config.all().await)
}

/// GET /api/admin/settings/{section}
async fn get_settings(
    State(state): State<AppState>,
    Path(section): Path<String>,
) -> Result<Json<Value>, ApiError> {
    Ok(Json(state.config.section_json(&section).await?))
}

/// PUT /api/admin/settings/{section}
async fn save_settings(
    State(state): State<AppState>,
    Path(section): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    Ok(Json(state.config.save_json(&section, body).await?))
}

// ============================================================================
// Themes
// ============================================================================

async fn list_themes(State(state): State<AppState>) -> Result<Json<Vec<Theme>>, ApiError> {
    Ok(Json(state.themes.list().await?))
}

async fn get_theme(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<Theme>, ApiError> {
    Ok(Json(state.themes.get_by_id(id).await?))
}

async fn create_theme(
    State(state): State<AppState>,
    Json(input): Json<ThemeInput>,
) -> Result<(StatusCode, Json<Theme>), ApiError> {
    let theme = state.themes.create(input).await?;
    Ok((StatusCode::CREATED, Json(theme)))
}

async fn delete_theme(State(state): State<AppState>, Path(id): Path<i64>) -> Result<StatusCode, ApiError> {
    state.themes.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn activate_theme(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<Theme>, ApiError> {
    Ok(Json(state.themes.activate(id).await?))
}

// ============================================================================
// Activity log
// ============================================================================

/// GET /api/admin/activity?event_type=&page=
async fn list_activity(
    State(state): State<AppState>,
    Query(query): Query<ActivityQuery>,
) -> Result<Json<ListResponse<ActivityLog>>, ApiError> {
    let params = ListParams::new(query.page, query.per_page.unwrap_or(20));
    let result = state.activity.list(query.event_type, &params).await?;
    Ok(Json(result.into()))
}

/// DELETE /api/admin/activity?older_than_days=
async fn clear_activity(
    State(state): State<AppState>,
    Query(query): Query<ClearActivityQuery>,
) -> Result<Json<AffectedResponse>, ApiError> {
    let affected = state.activity.clear(query.older_than_days).await?;
    Ok(Json(AffectedResponse { affected }))
}

// ============================================================================
// Cache
// ============================================================================

/// DELETE /api/admin/cache - Drop every cached entry
async fn clear_cache(State(state): State<AppState>) -> Result<StatusCode, ApiError> {
    state.cache.clear().await?;
    tracing::info!("Cache cleared");
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/admin/cache/{partition}
async fn clear_cache_partition(
    State(state): State<AppState>,
    Path(partition): Path<String>,
) -> Result<StatusCode, ApiError> {
    let partition: CachePartition = partition.parse().map_err(ApiError::not_found)?;
    state.cache.invalidate(&[partition]).await;
    tracing::info!("Cache partition {} cleared", partition.prefix());
    Ok(StatusCode::NO_CONTENT)
}

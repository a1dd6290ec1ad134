//! Post statistics endpoints
//!
//! - GET /api/stats/{post_id} - Hits and likes
//! - POST /api/stats/{post_id}/hit - Count a view (once per client per hour)
//! - POST /api/stats/{post_id}/like - Like a post (once per client per day)

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use crate::api::middleware::{ApiError, AppState, ClientInfo};
use crate::models::PostStats;

#[derive(Debug, Serialize)]
pub struct HitResponse {
    /// False when this client's hit was already counted
    pub counted: bool,
}

/// Statistics routes, nested under `/stats`
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{post_id}", get(get_stats))
        .route("/{post_id}/hit", post(hit))
        .route("/{post_id}/like", post(like))
}

async fn get_stats(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
) -> Result<Json<PostStats>, ApiError> {
    Ok(Json(state.statistics.get(post_id).await?))
}

async fn hit(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
    client: ClientInfo,
) -> Result<Json<HitResponse>, ApiError> {
    let counted = state.statistics.hit(post_id, &client.key()).await?;
    Ok(Json(HitResponse { counted }))
}

async fn like(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
    client: ClientInfo,
) -> Result<Json<PostStats>, ApiError> {
    Ok(Json(state.statistics.like(post_id, &client.key()).await?))
}

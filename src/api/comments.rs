//! Comment API endpoints
//!
//! - GET /api/comments/{post_id} - Approved comments of a post
//! - POST /api/comments/{post_id} - Leave a comment
//! - /api/admin/comments - Moderation and replies

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::common::{AffectedResponse, IdsRequest, ListResponse, PaginationQuery};
use crate::api::middleware::{ApiError, AppState, ClientInfo};
use crate::models::{CommentDetail, CommentReply, CommentView, CreateCommentInput};
use crate::services::CommentClient;

/// Result of leaving a comment
#[derive(Debug, Serialize)]
pub struct CommentCreatedResponse {
    pub id: i64,
    /// False while the comment waits for review
    pub is_approved: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApprovalResponse {
    pub is_approved: bool,
}

#[derive(Debug, Deserialize)]
pub struct ReplyRequest {
    pub content: String,
}

/// Public comment routes, nested under `/comments`
pub fn router() -> Router<AppState> {
    Router::new().route("/{post_id}", get(list_comments).post(create_comment))
}

/// Admin comment routes, nested under `/admin/comments`
pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/", get(admin_list).delete(delete_comments))
        .route("/{id}/approval", put(toggle_approval))
        .route("/{id}/reply", post(reply))
        .route("/replies/{id}", delete(delete_reply))
}

/// GET /api/comments/{post_id}
async fn list_comments(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
) -> Result<Json<Vec<CommentView>>, ApiError> {
    Ok(Json(state.comments.list_for_post(post_id).await?))
}

/// POST /api/comments/{post_id}
async fn create_comment(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
    client: ClientInfo,
    Json(input): Json<CreateCommentInput>,
) -> Result<(StatusCode, Json<CommentCreatedResponse>), ApiError> {
    let comment = state
        .comments
        .create(
            post_id,
            input,
            CommentClient {
                ip_address: client.ip,
                user_agent: client.user_agent,
            },
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CommentCreatedResponse {
            id: comment.id,
            is_approved: comment.is_approved,
            created_at: comment.created_at,
        }),
    ))
}

/// GET /api/admin/comments
async fn admin_list(
    State(state): State<AppState>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<ListResponse<CommentDetail>>, ApiError> {
    let result = state.comments.list_detailed(&query.params(20)).await?;
    Ok(Json(result.into()))
}

/// PUT /api/admin/comments/{id}/approval - Flip the approval state
async fn toggle_approval(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApprovalResponse>, ApiError> {
    let is_approved = state.comments.toggle_approval(id).await?;
    Ok(Json(ApprovalResponse { is_approved }))
}

/// DELETE /api/admin/comments
async fn delete_comments(
    State(state): State<AppState>,
    Json(body): Json<IdsRequest>,
) -> Result<Json<AffectedResponse>, ApiError> {
    let affected = state.comments.delete(&body.ids).await?;
    Ok(Json(AffectedResponse {
        affected: affected as u64,
    }))
}

/// POST /api/admin/comments/{id}/reply
async fn reply(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<ReplyRequest>,
) -> Result<(StatusCode, Json<CommentReply>), ApiError> {
    let reply = state.comments.reply(id, &body.content).await?;
    Ok((StatusCode::CREATED, Json(reply)))
}

/// DELETE /api/admin/comments/replies/{id}
async fn delete_reply(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.comments.delete_reply(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

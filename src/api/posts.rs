//! Post API endpoints
//!
//! Public:
//! - GET /api/posts - Published posts
//! - GET /api/posts/featured - Featured posts
//! - GET /api/posts/search?q= - Keyword search
//! - GET /api/posts/archive[/{year}[/{month}]] - Archive buckets / posts by date
//! - GET /api/posts/category/{route_name} - Posts in a category
//! - GET /api/posts/tag/{name} - Posts with a tag
//! - GET /api/post/{year}/{month}/{day}/{slug} - Single post
//!
//! Admin (`/api/admin/posts`): CRUD, publish/unpublish, drafts, recycle bin.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::common::{default_page, AffectedResponse, ListResponse, PaginationQuery};
use crate::api::middleware::{ApiError, AppState};
use crate::models::{Archive, ListParams, Post, PostCounts, PostDigest, PostEditInput, PostStatusFilter};
use crate::services::PostListFilter;

/// Post with its rendered body
#[derive(Debug, Serialize)]
pub struct PostResponse {
    #[serde(flatten)]
    pub post: Post,
    pub content_html: String,
}

impl From<Post> for PostResponse {
    fn from(post: Post) -> Self {
        let content_html = post.content_html();
        Self { post, content_html }
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default)]
    pub per_page: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct AdminListQuery {
    #[serde(default)]
    pub status: PostStatusFilter,
    #[serde(default)]
    pub keyword: Option<String>,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default)]
    pub per_page: Option<u32>,
}

/// Public post routes, nested under `/posts`
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_posts))
        .route("/featured", get(list_featured))
        .route("/search", get(search_posts))
        .route("/archive", get(archive))
        .route("/archive/{year}", get(list_by_year))
        .route("/archive/{year}/{month}", get(list_by_month))
        .route("/category/{route_name}", get(list_by_category))
        .route("/tag/{name}", get(list_by_tag))
}

/// Single post route, nested under `/post`
pub fn post_router() -> Router<AppState> {
    Router::new().route("/{year}/{month}/{day}/{slug}", get(get_post))
}

/// Admin post routes, nested under `/admin/posts`
pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/", get(admin_list).post(create_post))
        .route("/counts", get(counts))
        .route("/drafts", get(list_drafts))
        .route("/recycle-bin", get(list_recycle_bin).delete(empty_recycle_bin))
        .route("/{id}", get(get_by_id).put(update_post).delete(delete_post))
        .route("/{id}/publish", post(publish_post))
        .route("/{id}/unpublish", post(unpublish_post))
        .route("/{id}/restore", post(restore_post))
        .route("/{id}/purge", delete(purge_post))
}

async fn page_size(state: &AppState) -> u32 {
    state.config.content().await.posts_per_page
}

async fn list_filtered(
    state: &AppState,
    filter: PostListFilter,
    query: &PaginationQuery,
) -> Result<Json<ListResponse<PostDigest>>, ApiError> {
    let params = query.params(page_size(state).await);
    let result = state.posts.list(filter, &params).await?;
    Ok(Json(result.into()))
}

/// GET /api/posts
async fn list_posts(
    State(state): State<AppState>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<ListResponse<PostDigest>>, ApiError> {
    list_filtered(&state, PostListFilter::All, &query).await
}

/// GET /api/posts/featured
async fn list_featured(
    State(state): State<AppState>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<ListResponse<PostDigest>>, ApiError> {
    list_filtered(&state, PostListFilter::Featured, &query).await
}

/// GET /api/posts/category/{route_name}
async fn list_by_category(
    State(state): State<AppState>,
    Path(route_name): Path<String>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<ListResponse<PostDigest>>, ApiError> {
    list_filtered(&state, PostListFilter::Category(route_name), &query).await
}

/// GET /api/posts/tag/{name}
async fn list_by_tag(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<ListResponse<PostDigest>>, ApiError> {
    list_filtered(&state, PostListFilter::Tag(name), &query).await
}

/// GET /api/posts/search?q=
async fn search_posts(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<ListResponse<PostDigest>>, ApiError> {
    let per_page = query.per_page.unwrap_or(page_size(&state).await);
    let params = ListParams::new(query.page, per_page);
    let result = state.posts.search(&query.q, &params).await?;
    Ok(Json(result.into()))
}

/// GET /api/posts/archive
async fn archive(State(state): State<AppState>) -> Result<Json<Vec<Archive>>, ApiError> {
    Ok(Json(state.posts.archive().await?))
}

/// GET /api/posts/archive/{year}
async fn list_by_year(
    State(state): State<AppState>,
    Path(year): Path<i32>,
) -> Result<Json<Vec<PostDigest>>, ApiError> {
    Ok(Json(state.posts.list_by_date(year, None).await?))
}

/// GET /api/posts/archive/{year}/{month}
async fn list_by_month(
    State(state): State<AppState>,
    Path((year, month)): Path<(i32, u32)>,
) -> Result<Json<Vec<PostDigest>>, ApiError> {
    Ok(Json(state.posts.list_by_date(year, Some(month)).await?))
}

/// GET /api/post/{year}/{month}/{day}/{slug}
async fn get_post(
    State(state): State<AppState>,
    Path((year, month, day, slug)): Path<(i32, u32, u32, String)>,
) -> Result<Json<PostResponse>, ApiError> {
    let post = state.posts.get_by_slug(year, month, day, &slug).await?;
    Ok(Json(post.into()))
}

// ============================================================================
// Admin
// ============================================================================

/// GET /api/admin/posts?status=&keyword=
async fn admin_list(
    State(state): State<AppState>,
    Query(query): Query<AdminListQuery>,
) -> Result<Json<ListResponse<PostDigest>>, ApiError> {
    let params = ListParams::new(query.page, query.per_page.unwrap_or(20));
    let result = state
        .posts
        .list_admin(query.status, query.keyword.as_deref(), &params)
        .await?;
    Ok(Json(result.into()))
}

/// GET /api/admin/posts/counts
async fn counts(State(state): State<AppState>) -> Result<Json<PostCounts>, ApiError> {
    Ok(Json(state.posts.counts().await?))
}

/// GET /api/admin/posts/drafts
async fn list_drafts(
    State(state): State<AppState>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<ListResponse<PostDigest>>, ApiError> {
    let result = state.posts.list_drafts(&query.params(20)).await?;
    Ok(Json(result.into()))
}

/// GET /api/admin/posts/recycle-bin
async fn list_recycle_bin(
    State(state): State<AppState>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<ListResponse<PostDigest>>, ApiError> {
    let result = state.posts.list_recycle_bin(&query.params(20)).await?;
    Ok(Json(result.into()))
}

/// DELETE /api/admin/posts/recycle-bin
async fn empty_recycle_bin(
    State(state): State<AppState>,
) -> Result<Json<AffectedResponse>, ApiError> {
    let affected = state.posts.empty_recycle_bin().await?;
    Ok(Json(AffectedResponse { affected }))
}

/// GET /api/admin/posts/{id}
async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<PostResponse>, ApiError> {
    Ok(Json(state.posts.get_by_id(id).await?.into()))
}

/// POST /api/admin/posts
async fn create_post(
    State(state): State<AppState>,
    Json(input): Json<PostEditInput>,
) -> Result<(StatusCode, Json<PostResponse>), ApiError> {
    let post = state.posts.create(input).await?;
    Ok((StatusCode::CREATED, Json(post.into())))
}

/// PUT /api/admin/posts/{id}
async fn update_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<PostEditInput>,
) -> Result<Json<PostResponse>, ApiError> {
    Ok(Json(state.posts.update(id, input).await?.into()))
}

/// POST /api/admin/posts/{id}/publish
async fn publish_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<PostResponse>, ApiError> {
    Ok(Json(state.posts.publish(id).await?.into()))
}

/// POST /api/admin/posts/{id}/unpublish
async fn unpublish_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<PostResponse>, ApiError> {
    Ok(Json(state.posts.unpublish(id).await?.into()))
}

/// DELETE /api/admin/posts/{id} - Move to the recycle bin
async fn delete_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.posts.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/admin/posts/{id}/restore
async fn restore_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.posts.restore(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/admin/posts/{id}/purge
async fn purge_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.posts.purge(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

//! Friend link, menu and widget endpoints
//!
//! Public reads:
//! - GET /api/friendlinks
//! - GET /api/menus
//! - GET /api/widgets - Enabled widgets in display order
//!
//! Admin CRUD under `/api/admin/friendlinks`, `/api/admin/menus` and
//! `/api/admin/widgets`.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};

use crate::api::middleware::{ApiError, AppState};
use crate::models::{FriendLink, FriendLinkInput, Menu, MenuInput, Widget, WidgetInput};

/// Public routes, merged at the API root
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/friendlinks", get(list_friend_links))
        .route("/menus", get(list_menus))
        .route("/widgets", get(list_enabled_widgets))
}

/// Admin routes, merged under `/admin`
pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/friendlinks", get(list_friend_links).post(create_friend_link))
        .route(
            "/friendlinks/{id}",
            get(get_friend_link)
                .put(update_friend_link)
                .delete(delete_friend_link),
        )
        .route("/menus", get(list_menus).post(create_menu))
        .route("/menus/{id}", get(get_menu).put(update_menu).delete(delete_menu))
        .route("/widgets", get(list_widgets).post(create_widget))
        .route(
            "/widgets/{id}",
            get(get_widget).put(update_widget).delete(delete_widget),
        )
}

// ============================================================================
// Friend links
// ============================================================================

async fn list_friend_links(State(state): State<AppState>) -> Result<Json<Vec<FriendLink>>, ApiError> {
    Ok(Json(state.friend_links.list().await?))
}

async fn get_friend_link(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<FriendLink>, ApiError> {
    Ok(Json(state.friend_links.get_by_id(id).await?))
}

async fn create_friend_link(
    State(state): State<AppState>,
    Json(input): Json<FriendLinkInput>,
) -> Result<(StatusCode, Json<FriendLink>), ApiError> {
    let link = state.friend_links.create(input).await?;
    Ok((StatusCode::CREATED, Json(link)))
}

async fn update_friend_link(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<FriendLinkInput>,
) -> Result<Json<FriendLink>, ApiError> {
    Ok(Json(state.friend_links.update(id, input).await?))
}

async fn delete_friend_link(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.friend_links.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Menus
// ============================================================================

async fn list_menus(State(state): State<AppState>) -> Result<Json<Vec<Menu>>, ApiError> {
    Ok(Json(state.menus.list().await?))
}

async fn get_menu(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<Menu>, ApiError> {
    Ok(Json(state.menus.get_by_id(id).await?))
}

async fn create_menu(
    State(state): State<AppState>,
    Json(input): Json<MenuInput>,
) -> Result<(StatusCode, Json<Menu>), ApiError> {
    let menu = state.menus.create(input).await?;
    Ok((StatusCode::CREATED, Json(menu)))
}

async fn update_menu(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<MenuInput>,
) -> Result<Json<Menu>, ApiError> {
    Ok(Json(state.menus.update(id, input).await?))
}

async fn delete_menu(State(state): State<AppState>, Path(id): Path<i64>) -> Result<StatusCode, ApiError> {
    state.menus.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Widgets
// ============================================================================

async fn list_enabled_widgets(State(state): State<AppState>) -> Result<Json<Vec<Widget>>, ApiError> {
    Ok(Json(state.widgets.list_enabled().await?))
}

async fn list_widgets(State(state): State<AppState>) -> Result<Json<Vec<Widget>>, ApiError> {
    Ok(Json(state.widgets.list().await?))
}

async fn get_widget(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<Widget>, ApiError> {
    Ok(Json(state.widgets.get_by_id(id).await?))
}

async fn create_widget(
    State(state): State<AppState>,
    Json(input): Json<WidgetInput>,
) -> Result<(StatusCode, Json<Widget>), ApiError> {
    let widget = state.widgets.create(input).await?;
    Ok((StatusCode::CREATED, Json(widget)))
}

async fn update_widget(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<WidgetInput>,
) -> Result<Json<Widget>, ApiError> {
    Ok(Json(state.widgets.update(id, input).await?))
}

async fn delete_widget(State(state): State<AppState>, Path(id): Path<i64>) -> Result<StatusCode, ApiError> {
    state.widgets.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

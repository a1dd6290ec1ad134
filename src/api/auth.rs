//! Authentication and account endpoints
//!
//! - POST /api/auth/login - Open a session (also sets the `session` cookie)
//! - POST /api/admin/auth/logout - Close the current session
//! - GET /api/admin/auth/me - Current account
//! - PUT /api/admin/auth/password - Change own password
//! - /api/admin/accounts - Account management

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::IntoResponse,
    routing::{get, post, put},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser, ClientInfo, SessionToken};
use crate::models::{Account, CreateAccountInput};
use crate::services::{ChangePasswordInput, LoginInput};

const CLEAR_SESSION_COOKIE: &str = "session=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0";

/// Response for a successful login
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub account: Account,
}

/// Public auth routes, nested under `/auth`
pub fn public_router() -> Router<AppState> {
    Router::new().route("/login", post(login))
}

/// Session routes for a logged-in account, nested under `/admin/auth`
pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/logout", post(logout))
        .route("/me", get(me))
        .route("/password", put(change_password))
}

/// Account management, nested under `/admin/accounts`
pub fn accounts_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_accounts).post(create_account))
        .route("/{id}", get(get_account).delete(delete_account))
}

/// POST /api/auth/login
async fn login(
    State(state): State<AppState>,
    client: ClientInfo,
    Json(body): Json<LoginInput>,
) -> Result<impl IntoResponse, ApiError> {
    let (session, account) = state
        .accounts
        .login(body, client.ip_addr(), client.user_agent.as_deref())
        .await?;

    let max_age = (session.expires_at - Utc::now()).num_seconds().max(0);
    let cookie = format!(
        "session={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        session.id, max_age
    );
    let mut headers = HeaderMap::new();
    headers.insert(
        header::SET_COOKIE,
        HeaderValue::from_str(&cookie).map_err(|e| ApiError::internal_error(e.to_string()))?,
    );

    Ok((
        headers,
        Json(LoginResponse {
            token: session.id,
            expires_at: session.expires_at,
            account,
        }),
    ))
}

/// POST /api/admin/auth/logout
async fn logout(
    State(state): State<AppState>,
    Extension(SessionToken(token)): Extension<SessionToken>,
) -> Result<impl IntoResponse, ApiError> {
    state.accounts.logout(&token).await?;

    let mut headers = HeaderMap::new();
    headers.insert(header::SET_COOKIE, HeaderValue::from_static(CLEAR_SESSION_COOKIE));
    Ok((StatusCode::NO_CONTENT, headers))
}

/// GET /api/admin/auth/me
async fn me(AuthenticatedUser(account): AuthenticatedUser) -> Json<Account> {
    Json(account)
}

/// PUT /api/admin/auth/password
async fn change_password(
    State(state): State<AppState>,
    AuthenticatedUser(account): AuthenticatedUser,
    Json(body): Json<ChangePasswordInput>,
) -> Result<StatusCode, ApiError> {
    state.accounts.change_password(account.id, body).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/admin/accounts
async fn list_accounts(State(state): State<AppState>) -> Result<Json<Vec<Account>>, ApiError> {
    Ok(Json(state.accounts.list().await?))
}

/// GET /api/admin/accounts/{id}
async fn get_account(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Account>, ApiError> {
    Ok(Json(state.accounts.get_by_id(id).await?))
}

/// POST /api/admin/accounts
async fn create_account(
    State(state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    Json(body): Json<CreateAccountInput>,
) -> Result<(StatusCode, Json<Account>), ApiError> {
    let account = state.accounts.create(body, &actor).await?;
    Ok((StatusCode::CREATED, Json(account)))
}

/// DELETE /api/admin/accounts/{id}
async fn delete_account(
    State(state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.accounts.delete(id, &actor).await?;
    Ok(StatusCode::NO_CONTENT)
}

//! API middleware
//!
//! Contains:
//! - Application state shared by every handler
//! - `ApiError` and the mapping from service errors
//! - Authentication (session token validation)
//! - Client address / user agent extraction

use axum::{
    extract::{ConnectInfo, FromRequestParts, Request, State},
    http::{header, request::Parts, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use crate::cache::Cache;
use crate::config::Config;
use crate::db::repositories::{
    SqlxActivityLogRepository, SqlxCategoryRepository, SqlxCommentRepository,
    SqlxFriendLinkRepository, SqlxMenuRepository, SqlxMentionRepository, SqlxPageRepository,
    SqlxPostRepository, SqlxSessionRepository, SqlxSettingsRepository, SqlxTagRepository,
    SqlxThemeRepository, SqlxUserRepository, SqlxWidgetRepository,
};
use crate::db::DynDatabasePool;
use crate::models::Account;
use crate::services::*;

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub pool: DynDatabasePool,
    pub cache: Arc<Cache>,
    pub config: Arc<BlogConfigService>,
    pub activity: Arc<ActivityLogService>,
    pub accounts: Arc<AccountService>,
    pub posts: Arc<PostService>,
    pub tags: Arc<TagService>,
    pub categories: Arc<CategoryService>,
    pub pages: Arc<PageService>,
    pub comments: Arc<CommentService>,
    pub friend_links: Arc<FriendLinkService>,
    pub menus: Arc<MenuService>,
    pub widgets: Arc<WidgetService>,
    pub themes: Arc<ThemeService>,
    pub statistics: Arc<StatisticsService>,
    pub mentions: Arc<MentionService>,
    pub sitemap: Arc<SitemapService>,
    pub dashboard: Arc<DashboardService>,
}

impl AppState {
    /// Wire every service over `pool`. Runtime blog settings are loaded from
    /// the database here.
    pub async fn new(
        pool: DynDatabasePool,
        cache: Arc<Cache>,
        remote: Arc<dyn RemoteFetcher>,
        config: &Config,
    ) -> anyhow::Result<Self> {
        let base_url = config.base_url().to_string();

        let activity = Arc::new(ActivityLogService::new(SqlxActivityLogRepository::boxed(
            pool.clone(),
        )));
        let blog_config = Arc::new(
            BlogConfigService::load(
                SqlxSettingsRepository::boxed(pool.clone()),
                cache.clone(),
                activity.clone(),
            )
            .await?,
        );

        let post_repo = SqlxPostRepository::boxed(pool.clone());
        let category_repo = SqlxCategoryRepository::boxed(pool.clone());
        let tag_repo = SqlxTagRepository::boxed(pool.clone());
        let page_repo = SqlxPageRepository::boxed(pool.clone());
        let comment_repo = SqlxCommentRepository::boxed(pool.clone());
        let mention_repo = SqlxMentionRepository::boxed(pool.clone());

        let accounts = Arc::new(
            AccountService::new(
                SqlxUserRepository::boxed(pool.clone()),
                SqlxSessionRepository::boxed(pool.clone()),
                activity.clone(),
            )
            .with_session_days(config.auth.session_days),
        );
        let tags = Arc::new(TagService::new(
            tag_repo.clone(),
            cache.clone(),
            blog_config.clone(),
            activity.clone(),
        ));
        let mentions = Arc::new(MentionService::new(
            mention_repo.clone(),
            post_repo.clone(),
            remote,
            blog_config.clone(),
            activity.clone(),
            base_url.clone(),
        ));
        let posts = Arc::new(
            PostService::new(
                post_repo.clone(),
                category_repo.clone(),
                tags.clone(),
                cache.clone(),
                blog_config.clone(),
                activity.clone(),
            )
            .with_mentions(mentions.clone()),
        );

        Ok(Self {
            categories: Arc::new(CategoryService::new(
                category_repo.clone(),
                cache.clone(),
                activity.clone(),
            )),
            pages: Arc::new(PageService::new(page_repo.clone(), cache.clone(), activity.clone())),
            comments: Arc::new(CommentService::new(
                comment_repo.clone(),
                post_repo.clone(),
                blog_config.clone(),
                activity.clone(),
            )),
            friend_links: Arc::new(FriendLinkService::new(
                SqlxFriendLinkRepository::boxed(pool.clone()),
                cache.clone(),
                activity.clone(),
            )),
            menus: Arc::new(MenuService::new(
                SqlxMenuRepository::boxed(pool.clone()),
                cache.clone(),
                activity.clone(),
            )),
            widgets: Arc::new(WidgetService::new(
                SqlxWidgetRepository::boxed(pool.clone()),
                cache.clone(),
                activity.clone(),
            )),
            themes: Arc::new(ThemeService::new(
                SqlxThemeRepository::boxed(pool.clone()),
                cache.clone(),
                blog_config.clone(),
                activity.clone(),
            )),
            statistics: Arc::new(StatisticsService::new(post_repo.clone(), cache.clone())),
            sitemap: Arc::new(SitemapService::new(
                post_repo.clone(),
                page_repo.clone(),
                cache.clone(),
                blog_config.clone(),
                base_url,
            )),
            dashboard: Arc::new(DashboardService::new(
                post_repo,
                category_repo,
                tag_repo,
                page_repo,
                comment_repo,
                mention_repo,
            )),
            pool,
            cache,
            config: blog_config,
            activity,
            accounts,
            posts,
            tags,
            mentions,
        })
    }
}

/// Authenticated account extracted from request
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub Account);

/// Session token of the authenticated request
#[derive(Debug, Clone)]
pub struct SessionToken(pub String);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))
    }
}

/// Caller address and user agent
#[derive(Debug, Clone, Default)]
pub struct ClientInfo {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

impl ClientInfo {
    pub fn ip_addr(&self) -> Option<IpAddr> {
        self.ip.as_deref().and_then(|ip| ip.parse().ok())
    }

    /// Key used to dedupe per-client counters
    pub fn key(&self) -> String {
        self.ip.clone().unwrap_or_else(|| "unknown".to_string())
    }
}

impl<S> FromRequestParts<S> for ClientInfo
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|info| info.0);
        Ok(Self {
            ip: crate::utils::client_ip(&parts.headers, peer),
            user_agent: parts
                .headers
                .get(header::USER_AGENT)
                .and_then(|h| h.to_str().ok())
                .map(String::from),
        })
    }
}

/// Error response for API errors
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: Some(details),
            },
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("UNAUTHORIZED", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new("FORBIDDEN", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", message)
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new("CONFLICT", message)
    }

    pub fn too_many_requests(message: impl Into<String>) -> Self {
        Self::new("TOO_MANY_REQUESTS", message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new("INTERNAL_ERROR", message)
    }

    fn internal(error: anyhow::Error) -> Self {
        tracing::error!("Request failed: {:#}", error);
        Self::internal_error("Internal server error")
    }

    pub fn status(&self) -> StatusCode {
        match self.error.code.as_str() {
            "UNAUTHORIZED" => StatusCode::UNAUTHORIZED,
            "FORBIDDEN" => StatusCode::FORBIDDEN,
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "VALIDATION_ERROR" => StatusCode::BAD_REQUEST,
            "CONFLICT" => StatusCode::CONFLICT,
            "TOO_MANY_REQUESTS" => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

// ============================================================================
// Service error mapping
// ============================================================================

impl From<AccountServiceError> for ApiError {
    fn from(e: AccountServiceError) -> Self {
        match e {
            AccountServiceError::AuthenticationError(msg) => Self::unauthorized(msg),
            AccountServiceError::TooManyRequests => Self::with_details(
                "TOO_MANY_REQUESTS",
                "Too many login attempts, try again later",
                serde_json::json!({ "retry_after": 900 }),
            ),
            AccountServiceError::NotFound(id) => Self::not_found(format!("Account not found: {}", id)),
            AccountServiceError::Conflict(msg) => Self::conflict(msg),
            AccountServiceError::Forbidden(msg) => Self::forbidden(msg),
            AccountServiceError::ValidationError(msg) => Self::validation_error(msg),
            AccountServiceError::InternalError(e) => Self::internal(e),
        }
    }
}

impl From<ActivityLogServiceError> for ApiError {
    fn from(e: ActivityLogServiceError) -> Self {
        match e {
            ActivityLogServiceError::ValidationError(msg) => Self::validation_error(msg),
            ActivityLogServiceError::InternalError(e) => Self::internal(e),
        }
    }
}

impl From<BlogConfigError> for ApiError {
    fn from(e: BlogConfigError) -> Self {
        match e {
            BlogConfigError::UnknownSection(name) => {
                Self::not_found(format!("Unknown settings section: {}", name))
            }
            BlogConfigError::ValidationError(msg) => Self::validation_error(msg),
            BlogConfigError::InternalError(e) => Self::internal(e),
        }
    }
}

impl From<CategoryServiceError> for ApiError {
    fn from(e: CategoryServiceError) -> Self {
        match e {
            CategoryServiceError::NotFound(msg) => Self::not_found(msg),
            CategoryServiceError::DuplicateRouteName(name) => {
                Self::conflict(format!("Category route name already exists: {}", name))
            }
            CategoryServiceError::ValidationError(msg) => Self::validation_error(msg),
            CategoryServiceError::InternalError(e) => Self::internal(e),
        }
    }
}

impl From<CommentServiceError> for ApiError {
    fn from(e: CommentServiceError) -> Self {
        match e {
            CommentServiceError::NotFound(msg) => Self::not_found(msg),
            CommentServiceError::PostNotFound(id) => Self::not_found(format!("Post not found: {}", id)),
            CommentServiceError::Disabled(msg) => Self::forbidden(msg),
            CommentServiceError::ValidationError(msg) => Self::validation_error(msg),
            CommentServiceError::InternalError(e) => Self::internal(e),
        }
    }
}

impl From<FriendLinkServiceError> for ApiError {
    fn from(e: FriendLinkServiceError) -> Self {
        match e {
            FriendLinkServiceError::NotFound(id) => {
                Self::not_found(format!("Friend link not found: {}", id))
            }
            FriendLinkServiceError::ValidationError(msg) => Self::validation_error(msg),
            FriendLinkServiceError::InternalError(e) => Self::internal(e),
        }
    }
}

impl From<MenuServiceError> for ApiError {
    fn from(e: MenuServiceError) -> Self {
        match e {
            MenuServiceError::NotFound(id) => Self::not_found(format!("Menu not found: {}", id)),
            MenuServiceError::ValidationError(msg) => Self::validation_error(msg),
            MenuServiceError::InternalError(e) => Self::internal(e),
        }
    }
}

impl From<MentionServiceError> for ApiError {
    fn from(e: MentionServiceError) -> Self {
        match e {
            MentionServiceError::Disabled(msg) => Self::forbidden(msg),
            MentionServiceError::TargetNotFound(msg) => Self::not_found(msg),
            MentionServiceError::Duplicate(msg) => Self::conflict(msg),
            MentionServiceError::ValidationError(msg)
            | MentionServiceError::SourceNotFound(msg)
            | MentionServiceError::NoLinkToTarget(msg)
            | MentionServiceError::NotMentionable(msg) => Self::validation_error(msg),
            MentionServiceError::InternalError(e) => Self::internal(e),
        }
    }
}

impl From<PageServiceError> for ApiError {
    fn from(e: PageServiceError) -> Self {
        match e {
            PageServiceError::NotFound(msg) => Self::not_found(msg),
            PageServiceError::DuplicateSlug(slug) => {
                Self::conflict(format!("Page slug already exists: {}", slug))
            }
            PageServiceError::ValidationError(msg) => Self::validation_error(msg),
            PageServiceError::InternalError(e) => Self::internal(e),
        }
    }
}

impl From<PostServiceError> for ApiError {
    fn from(e: PostServiceError) -> Self {
        match e {
            PostServiceError::NotFound(msg) => Self::not_found(msg),
            PostServiceError::ValidationError(msg) => Self::validation_error(msg),
            PostServiceError::DuplicateSlug(link) => {
                Self::conflict(format!("A post is already published at {}", link))
            }
            PostServiceError::InternalError(e) => Self::internal(e),
        }
    }
}

impl From<SitemapServiceError> for ApiError {
    fn from(e: SitemapServiceError) -> Self {
        match e {
            SitemapServiceError::Disabled => Self::not_found("Sitemap is disabled"),
            SitemapServiceError::InternalError(e) => Self::internal(e),
        }
    }
}

impl From<StatisticsServiceError> for ApiError {
    fn from(e: StatisticsServiceError) -> Self {
        match e {
            StatisticsServiceError::NotFound(id) => Self::not_found(format!("Post not found: {}", id)),
            StatisticsServiceError::TooManyRequests(msg) => Self::too_many_requests(msg),
            StatisticsServiceError::InternalError(e) => Self::internal(e),
        }
    }
}

impl From<TagServiceError> for ApiError {
    fn from(e: TagServiceError) -> Self {
        match e {
            TagServiceError::NotFound(msg) => Self::not_found(msg),
            TagServiceError::ValidationError(msg) => Self::validation_error(msg),
            TagServiceError::Conflict(msg) => Self::conflict(msg),
            TagServiceError::InternalError(e) => Self::internal(e),
        }
    }
}

impl From<ThemeServiceError> for ApiError {
    fn from(e: ThemeServiceError) -> Self {
        match e {
            ThemeServiceError::NotFound(id) => Self::not_found(format!("Theme not found: {}", id)),
            ThemeServiceError::ValidationError(msg) => Self::validation_error(msg),
            ThemeServiceError::Conflict(msg) => Self::conflict(msg),
            ThemeServiceError::Forbidden(msg) => Self::forbidden(msg),
            ThemeServiceError::InternalError(e) => Self::internal(e),
        }
    }
}

impl From<WidgetServiceError> for ApiError {
    fn from(e: WidgetServiceError) -> Self {
        match e {
            WidgetServiceError::NotFound(id) => Self::not_found(format!("Widget not found: {}", id)),
            WidgetServiceError::ValidationError(msg) => Self::validation_error(msg),
            WidgetServiceError::InternalError(e) => Self::internal(e),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        Self::internal(e)
    }
}

// ============================================================================
// Authentication
// ============================================================================

/// Extract session token from request
fn extract_session_token(request: &Request) -> Option<String> {
    if let Some(auth_header) = request.headers().get(header::AUTHORIZATION) {
        if let Ok(auth_str) = auth_header.to_str() {
            if let Some(token) = auth_str.strip_prefix("Bearer ") {
                return Some(token.to_string());
            }
        }
    }

    if let Some(cookie_header) = request.headers().get(header::COOKIE) {
        if let Ok(cookie_str) = cookie_header.to_str() {
            for cookie in cookie_str.split(';') {
                let cookie = cookie.trim();
                if let Some(token) = cookie.strip_prefix("session=") {
                    if !token.is_empty() {
                        return Some(token.to_string());
                    }
                }
            }
        }
    }

    None
}

/// Authentication middleware
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_session_token(&request)
        .ok_or_else(|| ApiError::unauthorized("Missing authentication token"))?;

    let account = state
        .accounts
        .validate_session(&token)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid or expired session"))?;

    request.extensions_mut().insert(AuthenticatedUser(account));
    request.extensions_mut().insert(SessionToken(token));
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request};

    fn create_request_with_auth(token: &str) -> Request<Body> {
        Request::builder()
            .uri("/test")
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap()
    }

    fn create_request_with_cookie(cookie: &str) -> Request<Body> {
        Request::builder()
            .uri("/test")
            .header(header::COOKIE, cookie)
            .body(Body::empty())
            .unwrap()
    }

    #[test]
    fn test_extract_session_token_from_bearer() {
        let request = create_request_with_auth("test-token-123");
        assert_eq!(extract_session_token(&request), Some("test-token-123".to_string()));
    }

    #[test]
    fn test_extract_session_token_from_cookie() {
        let request = create_request_with_cookie("theme=dark; session=test-token-456");
        assert_eq!(extract_session_token(&request), Some("test-token-456".to_string()));
    }

    #[test]
    fn test_extract_session_token_ignores_cleared_cookie() {
        let request = create_request_with_cookie("session=");
        assert!(extract_session_token(&request).is_none());
    }

    #[test]
    fn test_extract_session_token_bearer_priority() {
        let request = Request::builder()
            .uri("/test")
            .header(header::AUTHORIZATION, "Bearer bearer-token")
            .header(header::COOKIE, "session=cookie-token")
            .body(Body::empty())
            .unwrap();
        assert_eq!(extract_session_token(&request), Some("bearer-token".to_string()));
    }

    #[test]
    fn test_extract_session_token_invalid_bearer() {
        let request = Request::builder()
            .uri("/test")
            .header(header::AUTHORIZATION, "Basic invalid")
            .body(Body::empty())
            .unwrap();
        assert!(extract_session_token(&request).is_none());
    }

    #[test]
    fn test_api_error_status_codes() {
        assert_eq!(ApiError::unauthorized("x").status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::forbidden("x").status(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::not_found("x").status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::validation_error("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::conflict("x").status(), StatusCode::CONFLICT);
        assert_eq!(ApiError::too_many_requests("x").status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(ApiError::new("SOMETHING", "x").status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_api_error_with_details() {
        let details = serde_json::json!({"field": "username"});
        let error = ApiError::with_details("VALIDATION_ERROR", "Invalid", details.clone());
        assert_eq!(error.error.details, Some(details));
    }

    #[test]
    fn test_service_errors_map_to_codes() {
        let e: ApiError = PostServiceError::DuplicateSlug("2024/1/1/x".into()).into();
        assert_eq!(e.error.code, "CONFLICT");
        let e: ApiError = StatisticsServiceError::TooManyRequests("again".into()).into();
        assert_eq!(e.error.code, "TOO_MANY_REQUESTS");
        let e: ApiError = ThemeServiceError::Forbidden("system".into()).into();
        assert_eq!(e.error.code, "FORBIDDEN");
        let e: ApiError = MentionServiceError::NoLinkToTarget("x".into()).into();
        assert_eq!(e.error.code, "VALIDATION_ERROR");
        let e: ApiError = AccountServiceError::AuthenticationError("bad".into()).into();
        assert_eq!(e.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_internal_errors_hide_their_cause() {
        let cause = anyhow::anyhow!("no such table: posts").context("Failed to list posts");
        let e: ApiError = PostServiceError::InternalError(cause).into();
        assert_eq!(e.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(e.error.code, "INTERNAL_ERROR");
        assert_eq!(e.error.message, "Internal server error");
        assert!(e.error.details.is_none());
    }

    #[test]
    fn test_client_info_key() {
        let info = ClientInfo {
            ip: Some("8.8.8.8".into()),
            user_agent: None,
        };
        assert_eq!(info.key(), "8.8.8.8");
        assert_eq!(info.ip_addr(), Some("8.8.8.8".parse().unwrap()));
        assert_eq!(ClientInfo::default().key(), "unknown");
    }
}

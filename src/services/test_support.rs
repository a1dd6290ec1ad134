//! Shared fixtures for service tests

use crate::cache::{Cache, MemoryCache};
use crate::db::repositories::{
    SqlxActivityLogRepository, SqlxCategoryRepository, SqlxCommentRepository,
    SqlxFriendLinkRepository, SqlxMenuRepository, SqlxMentionRepository, SqlxPageRepository,
    SqlxPostRepository, SqlxSessionRepository, SqlxSettingsRepository, SqlxTagRepository,
    SqlxThemeRepository, SqlxUserRepository, SqlxWidgetRepository,
};
use crate::db::{create_test_pool, migrations, DynDatabasePool};
use crate::services::mention::{RemoteDocument, RemoteFetcher};
use crate::services::*;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub const TEST_BASE_URL: &str = "https://blog.example.com";

/// In-memory database with migrations applied plus the shared services
pub struct TestContext {
    pub pool: DynDatabasePool,
    pub cache: Arc<Cache>,
    pub activity: Arc<ActivityLogService>,
    pub config: Arc<BlogConfigService>,
}

impl TestContext {
    pub async fn new() -> Self {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let cache = Arc::new(MemoryCache::new());
        let activity = Arc::new(ActivityLogService::new(SqlxActivityLogRepository::boxed(
            pool.clone(),
        )));
        let config = Arc::new(
            BlogConfigService::load(
                SqlxSettingsRepository::boxed(pool.clone()),
                cache.clone(),
                activity.clone(),
            )
            .await
            .expect("Failed to load configuration"),
        );
        Self {
            pool,
            cache,
            activity,
            config,
        }
    }

    pub fn tag_service(&self) -> TagService {
        TagService::new(
            SqlxTagRepository::boxed(self.pool.clone()),
            self.cache.clone(),
            self.config.clone(),
            self.activity.clone(),
        )
    }

    pub fn category_service(&self) -> CategoryService {
        CategoryService::new(
            SqlxCategoryRepository::boxed(self.pool.clone()),
            self.cache.clone(),
            self.activity.clone(),
        )
    }

    pub fn post_service(&self) -> PostService {
        PostService::new(
            SqlxPostRepository::boxed(self.pool.clone()),
            SqlxCategoryRepository::boxed(self.pool.clone()),
            Arc::new(self.tag_service()),
            self.cache.clone(),
            self.config.clone(),
            self.activity.clone(),
        )
    }

    pub fn statistics_service(&self) -> StatisticsService {
        StatisticsService::new(SqlxPostRepository::boxed(self.pool.clone()), self.cache.clone())
    }

    pub fn page_service(&self) -> PageService {
        PageService::new(
            SqlxPageRepository::boxed(self.pool.clone()),
            self.cache.clone(),
            self.activity.clone(),
        )
    }

    pub fn friend_link_service(&self) -> FriendLinkService {
        FriendLinkService::new(
            SqlxFriendLinkRepository::boxed(self.pool.clone()),
            self.cache.clone(),
            self.activity.clone(),
        )
    }

    pub fn menu_service(&self) -> MenuService {
        MenuService::new(
            SqlxMenuRepository::boxed(self.pool.clone()),
            self.cache.clone(),
            self.activity.clone(),
        )
    }

    pub fn widget_service(&self) -> WidgetService {
        WidgetService::new(
            SqlxWidgetRepository::boxed(self.pool.clone()),
            self.cache.clone(),
            self.activity.clone(),
        )
    }

    pub fn comment_service(&self) -> CommentService {
        CommentService::new(
            SqlxCommentRepository::boxed(self.pool.clone()),
            SqlxPostRepository::boxed(self.pool.clone()),
            self.config.clone(),
            self.activity.clone(),
        )
    }

    pub fn theme_service(&self) -> ThemeService {
        ThemeService::new(
            SqlxThemeRepository::boxed(self.pool.clone()),
            self.cache.clone(),
            self.config.clone(),
            self.activity.clone(),
        )
    }

    pub fn mention_service(&self, remote: Arc<StaticRemote>) -> MentionService {
        MentionService::new(
            SqlxMentionRepository::boxed(self.pool.clone()),
            SqlxPostRepository::boxed(self.pool.clone()),
            remote,
            self.config.clone(),
            self.activity.clone(),
            TEST_BASE_URL,
        )
    }

    pub fn account_service(&self) -> AccountService {
        AccountService::new(
            SqlxUserRepository::boxed(self.pool.clone()),
            SqlxSessionRepository::boxed(self.pool.clone()),
            self.activity.clone(),
        )
    }

    pub fn sitemap_service(&self) -> SitemapService {
        SitemapService::new(
            SqlxPostRepository::boxed(self.pool.clone()),
            SqlxPageRepository::boxed(self.pool.clone()),
            self.cache.clone(),
            self.config.clone(),
            TEST_BASE_URL,
        )
    }

    pub fn dashboard_service(&self) -> DashboardService {
        DashboardService::new(
            SqlxPostRepository::boxed(self.pool.clone()),
            SqlxCategoryRepository::boxed(self.pool.clone()),
            SqlxTagRepository::boxed(self.pool.clone()),
            SqlxPageRepository::boxed(self.pool.clone()),
            SqlxCommentRepository::boxed(self.pool.clone()),
            SqlxMentionRepository::boxed(self.pool.clone()),
        )
    }
}

/// Canned remote web: pages are served from memory and outbound
/// notifications are recorded as `(kind, endpoint, source, target)`.
#[derive(Default)]
pub struct StaticRemote {
    pages: Mutex<HashMap<String, RemoteDocument>>,
    sent: Mutex<Vec<(String, String, String, String)>>,
}

impl StaticRemote {
    pub fn add_page(&self, url: &str, document: RemoteDocument) {
        self.pages.lock().unwrap().insert(url.to_string(), document);
    }

    pub fn sent(&self) -> Vec<(String, String, String, String)> {
        self.sent.lock().unwrap().clone()
    }

    fn record(&self, kind: &str, endpoint: &str, source: &str, target: &str) {
        self.sent.lock().unwrap().push((
            kind.to_string(),
            endpoint.to_string(),
            source.to_string(),
            target.to_string(),
        ));
    }
}

#[async_trait]
impl RemoteFetcher for StaticRemote {
    async fn fetch(&self, url: &str) -> Result<Option<RemoteDocument>> {
        Ok(self.pages.lock().unwrap().get(url).cloned())
    }

    async fn send_webmention(&self, endpoint: &str, source: &str, target: &str) -> Result<()> {
        self.record("webmention", endpoint, source, target);
        Ok(())
    }

    async fn send_pingback(&self, endpoint: &str, source: &str, target: &str) -> Result<()> {
        self.record("pingback", endpoint, source, target);
        Ok(())
    }
}

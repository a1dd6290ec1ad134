//! Services layer - Business logic
//!
//! This module contains all business logic services for the Moonglade blog.
//! Services are responsible for:
//! - Implementing business rules
//! - Coordinating between repositories and cache
//! - Handling validation and error cases

pub mod account;
pub mod activity_log;
pub mod blog_config;
pub mod category;
pub mod comment;
pub mod dashboard;
pub mod friend_link;
pub mod mention;
pub mod menu;
pub mod page;
pub mod password;
pub mod post;
pub mod rate_limiter;
pub mod sitemap;
pub mod statistics;
pub mod tag;
pub mod theme;
pub mod widget;
pub mod word_filter;

#[cfg(test)]
pub(crate) mod test_support;

pub use account::{AccountService, AccountServiceError, ChangePasswordInput, LoginInput};
pub use activity_log::{ActivityLogService, ActivityLogServiceError};
pub use blog_config::{
    AdvancedSettings, AppearanceSettings, BlogConfigError, BlogConfigService, BlogSettings,
    CommentSettings, ContentSettings, GeneralSettings,
};
pub use category::{CategoryService, CategoryServiceError};
pub use comment::{CommentClient, CommentService, CommentServiceError};
pub use dashboard::{DashboardService, DashboardStats};
pub use friend_link::{FriendLinkService, FriendLinkServiceError};
pub use mention::{HttpRemote, MentionService, MentionServiceError, RemoteFetcher};
pub use menu::{MenuService, MenuServiceError};
pub use page::{PageService, PageServiceError};
pub use password::{hash_password, validate_password, verify_password};
pub use post::{PostListFilter, PostService, PostServiceError};
pub use rate_limiter::LoginRateLimiter;
pub use sitemap::{SitemapService, SitemapServiceError};
pub use statistics::{StatisticsService, StatisticsServiceError};
pub use tag::{TagService, TagServiceError};
pub use theme::{ThemeService, ThemeServiceError};
pub use widget::{WidgetService, WidgetServiceError};
pub use word_filter::WordFilter;

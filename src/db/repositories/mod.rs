//! Database repositories
//!
//! One repository per entity. Each exposes an `#[async_trait]` trait and a
//! SQLx implementation over the shared SQLite pool.

pub mod activity_log;
pub mod category;
pub mod comment;
pub mod friend_link;
pub mod menu;
pub mod mention;
pub mod page;
pub mod post;
pub mod session;
pub mod settings;
pub mod tag;
pub mod theme;
pub mod user;
pub mod widget;

pub use activity_log::{ActivityLogRepository, SqlxActivityLogRepository};
pub use category::{CategoryRepository, SqlxCategoryRepository};
pub use comment::{CommentRepository, SqlxCommentRepository};
pub use friend_link::{FriendLinkRepository, SqlxFriendLinkRepository};
pub use menu::{MenuRepository, SqlxMenuRepository};
pub use mention::{MentionRepository, SqlxMentionRepository};
pub use page::{PageRepository, SqlxPageRepository};
pub use post::{PostFilter, PostRepository, SqlxPostRepository};
pub use session::{SessionRepository, SqlxSessionRepository};
pub use settings::{ConfigEntry, SettingsRepository, SqlxSettingsRepository};
pub use tag::{SqlxTagRepository, TagRepository};
pub use theme::{SqlxThemeRepository, ThemeRepository};
pub use user::{SqlxUserRepository, UserRepository};
pub use widget::{SqlxWidgetRepository, WidgetRepository};

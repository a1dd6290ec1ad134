//! Data models
//!
//! Database entities, editor inputs and the list/paging types shared by
//! repositories, services and the API layer.

mod activity_log;
mod category;
mod comment;
mod friend_link;
mod menu;
mod mention;
mod page;
mod pagination;
mod post;
mod session;
mod tag;
mod theme;
mod user;
mod widget;

pub use activity_log::{ActivityLog, EventType, NewActivity};
pub use category::{Category, CategoryInput, CategoryWithCount};
pub use comment::{
    Comment, CommentDetail, CommentOrder, CommentReply, CommentView, CreateCommentInput,
};
pub use friend_link::{FriendLink, FriendLinkInput};
pub use menu::{Menu, MenuInput, SubMenu};
pub use mention::{Mention, MentionWorker};
pub use page::{Page, PageInput, PageSegment};
pub use pagination::{ListParams, PagedResult};
pub use post::{
    build_route_link, parse_route_link, Archive, ContentType, Post, PostDigest, PostEditInput,
    PostCounts, PostStats, PostStatusFilter,
};
pub use session::Session;
pub use tag::{Tag, TagWithCount};
pub use theme::{Theme, ThemeInput};
pub use user::{Account, CreateAccountInput};
pub use widget::{Widget, WidgetInput, WidgetType};

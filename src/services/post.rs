//! Post service
//!
//! Editing, publishing and querying posts. A post gets its publish date the
//! first time it is published; the date and slug form its route link
//! (`yyyy/M/d/slug`), which is unique across all posts.

use crate::cache::{Cache, CachePartition};
use crate::db::repositories::{CategoryRepository, PostFilter, PostRepository};
use crate::models::{
    build_route_link, Archive, ContentType, EventType, ListParams, NewActivity, PagedResult, Post,
    PostCounts, PostDigest, PostEditInput, PostStatusFilter,
};
use crate::services::{ActivityLogService, BlogConfigService, MentionService, TagService, TagServiceError};
use crate::utils::{generate_slug, get_post_abstract, sterilize_link};
use anyhow::Context;
use chrono::{TimeZone, Utc};
use std::sync::Arc;

/// Maximum title length, in characters
const MAX_TITLE_LENGTH: usize = 128;

/// Error types for post service operations
#[derive(Debug, thiserror::Error)]
pub enum PostServiceError {
    #[error("Post not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Another post already owns the route link
    #[error("Post slug already exists: {0}")]
    DuplicateSlug(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

impl From<TagServiceError> for PostServiceError {
    fn from(e: TagServiceError) -> Self {
        match e {
            TagServiceError::ValidationError(msg) | TagServiceError::Conflict(msg) => Self::ValidationError(msg),
            TagServiceError::NotFound(msg) => Self::NotFound(msg),
            TagServiceError::InternalError(e) => Self::InternalError(e),
        }
    }
}

/// Public list filter
#[derive(Debug, Clone, Default)]
pub enum PostListFilter {
    #[default]
    All,
    Featured,
    /// Category route name
    Category(String),
    /// Tag normalized name
    Tag(String),
}

pub struct PostService {
    repo: Arc<dyn PostRepository>,
    category_repo: Arc<dyn CategoryRepository>,
    tags: Arc<TagService>,
    cache: Arc<Cache>,
    config: Arc<BlogConfigService>,
    activity: Arc<ActivityLogService>,
    mentions: Option<Arc<MentionService>>,
}

impl PostService {
    pub fn new(
        repo: Arc<dyn PostRepository>,
        category_repo: Arc<dyn CategoryRepository>,
        tags: Arc<TagService>,
        cache: Arc<Cache>,
        config: Arc<BlogConfigService>,
        activity: Arc<ActivityLogService>,
    ) -> Self {
        Self {
            repo,
            category_repo,
            tags,
            cache,
            config,
            activity,
            mentions: None,
        }
    }

    /// Send webmentions / pingbacks for links in newly published posts
    pub fn with_mentions(mut self, mentions: Arc<MentionService>) -> Self {
        self.mentions = Some(mentions);
        self
    }

    // ========================================================================
    // Editing
    // ========================================================================

    pub async fn create(&self, input: PostEditInput) -> Result<Post, PostServiceError> {
        let edit = self.prepare(input).await?;
        let now = Utc::now();

        let pub_date = edit.is_published.then_some(now);
        let route_link = pub_date.map(|d| build_route_link(d, &edit.slug));
        if let Some(link) = &route_link {
            self.ensure_route_link_free(link, None).await?;
        }

        let post = Post {
            id: 0,
            title: edit.title,
            slug: edit.slug,
            author: edit.author,
            content: edit.content,
            content_type: edit.content_type,
            content_abstract: edit.content_abstract,
            content_language_code: edit.content_language_code,
            comment_enabled: edit.comment_enabled,
            is_feed_included: edit.is_feed_included,
            is_featured: edit.is_featured,
            is_original: edit.is_original,
            origin_link: edit.origin_link,
            hero_image_url: edit.hero_image_url,
            inline_css: edit.inline_css,
            is_published: edit.is_published,
            is_deleted: false,
            pub_date,
            last_modified: Some(now),
            created_at: now,
            route_link,
            hits: 0,
            likes: 0,
            categories: Vec::new(),
            tags: Vec::new(),
        };

        let id = self.repo.create(&post).await.context("Failed to create post")?;
        self.save_relations(id, &edit.category_ids, &edit.tag_ids).await?;

        let created = self.get_by_id(id).await?;
        self.after_write("Created post", &created).await;
        if created.is_published {
            self.notify_mentions(&created);
        }
        tracing::info!("Created post {} ({})", created.id, created.slug);
        Ok(created)
    }

    pub async fn update(&self, id: i64, input: PostEditInput) -> Result<Post, PostServiceError> {
        let existing = self.get_by_id(id).await?;
        if existing.is_deleted {
            return Err(PostServiceError::ValidationError(
                "Restore the post before editing it".to_string(),
            ));
        }

        let edit = self.prepare(input).await?;
        let now = Utc::now();

        let newly_published = edit.is_published && !existing.is_published;
        let pub_date = match existing.pub_date {
            Some(date) => Some(date),
            None if edit.is_published => Some(now),
            None => None,
        };
        let route_link = pub_date.map(|d| build_route_link(d, &edit.slug));
        if let Some(link) = &route_link {
            self.ensure_route_link_free(link, Some(id)).await?;
        }

        let post = Post {
            title: edit.title,
            slug: edit.slug,
            author: edit.author,
            content: edit.content,
            content_type: edit.content_type,
            content_abstract: edit.content_abstract,
            content_language_code: edit.content_language_code,
            comment_enabled: edit.comment_enabled,
            is_feed_included: edit.is_feed_included,
            is_featured: edit.is_featured,
            is_original: edit.is_original,
            origin_link: edit.origin_link,
            hero_image_url: edit.hero_image_url,
            inline_css: edit.inline_css,
            is_published: edit.is_published,
            pub_date,
            last_modified: Some(now),
            route_link,
            ..existing
        };

        self.repo.update(&post).await.context("Failed to update post")?;
        self.save_relations(id, &edit.category_ids, &edit.tag_ids).await?;

        let updated = self.get_by_id(id).await?;
        self.after_write("Updated post", &updated).await;
        if newly_published {
            self.notify_mentions(&updated);
        }
        Ok(updated)
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    pub async fn publish(&self, id: i64) -> Result<Post, PostServiceError> {
        let mut post = self.get_by_id(id).await?;
        if post.is_deleted {
            return Err(PostServiceError::ValidationError(
                "Cannot publish a deleted post".to_string(),
            ));
        }
        if post.is_published {
            return Ok(post);
        }

        let pub_date = post.pub_date.unwrap_or_else(Utc::now);
        let route_link = build_route_link(pub_date, &post.slug);
        self.ensure_route_link_free(&route_link, Some(id)).await?;

        post.is_published = true;
        post.pub_date = Some(pub_date);
        post.route_link = Some(route_link);
        post.last_modified = Some(Utc::now());
        self.repo.update(&post).await.context("Failed to publish post")?;

        self.after_write("Published post", &post).await;
        self.notify_mentions(&post);
        Ok(post)
    }

    /// Back to draft; the publish date and route link are kept
    pub async fn unpublish(&self, id: i64) -> Result<Post, PostServiceError> {
        let mut post = self.get_by_id(id).await?;
        if !post.is_published {
            return Ok(post);
        }
        post.is_published = false;
        post.last_modified = Some(Utc::now());
        self.repo.update(&post).await.context("Failed to unpublish post")?;

        self.after_write("Unpublished post", &post).await;
        Ok(post)
    }

    /// Move a post to the recycle bin
    pub async fn delete(&self, id: i64) -> Result<(), PostServiceError> {
        self.set_deleted(id, true, "Deleted post").await
    }

    /// Take a post back out of the recycle bin
    pub async fn restore(&self, id: i64) -> Result<(), PostServiceError> {
        self.set_deleted(id, false, "Restored post").await
    }

    /// Permanently delete a post
    pub async fn purge(&self, id: i64) -> Result<(), PostServiceError> {
        let post = self.get_by_id(id).await?;
        self.repo.delete(id).await.context("Failed to purge post")?;
        self.after_write("Purged post", &post).await;
        Ok(())
    }

    /// Permanently delete every post in the recycle bin
    pub async fn empty_recycle_bin(&self) -> Result<u64, PostServiceError> {
        let removed = self
            .repo
            .delete_all_deleted()
            .await
            .context("Failed to empty recycle bin")?;
        self.invalidate().await;
        self.activity
            .record(
                NewActivity::new(EventType::Post, "Emptied recycle bin")
                    .meta(serde_json::json!({ "removed": removed })),
            )
            .await;
        Ok(removed)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Any post by ID, including drafts and deleted posts
    pub async fn get_by_id(&self, id: i64) -> Result<Post, PostServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get post")?
            .ok_or_else(|| PostServiceError::NotFound(format!("Post with ID {} not found", id)))
    }

    /// Published post by route link
    pub async fn get_by_route_link(&self, route_link: &str) -> Result<Post, PostServiceError> {
        let route_link = route_link.trim_matches('/').to_lowercase();
        let key = CachePartition::Post.key(format!("link:{}", route_link));
        self.cache
            .get_or_insert(&key, || async {
                self.repo
                    .get_by_route_link(&route_link)
                    .await
                    .context("Failed to get post by route link")?
                    .ok_or_else(|| PostServiceError::NotFound(route_link.clone()))
            })
            .await
    }

    /// Published post by its date parts and slug
    pub async fn get_by_slug(&self, year: i32, month: u32, day: u32, slug: &str) -> Result<Post, PostServiceError> {
        let date = Utc
            .with_ymd_and_hms(year, month, day, 0, 0, 0)
            .single()
            .ok_or_else(|| PostServiceError::NotFound(format!("{}/{}/{}/{}", year, month, day, slug)))?;
        self.get_by_route_link(&build_route_link(date, slug)).await
    }

    /// Published posts, newest first
    pub async fn list(&self, filter: PostListFilter, params: &ListParams) -> Result<PagedResult<PostDigest>, PostServiceError> {
        let (repo_filter, label) = match &filter {
            PostListFilter::All => (PostFilter::default(), "all".to_string()),
            PostListFilter::Featured => (
                PostFilter {
                    featured_only: true,
                    ..Default::default()
                },
                "featured".to_string(),
            ),
            PostListFilter::Category(route_name) => {
                let category = self
                    .category_repo
                    .get_by_route_name(&route_name.to_lowercase())
                    .await
                    .context("Failed to get category")?
                    .ok_or_else(|| PostServiceError::NotFound(format!("Category '{}' not found", route_name)))?;
                (
                    PostFilter {
                        category_id: Some(category.id),
                        ..Default::default()
                    },
                    format!("category:{}", category.id),
                )
            }
            PostListFilter::Tag(normalized_name) => {
                let tag = self
                    .tags
                    .get_by_normalized_name(normalized_name)
                    .await
                    .map_err(|_| PostServiceError::NotFound(format!("Tag '{}' not found", normalized_name)))?;
                (
                    PostFilter {
                        tag_id: Some(tag.id),
                        ..Default::default()
                    },
                    format!("tag:{}", tag.id),
                )
            }
        };

        let key = CachePartition::Post.key(format!("list:{}:{}:{}", label, params.page, params.per_page));
        self.cache
            .get_or_insert(&key, || async {
                let (posts, total) = self
                    .repo
                    .list_published(&repo_filter, params)
                    .await
                    .context("Failed to list posts")?;
                Ok::<_, PostServiceError>(PagedResult::new(posts, total, params).map(PostDigest::from))
            })
            .await
    }

    /// Year/month buckets of published posts
    pub async fn archive(&self) -> Result<Vec<Archive>, PostServiceError> {
        self.cache
            .get_or_insert(&CachePartition::Post.key("archive"), || async {
                self.repo
                    .archive()
                    .await
                    .context("Failed to build archive")
                    .map_err(PostServiceError::from)
            })
            .await
    }

    /// Published posts of a year, or of one month of it
    pub async fn list_by_date(&self, year: i32, month: Option<u32>) -> Result<Vec<PostDigest>, PostServiceError> {
        let invalid = || PostServiceError::ValidationError("Invalid archive date".to_string());
        let (start, end) = match month {
            Some(m) if (1..=12).contains(&m) => {
                let start = Utc.with_ymd_and_hms(year, m, 1, 0, 0, 0).single().ok_or_else(invalid)?;
                let (ny, nm) = if m == 12 { (year + 1, 1) } else { (year, m + 1) };
                let end = Utc.with_ymd_and_hms(ny, nm, 1, 0, 0, 0).single().ok_or_else(invalid)?;
                (start, end)
            }
            Some(_) => return Err(invalid()),
            None => {
                let start = Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0).single().ok_or_else(invalid)?;
                let end = Utc.with_ymd_and_hms(year + 1, 1, 1, 0, 0, 0).single().ok_or_else(invalid)?;
                (start, end)
            }
        };

        let posts = self
            .repo
            .list_by_date_range(start, end)
            .await
            .context("Failed to list posts by date")?;
        Ok(posts.into_iter().map(PostDigest::from).collect())
    }

    /// Published posts matching `keyword` in title, abstract or content
    pub async fn search(&self, keyword: &str, params: &ListParams) -> Result<PagedResult<PostDigest>, PostServiceError> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return Err(PostServiceError::ValidationError(
                "Search keyword cannot be empty".to_string(),
            ));
        }
        let (posts, total) = self
            .repo
            .search(keyword, params)
            .await
            .context("Failed to search posts")?;
        Ok(PagedResult::new(posts, total, params).map(PostDigest::from))
    }

    /// Admin list by state with an optional title keyword
    pub async fn list_admin(
        &self,
        status: PostStatusFilter,
        keyword: Option<&str>,
        params: &ListParams,
    ) -> Result<PagedResult<PostDigest>, PostServiceError> {
        let keyword = keyword.map(str::trim).filter(|k| !k.is_empty());
        let (posts, total) = self
            .repo
            .list_admin(status, keyword, params)
            .await
            .context("Failed to list posts")?;
        Ok(PagedResult::new(posts, total, params).map(PostDigest::from))
    }

    pub async fn list_drafts(&self, params: &ListParams) -> Result<PagedResult<PostDigest>, PostServiceError> {
        self.list_admin(PostStatusFilter::Draft, None, params).await
    }

    pub async fn list_recycle_bin(&self, params: &ListParams) -> Result<PagedResult<PostDigest>, PostServiceError> {
        self.list_admin(PostStatusFilter::Deleted, None, params).await
    }

    pub async fn counts(&self) -> Result<PostCounts, PostServiceError> {
        Ok(self.repo.counts().await.context("Failed to count posts")?)
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    /// Validate and normalize editor input
    async fn prepare(&self, input: PostEditInput) -> Result<PreparedEdit, PostServiceError> {
        let title = input.title.trim().to_string();
        if title.is_empty() {
            return Err(PostServiceError::ValidationError("Title cannot be empty".to_string()));
        }
        if title.chars().count() > MAX_TITLE_LENGTH {
            return Err(PostServiceError::ValidationError(format!(
                "Title cannot exceed {} characters",
                MAX_TITLE_LENGTH
            )));
        }
        if input.content.trim().is_empty() {
            return Err(PostServiceError::ValidationError("Content cannot be empty".to_string()));
        }

        let slug = match input.slug.trim() {
            "" => generate_slug(&title),
            provided => generate_slug(provided),
        };
        if slug.is_empty() {
            return Err(PostServiceError::ValidationError(
                "Slug cannot be empty; set one explicitly".to_string(),
            ));
        }

        let origin_link = if input.is_original {
            None
        } else {
            let raw = input
                .origin_link
                .as_deref()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .ok_or_else(|| {
                    PostServiceError::ValidationError("Origin link is required for reprinted posts".to_string())
                })?;
            Some(checked_link(raw, "origin link", false)?)
        };

        let hero_image_url = match input.hero_image_url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => Some(checked_link(url, "hero image URL", true)?),
            _ => None,
        };

        let content_abstract = match input.content_abstract.trim() {
            "" => {
                let words = self.config.content().await.post_abstract_words;
                get_post_abstract(&input.content, words, input.content_type == ContentType::Markdown)
            }
            provided => provided.to_string(),
        };

        let mut category_ids = Vec::with_capacity(input.category_ids.len());
        for id in input.category_ids {
            if category_ids.contains(&id) {
                continue;
            }
            self.category_repo
                .get_by_id(id)
                .await
                .context("Failed to get category")?
                .ok_or_else(|| PostServiceError::ValidationError(format!("Category {} does not exist", id)))?;
            category_ids.push(id);
        }

        let tag_ids = self.tags.resolve_ids(&input.tags).await?;

        Ok(PreparedEdit {
            title,
            slug,
            author: input.author.map(|a| a.trim().to_string()).filter(|a| !a.is_empty()),
            content: input.content,
            content_type: input.content_type,
            content_abstract,
            content_language_code: input.content_language_code.trim().to_lowercase(),
            comment_enabled: input.comment_enabled,
            is_feed_included: input.is_feed_included,
            is_featured: input.is_featured,
            is_original: input.is_original,
            origin_link,
            hero_image_url,
            inline_css: input.inline_css.filter(|css| !css.trim().is_empty()),
            is_published: input.is_published,
            category_ids,
            tag_ids,
        })
    }

    async fn ensure_route_link_free(&self, route_link: &str, exclude_id: Option<i64>) -> Result<(), PostServiceError> {
        if self
            .repo
            .route_link_exists(route_link, exclude_id)
            .await
            .context("Failed to check route link")?
        {
            return Err(PostServiceError::DuplicateSlug(route_link.to_string()));
        }
        Ok(())
    }

    async fn save_relations(&self, post_id: i64, category_ids: &[i64], tag_ids: &[i64]) -> Result<(), PostServiceError> {
        self.category_repo
            .set_post_categories(post_id, category_ids)
            .await
            .context("Failed to save post categories")?;
        self.tags.assign(post_id, tag_ids).await?;
        Ok(())
    }

    async fn set_deleted(&self, id: i64, deleted: bool, operation: &str) -> Result<(), PostServiceError> {
        let mut post = self.get_by_id(id).await?;
        if post.is_deleted == deleted {
            return Ok(());
        }
        post.is_deleted = deleted;
        post.last_modified = Some(Utc::now());
        self.repo.update(&post).await.context("Failed to update post")?;
        self.after_write(operation, &post).await;
        Ok(())
    }

    async fn invalidate(&self) {
        self.cache
            .invalidate(&[
                CachePartition::Post,
                CachePartition::Sitemap,
                CachePartition::Tag,
                CachePartition::Category,
            ])
            .await;
    }

    async fn after_write(&self, operation: &str, post: &Post) {
        self.invalidate().await;
        self.activity
            .record(
                NewActivity::new(EventType::Post, operation)
                    .target(&post.title)
                    .meta(serde_json::json!({ "id": post.id, "route_link": post.route_link })),
            )
            .await;
    }

    fn notify_mentions(&self, post: &Post) {
        let Some(mentions) = self.mentions.clone() else {
            return;
        };
        let post = post.clone();
        tokio::spawn(async move {
            mentions.notify_post(&post).await;
        });
    }
}

/// Sterilized link, or a validation error naming `field`
fn checked_link(raw: &str, field: &str, allow_relative: bool) -> Result<String, PostServiceError> {
    match sterilize_link(raw) {
        link if link == "#" || (!allow_relative && link.starts_with('/')) => Err(PostServiceError::ValidationError(format!(
            "Invalid {}: {}",
            field, raw
        ))),
        link => Ok(link),
    }
}

/// Validated editor input
struct PreparedEdit {
    title: String,
    slug: String,
    author: Option<String>,
    content: String,
    content_type: ContentType,
    content_abstract: String,
    content_language_code: String,
    comment_enabled: bool,
    is_feed_included: bool,
    is_featured: bool,
    is_original: bool,
    origin_link: Option<String>,
    hero_image_url: Option<String>,
    inline_css: Option<String>,
    is_published: bool,
    category_ids: Vec<i64>,
    tag_ids: Vec<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CategoryInput;
    use crate::services::test_support::TestContext;

    async fn setup_test_service() -> (TestContext, PostService) {
        let ctx = TestContext::new().await;
        let service = ctx.post_service();
        (ctx, service)
    }

    #[tokio::test]
    async fn test_create_draft_has_no_route_link() {
        let (_ctx, service) = setup_test_service().await;

        let post = service
            .create(PostEditInput::new("Hello World", "Some **markdown** body"))
            .await
            .unwrap();

        assert_eq!(post.slug, "hello-world");
        assert!(!post.is_published);
        assert!(post.pub_date.is_none());
        assert!(post.route_link.is_none());
        assert_eq!(post.content_abstract, "Some markdown body");
    }

    #[tokio::test]
    async fn test_create_published_with_tags_and_categories() {
        let (ctx, service) = setup_test_service().await;
        let category = ctx
            .category_service()
            .create(CategoryInput::new("Rust").with_route_name("rust"))
            .await
            .unwrap();

        let post = service
            .create(
                PostEditInput::new("Ownership", "Borrowing rules")
                    .with_tags(&["Rust", "C#", "rust"])
                    .with_categories(vec![category.id, category.id])
                    .published(),
            )
            .await
            .unwrap();

        let pub_date = post.pub_date.expect("published post has a date");
        assert_eq!(post.route_link.as_deref(), Some(build_route_link(pub_date, "ownership").as_str()));
        assert_eq!(post.categories.len(), 1);
        let mut tags: Vec<_> = post.tags.iter().map(|t| t.normalized_name.clone()).collect();
        tags.sort();
        assert_eq!(tags, vec!["c-sharp", "rust"]);

        let fetched = service
            .get_by_route_link(post.route_link.as_deref().unwrap())
            .await
            .unwrap();
        assert_eq!(fetched.id, post.id);
    }

    #[tokio::test]
    async fn test_validation_errors() {
        let (_ctx, service) = setup_test_service().await;

        assert!(matches!(
            service.create(PostEditInput::new("  ", "body")).await,
            Err(PostServiceError::ValidationError(_))
        ));
        assert!(matches!(
            service.create(PostEditInput::new("Title", "")).await,
            Err(PostServiceError::ValidationError(_))
        ));
        assert!(matches!(
            service.create(PostEditInput::new("x".repeat(129), "body")).await,
            Err(PostServiceError::ValidationError(_))
        ));
        assert!(matches!(
            service
                .create(PostEditInput::new("Title", "body").with_categories(vec![999]))
                .await,
            Err(PostServiceError::ValidationError(_))
        ));

        let mut reprint = PostEditInput::new("Reprint", "body");
        reprint.is_original = false;
        assert!(matches!(
            service.create(reprint.clone()).await,
            Err(PostServiceError::ValidationError(_))
        ));
        reprint.origin_link = Some("javascript:alert(1)".to_string());
        assert!(matches!(
            service.create(reprint.clone()).await,
            Err(PostServiceError::ValidationError(_))
        ));
        reprint.origin_link = Some("https://example.com/source".to_string());
        assert!(service.create(reprint).await.is_ok());
    }

    #[tokio::test]
    async fn test_duplicate_route_link_is_rejected() {
        let (_ctx, service) = setup_test_service().await;

        service
            .create(PostEditInput::new("Same", "first").published())
            .await
            .unwrap();
        let result = service
            .create(PostEditInput::new("Same", "second").published())
            .await;
        assert!(matches!(result, Err(PostServiceError::DuplicateSlug(_))));

        // Drafts have no route link yet, so the same slug is fine until publish
        let draft = service.create(PostEditInput::new("Same", "third")).await.unwrap();
        assert!(matches!(
            service.publish(draft.id).await,
            Err(PostServiceError::DuplicateSlug(_))
        ));
    }

    #[tokio::test]
    async fn test_publish_unpublish_keeps_pub_date() {
        let (_ctx, service) = setup_test_service().await;
        let draft = service.create(PostEditInput::new("Later", "body")).await.unwrap();

        let published = service.publish(draft.id).await.unwrap();
        let pub_date = published.pub_date.unwrap();
        let link = published.route_link.clone().unwrap();

        let unpublished = service.unpublish(draft.id).await.unwrap();
        assert!(!unpublished.is_published);
        assert_eq!(unpublished.pub_date, Some(pub_date));
        assert!(matches!(
            service.get_by_route_link(&link).await,
            Err(PostServiceError::NotFound(_))
        ));

        let republished = service.publish(draft.id).await.unwrap();
        assert_eq!(republished.pub_date, Some(pub_date));
        assert_eq!(republished.route_link.as_deref(), Some(link.as_str()));
    }

    #[tokio::test]
    async fn test_update_changes_slug_and_invalidates_cache() {
        let (_ctx, service) = setup_test_service().await;
        let post = service
            .create(PostEditInput::new("Original", "body").published())
            .await
            .unwrap();
        let old_link = post.route_link.clone().unwrap();
        service.get_by_route_link(&old_link).await.unwrap();

        let updated = service
            .update(post.id, PostEditInput::new("Renamed", "new body").published())
            .await
            .unwrap();

        assert_eq!(updated.slug, "renamed");
        assert_eq!(updated.pub_date, post.pub_date);
        assert!(service.get_by_route_link(&old_link).await.is_err());
        let fetched = service
            .get_by_route_link(updated.route_link.as_deref().unwrap())
            .await
            .unwrap();
        assert_eq!(fetched.content, "new body");
    }

    #[tokio::test]
    async fn test_recycle_bin_lifecycle() {
        let (_ctx, service) = setup_test_service().await;
        let a = service.create(PostEditInput::new("A", "a").published()).await.unwrap();
        let b = service.create(PostEditInput::new("B", "b").published()).await.unwrap();

        service.delete(a.id).await.unwrap();
        service.delete(b.id).await.unwrap();
        assert!(matches!(
            service.update(a.id, PostEditInput::new("A", "edit")).await,
            Err(PostServiceError::ValidationError(_))
        ));

        let params = ListParams::default();
        assert_eq!(service.list_recycle_bin(&params).await.unwrap().total, 2);
        assert_eq!(service.list(PostListFilter::All, &params).await.unwrap().total, 0);

        service.restore(a.id).await.unwrap();
        assert_eq!(service.list(PostListFilter::All, &params).await.unwrap().total, 1);

        assert_eq!(service.empty_recycle_bin().await.unwrap(), 1);
        assert!(matches!(
            service.get_by_id(b.id).await,
            Err(PostServiceError::NotFound(_))
        ));

        service.purge(a.id).await.unwrap();
        assert_eq!(service.counts().await.unwrap(), PostCounts::default());
    }

    #[tokio::test]
    async fn test_list_by_tag_category_and_featured() {
        let (ctx, service) = setup_test_service().await;
        let category = ctx
            .category_service()
            .create(CategoryInput::new("Notes"))
            .await
            .unwrap();

        let mut featured = PostEditInput::new("Featured", "body")
            .with_tags(&["Azure"])
            .published();
        featured.is_featured = true;
        service.create(featured).await.unwrap();
        service
            .create(
                PostEditInput::new("Filed", "body")
                    .with_categories(vec![category.id])
                    .published(),
            )
            .await
            .unwrap();

        let params = ListParams::default();
        let by_tag = service.list(PostListFilter::Tag("azure".into()), &params).await.unwrap();
        assert_eq!(by_tag.items.len(), 1);
        assert_eq!(by_tag.items[0].title, "Featured");

        let by_category = service
            .list(PostListFilter::Category("notes".into()), &params)
            .await
            .unwrap();
        assert_eq!(by_category.items[0].title, "Filed");

        let featured = service.list(PostListFilter::Featured, &params).await.unwrap();
        assert_eq!(featured.total, 1);

        assert!(matches!(
            service.list(PostListFilter::Tag("missing".into()), &params).await,
            Err(PostServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_archive_and_list_by_date() {
        let (_ctx, service) = setup_test_service().await;
        let post = service
            .create(PostEditInput::new("Dated", "body").published())
            .await
            .unwrap();
        let date = post.pub_date.unwrap();

        let archive = service.archive().await.unwrap();
        assert_eq!(archive.len(), 1);
        assert_eq!(archive[0].count, 1);

        use chrono::Datelike;
        let by_year = service.list_by_date(date.year(), None).await.unwrap();
        assert_eq!(by_year.len(), 1);
        let by_month = service.list_by_date(date.year(), Some(date.month())).await.unwrap();
        assert_eq!(by_month.len(), 1);
        assert!(service.list_by_date(date.year() - 1, None).await.unwrap().is_empty());
        assert!(matches!(
            service.list_by_date(date.year(), Some(13)).await,
            Err(PostServiceError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_search_requires_keyword() {
        let (_ctx, service) = setup_test_service().await;
        service
            .create(PostEditInput::new("Async Rust", "tokio runtime").published())
            .await
            .unwrap();

        let params = ListParams::default();
        assert_eq!(service.search("tokio", &params).await.unwrap().total, 1);
        assert!(matches!(
            service.search("  ", &params).await,
            Err(PostServiceError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_writes_are_logged() {
        let (ctx, service) = setup_test_service().await;
        service.create(PostEditInput::new("Logged", "body")).await.unwrap();
        assert!(ctx.activity.count().await.unwrap() >= 1);
    }
}

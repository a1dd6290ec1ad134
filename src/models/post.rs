//! Post model
//!
//! A post is published under a date-based route link (`yyyy/M/d/slug`), may
//! belong to several categories and carries any number of tags.

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

use super::{Category, Tag};

/// Source format of the post body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    #[default]
    Markdown,
    Html,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Markdown => "markdown",
            ContentType::Html => "html",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "markdown" => Some(ContentType::Markdown),
            "html" => Some(ContentType::Html),
            _ => None,
        }
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Post entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub author: Option<String>,
    /// Raw body, interpreted according to `content_type`
    pub content: String,
    pub content_type: ContentType,
    pub content_abstract: String,
    pub content_language_code: String,
    pub comment_enabled: bool,
    pub is_feed_included: bool,
    pub is_featured: bool,
    pub is_original: bool,
    pub origin_link: Option<String>,
    pub hero_image_url: Option<String>,
    pub inline_css: Option<String>,
    pub is_published: bool,
    pub is_deleted: bool,
    /// Set on first publish and kept afterwards
    pub pub_date: Option<DateTime<Utc>>,
    pub last_modified: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    /// `yyyy/M/d/slug`, present once the post has been published
    pub route_link: Option<String>,
    pub hits: i64,
    pub likes: i64,
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

impl Post {
    /// Render the body as HTML
    pub fn content_html(&self) -> String {
        match self.content_type {
            ContentType::Markdown => crate::utils::markdown_to_html(&self.content),
            ContentType::Html => self.content.clone(),
        }
    }

    /// Whether the post is visible to readers
    pub fn is_visible(&self) -> bool {
        self.is_published && !self.is_deleted
    }
}

/// Build the public route link for a slug published at `pub_date`
pub fn build_route_link(pub_date: DateTime<Utc>, slug: &str) -> String {
    format!(
        "{}/{}/{}/{}",
        pub_date.year(),
        pub_date.month(),
        pub_date.day(),
        slug.to_lowercase()
    )
}

/// Parse a route link back into its date parts and slug
pub fn parse_route_link(route_link: &str) -> Option<(i32, u32, u32, String)> {
    let mut parts = route_link.trim_matches('/').splitn(4, '/');
    let year = parts.next()?.parse().ok()?;
    let month = parts.next()?.parse().ok()?;
    let day = parts.next()?.parse().ok()?;
    let slug = parts.next()?;
    if slug.is_empty() || slug.contains('/') || !(1..=12).contains(&month) || !(1..=31).contains(&day) {
        return None;
    }
    Some((year, month, day, slug.to_lowercase()))
}

/// Lightweight projection used in lists
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostDigest {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub content_abstract: String,
    pub route_link: Option<String>,
    pub pub_date: Option<DateTime<Utc>>,
    pub is_featured: bool,
    pub hero_image_url: Option<String>,
    pub hits: i64,
    pub likes: i64,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

impl From<Post> for PostDigest {
    fn from(post: Post) -> Self {
        Self {
            id: post.id,
            title: post.title,
            slug: post.slug,
            content_abstract: post.content_abstract,
            route_link: post.route_link,
            pub_date: post.pub_date,
            is_featured: post.is_featured,
            hero_image_url: post.hero_image_url,
            hits: post.hits,
            likes: post.likes,
            tags: post.tags,
        }
    }
}

/// Editor input for creating or updating a post
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PostEditInput {
    pub title: String,
    /// Derived from the title when blank
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub author: Option<String>,
    pub content: String,
    #[serde(default)]
    pub content_type: ContentType,
    /// Generated from the content when blank
    #[serde(default)]
    pub content_abstract: String,
    #[serde(default = "default_language")]
    pub content_language_code: String,
    #[serde(default = "default_true")]
    pub comment_enabled: bool,
    #[serde(default = "default_true")]
    pub is_feed_included: bool,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default = "default_true")]
    pub is_original: bool,
    #[serde(default)]
    pub origin_link: Option<String>,
    #[serde(default)]
    pub hero_image_url: Option<String>,
    #[serde(default)]
    pub inline_css: Option<String>,
    #[serde(default)]
    pub is_published: bool,
    #[serde(default)]
    pub category_ids: Vec<i64>,
    /// Tag display names
    #[serde(default)]
    pub tags: Vec<String>,
}

fn default_language() -> String {
    "en-us".to_string()
}

fn default_true() -> bool {
    true
}

impl PostEditInput {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            content_language_code: default_language(),
            comment_enabled: true,
            is_feed_included: true,
            is_original: true,
            ..Default::default()
        }
    }

    pub fn with_slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = slug.into();
        self
    }

    pub fn with_tags(mut self, tags: &[&str]) -> Self {
        self.tags = tags.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn with_categories(mut self, ids: Vec<i64>) -> Self {
        self.category_ids = ids;
        self
    }

    pub fn published(mut self) -> Self {
        self.is_published = true;
        self
    }
}

/// Post state filter used by the admin list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PostStatusFilter {
    #[default]
    Default,
    Published,
    Draft,
    Deleted,
}

/// Year/month bucket in the archive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Archive {
    pub year: i32,
    pub month: u32,
    pub count: i64,
}

/// Post totals by lifecycle state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostCounts {
    pub published: i64,
    pub drafts: i64,
    pub deleted: i64,
}

/// Hit and like counters of a post
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostStats {
    pub hits: i64,
    pub likes: i64,
}

//! Admin dashboard counters

use crate::db::repositories::{
    CategoryRepository, CommentRepository, MentionRepository, PageRepository, PostRepository, TagRepository,
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub published_posts: i64,
    pub draft_posts: i64,
    pub deleted_posts: i64,
    pub categories: i64,
    pub tags: i64,
    pub pages: i64,
    pub comments: i64,
    pub pending_comments: i64,
    pub mentions: i64,
}

pub struct DashboardService {
    posts: Arc<dyn PostRepository>,
    categories: Arc<dyn CategoryRepository>,
    tags: Arc<dyn TagRepository>,
    pages: Arc<dyn PageRepository>,
    comments: Arc<dyn CommentRepository>,
    mentions: Arc<dyn MentionRepository>,
}

impl DashboardService {
    pub fn new(
        posts: Arc<dyn PostRepository>,
        categories: Arc<dyn CategoryRepository>,
        tags: Arc<dyn TagRepository>,
        pages: Arc<dyn PageRepository>,
        comments: Arc<dyn CommentRepository>,
        mentions: Arc<dyn MentionRepository>,
    ) -> Self {
        Self {
            posts,
            categories,
            tags,
            pages,
            comments,
            mentions,
        }
    }

    pub async fn stats(&self) -> Result<DashboardStats> {
        let posts = self.posts.counts().await.context("Failed to count posts")?;
        let (comments, pending_comments) = self.comments.counts().await.context("Failed to count comments")?;

        Ok(DashboardStats {
            published_posts: posts.published,
            draft_posts: posts.drafts,
            deleted_posts: posts.deleted,
            categories: self.categories.count().await.context("Failed to count categories")?,
            tags: self.tags.count().await.context("Failed to count tags")?,
            pages: self.pages.count().await.context("Failed to count pages")?,
            comments,
            pending_comments,
            mentions: self.mentions.count().await.context("Failed to count mentions")?,
        })
    }
}

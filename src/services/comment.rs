//! Comment service
//!
//! Public comment submission with moderation, and the admin moderation
//! operations. Only approved comments are ever shown to readers.

use crate::db::repositories::{CommentRepository, PostRepository};
use crate::models::{
    Comment, CommentDetail, CommentOrder, CommentReply, CommentView, CreateCommentInput, EventType,
    ListParams, NewActivity, PagedResult,
};
use crate::services::blog_config::WordFilterMode;
use crate::services::word_filter::WordFilter;
use crate::services::{ActivityLogService, BlogConfigService};
use anyhow::Context;
use chrono::{Duration, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

const MAX_USERNAME_LENGTH: usize = 64;
const MAX_EMAIL_LENGTH: usize = 128;
const MAX_CONTENT_LENGTH: usize = 1024;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid regex"));

/// Error types for comment service operations
#[derive(Debug, thiserror::Error)]
pub enum CommentServiceError {
    #[error("Comment not found: {0}")]
    NotFound(String),

    #[error("Post not found: {0}")]
    PostNotFound(i64),

    /// Commenting is switched off globally, for the post, or has closed
    #[error("Comments are disabled: {0}")]
    Disabled(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Who is submitting a comment
#[derive(Debug, Clone, Default)]
pub struct CommentClient {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

pub struct CommentService {
    repo: Arc<dyn CommentRepository>,
    post_repo: Arc<dyn PostRepository>,
    config: Arc<BlogConfigService>,
    activity: Arc<ActivityLogService>,
}

impl CommentService {
    pub fn new(
        repo: Arc<dyn CommentRepository>,
        post_repo: Arc<dyn PostRepository>,
        config: Arc<BlogConfigService>,
        activity: Arc<ActivityLogService>,
    ) -> Self {
        Self {
            repo,
            post_repo,
            config,
            activity,
        }
    }

    /// Submit a reader comment. Returns the stored comment; it is unapproved
    /// when review is required.
    pub async fn create(
        &self,
        post_id: i64,
        input: CreateCommentInput,
        client: CommentClient,
    ) -> Result<Comment, CommentServiceError> {
        let settings = self.config.comment().await;
        if !settings.enable_comments {
            return Err(CommentServiceError::Disabled("Comments are disabled".to_string()));
        }

        let post = self
            .post_repo
            .get_by_id(post_id)
            .await
            .context("Failed to get post")?
            .filter(|p| p.is_visible())
            .ok_or(CommentServiceError::PostNotFound(post_id))?;
        if !post.comment_enabled {
            return Err(CommentServiceError::Disabled(
                "Comments are disabled for this post".to_string(),
            ));
        }
        if settings.close_comments_after_days > 0 {
            if let Some(pub_date) = post.pub_date {
                if Utc::now() - pub_date > Duration::days(i64::from(settings.close_comments_after_days)) {
                    return Err(CommentServiceError::Disabled(
                        "Comments are closed for this post".to_string(),
                    ));
                }
            }
        }

        let mut input = validate_input(input)?;

        let content_settings = self.config.content().await;
        if content_settings.enable_word_filter {
            let filter = WordFilter::new(&content_settings.blocked_words);
            match content_settings.word_filter_mode {
                WordFilterMode::Mask => {
                    input.username = filter.mask(&input.username);
                    input.content = filter.mask(&input.content);
                }
                WordFilterMode::Block => {
                    if filter.contains_blocked_word(&input.username)
                        || filter.contains_blocked_word(&input.content)
                    {
                        return Err(CommentServiceError::ValidationError(
                            "Your comment contains blocked words".to_string(),
                        ));
                    }
                }
            }
        }

        let comment = Comment {
            id: 0,
            post_id,
            username: input.username,
            email: input.email,
            ip_address: client.ip_address.clone(),
            content: input.content,
            is_approved: !settings.require_comment_review,
            created_at: Utc::now(),
        };
        let created = self.repo.create(&comment).await.context("Failed to create comment")?;

        self.activity
            .record(
                NewActivity::new(EventType::Comment, "Created comment")
                    .target(&post.title)
                    .actor(Some(&created.username))
                    .meta(serde_json::json!({ "comment_id": created.id, "approved": created.is_approved }))
                    .client(client.ip_address.as_deref(), client.user_agent.as_deref()),
            )
            .await;
        tracing::info!("New comment {} on post {}", created.id, post_id);
        Ok(created)
    }

    /// Approved comments of a visible post with their replies
    pub async fn list_for_post(&self, post_id: i64) -> Result<Vec<CommentView>, CommentServiceError> {
        self.post_repo
            .get_by_id(post_id)
            .await
            .context("Failed to get post")?
            .filter(|p| p.is_visible())
            .ok_or(CommentServiceError::PostNotFound(post_id))?;

        let settings = self.config.comment().await;
        let comments = self
            .repo
            .list_approved_by_post(post_id, settings.comment_order == CommentOrder::Newest)
            .await
            .context("Failed to list comments")?;

        let mut views = Vec::with_capacity(comments.len());
        for comment in comments {
            let replies = self
                .repo
                .list_replies(comment.id)
                .await
                .context("Failed to list replies")?;
            views.push(CommentView {
                id: comment.id,
                avatar_url: settings
                    .enable_gravatar
                    .then(|| CommentView::gravatar_url(&comment.email)),
                username: comment.username,
                content: comment.content,
                created_at: comment.created_at,
                replies,
            });
        }
        Ok(views)
    }

    /// Every comment, newest first, for moderation
    pub async fn list_detailed(&self, params: &ListParams) -> Result<PagedResult<CommentDetail>, CommentServiceError> {
        let (items, total) = self
            .repo
            .list_detailed(params)
            .await
            .context("Failed to list comments")?;
        Ok(PagedResult::new(items, total, params))
    }

    /// Flip the approval state; returns the new state
    pub async fn toggle_approval(&self, id: i64) -> Result<bool, CommentServiceError> {
        let comment = self.get_by_id(id).await?;
        let approved = !comment.is_approved;
        self.repo
            .set_approved(id, approved)
            .await
            .context("Failed to update comment")?;
        self.activity
            .record(
                NewActivity::new(
                    EventType::Comment,
                    if approved { "Approved comment" } else { "Unapproved comment" },
                )
                .target(&comment.username)
                .meta(serde_json::json!({ "comment_id": id })),
            )
            .await;
        Ok(approved)
    }

    /// Delete comments by ID; unknown IDs are skipped. Returns how many were removed.
    pub async fn delete(&self, ids: &[i64]) -> Result<usize, CommentServiceError> {
        let mut removed = 0;
        for &id in ids {
            if self.repo.get_by_id(id).await.context("Failed to get comment")?.is_none() {
                continue;
            }
            self.repo.delete(id).await.context("Failed to delete comment")?;
            removed += 1;
        }
        if removed > 0 {
            self.activity
                .record(
                    NewActivity::new(EventType::Comment, "Deleted comments")
                        .meta(serde_json::json!({ "ids": ids, "removed": removed })),
                )
                .await;
        }
        Ok(removed)
    }

    /// Reply as the blog owner; replying approves the comment
    pub async fn reply(&self, comment_id: i64, content: &str) -> Result<CommentReply, CommentServiceError> {
        let comment = self.get_by_id(comment_id).await?;
        let content = content.trim();
        if content.is_empty() || content.chars().count() > MAX_CONTENT_LENGTH {
            return Err(CommentServiceError::ValidationError(format!(
                "Reply must be 1-{} characters",
                MAX_CONTENT_LENGTH
            )));
        }

        let reply = self
            .repo
            .create_reply(comment_id, content)
            .await
            .context("Failed to create reply")?;
        if !comment.is_approved {
            self.repo
                .set_approved(comment_id, true)
                .await
                .context("Failed to approve comment")?;
        }

        self.activity
            .record(
                NewActivity::new(EventType::Comment, "Replied to comment")
                    .target(&comment.username)
                    .meta(serde_json::json!({ "comment_id": comment_id, "reply_id": reply.id })),
            )
            .await;
        Ok(reply)
    }

    pub async fn delete_reply(&self, reply_id: i64) -> Result<(), CommentServiceError> {
        self.repo
            .get_reply(reply_id)
            .await
            .context("Failed to get reply")?
            .ok_or_else(|| CommentServiceError::NotFound(format!("Reply with ID {} not found", reply_id)))?;
        self.repo
            .delete_reply(reply_id)
            .await
            .context("Failed to delete reply")?;
        Ok(())
    }

    /// Total and pending comment counts
    pub async fn counts(&self) -> Result<(i64, i64), CommentServiceError> {
        Ok(self.repo.counts().await.context("Failed to count comments")?)
    }

    async fn get_by_id(&self, id: i64) -> Result<Comment, CommentServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get comment")?
            .ok_or_else(|| CommentServiceError::NotFound(format!("Comment with ID {} not found", id)))
    }
}

fn validate_input(input: CreateCommentInput) -> Result<CreateCommentInput, CommentServiceError> {
    let username = input.username.trim().to_string();
    let email = input.email.trim().to_string();
    let content = input.content.trim().to_string();

    if username.is_empty() || username.chars().count() > MAX_USERNAME_LENGTH {
        return Err(CommentServiceError::ValidationError(format!(
            "Username must be 1-{} characters",
            MAX_USERNAME_LENGTH
        )));
    }
    if email.len() > MAX_EMAIL_LENGTH || !EMAIL_RE.is_match(&email) {
        return Err(CommentServiceError::ValidationError("Invalid email address".to_string()));
    }
    if content.is_empty() || content.chars().count() > MAX_CONTENT_LENGTH {
        return Err(CommentServiceError::ValidationError(format!(
            "Content must be 1-{} characters",
            MAX_CONTENT_LENGTH
        )));
    }

    Ok(CreateCommentInput {
        username,
        email,
        content,
    })
}

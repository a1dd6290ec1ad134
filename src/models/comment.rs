//! Comment model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Reader comment on a post
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub username: String,
    pub email: String,
    pub ip_address: Option<String>,
    pub content: String,
    pub is_approved: bool,
    pub created_at: DateTime<Utc>,
}

/// Reply written by the blog owner
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommentReply {
    pub id: i64,
    pub comment_id: i64,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Public view of an approved comment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentView {
    pub id: i64,
    pub username: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    pub replies: Vec<CommentReply>,
}

impl CommentView {
    /// Generate Gravatar URL from email
    pub fn gravatar_url(email: &str) -> String {
        let email = email.trim();
        if email.is_empty() {
            return "https://www.gravatar.com/avatar/?d=mp&s=80".to_string();
        }
        let hash = format!("{:x}", md5::compute(email.to_lowercase()));
        format!("https://www.gravatar.com/avatar/{}?d=mp&s=80", hash)
    }
}

/// Admin list entry, includes the post title and unapproved comments
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentDetail {
    #[serde(flatten)]
    pub comment: Comment,
    pub post_title: String,
    pub replies: Vec<CommentReply>,
}

/// Input for creating a comment
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CreateCommentInput {
    pub username: String,
    pub email: String,
    pub content: String,
}

/// Ordering of public comment lists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CommentOrder {
    Newest,
    #[default]
    Oldest,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gravatar_url_is_case_insensitive() {
        let a = CommentView::gravatar_url("Someone@Example.com ");
        let b = CommentView::gravatar_url("someone@example.com");
        assert_eq!(a, b);
        assert!(a.starts_with("https://www.gravatar.com/avatar/"));
        assert!(!a.contains("/avatar/?"));
    }

    #[test]
    fn test_gravatar_url_empty_email() {
        assert_eq!(
            CommentView::gravatar_url(""),
            "https://www.gravatar.com/avatar/?d=mp&s=80"
        );
    }
}

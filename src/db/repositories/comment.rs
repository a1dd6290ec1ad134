//! Comment repository

use crate::db::DynDatabasePool;
use crate::models::{Comment, CommentDetail, CommentReply, ListParams};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use std::sync::Arc;

/// Comment repository trait
#[async_trait]
pub trait CommentRepository: Send + Sync {
    async fn create(&self, comment: &Comment) -> Result<Comment>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Comment>>;

    /// Approved comments of a post, oldest first unless `newest_first`
    async fn list_approved_by_post(&self, post_id: i64, newest_first: bool) -> Result<Vec<Comment>>;

    /// Every comment with its post title, newest first
    async fn list_detailed(&self, params: &ListParams) -> Result<(Vec<CommentDetail>, i64)>;

    async fn set_approved(&self, id: i64, approved: bool) -> Result<()>;

    async fn delete(&self, id: i64) -> Result<()>;

    async fn list_replies(&self, comment_id: i64) -> Result<Vec<CommentReply>>;

    async fn create_reply(&self, comment_id: i64, content: &str) -> Result<CommentReply>;

    async fn get_reply(&self, reply_id: i64) -> Result<Option<CommentReply>>;

    async fn delete_reply(&self, reply_id: i64) -> Result<()>;

    /// Total and pending (unapproved) counts
    async fn counts(&self) -> Result<(i64, i64)>;
}

/// SQLx-based comment repository implementation
pub struct SqlxCommentRepository {
    pool: DynDatabasePool,
}

impl SqlxCommentRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CommentRepository> {
        Arc::new(Self::new(pool))
    }
}

const COMMENT_COLUMNS: &str =
    "c.id, c.post_id, c.username, c.email, c.ip_address, c.content, c.is_approved, c.created_at";

#[async_trait]
impl CommentRepository for SqlxCommentRepository {
    async fn create(&self, comment: &Comment) -> Result<Comment> {
        let result = sqlx::query(
            r#"
            INSERT INTO comments (post_id, username, email, ip_address, content, is_approved, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(comment.post_id)
        .bind(&comment.username)
        .bind(&comment.email)
        .bind(&comment.ip_address)
        .bind(&comment.content)
        .bind(comment.is_approved)
        .bind(comment.created_at)
        .execute(self.pool.sqlite())
        .await
        .context("Failed to create comment")?;

        Ok(Comment {
            id: result.last_insert_rowid(),
            ..comment.clone()
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Comment>> {
        let sql = format!("SELECT {} FROM comments c WHERE c.id = ?", COMMENT_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(self.pool.sqlite())
            .await
            .context("Failed to get comment")?;
        row.map(|r| row_to_comment(&r)).transpose()
    }

    async fn list_approved_by_post(&self, post_id: i64, newest_first: bool) -> Result<Vec<Comment>> {
        let order = if newest_first { "DESC" } else { "ASC" };
        let sql = format!(
            "SELECT {} FROM comments c WHERE c.post_id = ? AND c.is_approved = 1 ORDER BY c.created_at {}, c.id {}",
            COMMENT_COLUMNS, order, order
        );
        let rows = sqlx::query(&sql)
            .bind(post_id)
            .fetch_all(self.pool.sqlite())
            .await
            .context("Failed to list comments by post")?;
        rows.iter().map(row_to_comment).collect()
    }

    async fn list_detailed(&self, params: &ListParams) -> Result<(Vec<CommentDetail>, i64)> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM comments")
            .fetch_one(self.pool.sqlite())
            .await
            .context("Failed to count comments")?;

        let sql = format!(
            r#"
            SELECT {}, p.title AS post_title
            FROM comments c
            INNER JOIN posts p ON p.id = c.post_id
            ORDER BY c.created_at DESC, c.id DESC
            LIMIT ? OFFSET ?
            "#,
            COMMENT_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(params.limit())
            .bind(params.offset())
            .fetch_all(self.pool.sqlite())
            .await
            .context("Failed to list comments")?;

        let mut items = Vec::with_capacity(rows.len());
        for row in &rows {
            let comment = row_to_comment(row)?;
            let replies = self.list_replies(comment.id).await?;
            items.push(CommentDetail {
                comment,
                post_title: row.try_get("post_title")?,
                replies,
            });
        }

        Ok((items, total))
    }

    async fn set_approved(&self, id: i64, approved: bool) -> Result<()> {
        sqlx::query("UPDATE comments SET is_approved = ? WHERE id = ?")
            .bind(approved)
            .bind(id)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to update comment approval")?;
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        sqlx::query("DELETE FROM comments WHERE id = ?")
            .bind(id)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to delete comment")?;
        Ok(())
    }

    async fn list_replies(&self, comment_id: i64) -> Result<Vec<CommentReply>> {
        let rows = sqlx::query(
            "SELECT id, comment_id, content, created_at FROM comment_replies WHERE comment_id = ? ORDER BY created_at, id",
        )
        .bind(comment_id)
        .fetch_all(self.pool.sqlite())
        .await
        .context("Failed to list comment replies")?;
        rows.iter().map(row_to_reply).collect()
    }

    async fn create_reply(&self, comment_id: i64, content: &str) -> Result<CommentReply> {
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO comment_replies (comment_id, content, created_at) VALUES (?, ?, ?)",
        )
        .bind(comment_id)
        .bind(content)
        .bind(now)
        .execute(self.pool.sqlite())
        .await
        .context("Failed to create comment reply")?;

        Ok(CommentReply {
            id: result.last_insert_rowid(),
            comment_id,
            content: content.to_string(),
            created_at: now,
        })
    }

    async fn get_reply(&self, reply_id: i64) -> Result<Option<CommentReply>> {
        let row = sqlx::query("SELECT id, comment_id, content, created_at FROM comment_replies WHERE id = ?")
            .bind(reply_id)
            .fetch_optional(self.pool.sqlite())
            .await
            .context("Failed to get comment reply")?;
        row.map(|r| row_to_reply(&r)).transpose()
    }

    async fn delete_reply(&self, reply_id: i64) -> Result<()> {
        sqlx::query("DELETE FROM comment_replies WHERE id = ?")
            .bind(reply_id)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to delete comment reply")?;
        Ok(())
    }

    async fn counts(&self) -> Result<(i64, i64)> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS total, COALESCE(SUM(CASE WHEN is_approved = 0 THEN 1 ELSE 0 END), 0) AS pending FROM comments",
        )
        .fetch_one(self.pool.sqlite())
        .await
        .context("Failed to count comments")?;
        Ok((row.try_get("total")?, row.try_get("pending")?))
    }
}

fn row_to_comment(row: &SqliteRow) -> Result<Comment> {
    Ok(Comment {
        id: row.try_get("id")?,
        post_id: row.try_get("post_id")?,
        username: row.try_get("username")?,
        email: row.try_get("email")?,
        ip_address: row.try_get("ip_address")?,
        content: row.try_get("content")?,
        is_approved: row.try_get("is_approved")?,
        created_at: row.try_get("created_at")?,
    })
}

fn row_to_reply(row: &SqliteRow) -> Result<CommentReply> {
    Ok(CommentReply {
        id: row.try_get("id")?,
        comment_id: row.try_get("comment_id")?,
        content: row.try_get("content")?,
        created_at: row.try_get("created_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_repo() -> (DynDatabasePool, SqlxCommentRepository, i64) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let post_id = sqlx::query(
            "INSERT INTO posts (title, slug, content, is_published, created_at) VALUES ('Post', 'post', 'c', 1, ?)",
        )
        .bind(Utc::now())
        .execute(pool.sqlite())
        .await
        .expect("Failed to insert post")
        .last_insert_rowid();
        let repo = SqlxCommentRepository::new(pool.clone());
        (pool, repo, post_id)
    }

    fn sample_comment(post_id: i64, username: &str, approved: bool) -> Comment {
        Comment {
            id: 0,
            post_id,
            username: username.to_string(),
            email: format!("{}@example.com", username),
            ip_address: Some("203.0.113.1".to_string()),
            content: format!("Hi from {}", username),
            is_approved: approved,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_approved_listing_and_counts() {
        let (_pool, repo, post_id) = setup_test_repo().await;
        let first = repo.create(&sample_comment(post_id, "alice", true)).await.unwrap();
        let pending = repo.create(&sample_comment(post_id, "bob", false)).await.unwrap();
        repo.create(&sample_comment(post_id, "carol", true)).await.unwrap();

        let oldest = repo.list_approved_by_post(post_id, false).await.unwrap();
        assert_eq!(oldest.len(), 2);
        assert_eq!(oldest[0].id, first.id);
        let newest = repo.list_approved_by_post(post_id, true).await.unwrap();
        assert_eq!(newest[0].username, "carol");

        assert_eq!(repo.counts().await.unwrap(), (3, 1));
        repo.set_approved(pending.id, true).await.unwrap();
        assert_eq!(repo.counts().await.unwrap(), (3, 0));
    }

    #[tokio::test]
    async fn test_replies_and_detail_listing() {
        let (_pool, repo, post_id) = setup_test_repo().await;
        let comment = repo.create(&sample_comment(post_id, "alice", false)).await.unwrap();
        let reply = repo.create_reply(comment.id, "Thanks!").await.unwrap();

        let (details, total) = repo.list_detailed(&ListParams::default()).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(details[0].post_title, "Post");
        assert_eq!(details[0].replies, vec![reply.clone()]);

        repo.delete_reply(reply.id).await.unwrap();
        assert!(repo.get_reply(reply.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_deleting_comment_removes_replies() {
        let (pool, repo, post_id) = setup_test_repo().await;
        let comment = repo.create(&sample_comment(post_id, "alice", true)).await.unwrap();
        repo.create_reply(comment.id, "r").await.unwrap();

        repo.delete(comment.id).await.unwrap();

        let replies: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM comment_replies")
            .fetch_one(pool.sqlite())
            .await
            .unwrap();
        assert_eq!(replies, 0);
    }
}

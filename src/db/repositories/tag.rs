//! Tag repository

use crate::db::DynDatabasePool;
use crate::models::{Tag, TagWithCount};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use std::sync::Arc;

/// Tag repository trait
#[async_trait]
pub trait TagRepository: Send + Sync {
    async fn create(&self, tag: &Tag) -> Result<Tag>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Tag>>;

    async fn get_by_normalized_name(&self, normalized_name: &str) -> Result<Option<Tag>>;

    /// All tags ordered by display name
    async fn list(&self) -> Result<Vec<Tag>>;

    /// Tags with the number of visible posts using them, most used first
    async fn list_with_counts(&self, limit: usize) -> Result<Vec<TagWithCount>>;

    async fn update(&self, tag: &Tag) -> Result<()>;

    async fn delete(&self, id: i64) -> Result<()>;

    async fn get_by_post_id(&self, post_id: i64) -> Result<Vec<Tag>>;

    /// Replace the tag set of a post
    async fn set_post_tags(&self, post_id: i64, tag_ids: &[i64]) -> Result<()>;

    async fn count(&self) -> Result<i64>;
}

/// SQLx-based tag repository implementation
pub struct SqlxTagRepository {
    pool: DynDatabasePool,
}

impl SqlxTagRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn TagRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl TagRepository for SqlxTagRepository {
    async fn create(&self, tag: &Tag) -> Result<Tag> {
        let result = sqlx::query("INSERT INTO tags (display_name, normalized_name) VALUES (?, ?)")
            .bind(&tag.display_name)
            .bind(&tag.normalized_name)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to create tag")?;

        Ok(Tag {
            id: result.last_insert_rowid(),
            ..tag.clone()
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Tag>> {
        let row = sqlx::query("SELECT id, display_name, normalized_name FROM tags WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool.sqlite())
            .await
            .context("Failed to get tag by ID")?;

        row.map(|r| row_to_tag(&r)).transpose()
    }

    async fn get_by_normalized_name(&self, normalized_name: &str) -> Result<Option<Tag>> {
        let row = sqlx::query(
            "SELECT id, display_name, normalized_name FROM tags WHERE normalized_name = ?",
        )
        .bind(normalized_name)
        .fetch_optional(self.pool.sqlite())
        .await
        .context("Failed to get tag by normalized name")?;

        row.map(|r| row_to_tag(&r)).transpose()
    }

    async fn list(&self) -> Result<Vec<Tag>> {
        let rows = sqlx::query(
            "SELECT id, display_name, normalized_name FROM tags ORDER BY display_name COLLATE NOCASE",
        )
        .fetch_all(self.pool.sqlite())
        .await
        .context("Failed to list tags")?;

        rows.iter().map(row_to_tag).collect()
    }

    async fn list_with_counts(&self, limit: usize) -> Result<Vec<TagWithCount>> {
        let rows = sqlx::query(
            r#"
            SELECT t.id, t.display_name, t.normalized_name, COUNT(p.id) AS post_count
            FROM tags t
            LEFT JOIN post_tags pt ON pt.tag_id = t.id
            LEFT JOIN posts p ON p.id = pt.post_id AND p.is_published = 1 AND p.is_deleted = 0
            GROUP BY t.id, t.display_name, t.normalized_name
            ORDER BY post_count DESC, t.display_name COLLATE NOCASE ASC
            LIMIT ?
            "#,
        )
        .bind(limit as i64)
        .fetch_all(self.pool.sqlite())
        .await
        .context("Failed to get tags with counts")?;

        rows.iter()
            .map(|row| Ok(TagWithCount::new(row_to_tag(row)?, row.get("post_count"))))
            .collect()
    }

    async fn update(&self, tag: &Tag) -> Result<()> {
        sqlx::query("UPDATE tags SET display_name = ?, normalized_name = ? WHERE id = ?")
            .bind(&tag.display_name)
            .bind(&tag.normalized_name)
            .bind(tag.id)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to update tag")?;
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        // post_tags rows go with the tag (ON DELETE CASCADE)
        sqlx::query("DELETE FROM tags WHERE id = ?")
            .bind(id)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to delete tag")?;
        Ok(())
    }

    async fn get_by_post_id(&self, post_id: i64) -> Result<Vec<Tag>> {
        let rows = sqlx::query(
            r#"
            SELECT t.id, t.display_name, t.normalized_name
            FROM tags t
            INNER JOIN post_tags pt ON pt.tag_id = t.id
            WHERE pt.post_id = ?
            ORDER BY t.display_name COLLATE NOCASE
            "#,
        )
        .bind(post_id)
        .fetch_all(self.pool.sqlite())
        .await
        .context("Failed to get tags by post")?;

        rows.iter().map(row_to_tag).collect()
    }

    async fn set_post_tags(&self, post_id: i64, tag_ids: &[i64]) -> Result<()> {
        let mut tx = self
            .pool
            .sqlite()
            .begin()
            .await
            .context("Failed to begin transaction")?;

        sqlx::query("DELETE FROM post_tags WHERE post_id = ?")
            .bind(post_id)
            .execute(&mut *tx)
            .await
            .context("Failed to clear post tags")?;

        for tag_id in tag_ids {
            sqlx::query("INSERT OR IGNORE INTO post_tags (post_id, tag_id) VALUES (?, ?)")
                .bind(post_id)
                .bind(tag_id)
                .execute(&mut *tx)
                .await
                .context("Failed to add tag to post")?;
        }

        tx.commit().await.context("Failed to commit post tags")?;
        Ok(())
    }

    async fn count(&self) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM tags")
            .fetch_one(self.pool.sqlite())
            .await
            .context("Failed to count tags")
    }
}

fn row_to_tag(row: &SqliteRow) -> Result<Tag> {
    Ok(Tag {
        id: row.try_get("id")?,
        display_name: row.try_get("display_name")?,
        normalized_name: row.try_get("normalized_name")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_repo() -> (DynDatabasePool, SqlxTagRepository) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let repo = SqlxTagRepository::new(pool.clone());
        (pool, repo)
    }

    async fn insert_post(pool: &DynDatabasePool, slug: &str, published: bool) -> i64 {
        sqlx::query(
            "INSERT INTO posts (title, slug, content, is_published, created_at) VALUES (?, ?, 'body', ?, ?)",
        )
        .bind(slug)
        .bind(slug)
        .bind(published)
        .bind(chrono::Utc::now())
        .execute(pool.sqlite())
        .await
        .expect("Failed to insert post")
        .last_insert_rowid()
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let (_pool, repo) = setup_test_repo().await;

        let created = repo.create(&Tag::new("C#", "c-sharp")).await.unwrap();
        assert!(created.id > 0);

        let by_id = repo.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(by_id, created);
        let by_name = repo.get_by_normalized_name("c-sharp").await.unwrap().unwrap();
        assert_eq!(by_name.display_name, "C#");
        assert!(repo.get_by_normalized_name("rust").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_normalized_name_is_unique() {
        let (_pool, repo) = setup_test_repo().await;
        repo.create(&Tag::new("Rust", "rust")).await.unwrap();
        assert!(repo.create(&Tag::new("rust", "rust")).await.is_err());
    }

    #[tokio::test]
    async fn test_post_tags_and_counts() {
        let (pool, repo) = setup_test_repo().await;
        let rust = repo.create(&Tag::new("Rust", "rust")).await.unwrap();
        let web = repo.create(&Tag::new("Web", "web")).await.unwrap();
        let draft_only = repo.create(&Tag::new("Draft", "draft")).await.unwrap();

        let p1 = insert_post(&pool, "a", true).await;
        let p2 = insert_post(&pool, "b", true).await;
        let p3 = insert_post(&pool, "c", false).await;
        repo.set_post_tags(p1, &[rust.id, web.id]).await.unwrap();
        repo.set_post_tags(p2, &[rust.id]).await.unwrap();
        repo.set_post_tags(p3, &[draft_only.id]).await.unwrap();

        let tags = repo.get_by_post_id(p1).await.unwrap();
        assert_eq!(tags.len(), 2);

        let cloud = repo.list_with_counts(10).await.unwrap();
        assert_eq!(cloud[0].tag.normalized_name, "rust");
        assert_eq!(cloud[0].post_count, 2);
        let draft = cloud.iter().find(|t| t.tag.id == draft_only.id).unwrap();
        assert_eq!(draft.post_count, 0);

        // Replacing the set drops old links
        repo.set_post_tags(p1, &[web.id]).await.unwrap();
        let tags = repo.get_by_post_id(p1).await.unwrap();
        assert_eq!(tags, vec![web.clone()]);
    }

    #[tokio::test]
    async fn test_delete_cascades_associations() {
        let (pool, repo) = setup_test_repo().await;
        let tag = repo.create(&Tag::new("Rust", "rust")).await.unwrap();
        let post = insert_post(&pool, "a", true).await;
        repo.set_post_tags(post, &[tag.id]).await.unwrap();

        repo.delete(tag.id).await.unwrap();

        assert!(repo.get_by_post_id(post).await.unwrap().is_empty());
        assert_eq!(repo.count().await.unwrap(), 0);
    }
}

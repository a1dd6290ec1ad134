//! Mention repository

use crate::db::DynDatabasePool;
use crate::models::{ListParams, Mention, MentionWorker};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use std::sync::Arc;

#[async_trait]
pub trait MentionRepository: Send + Sync {
    async fn create(&self, mention: &Mention) -> Result<Mention>;

    /// Whether `source_url` already mentioned `post_id`
    async fn exists(&self, source_url: &str, post_id: i64) -> Result<bool>;

    /// Newest first
    async fn list(&self, params: &ListParams) -> Result<(Vec<Mention>, i64)>;

    async fn delete(&self, ids: &[i64]) -> Result<u64>;

    async fn clear(&self) -> Result<u64>;

    async fn count(&self) -> Result<i64>;
}

pub struct SqlxMentionRepository {
    pool: DynDatabasePool,
}

impl SqlxMentionRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn MentionRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl MentionRepository for SqlxMentionRepository {
    async fn create(&self, mention: &Mention) -> Result<Mention> {
        let result = sqlx::query(
            r#"
            INSERT INTO mentions (domain, source_url, source_title, source_ip, target_post_id, target_post_title, worker, ping_time)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&mention.domain)
        .bind(&mention.source_url)
        .bind(&mention.source_title)
        .bind(&mention.source_ip)
        .bind(mention.target_post_id)
        .bind(&mention.target_post_title)
        .bind(mention.worker.as_str())
        .bind(mention.ping_time)
        .execute(self.pool.sqlite())
        .await
        .context("Failed to create mention")?;

        Ok(Mention {
            id: result.last_insert_rowid(),
            ..mention.clone()
        })
    }

    async fn exists(&self, source_url: &str, post_id: i64) -> Result<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM mentions WHERE source_url = ? AND target_post_id = ?",
        )
        .bind(source_url)
        .bind(post_id)
        .fetch_one(self.pool.sqlite())
        .await
        .context("Failed to check mention")?;
        Ok(count > 0)
    }

    async fn list(&self, params: &ListParams) -> Result<(Vec<Mention>, i64)> {
        let total = self.count().await?;
        let rows = sqlx::query(
            r#"
            SELECT id, domain, source_url, source_title, source_ip, target_post_id, target_post_title, worker, ping_time
            FROM mentions
            ORDER BY ping_time DESC, id DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(self.pool.sqlite())
        .await
        .context("Failed to list mentions")?;

        let items = rows.iter().map(row_to_mention).collect::<Result<Vec<_>>>()?;
        Ok((items, total))
    }

    async fn delete(&self, ids: &[i64]) -> Result<u64> {
        let mut deleted = 0;
        for id in ids {
            let result = sqlx::query("DELETE FROM mentions WHERE id = ?")
                .bind(id)
                .execute(self.pool.sqlite())
                .await
                .context("Failed to delete mention")?;
            deleted += result.rows_affected();
        }
        Ok(deleted)
    }

    async fn clear(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM mentions")
            .execute(self.pool.sqlite())
            .await
            .context("Failed to clear mentions")?;
        Ok(result.rows_affected())
    }

    async fn count(&self) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM mentions")
            .fetch_one(self.pool.sqlite())
            .await
            .context("Failed to count mentions")
    }
}

fn row_to_mention(row: &SqliteRow) -> Result<Mention> {
    let worker: String = row.try_get("worker")?;
    Ok(Mention {
        id: row.try_get("id")?,
        domain: row.try_get("domain")?,
        source_url: row.try_get("source_url")?,
        source_title: row.try_get("source_title")?,
        source_ip: row.try_get("source_ip")?,
        target_post_id: row.try_get("target_post_id")?,
        target_post_title: row.try_get("target_post_title")?,
        worker: worker.parse::<MentionWorker>().map_err(|e| anyhow!(e))?,
        ping_time: row.try_get("ping_time")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};
    use chrono::Utc;

    #[tokio::test]
    async fn test_create_exists_and_delete() {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        let post_id = sqlx::query(
            "INSERT INTO posts (title, slug, content, is_published, created_at) VALUES ('T', 't', 'c', 1, ?)",
        )
        .bind(Utc::now())
        .execute(pool.sqlite())
        .await
        .unwrap()
        .last_insert_rowid();
        let repo = SqlxMentionRepository::new(pool);

        let mention = Mention {
            id: 0,
            domain: "example.com".to_string(),
            source_url: "https://example.com/a".to_string(),
            source_title: "A".to_string(),
            source_ip: None,
            target_post_id: post_id,
            target_post_title: "T".to_string(),
            worker: MentionWorker::Webmention,
            ping_time: Utc::now(),
        };
        let saved = repo.create(&mention).await.unwrap();
        assert!(repo.exists("https://example.com/a", post_id).await.unwrap());
        assert!(!repo.exists("https://example.com/b", post_id).await.unwrap());
        assert!(repo.create(&mention).await.is_err());

        let (items, total) = repo.list(&ListParams::default()).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(items[0].worker, MentionWorker::Webmention);

        assert_eq!(repo.delete(&[saved.id, 999]).await.unwrap(), 1);
        assert_eq!(repo.count().await.unwrap(), 0);
    }
}

//! Friend link repository

use crate::db::DynDatabasePool;
use crate::models::FriendLink;
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use std::sync::Arc;

#[async_trait]
pub trait FriendLinkRepository: Send + Sync {
    async fn create(&self, link: &FriendLink) -> Result<FriendLink>;

    async fn get_by_id(&self, id: i64) -> Result<Option<FriendLink>>;

    /// Ordered by rank, then title
    async fn list(&self) -> Result<Vec<FriendLink>>;

    async fn update(&self, link: &FriendLink) -> Result<()>;

    async fn delete(&self, id: i64) -> Result<()>;
}

pub struct SqlxFriendLinkRepository {
    pool: DynDatabasePool,
}

impl SqlxFriendLinkRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn FriendLinkRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl FriendLinkRepository for SqlxFriendLinkRepository {
    async fn create(&self, link: &FriendLink) -> Result<FriendLink> {
        let result = sqlx::query("INSERT INTO friend_links (title, link_url, rank) VALUES (?, ?, ?)")
            .bind(&link.title)
            .bind(&link.link_url)
            .bind(link.rank)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to create friend link")?;

        Ok(FriendLink {
            id: result.last_insert_rowid(),
            ..link.clone()
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<FriendLink>> {
        let row = sqlx::query("SELECT id, title, link_url, rank FROM friend_links WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool.sqlite())
            .await
            .context("Failed to get friend link")?;
        row.map(|r| row_to_link(&r)).transpose()
    }

    async fn list(&self) -> Result<Vec<FriendLink>> {
        let rows = sqlx::query(
            "SELECT id, title, link_url, rank FROM friend_links ORDER BY rank ASC, title COLLATE NOCASE ASC",
        )
        .fetch_all(self.pool.sqlite())
        .await
        .context("Failed to list friend links")?;
        rows.iter().map(row_to_link).collect()
    }

    async fn update(&self, link: &FriendLink) -> Result<()> {
        sqlx::query("UPDATE friend_links SET title = ?, link_url = ?, rank = ? WHERE id = ?")
            .bind(&link.title)
            .bind(&link.link_url)
            .bind(link.rank)
            .bind(link.id)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to update friend link")?;
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        sqlx::query("DELETE FROM friend_links WHERE id = ?")
            .bind(id)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to delete friend link")?;
        Ok(())
    }
}

fn row_to_link(row: &SqliteRow) -> Result<FriendLink> {
    Ok(FriendLink {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        link_url: row.try_get("link_url")?,
        rank: row.try_get("rank")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    #[tokio::test]
    async fn test_list_orders_by_rank_then_title() {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        let repo = SqlxFriendLinkRepository::new(pool);

        for (title, rank) in [("Zed", 1), ("alpha", 2), ("Beta", 1)] {
            repo.create(&FriendLink {
                id: 0,
                title: title.to_string(),
                link_url: "https://example.com".to_string(),
                rank,
            })
            .await
            .unwrap();
        }

        let titles: Vec<String> = repo.list().await.unwrap().into_iter().map(|l| l.title).collect();
        assert_eq!(titles, vec!["Beta", "Zed", "alpha"]);
    }
}

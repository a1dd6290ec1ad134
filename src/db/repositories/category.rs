//! Category repository

use crate::db::DynDatabasePool;
use crate::models::{Category, CategoryWithCount};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use std::sync::Arc;

/// Category repository trait
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    async fn create(&self, category: &Category) -> Result<Category>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Category>>;

    async fn get_by_route_name(&self, route_name: &str) -> Result<Option<Category>>;

    async fn list(&self) -> Result<Vec<Category>>;

    /// Categories with their count of visible posts
    async fn list_with_counts(&self) -> Result<Vec<CategoryWithCount>>;

    async fn update(&self, category: &Category) -> Result<()>;

    async fn delete(&self, id: i64) -> Result<()>;

    async fn get_by_post_id(&self, post_id: i64) -> Result<Vec<Category>>;

    /// Replace the category set of a post
    async fn set_post_categories(&self, post_id: i64, category_ids: &[i64]) -> Result<()>;

    async fn count(&self) -> Result<i64>;
}

/// SQLx-based category repository implementation
pub struct SqlxCategoryRepository {
    pool: DynDatabasePool,
}

impl SqlxCategoryRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CategoryRepository> {
        Arc::new(Self::new(pool))
    }
}

const CATEGORY_COLUMNS: &str = "c.id, c.route_name, c.display_name, c.note, c.created_at";

#[async_trait]
impl CategoryRepository for SqlxCategoryRepository {
    async fn create(&self, category: &Category) -> Result<Category> {
        let now = chrono::Utc::now();
        let result = sqlx::query(
            "INSERT INTO categories (route_name, display_name, note, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&category.route_name)
        .bind(&category.display_name)
        .bind(&category.note)
        .bind(now)
        .execute(self.pool.sqlite())
        .await
        .context("Failed to create category")?;

        Ok(Category {
            id: result.last_insert_rowid(),
            created_at: now,
            ..category.clone()
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Category>> {
        let sql = format!("SELECT {} FROM categories c WHERE c.id = ?", CATEGORY_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(self.pool.sqlite())
            .await
            .context("Failed to get category by ID")?;

        row.map(|r| row_to_category(&r)).transpose()
    }

    async fn get_by_route_name(&self, route_name: &str) -> Result<Option<Category>> {
        let sql = format!("SELECT {} FROM categories c WHERE c.route_name = ?", CATEGORY_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(route_name)
            .fetch_optional(self.pool.sqlite())
            .await
            .context("Failed to get category by route name")?;

        row.map(|r| row_to_category(&r)).transpose()
    }

    async fn list(&self) -> Result<Vec<Category>> {
        let sql = format!(
            "SELECT {} FROM categories c ORDER BY c.display_name COLLATE NOCASE",
            CATEGORY_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .fetch_all(self.pool.sqlite())
            .await
            .context("Failed to list categories")?;

        rows.iter().map(row_to_category).collect()
    }

    async fn list_with_counts(&self) -> Result<Vec<CategoryWithCount>> {
        let sql = format!(
            r#"
            SELECT {}, COUNT(p.id) AS post_count
            FROM categories c
            LEFT JOIN post_categories pc ON pc.category_id = c.id
            LEFT JOIN posts p ON p.id = pc.post_id AND p.is_published = 1 AND p.is_deleted = 0
            GROUP BY c.id
            ORDER BY c.display_name COLLATE NOCASE
            "#,
            CATEGORY_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .fetch_all(self.pool.sqlite())
            .await
            .context("Failed to list categories with counts")?;

        rows.iter()
            .map(|row| {
                Ok(CategoryWithCount {
                    category: row_to_category(row)?,
                    post_count: row.try_get("post_count")?,
                })
            })
            .collect()
    }

    async fn update(&self, category: &Category) -> Result<()> {
        sqlx::query("UPDATE categories SET route_name = ?, display_name = ?, note = ? WHERE id = ?")
            .bind(&category.route_name)
            .bind(&category.display_name)
            .bind(&category.note)
            .bind(category.id)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to update category")?;
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        sqlx::query("DELETE FROM categories WHERE id = ?")
            .bind(id)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to delete category")?;
        Ok(())
    }

    async fn get_by_post_id(&self, post_id: i64) -> Result<Vec<Category>> {
        let sql = format!(
            r#"
            SELECT {}
            FROM categories c
            INNER JOIN post_categories pc ON pc.category_id = c.id
            WHERE pc.post_id = ?
            ORDER BY c.display_name COLLATE NOCASE
            "#,
            CATEGORY_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(post_id)
            .fetch_all(self.pool.sqlite())
            .await
            .context("Failed to get categories by post")?;

        rows.iter().map(row_to_category).collect()
    }

    async fn set_post_categories(&self, post_id: i64, category_ids: &[i64]) -> Result<()> {
        let mut tx = self
            .pool
            .sqlite()
            .begin()
            .await
            .context("Failed to begin transaction")?;

        sqlx::query("DELETE FROM post_categories WHERE post_id = ?")
            .bind(post_id)
            .execute(&mut *tx)
            .await
            .context("Failed to clear post categories")?;

        for category_id in category_ids {
            sqlx::query("INSERT OR IGNORE INTO post_categories (post_id, category_id) VALUES (?, ?)")
                .bind(post_id)
                .bind(category_id)
                .execute(&mut *tx)
                .await
                .context("Failed to add category to post")?;
        }

        tx.commit().await.context("Failed to commit post categories")?;
        Ok(())
    }

    async fn count(&self) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM categories")
            .fetch_one(self.pool.sqlite())
            .await
            .context("Failed to count categories")
    }
}

fn row_to_category(row: &SqliteRow) -> Result<Category> {
    Ok(Category {
        id: row.try_get("id")?,
        route_name: row.try_get("route_name")?,
        display_name: row.try_get("display_name")?,
        note: row.try_get("note")?,
        created_at: row.try_get("created_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_repo() -> (DynDatabasePool, SqlxCategoryRepository) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let repo = SqlxCategoryRepository::new(pool.clone());
        (pool, repo)
    }

    #[tokio::test]
    async fn test_default_category_is_seeded() {
        let (_pool, repo) = setup_test_repo().await;
        let default = repo.get_by_route_name("default").await.unwrap();
        assert!(default.is_some());
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_create_update_delete() {
        let (_pool, repo) = setup_test_repo().await;

        let created = repo
            .create(&Category::new("rust", "Rust", Some("Systems".to_string())))
            .await
            .unwrap();
        assert!(created.id > 0);

        let mut updated = created.clone();
        updated.display_name = "Rust Lang".to_string();
        repo.update(&updated).await.unwrap();
        let fetched = repo.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(fetched.display_name, "Rust Lang");
        assert_eq!(fetched.note.as_deref(), Some("Systems"));

        repo.delete(created.id).await.unwrap();
        assert!(repo.get_by_id(created.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_route_name_is_unique() {
        let (_pool, repo) = setup_test_repo().await;
        assert!(repo.create(&Category::new("default", "Again", None)).await.is_err());
    }

    #[tokio::test]
    async fn test_post_categories() {
        let (pool, repo) = setup_test_repo().await;
        let rust = repo.create(&Category::new("rust", "Rust", None)).await.unwrap();
        let post_id = sqlx::query(
            "INSERT INTO posts (title, slug, content, is_published, created_at) VALUES ('t', 't', 'c', 1, ?)",
        )
        .bind(chrono::Utc::now())
        .execute(pool.sqlite())
        .await
        .unwrap()
        .last_insert_rowid();

        repo.set_post_categories(post_id, &[rust.id, 1]).await.unwrap();
        assert_eq!(repo.get_by_post_id(post_id).await.unwrap().len(), 2);

        let counts = repo.list_with_counts().await.unwrap();
        let rust_count = counts.iter().find(|c| c.category.id == rust.id).unwrap();
        assert_eq!(rust_count.post_count, 1);

        // Deleting a category keeps the post
        repo.delete(rust.id).await.unwrap();
        assert_eq!(repo.get_by_post_id(post_id).await.unwrap().len(), 1);
    }
}

//! Page repository

use crate::db::DynDatabasePool;
use crate::models::Page;
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use std::sync::Arc;

/// Page repository trait
#[async_trait]
pub trait PageRepository: Send + Sync {
    async fn create(&self, page: &Page) -> Result<Page>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Page>>;

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Page>>;

    /// All pages, newest first
    async fn list(&self) -> Result<Vec<Page>>;

    async fn list_published(&self) -> Result<Vec<Page>>;

    async fn update(&self, page: &Page) -> Result<()>;

    async fn delete(&self, id: i64) -> Result<()>;

    async fn count(&self) -> Result<i64>;
}

/// SQLx-based page repository implementation
pub struct SqlxPageRepository {
    pool: DynDatabasePool,
}

impl SqlxPageRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn PageRepository> {
        Arc::new(Self::new(pool))
    }
}

const PAGE_COLUMNS: &str = "id, title, slug, meta_description, html_content, css, hide_sidebar, is_published, created_at, updated_at";

#[async_trait]
impl PageRepository for SqlxPageRepository {
    async fn create(&self, page: &Page) -> Result<Page> {
        let result = sqlx::query(
            r#"
            INSERT INTO pages (title, slug, meta_description, html_content, css, hide_sidebar, is_published, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&page.title)
        .bind(&page.slug)
        .bind(&page.meta_description)
        .bind(&page.html_content)
        .bind(&page.css)
        .bind(page.hide_sidebar)
        .bind(page.is_published)
        .bind(page.created_at)
        .bind(page.updated_at)
        .execute(self.pool.sqlite())
        .await
        .context("Failed to create page")?;

        Ok(Page {
            id: result.last_insert_rowid(),
            ..page.clone()
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Page>> {
        let sql = format!("SELECT {} FROM pages WHERE id = ?", PAGE_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(self.pool.sqlite())
            .await
            .context("Failed to get page by ID")?;
        row.map(|r| row_to_page(&r)).transpose()
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Page>> {
        let sql = format!("SELECT {} FROM pages WHERE slug = ?", PAGE_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(slug)
            .fetch_optional(self.pool.sqlite())
            .await
            .context("Failed to get page by slug")?;
        row.map(|r| row_to_page(&r)).transpose()
    }

    async fn list(&self) -> Result<Vec<Page>> {
        let sql = format!("SELECT {} FROM pages ORDER BY created_at DESC, id DESC", PAGE_COLUMNS);
        let rows = sqlx::query(&sql)
            .fetch_all(self.pool.sqlite())
            .await
            .context("Failed to list pages")?;
        rows.iter().map(row_to_page).collect()
    }

    async fn list_published(&self) -> Result<Vec<Page>> {
        let sql = format!(
            "SELECT {} FROM pages WHERE is_published = 1 ORDER BY created_at DESC, id DESC",
            PAGE_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .fetch_all(self.pool.sqlite())
            .await
            .context("Failed to list published pages")?;
        rows.iter().map(row_to_page).collect()
    }

    async fn update(&self, page: &Page) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE pages SET title = ?, slug = ?, meta_description = ?, html_content = ?, css = ?,
                hide_sidebar = ?, is_published = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&page.title)
        .bind(&page.slug)
        .bind(&page.meta_description)
        .bind(&page.html_content)
        .bind(&page.css)
        .bind(page.hide_sidebar)
        .bind(page.is_published)
        .bind(page.updated_at)
        .bind(page.id)
        .execute(self.pool.sqlite())
        .await
        .context("Failed to update page")?;
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        sqlx::query("DELETE FROM pages WHERE id = ?")
            .bind(id)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to delete page")?;
        Ok(())
    }

    async fn count(&self) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM pages")
            .fetch_one(self.pool.sqlite())
            .await
            .context("Failed to count pages")
    }
}

fn row_to_page(row: &SqliteRow) -> Result<Page> {
    Ok(Page {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        slug: row.try_get("slug")?,
        meta_description: row.try_get("meta_description")?,
        html_content: row.try_get("html_content")?,
        css: row.try_get("css")?,
        hide_sidebar: row.try_get("hide_sidebar")?,
        is_published: row.try_get("is_published")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};
    use chrono::Utc;

    async fn setup_test_repo() -> SqlxPageRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        SqlxPageRepository::new(pool)
    }

    fn sample_page(slug: &str, published: bool) -> Page {
        Page {
            id: 0,
            title: slug.to_uppercase(),
            slug: slug.to_string(),
            meta_description: String::new(),
            html_content: "<p>hi</p>".to_string(),
            css: None,
            hide_sidebar: false,
            is_published: published,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_crud() {
        let repo = setup_test_repo().await;
        let page = repo.create(&sample_page("about", true)).await.unwrap();
        assert_eq!(repo.get_by_slug("about").await.unwrap().unwrap().id, page.id);

        let mut changed = page.clone();
        changed.title = "About me".to_string();
        repo.update(&changed).await.unwrap();
        assert_eq!(repo.get_by_id(page.id).await.unwrap().unwrap().title, "About me");

        repo.delete(page.id).await.unwrap();
        assert!(repo.get_by_id(page.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_published_and_unique_slug() {
        let repo = setup_test_repo().await;
        repo.create(&sample_page("about", true)).await.unwrap();
        repo.create(&sample_page("draft", false)).await.unwrap();
        assert!(repo.create(&sample_page("about", false)).await.is_err());

        assert_eq!(repo.list().await.unwrap().len(), 2);
        let published = repo.list_published().await.unwrap();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].slug, "about");
        assert_eq!(repo.count().await.unwrap(), 2);
    }
}

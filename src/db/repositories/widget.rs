//! Widget repository

use crate::db::DynDatabasePool;
use crate::models::{Widget, WidgetType};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use std::sync::Arc;

#[async_trait]
pub trait WidgetRepository: Send + Sync {
    async fn create(&self, widget: &Widget) -> Result<Widget>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Widget>>;

    /// By display order; only enabled widgets when `enabled_only`
    async fn list(&self, enabled_only: bool) -> Result<Vec<Widget>>;

    async fn update(&self, widget: &Widget) -> Result<()>;

    async fn delete(&self, id: i64) -> Result<()>;
}

pub struct SqlxWidgetRepository {
    pool: DynDatabasePool,
}

impl SqlxWidgetRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn WidgetRepository> {
        Arc::new(Self::new(pool))
    }
}

const WIDGET_COLUMNS: &str = "id, title, widget_type, content, display_order, is_enabled, created_at";

#[async_trait]
impl WidgetRepository for SqlxWidgetRepository {
    async fn create(&self, widget: &Widget) -> Result<Widget> {
        let content = serde_json::to_string(&widget.content).context("Failed to serialize widget content")?;
        let result = sqlx::query(
            "INSERT INTO widgets (title, widget_type, content, display_order, is_enabled, created_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&widget.title)
        .bind(widget.widget_type.as_str())
        .bind(content)
        .bind(widget.display_order)
        .bind(widget.is_enabled)
        .bind(widget.created_at)
        .execute(self.pool.sqlite())
        .await
        .context("Failed to create widget")?;

        Ok(Widget {
            id: result.last_insert_rowid(),
            ..widget.clone()
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Widget>> {
        let sql = format!("SELECT {} FROM widgets WHERE id = ?", WIDGET_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(self.pool.sqlite())
            .await
            .context("Failed to get widget")?;
        row.map(|r| row_to_widget(&r)).transpose()
    }

    async fn list(&self, enabled_only: bool) -> Result<Vec<Widget>> {
        let sql = format!(
            "SELECT {} FROM widgets WHERE (? = 0 OR is_enabled = 1) ORDER BY display_order, id",
            WIDGET_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(enabled_only)
            .fetch_all(self.pool.sqlite())
            .await
            .context("Failed to list widgets")?;
        rows.iter().map(row_to_widget).collect()
    }

    async fn update(&self, widget: &Widget) -> Result<()> {
        let content = serde_json::to_string(&widget.content).context("Failed to serialize widget content")?;
        sqlx::query(
            "UPDATE widgets SET title = ?, widget_type = ?, content = ?, display_order = ?, is_enabled = ? WHERE id = ?",
        )
        .bind(&widget.title)
        .bind(widget.widget_type.as_str())
        .bind(content)
        .bind(widget.display_order)
        .bind(widget.is_enabled)
        .bind(widget.id)
        .execute(self.pool.sqlite())
        .await
        .context("Failed to update widget")?;
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        sqlx::query("DELETE FROM widgets WHERE id = ?")
            .bind(id)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to delete widget")?;
        Ok(())
    }
}

fn row_to_widget(row: &SqliteRow) -> Result<Widget> {
    let widget_type: String = row.try_get("widget_type")?;
    let content: String = row.try_get("content")?;
    Ok(Widget {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        widget_type: widget_type.parse::<WidgetType>().map_err(|e| anyhow!(e))?,
        content: serde_json::from_str(&content).context("Invalid widget content")?,
        display_order: row.try_get("display_order")?,
        is_enabled: row.try_get("is_enabled")?,
        created_at: row.try_get("created_at")?,
    })
}

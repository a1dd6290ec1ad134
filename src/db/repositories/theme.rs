//! Theme repository

use crate::db::DynDatabasePool;
use crate::models::Theme;
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use std::sync::Arc;

#[async_trait]
pub trait ThemeRepository: Send + Sync {
    async fn create(&self, theme: &Theme) -> Result<Theme>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Theme>>;

    async fn get_by_name(&self, name: &str) -> Result<Option<Theme>>;

    /// System themes first, then by ID
    async fn list(&self) -> Result<Vec<Theme>>;

    async fn delete(&self, id: i64) -> Result<()>;
}

pub struct SqlxThemeRepository {
    pool: DynDatabasePool,
}

impl SqlxThemeRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ThemeRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl ThemeRepository for SqlxThemeRepository {
    async fn create(&self, theme: &Theme) -> Result<Theme> {
        let rules = serde_json::to_string(&theme.css_rules).context("Failed to serialize CSS rules")?;
        let result = sqlx::query(
            "INSERT INTO blog_themes (theme_name, css_rules, is_system, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&theme.theme_name)
        .bind(rules)
        .bind(theme.is_system)
        .bind(theme.created_at)
        .execute(self.pool.sqlite())
        .await
        .context("Failed to create theme")?;

        Ok(Theme {
            id: result.last_insert_rowid(),
            ..theme.clone()
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Theme>> {
        let row = sqlx::query("SELECT id, theme_name, css_rules, is_system, created_at FROM blog_themes WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool.sqlite())
            .await
            .context("Failed to get theme")?;
        row.map(|r| row_to_theme(&r)).transpose()
    }

    async fn get_by_name(&self, name: &str) -> Result<Option<Theme>> {
        let row = sqlx::query(
            "SELECT id, theme_name, css_rules, is_system, created_at FROM blog_themes WHERE theme_name = ?",
        )
        .bind(name)
        .fetch_optional(self.pool.sqlite())
        .await
        .context("Failed to get theme by name")?;
        row.map(|r| row_to_theme(&r)).transpose()
    }

    async fn list(&self) -> Result<Vec<Theme>> {
        let rows = sqlx::query(
            "SELECT id, theme_name, css_rules, is_system, created_at FROM blog_themes ORDER BY is_system DESC, id",
        )
        .fetch_all(self.pool.sqlite())
        .await
        .context("Failed to list themes")?;
        rows.iter().map(row_to_theme).collect()
    }

    async fn delete(&self, id: i64) -> Result<()> {
        sqlx::query("DELETE FROM blog_themes WHERE id = ?")
            .bind(id)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to delete theme")?;
        Ok(())
    }
}

fn row_to_theme(row: &SqliteRow) -> Result<Theme> {
    let rules: String = row.try_get("css_rules")?;
    Ok(Theme {
        id: row.try_get("id")?,
        theme_name: row.try_get("theme_name")?,
        css_rules: serde_json::from_str(&rules).context("Invalid theme CSS rules")?,
        is_system: row.try_get("is_system")?,
        created_at: row.try_get("created_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};
    use chrono::Utc;
    use std::collections::BTreeMap;

    #[tokio::test]
    async fn test_system_themes_are_seeded() {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        let repo = SqlxThemeRepository::new(pool);

        let themes = repo.list().await.unwrap();
        assert_eq!(themes.len(), 5);
        assert!(themes.iter().all(|t| t.is_system));
        let blue = repo.get_by_name("Word Blue").await.unwrap().unwrap();
        assert_eq!(blue.css_rules["--accent-color1"], "#2a579a");
    }

    #[tokio::test]
    async fn test_create_user_theme() {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        let repo = SqlxThemeRepository::new(pool);

        let mut rules = BTreeMap::new();
        rules.insert("--accent-color1".to_string(), "#000".to_string());
        let theme = repo
            .create(&Theme {
                id: 0,
                theme_name: "Mine".to_string(),
                css_rules: rules,
                is_system: false,
                created_at: Utc::now(),
            })
            .await
            .unwrap();

        let themes = repo.list().await.unwrap();
        assert_eq!(themes.last().unwrap().id, theme.id);
        repo.delete(theme.id).await.unwrap();
        assert!(repo.get_by_id(theme.id).await.unwrap().is_none());
    }
}

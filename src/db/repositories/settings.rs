//! Blog configuration repository
//!
//! Each configuration section is stored as one JSON document keyed by its
//! section name in `blog_configurations`.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use std::sync::Arc;

use crate::db::DynDatabasePool;

/// A stored configuration section
#[derive(Debug, Clone)]
pub struct ConfigEntry {
    pub key: String,
    pub value: String,
    pub last_modified: DateTime<Utc>,
}

/// Repository trait for configuration sections
#[async_trait]
pub trait SettingsRepository: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<ConfigEntry>>;

    async fn get_all(&self) -> Result<Vec<ConfigEntry>>;

    /// Insert or replace a section
    async fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// SQLx-based settings repository
pub struct SqlxSettingsRepository {
    pool: DynDatabasePool,
}

impl SqlxSettingsRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn SettingsRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl SettingsRepository for SqlxSettingsRepository {
    async fn get(&self, key: &str) -> Result<Option<ConfigEntry>> {
        let row = sqlx::query(
            "SELECT cfg_key, cfg_value, last_modified FROM blog_configurations WHERE cfg_key = ?",
        )
        .bind(key)
        .fetch_optional(self.pool.sqlite())
        .await
        .context("Failed to get configuration")?;

        row.map(|r| {
            Ok(ConfigEntry {
                key: r.try_get("cfg_key")?,
                value: r.try_get("cfg_value")?,
                last_modified: r.try_get("last_modified")?,
            })
        })
        .transpose()
    }

    async fn get_all(&self) -> Result<Vec<ConfigEntry>> {
        let rows = sqlx::query(
            "SELECT cfg_key, cfg_value, last_modified FROM blog_configurations ORDER BY cfg_key",
        )
        .fetch_all(self.pool.sqlite())
        .await
        .context("Failed to list configuration")?;

        rows.iter()
            .map(|r| {
                Ok(ConfigEntry {
                    key: r.try_get("cfg_key")?,
                    value: r.try_get("cfg_value")?,
                    last_modified: r.try_get("last_modified")?,
                })
            })
            .collect()
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO blog_configurations (cfg_key, cfg_value, last_modified)
            VALUES (?, ?, ?)
            ON CONFLICT(cfg_key) DO UPDATE SET cfg_value = excluded.cfg_value, last_modified = excluded.last_modified
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now())
        .execute(self.pool.sqlite())
        .await
        .context("Failed to save configuration")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    #[tokio::test]
    async fn test_set_overwrites() {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        let repo = SqlxSettingsRepository::new(pool);

        assert!(repo.get("GeneralSettings").await.unwrap().is_none());
        repo.set("GeneralSettings", r#"{"site_title":"A"}"#).await.unwrap();
        repo.set("GeneralSettings", r#"{"site_title":"B"}"#).await.unwrap();

        let entry = repo.get("GeneralSettings").await.unwrap().unwrap();
        assert_eq!(entry.value, r#"{"site_title":"B"}"#);
        assert_eq!(repo.get_all().await.unwrap().len(), 1);
    }
}

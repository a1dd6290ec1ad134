//! Activity log repository (append-only)

use crate::db::DynDatabasePool;
use crate::models::{ActivityLog, EventType, ListParams, NewActivity};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use std::sync::Arc;

#[async_trait]
pub trait ActivityLogRepository: Send + Sync {
    async fn append(&self, entry: &NewActivity) -> Result<i64>;

    /// Newest first, optionally restricted to one event type
    async fn list(&self, event_type: Option<EventType>, params: &ListParams) -> Result<(Vec<ActivityLog>, i64)>;

    async fn count(&self) -> Result<i64>;

    /// Remove entries older than `before`, or everything when `None`
    async fn clear(&self, before: Option<DateTime<Utc>>) -> Result<u64>;
}

pub struct SqlxActivityLogRepository {
    pool: DynDatabasePool,
}

impl SqlxActivityLogRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ActivityLogRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl ActivityLogRepository for SqlxActivityLogRepository {
    async fn append(&self, entry: &NewActivity) -> Result<i64> {
        let meta = entry
            .meta
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .context("Failed to serialize activity meta")?;

        let result = sqlx::query(
            r#"
            INSERT INTO activity_logs (event_type, event_time, actor, operation, target_name, meta, ip_address, user_agent)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(entry.event_type.as_str())
        .bind(Utc::now())
        .bind(&entry.actor)
        .bind(&entry.operation)
        .bind(&entry.target_name)
        .bind(meta)
        .bind(&entry.ip_address)
        .bind(&entry.user_agent)
        .execute(self.pool.sqlite())
        .await
        .context("Failed to append activity log")?;

        Ok(result.last_insert_rowid())
    }

    async fn list(&self, event_type: Option<EventType>, params: &ListParams) -> Result<(Vec<ActivityLog>, i64)> {
        let event_type = event_type.map(|t| t.as_str());

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM activity_logs WHERE (? IS NULL OR event_type = ?)")
            .bind(event_type)
            .bind(event_type)
            .fetch_one(self.pool.sqlite())
            .await
            .context("Failed to count activity logs")?;

        let rows = sqlx::query(
            r#"
            SELECT id, event_type, event_time, actor, operation, target_name, meta, ip_address, user_agent
            FROM activity_logs
            WHERE (? IS NULL OR event_type = ?)
            ORDER BY event_time DESC, id DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(event_type)
        .bind(event_type)
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(self.pool.sqlite())
        .await
        .context("Failed to list activity logs")?;

        let items = rows.iter().map(row_to_log).collect::<Result<Vec<_>>>()?;
        Ok((items, total))
    }

    async fn count(&self) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM activity_logs")
            .fetch_one(self.pool.sqlite())
            .await
            .context("Failed to count activity logs")
    }

    async fn clear(&self, before: Option<DateTime<Utc>>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM activity_logs WHERE (? IS NULL OR event_time < ?)")
            .bind(before)
            .bind(before)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to clear activity logs")?;
        Ok(result.rows_affected())
    }
}

fn row_to_log(row: &SqliteRow) -> Result<ActivityLog> {
    let event_type: String = row.try_get("event_type")?;
    let meta: Option<String> = row.try_get("meta")?;
    Ok(ActivityLog {
        id: row.try_get("id")?,
        event_type: event_type.parse().map_err(|e: String| anyhow!(e))?,
        event_time: row.try_get("event_time")?,
        actor: row.try_get("actor")?,
        operation: row.try_get("operation")?,
        target_name: row.try_get("target_name")?,
        meta: meta.as_deref().map(serde_json::from_str).transpose().context("Invalid activity meta")?,
        ip_address: row.try_get("ip_address")?,
        user_agent: row.try_get("user_agent")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    #[tokio::test]
    async fn test_append_list_and_clear() {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        let repo = SqlxActivityLogRepository::new(pool);

        repo.append(&NewActivity::new(EventType::Post, "Created post").target("Hello"))
            .await
            .unwrap();
        repo.append(
            &NewActivity::new(EventType::Settings, "Updated settings")
                .meta(serde_json::json!({"section": "GeneralSettings"})),
        )
        .await
        .unwrap();

        let (all, total) = repo.list(None, &ListParams::default()).await.unwrap();
        assert_eq!(total, 2);
        assert_eq!(all[0].event_type, EventType::Settings);
        assert_eq!(all[0].meta.as_ref().unwrap()["section"], "GeneralSettings");

        let (posts, total) = repo.list(Some(EventType::Post), &ListParams::default()).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(posts[0].target_name.as_deref(), Some("Hello"));

        let cutoff = Utc::now() - chrono::Duration::days(1);
        assert_eq!(repo.clear(Some(cutoff)).await.unwrap(), 0);
        assert_eq!(repo.clear(None).await.unwrap(), 2);
    }
}

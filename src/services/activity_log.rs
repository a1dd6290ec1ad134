//! Activity log service
//!
//! Append-only audit trail of administrative changes. Recording never fails
//! the operation that triggered it; a storage error is logged and dropped.

use crate::db::repositories::ActivityLogRepository;
use crate::models::{ActivityLog, EventType, ListParams, NewActivity, PagedResult};
use anyhow::Context;
use chrono::{Duration, Utc};
use std::sync::Arc;

/// Error types for activity log operations
#[derive(Debug, thiserror::Error)]
pub enum ActivityLogServiceError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct ActivityLogService {
    repo: Arc<dyn ActivityLogRepository>,
}

impl ActivityLogService {
    pub fn new(repo: Arc<dyn ActivityLogRepository>) -> Self {
        Self { repo }
    }

    /// Append an entry, logging instead of failing on storage errors
    pub async fn record(&self, entry: NewActivity) {
        tracing::debug!(
            event_type = %entry.event_type,
            operation = %entry.operation,
            "Recording activity"
        );
        if let Err(e) = self.repo.append(&entry).await {
            tracing::warn!("Failed to record activity '{}': {:#}", entry.operation, e);
        }
    }

    /// Newest entries first, optionally restricted to one event type
    pub async fn list(
        &self,
        event_type: Option<EventType>,
        params: &ListParams,
    ) -> Result<PagedResult<ActivityLog>, ActivityLogServiceError> {
        let (items, total) = self
            .repo
            .list(event_type, params)
            .await
            .context("Failed to list activity logs")?;
        Ok(PagedResult::new(items, total, params))
    }

    pub async fn count(&self) -> Result<i64, ActivityLogServiceError> {
        Ok(self.repo.count().await.context("Failed to count activity logs")?)
    }

    /// Remove entries older than `older_than_days`, or everything when `None`
    pub async fn clear(&self, older_than_days: Option<u32>) -> Result<u64, ActivityLogServiceError> {
        let cutoff = match older_than_days {
            Some(0) => {
                return Err(ActivityLogServiceError::ValidationError(
                    "Retention must be at least one day".to_string(),
                ))
            }
            Some(days) => Some(Utc::now() - Duration::days(days as i64)),
            None => None,
        };

        let removed = self
            .repo
            .clear(cutoff)
            .await
            .context("Failed to clear activity logs")?;
        tracing::info!("Cleared {} activity log entries", removed);
        Ok(removed)
    }
}

//! Sidebar widget service
//!
//! Widget content is JSON whose shape depends on the widget type:
//!
//! - `link_list`: `[{"title": "...", "url": "..."}]`, URLs sterilized
//! - `html`: a string of markup
//! - `tag_cloud`: `{"limit": n}` (optional)
//! - `recent_posts`: `{"count": n}` (optional)

use crate::cache::{Cache, CachePartition};
use crate::db::repositories::WidgetRepository;
use crate::models::{EventType, NewActivity, Widget, WidgetInput, WidgetType};
use crate::services::ActivityLogService;
use crate::utils::sterilize_link;
use anyhow::Context;
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;

const MAX_TITLE_LENGTH: usize = 64;
const MAX_ITEMS: u64 = 100;

#[derive(Debug, thiserror::Error)]
pub enum WidgetServiceError {
    #[error("Widget not found: {0}")]
    NotFound(i64),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct WidgetService {
    repo: Arc<dyn WidgetRepository>,
    cache: Arc<Cache>,
    activity: Arc<ActivityLogService>,
}

impl WidgetService {
    pub fn new(repo: Arc<dyn WidgetRepository>, cache: Arc<Cache>, activity: Arc<ActivityLogService>) -> Self {
        Self { repo, cache, activity }
    }

    /// Enabled widgets in display order
    pub async fn list_enabled(&self) -> Result<Vec<Widget>, WidgetServiceError> {
        self.cache
            .get_or_insert(&CachePartition::Widget.key("enabled"), || async {
                self.repo
                    .list(true)
                    .await
                    .context("Failed to list widgets")
                    .map_err(WidgetServiceError::from)
            })
            .await
    }

    pub async fn list(&self) -> Result<Vec<Widget>, WidgetServiceError> {
        Ok(self.repo.list(false).await.context("Failed to list widgets")?)
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Widget, WidgetServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get widget")?
            .ok_or(WidgetServiceError::NotFound(id))
    }

    pub async fn create(&self, input: WidgetInput) -> Result<Widget, WidgetServiceError> {
        let title = checked_title(&input.title)?;
        let content = normalize_content(input.widget_type, input.content)?;
        let widget = Widget {
            id: 0,
            title,
            widget_type: input.widget_type,
            content,
            display_order: input.display_order,
            is_enabled: input.is_enabled,
            created_at: Utc::now(),
        };
        let created = self.repo.create(&widget).await.context("Failed to create widget")?;
        self.after_write("Created widget", &created.title).await;
        Ok(created)
    }

    pub async fn update(&self, id: i64, input: WidgetInput) -> Result<Widget, WidgetServiceError> {
        let existing = self.get_by_id(id).await?;
        let widget = Widget {
            title: checked_title(&input.title)?,
            content: normalize_content(input.widget_type, input.content)?,
            widget_type: input.widget_type,
            display_order: input.display_order,
            is_enabled: input.is_enabled,
            ..existing
        };
        self.repo.update(&widget).await.context("Failed to update widget")?;
        self.after_write("Updated widget", &widget.title).await;
        Ok(widget)
    }

    pub async fn delete(&self, id: i64) -> Result<(), WidgetServiceError> {
        let widget = self.get_by_id(id).await?;
        self.repo.delete(id).await.context("Failed to delete widget")?;
        self.after_write("Deleted widget", &widget.title).await;
        Ok(())
    }

    async fn after_write(&self, operation: &str, title: &str) {
        self.cache.invalidate(&[CachePartition::Widget]).await;
        self.activity
            .record(NewActivity::new(EventType::Widget, operation).target(title))
            .await;
    }
}

fn checked_title(title: &str) -> Result<String, WidgetServiceError> {
    let title = title.trim();
    if title.is_empty() || title.chars().count() > MAX_TITLE_LENGTH {
        return Err(WidgetServiceError::ValidationError(format!(
            "Widget title must be 1-{} characters",
            MAX_TITLE_LENGTH
        )));
    }
    Ok(title.to_string())
}

/// Check `content` against the widget type and return its stored form
pub fn normalize_content(widget_type: WidgetType, content: Value) -> Result<Value, WidgetServiceError> {
    let invalid = |msg: &str| WidgetServiceError::ValidationError(msg.to_string());

    match widget_type {
        WidgetType::LinkList => {
            let items = match content {
                Value::Array(items) => items,
                Value::Object(map) if map.is_empty() => Vec::new(),
                _ => return Err(invalid("Link list content must be an array of links")),
            };
            let links = items
                .into_iter()
                .map(|item| {
                    let title = item.get("title").and_then(Value::as_str).map(str::trim).unwrap_or("");
                    let url = item.get("url").and_then(Value::as_str).unwrap_or("");
                    if title.is_empty() {
                        return Err(invalid("Every link needs a title"));
                    }
                    Ok(json!({ "title": title, "url": sterilize_link(url) }))
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Value::Array(links))
        }
        WidgetType::Html => match content {
            Value::String(html) => Ok(Value::String(html)),
            _ => Err(invalid("HTML widget content must be a string")),
        },
        WidgetType::TagCloud => Ok(json!({ "limit": bounded_number(&content, "limit", 20)? })),
        WidgetType::RecentPosts => Ok(json!({ "count": bounded_number(&content, "count", 5)? })),
    }
}

fn bounded_number(content: &Value, field: &str, default: u64) -> Result<u64, WidgetServiceError> {
    match content.get(field) {
        None | Some(Value::Null) => Ok(default),
        Some(value) => value
            .as_u64()
            .filter(|n| (1..=MAX_ITEMS).contains(n))
            .ok_or_else(|| {
                WidgetServiceError::ValidationError(format!("{} must be between 1 and {}", field, MAX_ITEMS))
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::TestContext;

    #[test]
    fn test_link_list_content_is_sterilized() {
        let content = json!([
            { "title": "Good", "url": "https://example.com" },
            { "title": "Bad", "url": "javascript:alert(1)" }
        ]);
        let normalized = normalize_content(WidgetType::LinkList, content).unwrap();
        assert_eq!(normalized[0]["url"], "https://example.com");
        assert_eq!(normalized[1]["url"], "#");

        assert!(normalize_content(WidgetType::LinkList, json!("nope")).is_err());
        assert!(normalize_content(WidgetType::LinkList, json!([{ "url": "/x" }])).is_err());
    }

    #[test]
    fn test_typed_content_defaults_and_bounds() {
        assert_eq!(
            normalize_content(WidgetType::TagCloud, json!({})).unwrap(),
            json!({ "limit": 20 })
        );
        assert_eq!(
            normalize_content(WidgetType::RecentPosts, json!({ "count": 3 })).unwrap(),
            json!({ "count": 3 })
        );
        assert!(normalize_content(WidgetType::RecentPosts, json!({ "count": 0 })).is_err());
        assert!(normalize_content(WidgetType::Html, json!({ "html": "<b>" })).is_err());
        assert_eq!(
            normalize_content(WidgetType::Html, json!("<b>hi</b>")).unwrap(),
            json!("<b>hi</b>")
        );
    }

    #[tokio::test]
    async fn test_enabled_list_follows_updates() {
        let ctx = TestContext::new().await;
        let service = ctx.widget_service();

        let widget = service
            .create(WidgetInput {
                title: "About".to_string(),
                widget_type: WidgetType::Html,
                content: json!("<p>hello</p>"),
                display_order: 1,
                is_enabled: true,
            })
            .await
            .unwrap();
        assert_eq!(service.list_enabled().await.unwrap().len(), 1);

        service
            .update(
                widget.id,
                WidgetInput {
                    title: "About".to_string(),
                    widget_type: WidgetType::Html,
                    content: json!("<p>hello</p>"),
                    display_order: 1,
                    is_enabled: false,
                },
            )
            .await
            .unwrap();
        assert!(service.list_enabled().await.unwrap().is_empty());
        assert_eq!(service.list().await.unwrap().len(), 1);

        service.delete(widget.id).await.unwrap();
        assert!(matches!(
            service.get_by_id(widget.id).await,
            Err(WidgetServiceError::NotFound(_))
        ));
    }
}

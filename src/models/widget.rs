//! Sidebar widget model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of widget, decides how `content` is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WidgetType {
    /// `{"links": [{"name": .., "url": ..}]}`
    LinkList,
    /// `{"html": ..}`
    Html,
    /// `{"limit": n}`
    TagCloud,
    /// `{"limit": n}`
    RecentPosts,
}

impl WidgetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LinkList => "link_list",
            Self::Html => "html",
            Self::TagCloud => "tag_cloud",
            Self::RecentPosts => "recent_posts",
        }
    }
}

impl std::fmt::Display for WidgetType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for WidgetType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "link_list" => Ok(Self::LinkList),
            "html" => Ok(Self::Html),
            "tag_cloud" => Ok(Self::TagCloud),
            "recent_posts" => Ok(Self::RecentPosts),
            _ => Err(format!("Invalid widget type: {}", s)),
        }
    }
}

/// Sidebar widget
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Widget {
    pub id: i64,
    pub title: String,
    pub widget_type: WidgetType,
    pub content: serde_json::Value,
    pub display_order: i64,
    pub is_enabled: bool,
    pub created_at: DateTime<Utc>,
}

/// Input for creating or updating a widget
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WidgetInput {
    pub title: String,
    pub widget_type: WidgetType,
    #[serde(default = "empty_object")]
    pub content: serde_json::Value,
    #[serde(default)]
    pub display_order: i64,
    #[serde(default = "default_enabled")]
    pub is_enabled: bool,
}

fn empty_object() -> serde_json::Value {
    serde_json::json!({})
}

fn default_enabled() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_widget_type_round_trips_through_str() {
        for t in [WidgetType::LinkList, WidgetType::Html, WidgetType::TagCloud, WidgetType::RecentPosts] {
            assert_eq!(t.as_str().parse::<WidgetType>().unwrap(), t);
        }
        assert!("calendar".parse::<WidgetType>().is_err());
    }

    #[test]
    fn test_widget_input_defaults() {
        let input: WidgetInput =
            serde_json::from_str(r#"{"title":"Links","widget_type":"link_list"}"#).unwrap();
        assert!(input.is_enabled);
        assert_eq!(input.content, serde_json::json!({}));
    }
}

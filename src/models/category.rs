//! Category model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Post category, addressed by its `route_name`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Category {
    pub id: i64,
    /// URL segment, lowercase letters, digits and hyphens
    pub route_name: String,
    pub display_name: String,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Category {
    pub fn new(route_name: impl Into<String>, display_name: impl Into<String>, note: Option<String>) -> Self {
        Self {
            id: 0,
            route_name: route_name.into(),
            display_name: display_name.into(),
            note,
            created_at: Utc::now(),
        }
    }
}

/// Category with its published post count
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryWithCount {
    #[serde(flatten)]
    pub category: Category,
    pub post_count: i64,
}

/// Input for creating or updating a category
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategoryInput {
    /// Derived from the display name when blank
    #[serde(default)]
    pub route_name: String,
    pub display_name: String,
    #[serde(default)]
    pub note: Option<String>,
}

impl CategoryInput {
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            ..Default::default()
        }
    }

    pub fn with_route_name(mut self, route_name: impl Into<String>) -> Self {
        self.route_name = route_name.into();
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

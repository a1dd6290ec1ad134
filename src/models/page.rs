//! Standalone page model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Custom page served at `/page/{slug}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub meta_description: String,
    pub html_content: String,
    pub css: Option<String>,
    pub hide_sidebar: bool,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Published page listing entry without the body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageSegment {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Page> for PageSegment {
    fn from(page: Page) -> Self {
        Self {
            id: page.id,
            title: page.title,
            slug: page.slug,
            is_published: page.is_published,
            created_at: page.created_at,
        }
    }
}

/// Input for creating or updating a page
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageInput {
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub meta_description: String,
    pub html_content: String,
    #[serde(default)]
    pub css: Option<String>,
    #[serde(default)]
    pub hide_sidebar: bool,
    #[serde(default)]
    pub is_published: bool,
}

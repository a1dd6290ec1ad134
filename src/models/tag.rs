//! Tag model

use serde::{Deserialize, Serialize};

/// Tag attached to posts.
///
/// `normalized_name` is the URL form used in routes and is unique; the
/// display name is what the author typed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Tag {
    pub id: i64,
    pub display_name: String,
    pub normalized_name: String,
}

impl Tag {
    /// Create a new Tag. The ID is assigned by the database.
    pub fn new(display_name: impl Into<String>, normalized_name: impl Into<String>) -> Self {
        Self {
            id: 0,
            display_name: display_name.into(),
            normalized_name: normalized_name.into(),
        }
    }
}

/// Tag with the number of published posts using it, for the tag cloud
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagWithCount {
    #[serde(flatten)]
    pub tag: Tag,
    pub post_count: i64,
}

impl TagWithCount {
    pub fn new(tag: Tag, post_count: i64) -> Self {
        Self { tag, post_count }
    }
}

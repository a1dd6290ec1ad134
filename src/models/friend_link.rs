//! Friend link model

use serde::{Deserialize, Serialize};

/// Link to another site shown in the sidebar
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FriendLink {
    pub id: i64,
    pub title: String,
    pub link_url: String,
    pub rank: i64,
}

/// Input for creating or updating a friend link
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FriendLinkInput {
    pub title: String,
    pub link_url: String,
    #[serde(default)]
    pub rank: i64,
}

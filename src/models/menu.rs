//! Navigation menu model

use serde::{Deserialize, Serialize};

/// Top-level menu entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Menu {
    pub id: i64,
    pub title: String,
    pub url: String,
    pub icon: Option<String>,
    pub display_order: i64,
    pub is_open_in_new_tab: bool,
    #[serde(default)]
    pub sub_menus: Vec<SubMenu>,
}

/// Entry nested under a menu
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubMenu {
    #[serde(default)]
    pub id: i64,
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub is_open_in_new_tab: bool,
}

impl SubMenu {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: 0,
            title: title.into(),
            url: url.into(),
            is_open_in_new_tab: false,
        }
    }
}

/// Input for creating or updating a menu together with its sub menus
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MenuInput {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub display_order: i64,
    #[serde(default)]
    pub is_open_in_new_tab: bool,
    #[serde(default)]
    pub sub_menus: Vec<SubMenu>,
}

//! Navigation menu service
//!
//! Menus and their sub menus. Every URL is sterilized before it is stored;
//! relative paths are allowed.

use crate::cache::{Cache, CachePartition};
use crate::db::repositories::MenuRepository;
use crate::models::{EventType, Menu, MenuInput, NewActivity, SubMenu};
use crate::services::ActivityLogService;
use crate::utils::sterilize_link;
use anyhow::Context;
use std::sync::Arc;

const MAX_TITLE_LENGTH: usize = 64;

#[derive(Debug, thiserror::Error)]
pub enum MenuServiceError {
    #[error("Menu not found: {0}")]
    NotFound(i64),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct MenuService {
    repo: Arc<dyn MenuRepository>,
    cache: Arc<Cache>,
    activity: Arc<ActivityLogService>,
}

impl MenuService {
    pub fn new(repo: Arc<dyn MenuRepository>, cache: Arc<Cache>, activity: Arc<ActivityLogService>) -> Self {
        Self { repo, cache, activity }
    }

    /// Menus in display order, with sub menus
    pub async fn list(&self) -> Result<Vec<Menu>, MenuServiceError> {
        self.cache
            .get_or_insert(&CachePartition::Menu.key("list"), || async {
                self.repo
                    .list()
                    .await
                    .context("Failed to list menus")
                    .map_err(MenuServiceError::from)
            })
            .await
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Menu, MenuServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get menu")?
            .ok_or(MenuServiceError::NotFound(id))
    }

    pub async fn create(&self, input: MenuInput) -> Result<Menu, MenuServiceError> {
        let menu = build_menu(0, input)?;
        let created = self.repo.create(&menu).await.context("Failed to create menu")?;
        self.after_write("Created menu", &created.title).await;
        Ok(created)
    }

    pub async fn update(&self, id: i64, input: MenuInput) -> Result<Menu, MenuServiceError> {
        self.get_by_id(id).await?;
        let menu = build_menu(id, input)?;
        self.repo.update(&menu).await.context("Failed to update menu")?;
        self.after_write("Updated menu", &menu.title).await;
        self.get_by_id(id).await
    }

    pub async fn delete(&self, id: i64) -> Result<(), MenuServiceError> {
        let menu = self.get_by_id(id).await?;
        self.repo.delete(id).await.context("Failed to delete menu")?;
        self.after_write("Deleted menu", &menu.title).await;
        Ok(())
    }

    async fn after_write(&self, operation: &str, title: &str) {
        self.cache.invalidate(&[CachePartition::Menu]).await;
        self.activity
            .record(NewActivity::new(EventType::Menu, operation).target(title))
            .await;
    }
}

fn build_menu(id: i64, input: MenuInput) -> Result<Menu, MenuServiceError> {
    let title = checked_title(&input.title)?;
    let sub_menus = input
        .sub_menus
        .into_iter()
        .map(|sub| {
            Ok(SubMenu {
                id: 0,
                title: checked_title(&sub.title)?,
                url: sterilize_link(&sub.url),
                is_open_in_new_tab: sub.is_open_in_new_tab,
            })
        })
        .collect::<Result<Vec<_>, MenuServiceError>>()?;

    Ok(Menu {
        id,
        title,
        url: sterilize_link(&input.url),
        icon: input.icon.map(|i| i.trim().to_string()).filter(|i| !i.is_empty()),
        display_order: input.display_order,
        is_open_in_new_tab: input.is_open_in_new_tab,
        sub_menus,
    })
}

fn checked_title(title: &str) -> Result<String, MenuServiceError> {
    let title = title.trim();
    if title.is_empty() || title.chars().count() > MAX_TITLE_LENGTH {
        return Err(MenuServiceError::ValidationError(format!(
            "Menu title must be 1-{} characters",
            MAX_TITLE_LENGTH
        )));
    }
    Ok(title.to_string())
}

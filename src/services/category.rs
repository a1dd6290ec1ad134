//! Category service
//!
//! Categories are addressed by a lowercase route name. Deleting a category
//! only removes its post associations; the posts themselves stay.

use crate::cache::{Cache, CachePartition};
use crate::db::repositories::CategoryRepository;
use crate::models::{Category, CategoryInput, CategoryWithCount, EventType, NewActivity};
use crate::services::ActivityLogService;
use crate::utils::{generate_slug, is_valid_route_name};
use anyhow::Context;
use std::sync::Arc;

/// Error types for category service operations
#[derive(Debug, thiserror::Error)]
pub enum CategoryServiceError {
    #[error("Category not found: {0}")]
    NotFound(String),

    #[error("Category route name already exists: {0}")]
    DuplicateRouteName(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct CategoryService {
    repo: Arc<dyn CategoryRepository>,
    cache: Arc<Cache>,
    activity: Arc<ActivityLogService>,
}

impl CategoryService {
    pub fn new(
        repo: Arc<dyn CategoryRepository>,
        cache: Arc<Cache>,
        activity: Arc<ActivityLogService>,
    ) -> Self {
        Self {
            repo,
            cache,
            activity,
        }
    }

    /// All categories ordered by display name
    pub async fn list(&self) -> Result<Vec<Category>, CategoryServiceError> {
        self.cache
            .get_or_insert(&CachePartition::Category.key("list"), || async {
                self.repo
                    .list()
                    .await
                    .context("Failed to list categories")
                    .map_err(CategoryServiceError::from)
            })
            .await
    }

    /// Categories with their visible post counts
    pub async fn list_with_counts(&self) -> Result<Vec<CategoryWithCount>, CategoryServiceError> {
        self.cache
            .get_or_insert(&CachePartition::Category.key("counts"), || async {
                self.repo
                    .list_with_counts()
                    .await
                    .context("Failed to list categories with counts")
                    .map_err(CategoryServiceError::from)
            })
            .await
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Category, CategoryServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get category")?
            .ok_or_else(|| CategoryServiceError::NotFound(format!("Category with ID {} not found", id)))
    }

    pub async fn get_by_route_name(&self, route_name: &str) -> Result<Category, CategoryServiceError> {
        let route_name = route_name.to_lowercase();
        self.repo
            .get_by_route_name(&route_name)
            .await
            .context("Failed to get category")?
            .ok_or_else(|| CategoryServiceError::NotFound(route_name))
    }

    pub async fn create(&self, input: CategoryInput) -> Result<Category, CategoryServiceError> {
        let (route_name, display_name, note) = validate_input(input)?;

        if self
            .repo
            .get_by_route_name(&route_name)
            .await
            .context("Failed to check route name uniqueness")?
            .is_some()
        {
            return Err(CategoryServiceError::DuplicateRouteName(route_name));
        }

        let created = self
            .repo
            .create(&Category::new(route_name, display_name, note))
            .await
            .context("Failed to create category")?;

        self.cache.invalidate(&[CachePartition::Category]).await;
        self.activity
            .record(NewActivity::new(EventType::Category, "Created category").target(&created.display_name))
            .await;
        tracing::info!("Created category {}", created.route_name);
        Ok(created)
    }

    pub async fn update(&self, id: i64, input: CategoryInput) -> Result<Category, CategoryServiceError> {
        let mut category = self.get_by_id(id).await?;
        let (route_name, display_name, note) = validate_input(input)?;

        if let Some(other) = self
            .repo
            .get_by_route_name(&route_name)
            .await
            .context("Failed to check route name uniqueness")?
        {
            if other.id != id {
                return Err(CategoryServiceError::DuplicateRouteName(route_name));
            }
        }

        category.route_name = route_name;
        category.display_name = display_name;
        category.note = note;
        self.repo
            .update(&category)
            .await
            .context("Failed to update category")?;

        self.cache
            .invalidate(&[CachePartition::Category, CachePartition::Post])
            .await;
        self.activity
            .record(NewActivity::new(EventType::Category, "Updated category").target(&category.display_name))
            .await;
        Ok(category)
    }

    pub async fn delete(&self, id: i64) -> Result<(), CategoryServiceError> {
        let category = self.get_by_id(id).await?;
        self.repo
            .delete(category.id)
            .await
            .context("Failed to delete category")?;

        self.cache
            .invalidate(&[CachePartition::Category, CachePartition::Post])
            .await;
        self.activity
            .record(NewActivity::new(EventType::Category, "Deleted category").target(&category.display_name))
            .await;
        tracing::info!("Deleted category {}", category.route_name);
        Ok(())
    }

    pub async fn count(&self) -> Result<i64, CategoryServiceError> {
        Ok(self.repo.count().await.context("Failed to count categories")?)
    }
}

/// Trim and check the input, deriving the route name when blank
fn validate_input(input: CategoryInput) -> Result<(String, String, Option<String>), CategoryServiceError> {
    let display_name = input.display_name.trim().to_string();
    if display_name.is_empty() {
        return Err(CategoryServiceError::ValidationError(
            "Display name cannot be empty".to_string(),
        ));
    }
    if display_name.chars().count() > 64 {
        return Err(CategoryServiceError::ValidationError(
            "Display name cannot exceed 64 characters".to_string(),
        ));
    }

    let route_name = match input.route_name.trim() {
        "" => generate_slug(&display_name),
        provided => provided.to_lowercase(),
    };
    if !is_valid_route_name(&route_name) || route_name.len() > 64 {
        return Err(CategoryServiceError::ValidationError(format!(
            "Invalid route name '{}': use lowercase letters, digits and hyphens",
            route_name
        )));
    }

    let note = input
        .note
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty());
    if note.as_ref().is_some_and(|n| n.chars().count() > 128) {
        return Err(CategoryServiceError::ValidationError(
            "Note cannot exceed 128 characters".to_string(),
        ));
    }

    Ok((route_name, display_name, note))
}

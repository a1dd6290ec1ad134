//! Page service
//!
//! Standalone HTML pages served at `/page/{slug}`.

use crate::cache::{Cache, CachePartition};
use crate::db::repositories::PageRepository;
use crate::models::{EventType, NewActivity, Page, PageInput, PageSegment};
use crate::services::ActivityLogService;
use crate::utils::is_valid_route_name;
use anyhow::Context;
use chrono::Utc;
use std::sync::Arc;

const MAX_TITLE_LENGTH: usize = 128;
const MAX_SLUG_LENGTH: usize = 128;
const MAX_META_DESCRIPTION_LENGTH: usize = 256;

/// Error types for page service operations
#[derive(Debug, thiserror::Error)]
pub enum PageServiceError {
    #[error("Page not found: {0}")]
    NotFound(String),

    #[error("Page slug already exists: {0}")]
    DuplicateSlug(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct PageService {
    repo: Arc<dyn PageRepository>,
    cache: Arc<Cache>,
    activity: Arc<ActivityLogService>,
}

impl PageService {
    pub fn new(repo: Arc<dyn PageRepository>, cache: Arc<Cache>, activity: Arc<ActivityLogService>) -> Self {
        Self { repo, cache, activity }
    }

    pub async fn create(&self, input: PageInput) -> Result<Page, PageServiceError> {
        let input = validate_input(input)?;
        self.ensure_slug_free(&input.slug, None).await?;

        let now = Utc::now();
        let page = Page {
            id: 0,
            title: input.title,
            slug: input.slug,
            meta_description: input.meta_description,
            html_content: input.html_content,
            css: input.css,
            hide_sidebar: input.hide_sidebar,
            is_published: input.is_published,
            created_at: now,
            updated_at: now,
        };

        let created = self.repo.create(&page).await.context("Failed to create page")?;
        self.after_write("Created page", &created.title).await;
        Ok(created)
    }

    pub async fn update(&self, id: i64, input: PageInput) -> Result<Page, PageServiceError> {
        let existing = self.get_by_id(id).await?;
        let input = validate_input(input)?;
        if input.slug != existing.slug {
            self.ensure_slug_free(&input.slug, Some(id)).await?;
        }

        let page = Page {
            title: input.title,
            slug: input.slug,
            meta_description: input.meta_description,
            html_content: input.html_content,
            css: input.css,
            hide_sidebar: input.hide_sidebar,
            is_published: input.is_published,
            updated_at: Utc::now(),
            ..existing
        };

        self.repo.update(&page).await.context("Failed to update page")?;
        self.after_write("Updated page", &page.title).await;
        Ok(page)
    }

    pub async fn delete(&self, id: i64) -> Result<(), PageServiceError> {
        let page = self.get_by_id(id).await?;
        self.repo.delete(id).await.context("Failed to delete page")?;
        self.after_write("Deleted page", &page.title).await;
        Ok(())
    }

    /// Any page by ID, published or not
    pub async fn get_by_id(&self, id: i64) -> Result<Page, PageServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get page")?
            .ok_or_else(|| PageServiceError::NotFound(format!("Page with ID {} not found", id)))
    }

    /// Published page by slug
    pub async fn get_published_by_slug(&self, slug: &str) -> Result<Page, PageServiceError> {
        let slug = slug.trim().to_lowercase();
        let key = CachePartition::Page.key(format!("slug:{}", slug));
        self.cache
            .get_or_insert(&key, || async {
                self.repo
                    .get_by_slug(&slug)
                    .await
                    .context("Failed to get page")?
                    .filter(|p| p.is_published)
                    .ok_or_else(|| PageServiceError::NotFound(slug.clone()))
            })
            .await
    }

    /// All pages for the admin list
    pub async fn list(&self) -> Result<Vec<PageSegment>, PageServiceError> {
        let pages = self.repo.list().await.context("Failed to list pages")?;
        Ok(pages.into_iter().map(PageSegment::from).collect())
    }

    /// Published pages without their bodies
    pub async fn list_segments(&self) -> Result<Vec<PageSegment>, PageServiceError> {
        self.cache
            .get_or_insert(&CachePartition::Page.key("segments"), || async {
                let pages = self
                    .repo
                    .list_published()
                    .await
                    .context("Failed to list published pages")?;
                Ok::<_, PageServiceError>(pages.into_iter().map(PageSegment::from).collect())
            })
            .await
    }

    pub async fn count(&self) -> Result<i64, PageServiceError> {
        Ok(self.repo.count().await.context("Failed to count pages")?)
    }

    async fn ensure_slug_free(&self, slug: &str, exclude_id: Option<i64>) -> Result<(), PageServiceError> {
        let existing = self
            .repo
            .get_by_slug(slug)
            .await
            .context("Failed to check page slug")?;
        match existing {
            Some(page) if Some(page.id) != exclude_id => Err(PageServiceError::DuplicateSlug(slug.to_string())),
            _ => Ok(()),
        }
    }

    async fn after_write(&self, operation: &str, title: &str) {
        self.cache
            .invalidate(&[CachePartition::Page, CachePartition::Sitemap])
            .await;
        self.activity
            .record(NewActivity::new(EventType::Page, operation).target(title))
            .await;
    }
}

fn validate_input(mut input: PageInput) -> Result<PageInput, PageServiceError> {
    input.title = input.title.trim().to_string();
    input.slug = input.slug.trim().to_lowercase();
    input.meta_description = input.meta_description.trim().to_string();
    input.css = input.css.filter(|css| !css.trim().is_empty());

    if input.title.is_empty() || input.title.chars().count() > MAX_TITLE_LENGTH {
        return Err(PageServiceError::ValidationError(format!(
            "Title must be 1-{} characters",
            MAX_TITLE_LENGTH
        )));
    }
    if input.slug.len() > MAX_SLUG_LENGTH || !is_valid_route_name(&input.slug) {
        return Err(PageServiceError::ValidationError(
            "Slug may only contain lowercase letters, digits and hyphens".to_string(),
        ));
    }
    if input.meta_description.chars().count() > MAX_META_DESCRIPTION_LENGTH {
        return Err(PageServiceError::ValidationError(format!(
            "Meta description cannot exceed {} characters",
            MAX_META_DESCRIPTION_LENGTH
        )));
    }
    if input.html_content.trim().is_empty() {
        return Err(PageServiceError::ValidationError("Content cannot be empty".to_string()));
    }
    Ok(input)
}

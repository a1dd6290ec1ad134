//! Tag service
//!
//! Tags are addressed by a normalized name derived from the display name
//! through the configurable replacement table, so "C#" and "c#" share the
//! tag `c-sharp`. Post saves create missing tags on demand.

use crate::cache::{Cache, CachePartition};
use crate::db::repositories::TagRepository;
use crate::models::{EventType, NewActivity, Tag, TagWithCount};
use crate::services::blog_config::TagNormalization;
use crate::services::{ActivityLogService, BlogConfigService};
use anyhow::Context;
use std::sync::Arc;

/// Maximum length of a tag display name, in characters
pub const MAX_TAG_NAME_LENGTH: usize = 32;

/// Error types for tag service operations
#[derive(Debug, thiserror::Error)]
pub enum TagServiceError {
    #[error("Tag not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct TagService {
    repo: Arc<dyn TagRepository>,
    cache: Arc<Cache>,
    config: Arc<BlogConfigService>,
    activity: Arc<ActivityLogService>,
}

impl TagService {
    pub fn new(
        repo: Arc<dyn TagRepository>,
        cache: Arc<Cache>,
        config: Arc<BlogConfigService>,
        activity: Arc<ActivityLogService>,
    ) -> Self {
        Self {
            repo,
            cache,
            config,
            activity,
        }
    }

    /// All tags ordered by display name
    pub async fn list(&self) -> Result<Vec<Tag>, TagServiceError> {
        self.cache
            .get_or_insert(&CachePartition::Tag.key("list"), || async {
                self.repo
                    .list()
                    .await
                    .context("Failed to list tags")
                    .map_err(TagServiceError::from)
            })
            .await
    }

    /// Tag cloud: tags with their visible post count, most used first
    pub async fn cloud(&self, limit: usize) -> Result<Vec<TagWithCount>, TagServiceError> {
        self.cache
            .get_or_insert(&CachePartition::Tag.key(format!("cloud:{}", limit)), || async {
                self.repo
                    .list_with_counts(limit)
                    .await
                    .context("Failed to get tag cloud")
                    .map_err(TagServiceError::from)
            })
            .await
    }

    /// Display names for editor autocomplete
    pub async fn names(&self) -> Result<Vec<String>, TagServiceError> {
        Ok(self.list().await?.into_iter().map(|t| t.display_name).collect())
    }

    /// Accepts both the stored (percent-encoded) form and a decoded non-Latin name
    pub async fn get_by_normalized_name(&self, normalized_name: &str) -> Result<Tag, TagServiceError> {
        let lookup = if normalized_name.is_ascii() {
            normalized_name.to_lowercase()
        } else {
            urlencoding::encode(&normalized_name.to_lowercase()).to_lowercase()
        };
        self.repo
            .get_by_normalized_name(&lookup)
            .await
            .context("Failed to get tag")?
            .ok_or_else(|| TagServiceError::NotFound(normalized_name.to_string()))
    }

    /// Return the tag whose normalized name matches `display_name`, creating it if needed
    pub async fn find_or_create(&self, display_name: &str) -> Result<Tag, TagServiceError> {
        let display_name = display_name.trim();
        if !validate_name(display_name) {
            return Err(TagServiceError::ValidationError(format!(
                "Invalid tag name: '{}'",
                display_name
            )));
        }

        let normalizations = self.config.advanced().await.tag_normalization;
        let normalized = normalize_name(display_name, &normalizations);

        if let Some(existing) = self
            .repo
            .get_by_normalized_name(&normalized)
            .await
            .context("Failed to check existing tag")?
        {
            return Ok(existing);
        }

        let created = self
            .repo
            .create(&Tag::new(display_name, normalized))
            .await
            .context("Failed to create tag")?;
        self.cache.invalidate(&[CachePartition::Tag]).await;
        tracing::debug!("Created tag {} ({})", created.display_name, created.normalized_name);
        Ok(created)
    }

    /// Explicit creation from the admin panel; reuses an existing tag
    pub async fn create(&self, display_name: &str) -> Result<Tag, TagServiceError> {
        let tag = self.find_or_create(display_name).await?;
        self.activity
            .record(NewActivity::new(EventType::Tag, "Created tag").target(&tag.display_name))
            .await;
        Ok(tag)
    }

    /// Tag IDs for a list of display names, creating missing tags
    pub async fn resolve_ids(&self, display_names: &[String]) -> Result<Vec<i64>, TagServiceError> {
        let mut ids = Vec::with_capacity(display_names.len());
        for name in display_names {
            if name.trim().is_empty() {
                continue;
            }
            let tag = self.find_or_create(name).await?;
            if !ids.contains(&tag.id) {
                ids.push(tag.id);
            }
        }
        Ok(ids)
    }

    /// Replace the tag set of a post
    pub async fn assign(&self, post_id: i64, tag_ids: &[i64]) -> Result<(), TagServiceError> {
        self.repo
            .set_post_tags(post_id, tag_ids)
            .await
            .context("Failed to save post tags")?;
        Ok(())
    }

    /// Rename a tag; the normalized name follows the display name
    pub async fn update(&self, id: i64, display_name: &str) -> Result<Tag, TagServiceError> {
        let display_name = display_name.trim();
        if !validate_name(display_name) {
            return Err(TagServiceError::ValidationError(format!(
                "Invalid tag name: '{}'",
                display_name
            )));
        }

        let mut tag = self
            .repo
            .get_by_id(id)
            .await
            .context("Failed to get tag")?
            .ok_or_else(|| TagServiceError::NotFound(format!("Tag with ID {} not found", id)))?;

        let normalizations = self.config.advanced().await.tag_normalization;
        let normalized = normalize_name(display_name, &normalizations);
        if let Some(other) = self
            .repo
            .get_by_normalized_name(&normalized)
            .await
            .context("Failed to check existing tag")?
        {
            if other.id != id {
                return Err(TagServiceError::Conflict(format!(
                    "Tag '{}' already exists",
                    other.display_name
                )));
            }
        }

        tag.display_name = display_name.to_string();
        tag.normalized_name = normalized;
        self.repo.update(&tag).await.context("Failed to update tag")?;

        self.cache
            .invalidate(&[CachePartition::Tag, CachePartition::Post])
            .await;
        self.activity
            .record(NewActivity::new(EventType::Tag, "Updated tag").target(&tag.display_name))
            .await;
        Ok(tag)
    }

    /// Delete a tag; its post associations cascade
    pub async fn delete(&self, id: i64) -> Result<(), TagServiceError> {
        let tag = self
            .repo
            .get_by_id(id)
            .await
            .context("Failed to get tag")?
            .ok_or_else(|| TagServiceError::NotFound(format!("Tag with ID {} not found", id)))?;

        self.repo.delete(tag.id).await.context("Failed to delete tag")?;

        self.cache
            .invalidate(&[CachePartition::Tag, CachePartition::Post])
            .await;
        self.activity
            .record(NewActivity::new(EventType::Tag, "Deleted tag").target(&tag.display_name))
            .await;
        Ok(())
    }

    pub async fn count(&self) -> Result<i64, TagServiceError> {
        Ok(self.repo.count().await.context("Failed to count tags")?)
    }
}

/// Derive the normalized (URL) name of a tag.
///
/// The replacement table is applied first and the result lowercased. Names
/// with characters outside the Latin tag alphabet are percent-encoded.
pub fn normalize_name(display_name: &str, normalizations: &[TagNormalization]) -> String {
    let mut name = display_name.trim().to_string();
    for rule in normalizations.iter().filter(|r| !r.source.is_empty()) {
        name = name.replace(&rule.source, &rule.target);
    }
    let name = name.to_lowercase();

    let is_latin = name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '+' | '#' | ' '));
    let name = if is_latin {
        name
    } else {
        urlencoding::encode(&name).to_lowercase()
    };

    name.trim_matches('-').to_string()
}

/// Whether `name` is an acceptable tag display name
pub fn validate_name(name: &str) -> bool {
    let length = name.chars().count();
    (1..=MAX_TAG_NAME_LENGTH).contains(&length)
        && !name.trim().is_empty()
        && name
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '.' | '+' | '#'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::TestContext;
    use proptest::prelude::*;

    async fn setup_test_service() -> (TestContext, TagService) {
        let ctx = TestContext::new().await;
        let service = ctx.tag_service();
        (ctx, service)
    }

    #[test]
    fn test_normalize_name_with_default_table() {
        let rules = TagNormalization::defaults();
        assert_eq!(normalize_name("C#", &rules), "c-sharp");
        assert_eq!(normalize_name(".NET Core", &rules), "dotnet-core");
        assert_eq!(normalize_name("C++", &rules), "c-plus-plus");
        assert_eq!(normalize_name("  Azure  ", &rules), "azure");
    }

    #[test]
    fn test_normalize_non_latin_name_is_url_encoded() {
        let rules = TagNormalization::defaults();
        assert_eq!(normalize_name("中文", &rules), "%e4%b8%ad%e6%96%87");
        assert_eq!(normalize_name("Rust 中文", &rules), "rust-%e4%b8%ad%e6%96%87");
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("C#"));
        assert!(validate_name(".NET Core"));
        assert!(validate_name("中文"));
        assert!(!validate_name(""));
        assert!(!validate_name("   "));
        assert!(!validate_name("a/b"));
        assert!(!validate_name("<script>"));
        assert!(!validate_name(&"a".repeat(33)));
    }

    #[tokio::test]
    async fn test_find_or_create_reuses_by_normalized_name() {
        let (_ctx, service) = setup_test_service().await;

        let first = service.find_or_create("ASP.NET").await.unwrap();
        let second = service.find_or_create("asp.net").await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first.normalized_name, "asp-dotnet");
        assert_eq!(first.display_name, "ASP.NET");
    }

    #[tokio::test]
    async fn test_get_by_normalized_name_accepts_decoded_form() {
        let (_ctx, service) = setup_test_service().await;
        let tag = service.find_or_create("Rust 中文").await.unwrap();

        let by_stored = service.get_by_normalized_name("rust-%E4%B8%AD%E6%96%87").await.unwrap();
        let by_decoded = service.get_by_normalized_name("rust-中文").await.unwrap();
        assert_eq!(by_stored.id, tag.id);
        assert_eq!(by_decoded.id, tag.id);
    }

    #[tokio::test]
    async fn test_find_or_create_rejects_invalid_name() {
        let (_ctx, service) = setup_test_service().await;
        assert!(matches!(
            service.find_or_create("bad/name").await,
            Err(TagServiceError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_update_conflict_and_rename() {
        let (_ctx, service) = setup_test_service().await;
        let rust = service.create("Rust").await.unwrap();
        service.create("Go").await.unwrap();

        assert!(matches!(
            service.update(rust.id, "go").await,
            Err(TagServiceError::Conflict(_))
        ));

        let renamed = service.update(rust.id, "Rust Lang").await.unwrap();
        assert_eq!(renamed.normalized_name, "rust-lang");
        assert!(service.get_by_normalized_name("rust").await.is_err());
        assert_eq!(service.get_by_normalized_name("rust-lang").await.unwrap().id, rust.id);
    }

    #[tokio::test]
    async fn test_list_cache_is_invalidated_on_create() {
        let (_ctx, service) = setup_test_service().await;
        assert!(service.list().await.unwrap().is_empty());

        service.create("Rust").await.unwrap();
        assert_eq!(service.names().await.unwrap(), vec!["Rust".to_string()]);
    }

    #[tokio::test]
    async fn test_delete_and_resolve_ids() {
        let (_ctx, service) = setup_test_service().await;
        let ids = service
            .resolve_ids(&["Rust".to_string(), "rust".to_string(), "".to_string(), "Web".to_string()])
            .await
            .unwrap();
        assert_eq!(ids.len(), 2);

        service.delete(ids[0]).await.unwrap();
        assert!(matches!(service.delete(ids[0]).await, Err(TagServiceError::NotFound(_))));
        assert_eq!(service.count().await.unwrap(), 1);
    }

    proptest! {
        #[test]
        fn normalized_names_are_trimmed_and_lowercase(name in "[A-Za-z0-9 .+#-]{1,32}") {
            let normalized = normalize_name(&name, &TagNormalization::defaults());
            prop_assert!(!normalized.starts_with('-'));
            prop_assert!(!normalized.ends_with('-'));
            prop_assert!(!normalized.contains(' '));
            prop_assert_eq!(normalized.to_lowercase(), normalized.clone());
        }
    }
}

//! Friend link service

use crate::cache::{Cache, CachePartition};
use crate::db::repositories::FriendLinkRepository;
use crate::models::{EventType, FriendLink, FriendLinkInput, NewActivity};
use crate::services::ActivityLogService;
use crate::utils::sterilize_link;
use anyhow::Context;
use std::sync::Arc;

const MAX_TITLE_LENGTH: usize = 64;

#[derive(Debug, thiserror::Error)]
pub enum FriendLinkServiceError {
    #[error("Friend link not found: {0}")]
    NotFound(i64),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct FriendLinkService {
    repo: Arc<dyn FriendLinkRepository>,
    cache: Arc<Cache>,
    activity: Arc<ActivityLogService>,
}

impl FriendLinkService {
    pub fn new(repo: Arc<dyn FriendLinkRepository>, cache: Arc<Cache>, activity: Arc<ActivityLogService>) -> Self {
        Self { repo, cache, activity }
    }

    /// Links ordered by rank, then title
    pub async fn list(&self) -> Result<Vec<FriendLink>, FriendLinkServiceError> {
        self.cache
            .get_or_insert(&CachePartition::FriendLink.key("list"), || async {
                self.repo
                    .list()
                    .await
                    .context("Failed to list friend links")
                    .map_err(FriendLinkServiceError::from)
            })
            .await
    }

    pub async fn get_by_id(&self, id: i64) -> Result<FriendLink, FriendLinkServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get friend link")?
            .ok_or(FriendLinkServiceError::NotFound(id))
    }

    pub async fn create(&self, input: FriendLinkInput) -> Result<FriendLink, FriendLinkServiceError> {
        let input = validate_input(input)?;
        let link = FriendLink {
            id: 0,
            title: input.title,
            link_url: input.link_url,
            rank: input.rank,
        };
        let created = self.repo.create(&link).await.context("Failed to create friend link")?;
        self.after_write("Created friend link", &created.title).await;
        Ok(created)
    }

    pub async fn update(&self, id: i64, input: FriendLinkInput) -> Result<FriendLink, FriendLinkServiceError> {
        let existing = self.get_by_id(id).await?;
        let input = validate_input(input)?;
        let link = FriendLink {
            title: input.title,
            link_url: input.link_url,
            rank: input.rank,
            ..existing
        };
        self.repo.update(&link).await.context("Failed to update friend link")?;
        self.after_write("Updated friend link", &link.title).await;
        Ok(link)
    }

    pub async fn delete(&self, id: i64) -> Result<(), FriendLinkServiceError> {
        let link = self.get_by_id(id).await?;
        self.repo.delete(id).await.context("Failed to delete friend link")?;
        self.after_write("Deleted friend link", &link.title).await;
        Ok(())
    }

    async fn after_write(&self, operation: &str, title: &str) {
        self.cache.invalidate(&[CachePartition::FriendLink]).await;
        self.activity
            .record(NewActivity::new(EventType::FriendLink, operation).target(title))
            .await;
    }
}

fn validate_input(mut input: FriendLinkInput) -> Result<FriendLinkInput, FriendLinkServiceError> {
    input.title = input.title.trim().to_string();
    if input.title.is_empty() || input.title.chars().count() > MAX_TITLE_LENGTH {
        return Err(FriendLinkServiceError::ValidationError(format!(
            "Title must be 1-{} characters",
            MAX_TITLE_LENGTH
        )));
    }

    input.link_url = sterilize_link(&input.link_url);
    if input.link_url == "#" || input.link_url.starts_with('/') {
        return Err(FriendLinkServiceError::ValidationError(
            "Link must be an absolute http(s) URL".to_string(),
        ));
    }
    Ok(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::TestContext;

    fn input(title: &str, url: &str, rank: i64) -> FriendLinkInput {
        FriendLinkInput {
            title: title.to_string(),
            link_url: url.to_string(),
            rank,
        }
    }

    #[tokio::test]
    async fn test_crud() {
        let ctx = TestContext::new().await;
        let service = ctx.friend_link_service();

        let b = service.create(input("B", "https://b.example.com", 2)).await.unwrap();
        service.create(input("A", "https://a.example.com", 1)).await.unwrap();

        let titles: Vec<_> = service.list().await.unwrap().into_iter().map(|l| l.title).collect();
        assert_eq!(titles, vec!["A", "B"]);

        service.update(b.id, input("B", "https://b.example.com", 0)).await.unwrap();
        let titles: Vec<_> = service.list().await.unwrap().into_iter().map(|l| l.title).collect();
        assert_eq!(titles, vec!["B", "A"]);

        service.delete(b.id).await.unwrap();
        assert_eq!(service.list().await.unwrap().len(), 1);
        assert!(matches!(
            service.delete(b.id).await,
            Err(FriendLinkServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_rejects_unsafe_links() {
        let ctx = TestContext::new().await;
        let service = ctx.friend_link_service();

        for url in ["javascript:alert(1)", "http://127.0.0.1/", "/local"] {
            assert!(matches!(
                service.create(input("Bad", url, 0)).await,
                Err(FriendLinkServiceError::ValidationError(_))
            ));
        }
        assert!(matches!(
            service.create(input(" ", "https://ok.example.com", 0)).await,
            Err(FriendLinkServiceError::ValidationError(_))
        ));
    }
}

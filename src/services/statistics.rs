//! Post statistics
//!
//! Hit and like counters live on the post row. Repeat hits and likes from the
//! same client are filtered through short-lived cache markers.

use crate::cache::{Cache, CacheLayer, CachePartition};
use crate::db::repositories::PostRepository;
use crate::models::PostStats;
use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;

/// Window in which repeat hits from one client are ignored
const HIT_WINDOW: Duration = Duration::from_secs(60 * 60);

/// Window in which a client may like a post once
const LIKE_WINDOW: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, thiserror::Error)]
pub enum StatisticsServiceError {
    #[error("Post not found: {0}")]
    NotFound(i64),

    #[error("Too many requests: {0}")]
    TooManyRequests(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct StatisticsService {
    repo: Arc<dyn PostRepository>,
    cache: Arc<Cache>,
}

impl StatisticsService {
    pub fn new(repo: Arc<dyn PostRepository>, cache: Arc<Cache>) -> Self {
        Self { repo, cache }
    }

    /// Count a view. Returns whether the counter moved.
    pub async fn hit(&self, post_id: i64, client_key: &str) -> Result<bool, StatisticsServiceError> {
        let marker = CachePartition::Stats.key(format!("hit:{}:{}", post_id, client_key));
        if self.has_marker(&marker).await {
            return Ok(false);
        }

        let counted = self
            .repo
            .increment_hits(post_id)
            .await
            .context("Failed to increment hits")?;
        if !counted {
            return Err(StatisticsServiceError::NotFound(post_id));
        }

        self.set_marker(&marker, HIT_WINDOW).await;
        Ok(true)
    }

    /// Like a post once per client per day
    pub async fn like(&self, post_id: i64, client_key: &str) -> Result<PostStats, StatisticsServiceError> {
        let marker = CachePartition::Stats.key(format!("like:{}:{}", post_id, client_key));
        if self.has_marker(&marker).await {
            return Err(StatisticsServiceError::TooManyRequests(
                "You already liked this post".to_string(),
            ));
        }

        let counted = self
            .repo
            .increment_likes(post_id)
            .await
            .context("Failed to increment likes")?;
        if !counted {
            return Err(StatisticsServiceError::NotFound(post_id));
        }

        self.set_marker(&marker, LIKE_WINDOW).await;
        self.get(post_id).await
    }

    pub async fn get(&self, post_id: i64) -> Result<PostStats, StatisticsServiceError> {
        self.repo
            .get_stats(post_id)
            .await
            .context("Failed to get post statistics")?
            .ok_or(StatisticsServiceError::NotFound(post_id))
    }

    async fn has_marker(&self, key: &str) -> bool {
        matches!(self.cache.get::<bool>(key).await, Ok(Some(true)))
    }

    async fn set_marker(&self, key: &str, ttl: Duration) {
        if let Err(e) = self.cache.set(key, &true, ttl).await {
            tracing::warn!("Failed to store statistics marker {}: {}", key, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PostEditInput;
    use crate::services::test_support::TestContext;

    async fn setup() -> (TestContext, StatisticsService, i64) {
        let ctx = TestContext::new().await;
        let post = ctx
            .post_service()
            .create(PostEditInput::new("Counted", "body").published())
            .await
            .unwrap();
        let service = ctx.statistics_service();
        (ctx, service, post.id)
    }

    #[tokio::test]
    async fn test_hit_is_deduplicated_per_client() {
        let (_ctx, service, post_id) = setup().await;

        assert!(service.hit(post_id, "1.2.3.4").await.unwrap());
        assert!(!service.hit(post_id, "1.2.3.4").await.unwrap());
        assert!(service.hit(post_id, "5.6.7.8").await.unwrap());

        assert_eq!(service.get(post_id).await.unwrap().hits, 2);
    }

    #[tokio::test]
    async fn test_second_like_is_rejected() {
        let (_ctx, service, post_id) = setup().await;

        let stats = service.like(post_id, "1.2.3.4").await.unwrap();
        assert_eq!(stats.likes, 1);
        assert!(matches!(
            service.like(post_id, "1.2.3.4").await,
            Err(StatisticsServiceError::TooManyRequests(_))
        ));
        assert_eq!(service.get(post_id).await.unwrap().likes, 1);
    }

    #[tokio::test]
    async fn test_unknown_post() {
        let (_ctx, service, _) = setup().await;
        assert!(matches!(
            service.hit(999, "x").await,
            Err(StatisticsServiceError::NotFound(999))
        ));
        assert!(matches!(
            service.get(999).await,
            Err(StatisticsServiceError::NotFound(999))
        ));
    }

    #[tokio::test]
    async fn test_drafts_and_deleted_posts_are_not_counted() {
        let (ctx, service, published_id) = setup().await;
        let draft = ctx
            .post_service()
            .create(PostEditInput::new("Draft", "body"))
            .await
            .unwrap();

        assert!(matches!(
            service.hit(draft.id, "1.2.3.4").await,
            Err(StatisticsServiceError::NotFound(_))
        ));
        assert!(matches!(
            service.like(draft.id, "1.2.3.4").await,
            Err(StatisticsServiceError::NotFound(_))
        ));
        assert!(matches!(
            service.get(draft.id).await,
            Err(StatisticsServiceError::NotFound(_))
        ));

        ctx.post_service().delete(published_id).await.unwrap();
        assert!(matches!(
            service.like(published_id, "1.2.3.4").await,
            Err(StatisticsServiceError::NotFound(_))
        ));
    }
}

//! Cache layer
//!
//! A process-local moka cache in front of the read-heavy queries. Keys are
//! grouped into partitions (`post:*`, `page:*`, ...) so a write can drop every
//! entry it may have made stale.
//!
//! ```rust,ignore
//! use moonglade::cache::{create_cache, CacheLayer};
//!
//! let cache = create_cache(&config.cache);
//! cache.set("key", &"value", Duration::from_secs(60)).await?;
//! ```

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::config::CacheConfig;

pub use memory::MemoryCache;

/// Cache layer trait
///
/// The methods are generic, so the trait is not object safe; services hold the
/// concrete [`Cache`] type.
#[async_trait]
pub trait CacheLayer: Send + Sync {
    async fn get<T: DeserializeOwned + Send>(&self, key: &str) -> Result<Option<T>>;

    async fn set<T: Serialize + Send + Sync>(&self, key: &str, value: &T, ttl: Duration) -> Result<()>;

    async fn delete(&self, key: &str) -> Result<()>;

    /// Delete all values matching a glob pattern (`*`, `?`)
    async fn delete_pattern(&self, pattern: &str) -> Result<()>;

    async fn clear(&self) -> Result<()>;
}

/// Cache shared by all services
pub type Cache = MemoryCache;

/// Key groups that are invalidated together
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CachePartition {
    Post,
    Page,
    Category,
    Tag,
    Menu,
    FriendLink,
    Widget,
    Sitemap,
    Theme,
    Stats,
}

impl CachePartition {
    pub const ALL: [CachePartition; 10] = [
        Self::Post,
        Self::Page,
        Self::Category,
        Self::Tag,
        Self::Menu,
        Self::FriendLink,
        Self::Widget,
        Self::Sitemap,
        Self::Theme,
        Self::Stats,
    ];

    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Post => "post",
            Self::Page => "page",
            Self::Category => "category",
            Self::Tag => "tag",
            Self::Menu => "menu",
            Self::FriendLink => "friendlink",
            Self::Widget => "widget",
            Self::Sitemap => "sitemap",
            Self::Theme => "theme",
            Self::Stats => "stats",
        }
    }

    /// Build a key inside this partition
    pub fn key(&self, suffix: impl std::fmt::Display) -> String {
        format!("{}:{}", self.prefix(), suffix)
    }

    /// Glob matching every key of the partition
    pub fn pattern(&self) -> String {
        format!("{}*", self.prefix())
    }
}

impl std::str::FromStr for CachePartition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.prefix() == s)
            .ok_or_else(|| format!("Unknown cache partition: {}", s))
    }
}

impl MemoryCache {
    /// Drop every entry of the given partitions, logging (not failing) on error
    pub async fn invalidate(&self, partitions: &[CachePartition]) {
        for partition in partitions {
            if let Err(e) = self.delete_pattern(&partition.pattern()).await {
                tracing::warn!("Failed to invalidate cache partition {:?}: {}", partition, e);
            }
        }
    }
}

/// Create the shared cache from configuration
pub fn create_cache(config: &CacheConfig) -> Arc<Cache> {
    let ttl = Duration::from_secs(config.ttl_seconds);
    Arc::new(MemoryCache::with_capacity_and_ttl(config.max_capacity, ttl))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_cache_uses_config_ttl() {
        let config = CacheConfig {
            ttl_seconds: 120,
            max_capacity: 100,
        };
        let cache = create_cache(&config);
        assert_eq!(cache.default_ttl(), Duration::from_secs(120));
    }

    #[test]
    fn test_partition_keys() {
        assert_eq!(CachePartition::Post.key("id:5"), "post:id:5");
        assert_eq!(CachePartition::FriendLink.pattern(), "friendlink*");
        assert_eq!("theme".parse::<CachePartition>().unwrap(), CachePartition::Theme);
        assert!("bogus".parse::<CachePartition>().is_err());
    }

    #[tokio::test]
    async fn test_invalidate_partitions() {
        let cache = MemoryCache::new();
        cache.set_default("post:list:1", &1).await.unwrap();
        cache.set_default("sitemap", &"xml").await.unwrap();
        cache.set_default("tag:cloud", &2).await.unwrap();

        cache
            .invalidate(&[CachePartition::Post, CachePartition::Sitemap])
            .await;

        assert_eq!(cache.get::<i32>("post:list:1").await.unwrap(), None);
        assert_eq!(cache.get::<String>("sitemap").await.unwrap(), None);
        assert_eq!(cache.get::<i32>("tag:cloud").await.unwrap(), Some(2));
    }
}

//! Blog configuration service
//!
//! Runtime settings edited from the admin panel. Each section is stored as a
//! JSON document in `blog_configurations` under its own key, loaded once at
//! startup and served from memory afterwards.

use crate::cache::{Cache, CachePartition};
use crate::db::repositories::SettingsRepository;
use crate::models::{CommentOrder, EventType, NewActivity};
use anyhow::Context;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Error types for blog configuration operations
#[derive(Debug, thiserror::Error)]
pub enum BlogConfigError {
    #[error("Unknown settings section: {0}")]
    UnknownSection(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SidebarPosition {
    #[default]
    Right,
    Left,
    Disabled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    pub site_title: String,
    pub owner_name: String,
    pub owner_email: String,
    pub description: String,
    pub short_description: String,
    pub copyright: String,
    pub canonical_prefix: String,
    /// `[-]HH:MM` offset used when displaying dates
    pub time_zone_utc_offset: String,
    pub sidebar_position: SidebarPosition,
    pub footer_custom_html: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            site_title: "Moonglade".to_string(),
            owner_name: "Admin".to_string(),
            owner_email: "admin@example.com".to_string(),
            description: "Moonglade Admin".to_string(),
            short_description: "Moonglade Admin".to_string(),
            copyright: "[c] 2024".to_string(),
            canonical_prefix: String::new(),
            time_zone_utc_offset: "00:00".to_string(),
            sidebar_position: SidebarPosition::default(),
            footer_custom_html: String::new(),
        }
    }
}

/// What happens to a comment containing a blocked word
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum WordFilterMode {
    #[default]
    Mask,
    Block,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentSettings {
    pub post_abstract_words: usize,
    pub posts_per_page: u32,
    pub show_calloutsection: bool,
    pub calloutsection_html: String,
    pub enable_word_filter: bool,
    pub word_filter_mode: WordFilterMode,
    pub blocked_words: Vec<String>,
}

impl Default for ContentSettings {
    fn default() -> Self {
        Self {
            post_abstract_words: 400,
            posts_per_page: 10,
            show_calloutsection: false,
            calloutsection_html: String::new(),
            enable_word_filter: false,
            word_filter_mode: WordFilterMode::default(),
            blocked_words: vec!["fuck".to_string(), "shit".to_string()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CommentSettings {
    pub enable_comments: bool,
    pub require_comment_review: bool,
    pub enable_gravatar: bool,
    pub comment_order: CommentOrder,
    /// 0 keeps comments open forever
    pub close_comments_after_days: u32,
}

impl Default for CommentSettings {
    fn default() -> Self {
        Self {
            enable_comments: true,
            require_comment_review: true,
            enable_gravatar: true,
            comment_order: CommentOrder::default(),
            close_comments_after_days: 0,
        }
    }
}

/// One entry of the tag name replacement table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagNormalization {
    pub source: String,
    pub target: String,
}

impl TagNormalization {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }

    pub fn defaults() -> Vec<Self> {
        vec![
            Self::new(" ", "-"),
            Self::new("#", "-sharp"),
            Self::new(".", "-dot"),
            Self::new("+", "-plus"),
        ]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvancedSettings {
    pub enable_pingback: bool,
    pub enable_webmention: bool,
    pub enable_sitemap: bool,
    pub robots_txt: String,
    pub tag_normalization: Vec<TagNormalization>,
}

impl Default for AdvancedSettings {
    fn default() -> Self {
        Self {
            enable_pingback: true,
            enable_webmention: true,
            enable_sitemap: true,
            robots_txt: "User-agent: *\nAllow: /\nSitemap: /sitemap.xml\n".to_string(),
            tag_normalization: TagNormalization::defaults(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppearanceSettings {
    pub theme_id: i64,
    pub use_custom_css: bool,
    pub custom_css: String,
}

impl Default for AppearanceSettings {
    fn default() -> Self {
        Self {
            theme_id: 1,
            use_custom_css: false,
            custom_css: String::new(),
        }
    }
}

/// Every settings section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BlogSettings {
    pub general: GeneralSettings,
    pub content: ContentSettings,
    pub comment: CommentSettings,
    pub advanced: AdvancedSettings,
    pub appearance: AppearanceSettings,
}

/// A section stored under its own configuration key
pub trait SettingsSection: Serialize + DeserializeOwned + Default + Clone + Send + Sync + 'static {
    const KEY: &'static str;

    /// Cache partitions whose contents depend on this section
    const AFFECTS: &'static [CachePartition] = &[];

    fn validate(&self) -> Result<(), String> {
        Ok(())
    }

    fn read(settings: &BlogSettings) -> &Self;

    fn write(self, settings: &mut BlogSettings);
}

impl SettingsSection for GeneralSettings {
    const KEY: &'static str = "GeneralSettings";

    fn validate(&self) -> Result<(), String> {
        if self.site_title.trim().is_empty() {
            return Err("Site title cannot be empty".to_string());
        }
        if self.site_title.chars().count() > 64 {
            return Err("Site title cannot exceed 64 characters".to_string());
        }
        if !is_valid_utc_offset(&self.time_zone_utc_offset) {
            return Err(format!("Invalid UTC offset: {}", self.time_zone_utc_offset));
        }
        Ok(())
    }

    fn read(settings: &BlogSettings) -> &Self {
        &settings.general
    }

    fn write(self, settings: &mut BlogSettings) {
        settings.general = self;
    }
}

impl SettingsSection for ContentSettings {
    const KEY: &'static str = "ContentSettings";
    const AFFECTS: &'static [CachePartition] = &[CachePartition::Post];

    fn validate(&self) -> Result<(), String> {
        if !(1..=1024).contains(&self.post_abstract_words) {
            return Err("Abstract word count must be between 1 and 1024".to_string());
        }
        if !(1..=100).contains(&self.posts_per_page) {
            return Err("Posts per page must be between 1 and 100".to_string());
        }
        Ok(())
    }

    fn read(settings: &BlogSettings) -> &Self {
        &settings.content
    }

    fn write(self, settings: &mut BlogSettings) {
        settings.content = self;
    }
}

impl SettingsSection for CommentSettings {
    const KEY: &'static str = "CommentSettings";

    fn read(settings: &BlogSettings) -> &Self {
        &settings.comment
    }

    fn write(self, settings: &mut BlogSettings) {
        settings.comment = self;
    }
}

impl SettingsSection for AdvancedSettings {
    const KEY: &'static str = "AdvancedSettings";
    const AFFECTS: &'static [CachePartition] = &[CachePartition::Sitemap];

    fn validate(&self) -> Result<(), String> {
        if self.tag_normalization.iter().any(|n| n.source.is_empty()) {
            return Err("Tag normalization source cannot be empty".to_string());
        }
        Ok(())
    }

    fn read(settings: &BlogSettings) -> &Self {
        &settings.advanced
    }

    fn write(self, settings: &mut BlogSettings) {
        settings.advanced = self;
    }
}

impl SettingsSection for AppearanceSettings {
    const KEY: &'static str = "AppearanceSettings";
    const AFFECTS: &'static [CachePartition] = &[CachePartition::Theme];

    fn validate(&self) -> Result<(), String> {
        if self.custom_css.len() > 10240 {
            return Err("Custom CSS cannot exceed 10240 characters".to_string());
        }
        Ok(())
    }

    fn read(settings: &BlogSettings) -> &Self {
        &settings.appearance
    }

    fn write(self, settings: &mut BlogSettings) {
        settings.appearance = self;
    }
}

fn is_valid_utc_offset(offset: &str) -> bool {
    let unsigned = offset.strip_prefix(['-', '+']).unwrap_or(offset);
    let mut parts = unsigned.split(':');
    let (Some(hours), Some(minutes), None) = (parts.next(), parts.next(), parts.next()) else {
        return false;
    };
    matches!(
        (hours.parse::<u32>(), minutes.parse::<u32>()),
        (Ok(h), Ok(m)) if h <= 14 && m < 60 && hours.len() == 2 && minutes.len() == 2
    )
}

pub struct BlogConfigService {
    repo: Arc<dyn SettingsRepository>,
    cache: Arc<Cache>,
    activity: Arc<crate::services::ActivityLogService>,
    settings: RwLock<BlogSettings>,
}

impl BlogConfigService {
    /// Load every section, inserting defaults for the ones not stored yet
    pub async fn load(
        repo: Arc<dyn SettingsRepository>,
        cache: Arc<Cache>,
        activity: Arc<crate::services::ActivityLogService>,
    ) -> Result<Self, BlogConfigError> {
        let mut settings = BlogSettings::default();
        load_section::<GeneralSettings>(repo.as_ref(), &mut settings).await?;
        load_section::<ContentSettings>(repo.as_ref(), &mut settings).await?;
        load_section::<CommentSettings>(repo.as_ref(), &mut settings).await?;
        load_section::<AdvancedSettings>(repo.as_ref(), &mut settings).await?;
        load_section::<AppearanceSettings>(repo.as_ref(), &mut settings).await?;

        tracing::info!("Blog configuration loaded");
        Ok(Self {
            repo,
            cache,
            activity,
            settings: RwLock::new(settings),
        })
    }

    /// Snapshot of all sections
    pub async fn all(&self) -> BlogSettings {
        self.settings.read().await.clone()
    }

    pub async fn section<S: SettingsSection>(&self) -> S {
        S::read(&*self.settings.read().await).clone()
    }

    pub async fn general(&self) -> GeneralSettings {
        self.section().await
    }

    pub async fn content(&self) -> ContentSettings {
        self.section().await
    }

    pub async fn comment(&self) -> CommentSettings {
        self.section().await
    }

    pub async fn advanced(&self) -> AdvancedSettings {
        self.section().await
    }

    pub async fn appearance(&self) -> AppearanceSettings {
        self.section().await
    }

    /// Validate, persist and apply one section
    pub async fn save<S: SettingsSection>(&self, section: S) -> Result<S, BlogConfigError> {
        section.validate().map_err(BlogConfigError::ValidationError)?;

        let json = serde_json::to_string(&section)
            .with_context(|| format!("Failed to serialize {}", S::KEY))?;

        // Hold the write lock across the store so concurrent saves apply in order.
        let mut settings = self.settings.write().await;
        self.repo
            .set(S::KEY, &json)
            .await
            .with_context(|| format!("Failed to save {}", S::KEY))?;
        section.clone().write(&mut settings);
        drop(settings);

        self.cache.invalidate(S::AFFECTS).await;
        self.activity
            .record(NewActivity::new(EventType::Settings, "Updated settings").target(S::KEY))
            .await;
        tracing::info!("Saved {}", S::KEY);
        Ok(section)
    }

    /// Read a section by its URL name (`general`, `content`, ...)
    pub async fn section_json(&self, name: &str) -> Result<Value, BlogConfigError> {
        let settings = self.settings.read().await;
        let value = match name {
            "general" => serde_json::to_value(&settings.general),
            "content" => serde_json::to_value(&settings.content),
            "comment" => serde_json::to_value(&settings.comment),
            "advanced" => serde_json::to_value(&settings.advanced),
            "appearance" => serde_json::to_value(&settings.appearance),
            _ => return Err(BlogConfigError::UnknownSection(name.to_string())),
        };
        Ok(value.context("Failed to serialize settings")?)
    }

    /// Replace a section by its URL name from a JSON document
    pub async fn save_json(&self, name: &str, value: Value) -> Result<Value, BlogConfigError> {
        match name {
            "general" => self.save_value::<GeneralSettings>(value).await,
            "content" => self.save_value::<ContentSettings>(value).await,
            "comment" => self.save_value::<CommentSettings>(value).await,
            "advanced" => self.save_value::<AdvancedSettings>(value).await,
            "appearance" => self.save_value::<AppearanceSettings>(value).await,
            _ => Err(BlogConfigError::UnknownSection(name.to_string())),
        }
    }

    async fn save_value<S: SettingsSection>(&self, value: Value) -> Result<Value, BlogConfigError> {
        let section: S = serde_json::from_value(value)
            .map_err(|e| BlogConfigError::ValidationError(format!("Invalid {}: {}", S::KEY, e)))?;
        let saved = self.save(section).await?;
        Ok(serde_json::to_value(saved).context("Failed to serialize settings")?)
    }
}

async fn load_section<S: SettingsSection>(
    repo: &dyn SettingsRepository,
    settings: &mut BlogSettings,
) -> Result<(), BlogConfigError> {
    let stored = repo
        .get(S::KEY)
        .await
        .with_context(|| format!("Failed to load {}", S::KEY))?;

    let section = match stored {
        Some(entry) => match serde_json::from_str::<S>(&entry.value) {
            Ok(section) => section,
            Err(e) => {
                tracing::warn!("Invalid {} in database, using defaults: {}", S::KEY, e);
                S::default()
            }
        },
        None => {
            let section = S::default();
            let json = serde_json::to_string(&section)
                .with_context(|| format!("Failed to serialize {}", S::KEY))?;
            repo.set(S::KEY, &json)
                .await
                .with_context(|| format!("Failed to insert default {}", S::KEY))?;
            tracing::debug!("Inserted default {}", S::KEY);
            section
        }
    };

    section.write(settings);
    Ok(())
}

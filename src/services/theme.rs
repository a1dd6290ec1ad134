//! Theme service
//!
//! Themes are sets of CSS custom properties. System themes ship with the
//! database and are read-only; user themes can be added and removed. The
//! active theme (plus optional custom CSS) is served as `/theme.css`.

use crate::cache::{Cache, CachePartition};
use crate::db::repositories::ThemeRepository;
use crate::models::{EventType, NewActivity, Theme, ThemeInput};
use crate::services::blog_config::AppearanceSettings;
use crate::services::{ActivityLogService, BlogConfigService};
use anyhow::Context;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;

const MAX_THEME_NAME_LENGTH: usize = 32;
const MAX_RULES: usize = 64;

#[derive(Debug, thiserror::Error)]
pub enum ThemeServiceError {
    #[error("Theme not found: {0}")]
    NotFound(i64),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Theme already exists: {0}")]
    Conflict(String),

    /// System themes cannot be changed
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct ThemeService {
    repo: Arc<dyn ThemeRepository>,
    cache: Arc<Cache>,
    config: Arc<BlogConfigService>,
    activity: Arc<ActivityLogService>,
}

impl ThemeService {
    pub fn new(
        repo: Arc<dyn ThemeRepository>,
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

    pub async fn list(&self) -> Result<Vec<Theme>, ThemeServiceError> {
        Ok(self.repo.list().await.context("Failed to list themes")?)
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Theme, ThemeServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get theme")?
            .ok_or(ThemeServiceError::NotFound(id))
    }

    pub async fn create(&self, input: ThemeInput) -> Result<Theme, ThemeServiceError> {
        let name = input.theme_name.trim().to_string();
        if name.is_empty() || name.chars().count() > MAX_THEME_NAME_LENGTH {
            return Err(ThemeServiceError::ValidationError(format!(
                "Theme name must be 1-{} characters",
                MAX_THEME_NAME_LENGTH
            )));
        }
        let css_rules = validate_rules(input.css_rules)?;

        if self
            .repo
            .get_by_name(&name)
            .await
            .context("Failed to check theme name")?
            .is_some()
        {
            return Err(ThemeServiceError::Conflict(name));
        }

        let theme = Theme {
            id: 0,
            theme_name: name,
            css_rules,
            is_system: false,
            created_at: Utc::now(),
        };
        let created = self.repo.create(&theme).await.context("Failed to create theme")?;
        self.activity
            .record(NewActivity::new(EventType::Theme, "Created theme").target(&created.theme_name))
            .await;
        Ok(created)
    }

    /// Delete a user theme. When it was active the blog falls back to the first
    /// system theme.
    pub async fn delete(&self, id: i64) -> Result<(), ThemeServiceError> {
        let theme = self.get_by_id(id).await?;
        if theme.is_system {
            return Err(ThemeServiceError::Forbidden(
                "System themes cannot be deleted".to_string(),
            ));
        }

        self.repo.delete(id).await.context("Failed to delete theme")?;

        let appearance = self.config.appearance().await;
        if appearance.theme_id == id {
            let fallback = self.fallback_theme_id().await?;
            self.save_appearance(AppearanceSettings {
                theme_id: fallback,
                ..appearance
            })
            .await?;
        }

        self.cache.invalidate(&[CachePartition::Theme]).await;
        self.activity
            .record(NewActivity::new(EventType::Theme, "Deleted theme").target(&theme.theme_name))
            .await;
        Ok(())
    }

    /// Make `id` the active theme
    pub async fn activate(&self, id: i64) -> Result<Theme, ThemeServiceError> {
        let theme = self.get_by_id(id).await?;
        let appearance = self.config.appearance().await;
        self.save_appearance(AppearanceSettings {
            theme_id: theme.id,
            ..appearance
        })
        .await?;
        Ok(theme)
    }

    /// Stylesheet for the active theme, with custom CSS appended when enabled
    pub async fn render_css(&self) -> Result<String, ThemeServiceError> {
        self.cache
            .get_or_insert(&CachePartition::Theme.key("css"), || async {
                let appearance = self.config.appearance().await;
                let theme = match self
                    .repo
                    .get_by_id(appearance.theme_id)
                    .await
                    .context("Failed to get active theme")?
                {
                    Some(theme) => Some(theme),
                    None => {
                        tracing::warn!("Active theme {} is missing, using fallback", appearance.theme_id);
                        self.repo
                            .list()
                            .await
                            .context("Failed to list themes")?
                            .into_iter()
                            .next()
                    }
                };

                let mut css = theme.map(|t| t.to_css()).unwrap_or_default();
                if appearance.use_custom_css && !appearance.custom_css.trim().is_empty() {
                    css.push('\n');
                    css.push_str(appearance.custom_css.trim());
                    css.push('\n');
                }
                Ok::<_, ThemeServiceError>(css)
            })
            .await
    }

    async fn fallback_theme_id(&self) -> Result<i64, ThemeServiceError> {
        Ok(self
            .repo
            .list()
            .await
            .context("Failed to list themes")?
            .first()
            .map(|t| t.id)
            .unwrap_or(1))
    }

    async fn save_appearance(&self, appearance: AppearanceSettings) -> Result<(), ThemeServiceError> {
        self.config.save(appearance).await.map_err(|e| match e {
            crate::services::BlogConfigError::ValidationError(msg) => ThemeServiceError::ValidationError(msg),
            other => ThemeServiceError::InternalError(anyhow::anyhow!(other)),
        })?;
        Ok(())
    }
}

/// Check CSS variable names and values
fn validate_rules(rules: BTreeMap<String, String>) -> Result<BTreeMap<String, String>, ThemeServiceError> {
    if rules.is_empty() || rules.len() > MAX_RULES {
        return Err(ThemeServiceError::ValidationError(format!(
            "A theme needs 1-{} CSS rules",
            MAX_RULES
        )));
    }

    let mut checked = BTreeMap::new();
    for (name, value) in rules {
        let name = name.trim().to_string();
        let value = value.trim().to_string();
        let valid_name = name.len() > 2
            && name.starts_with("--")
            && name[2..].chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid_name {
            return Err(ThemeServiceError::ValidationError(format!(
                "Invalid CSS variable name: {}",
                name
            )));
        }
        if value.is_empty() || value.contains(&[';', '{', '}', '<', '>'][..]) {
            return Err(ThemeServiceError::ValidationError(format!(
                "Invalid value for {}",
                name
            )));
        }
        checked.insert(name, value);
    }
    Ok(checked)
}

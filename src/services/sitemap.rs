//! Sitemap and robots.txt

use crate::cache::{Cache, CachePartition};
use crate::db::repositories::{PageRepository, PostRepository};
use crate::services::BlogConfigService;
use crate::utils::combine_url;
use anyhow::Context;
use chrono::{DateTime, Utc};
use std::fmt::Write;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum SitemapServiceError {
    #[error("Sitemap is disabled")]
    Disabled,

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct SitemapService {
    post_repo: Arc<dyn PostRepository>,
    page_repo: Arc<dyn PageRepository>,
    cache: Arc<Cache>,
    config: Arc<BlogConfigService>,
    base_url: String,
}

impl SitemapService {
    pub fn new(
        post_repo: Arc<dyn PostRepository>,
        page_repo: Arc<dyn PageRepository>,
        cache: Arc<Cache>,
        config: Arc<BlogConfigService>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            post_repo,
            page_repo,
            cache,
            config,
            base_url: base_url.into(),
        }
    }

    /// `urlset` document with the home page, published posts and published pages
    pub async fn sitemap(&self) -> Result<String, SitemapServiceError> {
        if !self.config.advanced().await.enable_sitemap {
            return Err(SitemapServiceError::Disabled);
        }

        self.cache
            .get_or_insert(&CachePartition::Sitemap.key("xml"), || async {
                let posts = self
                    .post_repo
                    .list_all_published()
                    .await
                    .context("Failed to list posts for sitemap")?;
                let pages = self
                    .page_repo
                    .list_published()
                    .await
                    .context("Failed to list pages for sitemap")?;

                let mut xml = String::from(
                    "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n",
                );
                push_url(&mut xml, &combine_url(&self.base_url, "/"), None);
                for post in &posts {
                    if let Some(route_link) = &post.route_link {
                        let loc = combine_url(&self.base_url, &format!("post/{}", route_link));
                        push_url(&mut xml, &loc, post.last_modified.or(post.pub_date));
                    }
                }
                for page in &pages {
                    let loc = combine_url(&self.base_url, &format!("page/{}", page.slug));
                    push_url(&mut xml, &loc, Some(page.updated_at));
                }
                xml.push_str("</urlset>\n");

                tracing::debug!("Built sitemap with {} posts and {} pages", posts.len(), pages.len());
                Ok::<_, SitemapServiceError>(xml)
            })
            .await
    }

    /// Configured robots.txt text
    pub async fn robots_txt(&self) -> String {
        self.config.advanced().await.robots_txt
    }
}

fn push_url(xml: &mut String, loc: &str, last_modified: Option<DateTime<Utc>>) {
    xml.push_str("  <url>\n");
    let _ = writeln!(xml, "    <loc>{}</loc>", escape_xml(loc));
    if let Some(at) = last_modified {
        let _ = writeln!(xml, "    <lastmod>{}</lastmod>", at.format("%Y-%m-%dT%H:%M:%SZ"));
    }
    xml.push_str("  </url>\n");
}

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PageInput, PostEditInput};
    use crate::services::blog_config::AdvancedSettings;
    use crate::services::test_support::{TestContext, TEST_BASE_URL};

    #[tokio::test]
    async fn test_sitemap_lists_published_content() {
        let ctx = TestContext::new().await;
        let service = ctx.sitemap_service();

        let post = ctx
            .post_service()
            .create(PostEditInput::new("Visible", "body").published())
            .await
            .unwrap();
        ctx.post_service()
            .create(PostEditInput::new("Draft", "body"))
            .await
            .unwrap();
        ctx.page_service()
            .create(PageInput {
                title: "About".into(),
                slug: "about".into(),
                html_content: "<p>x</p>".into(),
                is_published: true,
                ..Default::default()
            })
            .await
            .unwrap();

        let xml = service.sitemap().await.unwrap();
        assert!(xml.contains(&format!("<loc>{}</loc>", TEST_BASE_URL)));
        assert!(xml.contains(&format!(
            "<loc>{}/post/{}</loc>",
            TEST_BASE_URL,
            post.route_link.unwrap()
        )));
        assert!(xml.contains(&format!("<loc>{}/page/about</loc>", TEST_BASE_URL)));
        assert!(!xml.contains("draft"));
        assert_eq!(xml.matches("<url>").count(), 3);
    }

    #[tokio::test]
    async fn test_sitemap_is_refreshed_after_post_write() {
        let ctx = TestContext::new().await;
        let service = ctx.sitemap_service();
        assert_eq!(service.sitemap().await.unwrap().matches("<url>").count(), 1);

        ctx.post_service()
            .create(PostEditInput::new("New", "body").published())
            .await
            .unwrap();
        assert_eq!(service.sitemap().await.unwrap().matches("<url>").count(), 2);
    }

    #[tokio::test]
    async fn test_disabled_sitemap_and_robots() {
        let ctx = TestContext::new().await;
        let service = ctx.sitemap_service();
        assert!(service.robots_txt().await.contains("Sitemap: /sitemap.xml"));

        ctx.config
            .save(AdvancedSettings {
                enable_sitemap: false,
                robots_txt: "User-agent: *\nDisallow: /\n".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(matches!(service.sitemap().await, Err(SitemapServiceError::Disabled)));
        assert_eq!(service.robots_txt().await, "User-agent: *\nDisallow: /\n");
    }

    #[test]
    fn test_escape_xml() {
        assert_eq!(escape_xml("a?b=1&c=<d>"), "a?b=1&amp;c=&lt;d&gt;");
    }
}

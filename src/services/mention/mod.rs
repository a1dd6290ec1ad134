//! Mention service
//!
//! Receives webmentions and pingbacks for published posts and notifies the
//! pages a newly published post links to. Every inbound mention is verified
//! in a single pass: the source page must exist and link to the target.

pub mod discovery;
pub mod remote;
pub mod xmlrpc;

pub use discovery::{discover, find_html_endpoint, parse_link_header, Endpoint};
pub use remote::{HttpRemote, RemoteDocument, RemoteFetcher};

use crate::db::repositories::{MentionRepository, PostRepository};
use crate::models::{
    parse_route_link, EventType, ListParams, Mention, MentionWorker, NewActivity, PagedResult, Post,
};
use crate::services::{ActivityLogService, BlogConfigService};
use crate::utils::{combine_url, ellipsize, extract_links, remove_tags, resolve_root_url, sterilize_link};
use anyhow::Context;
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use url::Url;

static TITLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title\s*>").expect("valid regex"));

const MAX_SOURCE_TITLE_LENGTH: usize = 128;

/// Error types for mention operations
#[derive(Debug, thiserror::Error)]
pub enum MentionServiceError {
    #[error("{0} is disabled")]
    Disabled(&'static str),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Source not found: {0}")]
    SourceNotFound(String),

    #[error("Source does not link to the target: {0}")]
    NoLinkToTarget(String),

    #[error("Target not found: {0}")]
    TargetNotFound(String),

    /// Target is not a post on this blog
    #[error("Target cannot receive mentions: {0}")]
    NotMentionable(String),

    #[error("Mention already registered: {0}")]
    Duplicate(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

impl MentionServiceError {
    /// Pingback XML-RPC fault code
    pub fn fault_code(&self) -> i32 {
        match self {
            Self::SourceNotFound(_) => 16,
            Self::NoLinkToTarget(_) => 17,
            Self::TargetNotFound(_) => 32,
            Self::NotMentionable(_) => 33,
            Self::Duplicate(_) => 48,
            Self::Disabled(_) | Self::ValidationError(_) | Self::InternalError(_) => 0,
        }
    }
}

pub struct MentionService {
    repo: Arc<dyn MentionRepository>,
    post_repo: Arc<dyn PostRepository>,
    remote: Arc<dyn RemoteFetcher>,
    config: Arc<BlogConfigService>,
    activity: Arc<ActivityLogService>,
    base_url: String,
}

impl MentionService {
    pub fn new(
        repo: Arc<dyn MentionRepository>,
        post_repo: Arc<dyn PostRepository>,
        remote: Arc<dyn RemoteFetcher>,
        config: Arc<BlogConfigService>,
        activity: Arc<ActivityLogService>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            repo,
            post_repo,
            remote,
            config,
            activity,
            base_url: base_url.into(),
        }
    }

    /// Public URL of a published post
    pub fn post_url(&self, route_link: &str) -> String {
        combine_url(&self.base_url, &format!("post/{}", route_link))
    }

    // ========================================================================
    // Inbound
    // ========================================================================

    /// Verify and store an inbound mention of one of our posts
    pub async fn receive(
        &self,
        source: &str,
        target: &str,
        worker: MentionWorker,
        source_ip: Option<&str>,
    ) -> Result<Mention, MentionServiceError> {
        let advanced = self.config.advanced().await;
        match worker {
            MentionWorker::Webmention if !advanced.enable_webmention => {
                return Err(MentionServiceError::Disabled("Webmention"))
            }
            MentionWorker::Pingback if !advanced.enable_pingback => {
                return Err(MentionServiceError::Disabled("Pingback"))
            }
            _ => {}
        }

        let source = source.trim();
        let target = target.trim();
        let source_url = absolute_http_url(source)
            .ok_or_else(|| MentionServiceError::ValidationError(format!("Invalid source URL: {}", source)))?;
        absolute_http_url(target)
            .ok_or_else(|| MentionServiceError::ValidationError(format!("Invalid target URL: {}", target)))?;
        if same_url(source, target) {
            return Err(MentionServiceError::ValidationError(
                "Source and target must differ".to_string(),
            ));
        }
        if sterilize_link(source) == "#" {
            return Err(MentionServiceError::ValidationError(format!(
                "Source URL is not publicly reachable: {}",
                source
            )));
        }

        let post = self.resolve_target(target).await?;

        if self
            .repo
            .exists(source, post.id)
            .await
            .context("Failed to check existing mention")?
        {
            return Err(MentionServiceError::Duplicate(source.to_string()));
        }

        let document = match self.remote.fetch(source).await {
            Ok(Some(document)) => document,
            Ok(None) => return Err(MentionServiceError::SourceNotFound(source.to_string())),
            Err(e) => {
                tracing::warn!("Failed to fetch mention source {}: {:#}", source, e);
                return Err(MentionServiceError::SourceNotFound(source.to_string()));
            }
        };
        if !links_to(&document.body, target) {
            return Err(MentionServiceError::NoLinkToTarget(source.to_string()));
        }

        let mention = Mention {
            id: 0,
            domain: source_url.host_str().unwrap_or_default().to_string(),
            source_url: source.to_string(),
            source_title: extract_title(&document.body).unwrap_or_else(|| source.to_string()),
            source_ip: source_ip.map(str::to_string),
            target_post_id: post.id,
            target_post_title: post.title.clone(),
            worker,
            ping_time: Utc::now(),
        };
        let created = self.repo.create(&mention).await.context("Failed to save mention")?;

        self.activity
            .record(
                NewActivity::new(EventType::Mention, format!("Received {}", worker.as_str()))
                    .target(&post.title)
                    .meta(serde_json::json!({ "source": source, "domain": created.domain }))
                    .client(source_ip, None),
            )
            .await;
        tracing::info!("Registered {} from {} for post {}", worker.as_str(), source, post.id);
        Ok(created)
    }

    /// Map a target URL to a published post of this blog
    async fn resolve_target(&self, target: &str) -> Result<Post, MentionServiceError> {
        let ours = resolve_root_url(&self.base_url).map(|r| r.to_lowercase());
        let theirs = resolve_root_url(target).map(|r| r.to_lowercase());
        if ours.is_none() || ours != theirs {
            return Err(MentionServiceError::NotMentionable(target.to_string()));
        }

        let path = Url::parse(target)
            .map(|u| u.path().to_string())
            .map_err(|_| MentionServiceError::ValidationError(format!("Invalid target URL: {}", target)))?;
        // Url keeps the path percent-encoded; route links are stored decoded
        let path = urlencoding::decode(&path)
            .map(|p| p.into_owned())
            .map_err(|_| MentionServiceError::NotMentionable(target.to_string()))?;
        let route_link = path
            .trim_start_matches('/')
            .strip_prefix("post/")
            .and_then(parse_route_link)
            .map(|(y, m, d, slug)| format!("{}/{}/{}/{}", y, m, d, slug))
            .ok_or_else(|| MentionServiceError::NotMentionable(target.to_string()))?;

        self.post_repo
            .get_by_route_link(&route_link)
            .await
            .context("Failed to get target post")?
            .ok_or_else(|| MentionServiceError::TargetNotFound(target.to_string()))
    }

    // ========================================================================
    // Outbound
    // ========================================================================

    /// Notify every external page linked from a newly published post.
    ///
    /// Failures are logged and otherwise ignored.
    pub async fn notify_post(&self, post: &Post) {
        let advanced = self.config.advanced().await;
        if !advanced.enable_webmention && !advanced.enable_pingback {
            return;
        }
        let Some(route_link) = post.route_link.as_deref() else {
            return;
        };

        let source = self.post_url(route_link);
        let own_root = resolve_root_url(&self.base_url).map(|r| r.to_lowercase());

        for target in extract_links(&post.content_html()) {
            if sterilize_link(&target) == "#" {
                continue;
            }
            if resolve_root_url(&target).map(|r| r.to_lowercase()) == own_root {
                continue;
            }

            let document = match self.remote.fetch(&target).await {
                Ok(Some(document)) => document,
                Ok(None) => continue,
                Err(e) => {
                    tracing::warn!("Failed to fetch {}: {:#}", target, e);
                    continue;
                }
            };

            let result = match discover(&target, &document, advanced.enable_webmention, advanced.enable_pingback) {
                Some(Endpoint::Webmention(endpoint)) => {
                    self.remote.send_webmention(&endpoint, &source, &target).await
                }
                Some(Endpoint::Pingback(endpoint)) => self.remote.send_pingback(&endpoint, &source, &target).await,
                None => {
                    tracing::debug!("No mention endpoint advertised by {}", target);
                    continue;
                }
            };

            match result {
                Ok(()) => tracing::info!("Notified {} about {}", target, source),
                Err(e) => tracing::warn!("Failed to notify {}: {:#}", target, e),
            }
        }
    }

    // ========================================================================
    // Admin
    // ========================================================================

    pub async fn list(&self, params: &ListParams) -> Result<PagedResult<Mention>, MentionServiceError> {
        let (items, total) = self.repo.list(params).await.context("Failed to list mentions")?;
        Ok(PagedResult::new(items, total, params))
    }

    pub async fn delete(&self, ids: &[i64]) -> Result<u64, MentionServiceError> {
        let removed = self.repo.delete(ids).await.context("Failed to delete mentions")?;
        if removed > 0 {
            self.activity
                .record(
                    NewActivity::new(EventType::Mention, "Deleted mentions")
                        .meta(serde_json::json!({ "ids": ids, "removed": removed })),
                )
                .await;
        }
        Ok(removed)
    }

    pub async fn clear(&self) -> Result<u64, MentionServiceError> {
        let removed = self.repo.clear().await.context("Failed to clear mentions")?;
        self.activity
            .record(
                NewActivity::new(EventType::Mention, "Cleared mentions")
                    .meta(serde_json::json!({ "removed": removed })),
            )
            .await;
        Ok(removed)
    }

    pub async fn count(&self) -> Result<i64, MentionServiceError> {
        Ok(self.repo.count().await.context("Failed to count mentions")?)
    }
}

fn absolute_http_url(raw: &str) -> Option<Url> {
    Url::parse(raw)
        .ok()
        .filter(|u| (u.scheme() == "http" || u.scheme() == "https") && u.host_str().is_some())
}

fn same_url(a: &str, b: &str) -> bool {
    a.trim_end_matches('/').eq_ignore_ascii_case(b.trim_end_matches('/'))
}

/// Whether `html` contains an anchor pointing at `target`
fn links_to(html: &str, target: &str) -> bool {
    extract_links(html).iter().any(|link| same_url(link, target))
}

/// Text of the `<title>` element
fn extract_title(html: &str) -> Option<String> {
    let raw = TITLE_RE.captures(html)?.get(1)?.as_str();
    let title = remove_tags(raw);
    (!title.is_empty()).then(|| ellipsize(&title, MAX_SOURCE_TITLE_LENGTH))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PostEditInput;
    use crate::services::blog_config::AdvancedSettings;
    use crate::services::test_support::{StaticRemote, TestContext, TEST_BASE_URL};

    struct Fixture {
        ctx: TestContext,
        remote: Arc<StaticRemote>,
        service: MentionService,
        target: String,
    }

    async fn setup() -> Fixture {
        let ctx = TestContext::new().await;
        let post = ctx
            .post_service()
            .create(PostEditInput::new("Target Post", "body").published())
            .await
            .unwrap();
        let remote = Arc::new(StaticRemote::default());
        let service = ctx.mention_service(remote.clone());
        let target = service.post_url(post.route_link.as_deref().unwrap());
        Fixture {
            ctx,
            remote,
            service,
            target,
        }
    }

    #[test]
    fn test_extract_title() {
        assert_eq!(
            extract_title("<html><head><title> Hello &amp; bye </title></head></html>"),
            Some("Hello & bye".to_string())
        );
        assert_eq!(extract_title("<p>none</p>"), None);
    }

    #[test]
    fn test_fault_codes() {
        assert_eq!(MentionServiceError::SourceNotFound(String::new()).fault_code(), 16);
        assert_eq!(MentionServiceError::NoLinkToTarget(String::new()).fault_code(), 17);
        assert_eq!(MentionServiceError::TargetNotFound(String::new()).fault_code(), 32);
        assert_eq!(MentionServiceError::NotMentionable(String::new()).fault_code(), 33);
        assert_eq!(MentionServiceError::Duplicate(String::new()).fault_code(), 48);
        assert_eq!(MentionServiceError::ValidationError(String::new()).fault_code(), 0);
    }

    #[tokio::test]
    async fn test_receive_webmention() {
        let f = setup().await;
        f.remote.add_page(
            "https://other.example/reply",
            RemoteDocument::html(format!(
                "<html><title>A reply</title><body><a href=\"{}\">nice</a></body></html>",
                f.target
            )),
        );

        let mention = f
            .service
            .receive("https://other.example/reply", &f.target, MentionWorker::Webmention, Some("8.8.8.8"))
            .await
            .unwrap();
        assert_eq!(mention.domain, "other.example");
        assert_eq!(mention.source_title, "A reply");
        assert_eq!(mention.target_post_title, "Target Post");

        assert!(matches!(
            f.service
                .receive("https://other.example/reply", &f.target, MentionWorker::Pingback, None)
                .await,
            Err(MentionServiceError::Duplicate(_))
        ));
        assert_eq!(f.service.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_receive_for_non_latin_slug() {
        let f = setup().await;
        let post = f
            .ctx
            .post_service()
            .create(PostEditInput::new("中文 标题", "body").published())
            .await
            .unwrap();
        let route_link = post.route_link.unwrap();
        assert!(route_link.ends_with("/中文-标题"));

        let raw_target = f.service.post_url(&route_link);
        let encoded_target = Url::parse(&raw_target).unwrap().to_string();
        assert_ne!(raw_target, encoded_target);

        for (source, target) in [
            ("https://other.example/encoded", &encoded_target),
            ("https://other.example/raw", &raw_target),
        ] {
            f.remote.add_page(
                source,
                RemoteDocument::html(format!("<a href=\"{}\">link</a>", target)),
            );
            let mention = f
                .service
                .receive(source, target, MentionWorker::Webmention, None)
                .await
                .unwrap();
            assert_eq!(mention.target_post_id, post.id);
        }
    }

    #[tokio::test]
    async fn test_receive_verification_failures() {
        let f = setup().await;
        f.remote.add_page("https://other.example/nolink", RemoteDocument::html("<p>nothing</p>"));

        let cases = [
            ("https://other.example/missing", f.target.clone(), 16),
            ("https://other.example/nolink", f.target.clone(), 17),
            ("https://other.example/nolink", format!("{}/post/2020/1/1/nope", TEST_BASE_URL), 32),
            ("https://other.example/nolink", "https://elsewhere.example/post/2020/1/1/x".to_string(), 33),
            ("https://other.example/nolink", format!("{}/about", TEST_BASE_URL), 33),
        ];
        for (source, target, code) in cases {
            let err = f
                .service
                .receive(source, &target, MentionWorker::Pingback, None)
                .await
                .unwrap_err();
            assert_eq!(err.fault_code(), code, "{} -> {}", source, target);
        }

        assert!(matches!(
            f.service.receive("ftp://x.example", &f.target, MentionWorker::Webmention, None).await,
            Err(MentionServiceError::ValidationError(_))
        ));
        assert!(matches!(
            f.service.receive(&f.target, &f.target, MentionWorker::Webmention, None).await,
            Err(MentionServiceError::ValidationError(_))
        ));
        assert!(matches!(
            f.service
                .receive("http://192.168.1.10/page", &f.target, MentionWorker::Webmention, None)
                .await,
            Err(MentionServiceError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_disabled_worker() {
        let f = setup().await;
        f.ctx
            .config
            .save(AdvancedSettings {
                enable_pingback: false,
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(matches!(
            f.service
                .receive("https://other.example/a", &f.target, MentionWorker::Pingback, None)
                .await,
            Err(MentionServiceError::Disabled(_))
        ));
    }

    #[tokio::test]
    async fn test_notify_post_sends_to_discovered_endpoints() {
        let f = setup().await;
        f.remote.add_page(
            "https://wm.example/article",
            RemoteDocument {
                link_headers: vec![r#"</webmention>; rel="webmention""#.to_string()],
                ..Default::default()
            },
        );
        f.remote.add_page(
            "https://pb.example/article",
            RemoteDocument::html(r#"<link rel="pingback" href="https://pb.example/xmlrpc">"#),
        );
        f.remote.add_page("https://plain.example/", RemoteDocument::html("<p>plain</p>"));

        let post = f
            .ctx
            .post_service()
            .create(
                PostEditInput::new(
                    "Links",
                    "[a](https://wm.example/article) [b](https://pb.example/article) \
                     [c](https://plain.example/) [d](http://127.0.0.1/x)",
                )
                .published(),
            )
            .await
            .unwrap();

        f.service.notify_post(&post).await;

        let sent = f.remote.sent();
        let source = f.service.post_url(post.route_link.as_deref().unwrap());
        assert!(sent.contains(&(
            "webmention".to_string(),
            "https://wm.example/webmention".to_string(),
            source.clone(),
            "https://wm.example/article".to_string()
        )));
        assert!(sent.contains(&(
            "pingback".to_string(),
            "https://pb.example/xmlrpc".to_string(),
            source,
            "https://pb.example/article".to_string()
        )));
        assert_eq!(sent.len(), 2);
    }

    #[tokio::test]
    async fn test_admin_delete_and_clear() {
        let f = setup().await;
        for i in 0..3 {
            let source = format!("https://other.example/{}", i);
            f.remote.add_page(
                &source,
                RemoteDocument::html(format!("<a href=\"{}\">x</a>", f.target)),
            );
            f.service
                .receive(&source, &f.target, MentionWorker::Webmention, None)
                .await
                .unwrap();
        }

        let page = f.service.list(&ListParams::default()).await.unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(f.service.delete(&[page.items[0].id]).await.unwrap(), 1);
        assert_eq!(f.service.clear().await.unwrap(), 2);
        assert_eq!(f.service.count().await.unwrap(), 0);
    }
}

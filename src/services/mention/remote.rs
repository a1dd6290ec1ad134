//! Outbound HTTP for mentions
//!
//! Fetching source documents and sending webmentions / pingbacks goes through
//! [`RemoteFetcher`] so the mention logic can run against canned documents.

use super::xmlrpc;
use crate::config::MentionConfig;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::time::Duration;

/// A fetched remote page
#[derive(Debug, Clone, Default)]
pub struct RemoteDocument {
    /// Every `Link` response header value
    pub link_headers: Vec<String>,
    /// `X-Pingback` response header
    pub pingback_header: Option<String>,
    pub body: String,
}

impl RemoteDocument {
    pub fn html(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            ..Default::default()
        }
    }
}

#[async_trait]
pub trait RemoteFetcher: Send + Sync {
    /// GET `url`. `Ok(None)` when the server answered with an error status.
    async fn fetch(&self, url: &str) -> Result<Option<RemoteDocument>>;

    async fn send_webmention(&self, endpoint: &str, source: &str, target: &str) -> Result<()>;

    async fn send_pingback(&self, endpoint: &str, source: &str, target: &str) -> Result<()>;
}

/// reqwest-backed fetcher
pub struct HttpRemote {
    client: reqwest::Client,
}

impl HttpRemote {
    pub fn new(config: &MentionConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(config.user_agent.clone())
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl RemoteFetcher for HttpRemote {
    async fn fetch(&self, url: &str) -> Result<Option<RemoteDocument>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Failed to fetch {}", url))?;

        if !response.status().is_success() {
            tracing::debug!("Fetching {} returned {}", url, response.status());
            return Ok(None);
        }

        let headers = response.headers();
        let link_headers = headers
            .get_all(reqwest::header::LINK)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .map(str::to_string)
            .collect();
        let pingback_header = headers
            .get("x-pingback")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = response
            .text()
            .await
            .with_context(|| format!("Failed to read body of {}", url))?;

        Ok(Some(RemoteDocument {
            link_headers,
            pingback_header,
            body,
        }))
    }

    async fn send_webmention(&self, endpoint: &str, source: &str, target: &str) -> Result<()> {
        let response = self
            .client
            .post(endpoint)
            .form(&[("source", source), ("target", target)])
            .send()
            .await
            .with_context(|| format!("Failed to send webmention to {}", endpoint))?;
        if !response.status().is_success() {
            bail!("Webmention endpoint {} answered {}", endpoint, response.status());
        }
        Ok(())
    }

    async fn send_pingback(&self, endpoint: &str, source: &str, target: &str) -> Result<()> {
        let response = self
            .client
            .post(endpoint)
            .header(reqwest::header::CONTENT_TYPE, "text/xml")
            .body(xmlrpc::pingback_request(source, target))
            .send()
            .await
            .with_context(|| format!("Failed to send pingback to {}", endpoint))?;
        if !response.status().is_success() {
            bail!("Pingback endpoint {} answered {}", endpoint, response.status());
        }
        let body = response.text().await.unwrap_or_default();
        if let Some((code, message)) = xmlrpc::parse_fault(&body) {
            bail!("Pingback endpoint {} returned fault {}: {}", endpoint, code, message);
        }
        Ok(())
    }
}

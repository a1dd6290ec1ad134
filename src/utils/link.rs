//! URL helpers

use once_cell::sync::Lazy;
use regex::Regex;
use url::{Host, Url};

use super::ip::is_private_ip;

static ANCHOR_HREF_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<a\s[^>]*?href\s*=\s*["']([^"']+)["']"#).expect("valid regex")
});

/// Return `raw` when it is safe to render as a link, otherwise `"#"`.
///
/// Accepted: absolute `http`/`https` URLs whose host is not loopback or a
/// private address, and site-relative paths starting with a single `/`.
pub fn sterilize_link(raw: &str) -> String {
    const INVALID: &str = "#";
    let raw = raw.trim();

    if raw.starts_with('/') {
        if raw.starts_with("//") || raw.starts_with("/\\") {
            return INVALID.to_string();
        }
        return raw.to_string();
    }

    let Ok(url) = Url::parse(raw) else {
        return INVALID.to_string();
    };
    if url.scheme() != "http" && url.scheme() != "https" {
        return INVALID.to_string();
    }

    let blocked = match url.host() {
        None => true,
        Some(Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
        Some(Host::Ipv4(ip)) => is_private_ip(&ip.into()),
        Some(Host::Ipv6(ip)) => is_private_ip(&ip.into()),
    };
    if blocked {
        return INVALID.to_string();
    }

    raw.to_string()
}

/// Join a base URL and a path with exactly one `/`
pub fn combine_url(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    if path.is_empty() {
        return base.to_string();
    }
    format!("{}/{}", base, path)
}

/// Scheme, host and (non-default) port of an absolute URL
pub fn resolve_root_url(raw: &str) -> Option<String> {
    let url = Url::parse(raw.trim()).ok()?;
    let host = url.host_str()?;
    Some(match url.port() {
        Some(port) => format!("{}://{}:{}", url.scheme(), host, port),
        None => format!("{}://{}", url.scheme(), host),
    })
}

/// Absolute http(s) `href` values of the anchors in `html`, first occurrence order
pub fn extract_links(html: &str) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    ANCHOR_HREF_RE
        .captures_iter(html)
        .filter_map(|cap| cap.get(1))
        .map(|m| m.as_str().trim().replace("&amp;", "&"))
        .filter(|href| {
            Url::parse(href)
                .map(|u| u.scheme() == "http" || u.scheme() == "https")
                .unwrap_or(false)
        })
        .filter(|href| seen.insert(href.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sterilize_link_accepts_public_urls() {
        assert_eq!(sterilize_link("https://example.com/a?b=1"), "https://example.com/a?b=1");
        assert_eq!(sterilize_link("http://8.8.8.8/"), "http://8.8.8.8/");
        assert_eq!(sterilize_link("/about"), "/about");
    }

    #[test]
    fn test_sterilize_link_rejects_unsafe_urls() {
        assert_eq!(sterilize_link("javascript:alert(1)"), "#");
        assert_eq!(sterilize_link("data:text/html,hi"), "#");
        assert_eq!(sterilize_link("//evil.com"), "#");
        assert_eq!(sterilize_link("ftp://example.com"), "#");
        assert_eq!(sterilize_link("http://localhost:8080"), "#");
        assert_eq!(sterilize_link("http://127.0.0.1/"), "#");
        assert_eq!(sterilize_link("http://192.168.1.10/admin"), "#");
        assert_eq!(sterilize_link("http://[::1]/"), "#");
        assert_eq!(sterilize_link("not a url"), "#");
    }

    #[test]
    fn test_combine_url() {
        assert_eq!(combine_url("https://a.com/", "/post/x"), "https://a.com/post/x");
        assert_eq!(combine_url("https://a.com", "post/x"), "https://a.com/post/x");
        assert_eq!(combine_url("https://a.com/", ""), "https://a.com");
    }

    #[test]
    fn test_resolve_root_url() {
        assert_eq!(
            resolve_root_url("https://blog.example.com/post/1?x=2").as_deref(),
            Some("https://blog.example.com")
        );
        assert_eq!(
            resolve_root_url("http://localhost:8080/a").as_deref(),
            Some("http://localhost:8080")
        );
        assert_eq!(resolve_root_url("relative/path"), None);
    }

    #[test]
    fn test_extract_links() {
        let html = r#"<p><a href="https://a.com/1">a</a> <A class="x" HREF='http://b.com'>b</A>
            <a href="/local">l</a> <a href="mailto:x@y.z">m</a> <a href="https://a.com/1">dup</a></p>"#;
        assert_eq!(extract_links(html), vec!["https://a.com/1", "http://b.com"]);
    }
}

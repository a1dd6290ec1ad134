//! Webmention and pingback endpoint discovery

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use super::remote::RemoteDocument;

static LINK_VALUE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<([^>]*)>((?:\s*;\s*[^;,]+)*)").expect("valid regex"));
static REL_PARAM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)rel\s*=\s*(?:"([^"]*)"|([^\s;,"]+))"#).expect("valid regex"));
static ELEMENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<(?:link|a)\s[^>]*>").expect("valid regex"));
static REL_ATTR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)\srel\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s>]+))"#).expect("valid regex"));
static HREF_ATTR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)\shref\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s>]+))"#).expect("valid regex"));

/// Where to send a notification for a linked page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    Webmention(String),
    Pingback(String),
}

fn has_rel(values: &str, rel: &str) -> bool {
    values.split_whitespace().any(|v| v.eq_ignore_ascii_case(rel))
}

fn first_group(caps: &regex::Captures) -> Option<String> {
    (1..caps.len()).find_map(|i| caps.get(i)).map(|m| m.as_str().trim().to_string())
}

/// URL of the first `Link` header entry carrying `rel`
pub fn parse_link_header(value: &str, rel: &str) -> Option<String> {
    LINK_VALUE_RE.captures_iter(value).find_map(|cap| {
        let params = cap.get(2).map_or("", |m| m.as_str());
        let rel_values = REL_PARAM_RE.captures(params).and_then(|c| first_group(&c))?;
        has_rel(&rel_values, rel).then(|| cap[1].trim().to_string())
    })
}

/// `href` of the first `<link>` or `<a>` element carrying `rel`
pub fn find_html_endpoint(html: &str, rel: &str) -> Option<String> {
    ELEMENT_RE.find_iter(html).find_map(|element| {
        let element = element.as_str();
        let rel_values = REL_ATTR_RE.captures(element).and_then(|c| first_group(&c))?;
        if !has_rel(&rel_values, rel) {
            return None;
        }
        let href = HREF_ATTR_RE.captures(element).and_then(|c| first_group(&c))?;
        Some(href.replace("&amp;", "&"))
    })
}

/// Endpoint advertised by `document`, fetched from `target`.
///
/// Webmention wins over pingback; relative endpoints resolve against `target`.
pub fn discover(target: &str, document: &RemoteDocument, webmention: bool, pingback: bool) -> Option<Endpoint> {
    let base = Url::parse(target).ok()?;
    let resolve = |href: String| base.join(&href).ok().map(|u| u.to_string());

    if webmention {
        let found = document
            .link_headers
            .iter()
            .find_map(|h| parse_link_header(h, "webmention"))
            .or_else(|| find_html_endpoint(&document.body, "webmention"))
            .and_then(resolve);
        if let Some(endpoint) = found {
            return Some(Endpoint::Webmention(endpoint));
        }
    }

    if pingback {
        let found = document
            .pingback_header
            .clone()
            .filter(|h| !h.trim().is_empty())
            .or_else(|| find_html_endpoint(&document.body, "pingback"))
            .and_then(resolve);
        if let Some(endpoint) = found {
            return Some(Endpoint::Pingback(endpoint));
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_link_header() {
        assert_eq!(
            parse_link_header(r#"<https://a.example/wm>; rel="webmention""#, "webmention"),
            Some("https://a.example/wm".to_string())
        );
        assert_eq!(
            parse_link_header(
                r#"<https://a.example/style.css>; rel=stylesheet, </wm>; rel="other webmention""#,
                "webmention"
            ),
            Some("/wm".to_string())
        );
        assert_eq!(parse_link_header(r#"<https://a.example/>; rel="home""#, "webmention"), None);
    }

    #[test]
    fn test_find_html_endpoint() {
        let html = r#"<html><head>
            <link rel="stylesheet" href="/s.css">
            <link href='/endpoint?x=1&amp;y=2' rel='webmention'>
            <link rel="pingback" href="https://a.example/xmlrpc">
        </head></html>"#;
        assert_eq!(find_html_endpoint(html, "webmention"), Some("/endpoint?x=1&y=2".to_string()));
        assert_eq!(find_html_endpoint(html, "pingback"), Some("https://a.example/xmlrpc".to_string()));
        assert_eq!(find_html_endpoint(html, "micropub"), None);
    }

    #[test]
    fn test_discover_prefers_webmention_and_resolves_relative() {
        let doc = RemoteDocument {
            link_headers: vec![r#"</webmention>; rel="webmention""#.to_string()],
            pingback_header: Some("https://a.example/xmlrpc".to_string()),
            body: String::new(),
        };
        assert_eq!(
            discover("https://a.example/posts/1", &doc, true, true),
            Some(Endpoint::Webmention("https://a.example/webmention".to_string()))
        );
        assert_eq!(
            discover("https://a.example/posts/1", &doc, false, true),
            Some(Endpoint::Pingback("https://a.example/xmlrpc".to_string()))
        );
        assert_eq!(discover("https://a.example/", &RemoteDocument::html("<p>no</p>"), true, true), None);
    }
}

//! The slice of XML-RPC that pingback needs

use once_cell::sync::Lazy;
use regex::Regex;

static METHOD_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<methodName>\s*([^<]*?)\s*</methodName>").expect("valid regex"));
static PARAM_VALUE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<param>\s*<value>\s*(?:<string>(.*?)</string>|([^<]*))\s*</value>\s*</param>")
        .expect("valid regex")
});
static FAULT_CODE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<fault>.*?<name>faultCode</name>\s*<value>\s*<(?:int|i4)>\s*(-?\d+)")
        .expect("valid regex")
});
static FAULT_STRING_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<name>faultString</name>\s*<value>\s*(?:<string>)?(.*?)(?:</string>)?\s*</value>")
        .expect("valid regex")
});

/// Source and target of a `pingback.ping` call
pub fn parse_pingback_request(xml: &str) -> Option<(String, String)> {
    let method = METHOD_NAME_RE.captures(xml)?.get(1)?.as_str();
    if method != "pingback.ping" {
        return None;
    }

    let mut params = PARAM_VALUE_RE.captures_iter(xml).map(|cap| {
        let raw = cap.get(1).or_else(|| cap.get(2)).map_or("", |m| m.as_str());
        unescape(raw.trim())
    });
    let source = params.next()?;
    let target = params.next()?;
    if source.is_empty() || target.is_empty() {
        return None;
    }
    Some((source, target))
}

/// Successful method response carrying a string
pub fn success_response(message: &str) -> String {
    format!(
        "<?xml version=\"1.0\"?>\n<methodResponse><params><param><value><string>{}</string></value></param></params></methodResponse>\n",
        escape(message)
    )
}

/// Fault response
pub fn fault_response(code: i32, message: &str) -> String {
    format!(
        "<?xml version=\"1.0\"?>\n<methodResponse><fault><value><struct>\
<member><name>faultCode</name><value><int>{}</int></value></member>\
<member><name>faultString</name><value><string>{}</string></value></member>\
</struct></value></fault></methodResponse>\n",
        code,
        escape(message)
    )
}

/// Outgoing `pingback.ping` call
pub fn pingback_request(source: &str, target: &str) -> String {
    format!(
        "<?xml version=\"1.0\"?>\n<methodCall><methodName>pingback.ping</methodName><params>\
<param><value><string>{}</string></value></param>\
<param><value><string>{}</string></value></param>\
</params></methodCall>\n",
        escape(source),
        escape(target)
    )
}

/// Fault code and message, when `xml` is a fault response
pub fn parse_fault(xml: &str) -> Option<(i32, String)> {
    let code = FAULT_CODE_RE.captures(xml)?.get(1)?.as_str().parse().ok()?;
    let message = FAULT_STRING_RE
        .captures(xml)
        .and_then(|c| c.get(1))
        .map(|m| unescape(m.as_str()))
        .unwrap_or_default();
    Some((code, message))
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pingback_request() {
        let xml = r#"<?xml version="1.0"?>
<methodCall>
  <methodName>pingback.ping</methodName>
  <params>
    <param><value><string>https://other.example/a?x=1&amp;y=2</string></value></param>
    <param><value>https://blog.example/post/2024/1/2/hello</value></param>
  </params>
</methodCall>"#;
        let (source, target) = parse_pingback_request(xml).unwrap();
        assert_eq!(source, "https://other.example/a?x=1&y=2");
        assert_eq!(target, "https://blog.example/post/2024/1/2/hello");
    }

    #[test]
    fn test_parse_rejects_other_methods() {
        let xml = "<methodCall><methodName>system.listMethods</methodName><params></params></methodCall>";
        assert!(parse_pingback_request(xml).is_none());
        assert!(parse_pingback_request("not xml").is_none());
    }

    #[test]
    fn test_outgoing_request_parses_back() {
        let xml = pingback_request("https://a.example/?q=1&r=2", "https://b.example/");
        assert_eq!(
            parse_pingback_request(&xml),
            Some(("https://a.example/?q=1&r=2".to_string(), "https://b.example/".to_string()))
        );
    }

    #[test]
    fn test_fault_response() {
        let xml = fault_response(48, "Already <registered>");
        assert!(xml.contains("<int>48</int>"));
        assert!(xml.contains("Already &lt;registered&gt;"));
        assert_eq!(parse_fault(&xml), Some((48, "Already <registered>".to_string())));
        assert_eq!(parse_fault(&success_response("ok")), None);
    }
}

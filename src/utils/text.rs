//! Text helpers: slugs, markdown, HTML stripping and abstracts

use once_cell::sync::Lazy;
use pulldown_cmark::{html, Options, Parser};
use regex::Regex;

static SCRIPT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<script[^>]*>.*?</script\s*>").expect("valid regex"));
static STYLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<style[^>]*>.*?</style\s*>").expect("valid regex"));
static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").expect("valid regex"));
static ROUTE_NAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z0-9-]+$").expect("valid regex"));

/// Generate a URL-friendly slug from a title.
///
/// ASCII letters and digits are lowercased and kept, non-ASCII characters are
/// kept as-is, everything else becomes a hyphen. Runs of hyphens collapse and
/// the result never starts or ends with one.
pub fn generate_slug(title: &str) -> String {
    let mut result = String::with_capacity(title.len());
    let mut prev_hyphen = false;

    for c in title.to_lowercase().chars() {
        if c.is_ascii_alphanumeric() || !c.is_ascii() {
            if c.is_whitespace() {
                // Non-ASCII whitespace (e.g. ideographic space)
                if !prev_hyphen && !result.is_empty() {
                    result.push('-');
                    prev_hyphen = true;
                }
                continue;
            }
            result.push(c);
            prev_hyphen = false;
        } else if !prev_hyphen && !result.is_empty() {
            result.push('-');
            prev_hyphen = true;
        }
    }

    result.trim_end_matches('-').to_string()
}

/// Whether `name` is usable as a category route name or page slug
pub fn is_valid_route_name(name: &str) -> bool {
    ROUTE_NAME_RE.is_match(name)
}

/// Render markdown to HTML (tables, footnotes, strikethrough, task lists)
pub fn markdown_to_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);

    let parser = Parser::new_ext(markdown, options);
    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}

/// Strip HTML tags, decode common entities and collapse whitespace
pub fn remove_tags(html: &str) -> String {
    if html.is_empty() {
        return String::new();
    }
    let text = SCRIPT_RE.replace_all(html, " ");
    let text = STYLE_RE.replace_all(&text, " ");
    let text = TAG_RE.replace_all(&text, " ");
    let text = decode_entities(&text);
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn decode_entities(text: &str) -> String {
    // `&amp;` last so `&amp;lt;` decodes to the literal `&lt;`.
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&amp;", "&")
}

fn is_cjk(c: char) -> bool {
    matches!(c,
        '\u{3040}'..='\u{30FF}'
        | '\u{3400}'..='\u{4DBF}'
        | '\u{4E00}'..='\u{9FFF}'
        | '\u{AC00}'..='\u{D7AF}'
        | '\u{F900}'..='\u{FAFF}')
}

/// Split a whitespace-free token into words: each CJK character is a word,
/// runs of other characters form one word.
fn token_units(token: &str) -> Vec<&str> {
    let mut units = Vec::new();
    let mut start = 0;
    for (i, c) in token.char_indices() {
        if is_cjk(c) {
            if start < i {
                units.push(&token[start..i]);
            }
            units.push(&token[i..i + c.len_utf8()]);
            start = i + c.len_utf8();
        }
    }
    if start < token.len() {
        units.push(&token[start..]);
    }
    units
}

/// Build a plain-text abstract of at most `word_count` words.
///
/// Markdown is rendered first so syntax does not leak into the abstract.
/// `...` is appended when the text was cut.
pub fn get_post_abstract(content: &str, word_count: usize, is_markdown: bool) -> String {
    let html = if is_markdown {
        markdown_to_html(content)
    } else {
        content.to_string()
    };
    let plain = remove_tags(&html);

    let mut out = String::new();
    let mut count = 0;
    for token in plain.split_whitespace() {
        for (i, unit) in token_units(token).into_iter().enumerate() {
            if count == word_count {
                out.push_str("...");
                return out;
            }
            if i == 0 && !out.is_empty() {
                out.push(' ');
            }
            out.push_str(unit);
            count += 1;
        }
    }
    out
}

/// Cut `text` to `max_chars` characters, appending `...` when shortened
pub fn ellipsize(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars).collect();
    out.push_str("...");
    out
}

/// Split a keyword list on `,` `;` and their full-width forms.
///
/// Entries are trimmed, empties dropped and duplicates removed keeping the
/// first occurrence.
pub fn split_keywords(raw: &str) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    raw.split(|c: char| matches!(c, ',' | ';' | '，' | '；'))
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .filter(|k| seen.insert(k.to_string()))
        .map(str::to_string)
        .collect()
}

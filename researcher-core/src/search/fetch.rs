//! Readable-text extraction from fetched HTML pages.

use regex::Regex;
use std::sync::LazyLock;

/// Elements whose whole subtree is dropped before extracting text.
const NOISE_TAGS: &[&str] = &[
    "script", "style", "iframe", "nav", "header", "footer", "form", "noscript", "svg",
];

static NOISE_BLOCKS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    NOISE_TAGS
        .iter()
        .map(|tag| {
            Regex::new(&format!(r"(?is)<{tag}\b[^>]*>.*?</{tag}\s*>"))
                .expect("noise tag pattern is valid")
        })
        .collect()
});

static COMMENTS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("comment pattern is valid"));

/// Content containers tried in order before falling back to `<body>`.
static CONTENT_AREAS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    ["main", "article", "body"]
        .iter()
        .map(|tag| {
            Regex::new(&format!(r"(?is)<{tag}\b[^>]*>(.*?)</{tag}\s*>"))
                .expect("content area pattern is valid")
        })
        .collect()
});

/// Extract the readable text of an HTML page.
///
/// Drops non-content blocks, keeps the first `<main>` or `<article>` when the
/// page has one, strips the remaining tags, decodes common entities,
/// collapses whitespace and removes non-printable characters.
pub fn extract_readable_text(html: &str) -> String {
    let mut cleaned = COMMENTS.replace_all(html, " ").into_owned();
    for block in NOISE_BLOCKS.iter() {
        cleaned = block.replace_all(&cleaned, " ").into_owned();
    }

    let area = CONTENT_AREAS
        .iter()
        .find_map(|re| re.captures(&cleaned))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .unwrap_or(&cleaned);

    let text = decode_entities(&strip_tags(area));
    super::normalize_whitespace(&text)
        .chars()
        .filter(|c| !c.is_control())
        .collect()
}

/// Remove every tag, leaving a space where each tag stood.
pub fn strip_tags(html: &str) -> String {
    let mut text = String::with_capacity(html.len());
    let mut in_tag = false;
    for ch in html.chars() {
        match ch {
            '<' => in_tag = true,
            '>' if in_tag => {
                in_tag = false;
                text.push(' ');
            }
            _ if in_tag => {}
            _ => text.push(ch),
        }
    }
    text
}

/// Decode the handful of entities common in page text.
pub fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

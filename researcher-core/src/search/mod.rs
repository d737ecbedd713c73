//! Web search gateway.
//!
//! A `SearchGateway` turns a query into an ordered list of `SearchResult`s,
//! each carrying fetched page text capped at the session's content limit.
//! Searching never fails from the caller's point of view: transport or parse
//! problems produce an empty response and a warning in the log.
//!
//! - `DuckDuckGoSearch`: HTML scrape of DuckDuckGo plus page fetches.
//! - `StaticSearchGateway`: canned results for tests and offline runs.

pub mod cache;
pub mod duckduckgo;
pub mod fetch;

use crate::config::ResearchConfig;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;

pub use cache::TtlCache;
pub use duckduckgo::DuckDuckGoSearch;

/// One search hit, enriched with page content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub title: String,
    pub snippet: String,
    /// Canonical target URL with any search-engine redirect removed.
    pub url: String,
    /// Readable page text, or the snippet when the page could not be fetched.
    pub content: String,
    /// Short label used in `[SourceName]` citation markers.
    pub source_name: String,
}

impl SearchResult {
    /// Build a result, deriving `source_name` from the URL and title.
    pub fn new(
        title: impl Into<String>,
        snippet: impl Into<String>,
        url: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        let title = title.into();
        let url = url.into();
        let source_name = source_name(&title, &url);
        Self {
            title,
            snippet: snippet.into(),
            url,
            content: content.into(),
            source_name,
        }
    }
}

/// Results for one query, in search-engine order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub results: Vec<SearchResult>,
}

impl SearchResponse {
    pub fn new(results: Vec<SearchResult>) -> Self {
        Self { results }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }
}

/// A best-effort web search.
///
/// Implementations return at most `config.search_results()` results, and no
/// result's `content` is longer than `config.max_content_length()` bytes.
#[async_trait]
pub trait SearchGateway: Send + Sync {
    async fn search(&self, query: &str, config: &ResearchConfig) -> SearchResponse;
}

/// Short label for a source: the first label of the host with `www.`
/// removed, e.g. `https://www.nature.com/x` -> `nature`.
///
/// Falls back to the first two words of the title when the URL has no host.
pub fn source_name(title: &str, url: &str) -> String {
    let host = url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_string()));
    match host {
        Some(host) if !host.is_empty() => {
            let domain = host.strip_prefix("www.").unwrap_or(&host);
            domain.split('.').next().unwrap_or(domain).to_string()
        }
        _ => {
            let words: Vec<&str> = title.split_whitespace().collect();
            if words.len() > 2 {
                words[..2].join(" ")
            } else {
                title.trim().to_string()
            }
        }
    }
}

/// Collapse every whitespace run to one space and trim the ends.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Cap `text` at `max_len` bytes, cutting at the last space when there is one.
///
/// The cut always lands on a character boundary, so the result is also at
/// most `max_len` characters.
pub fn truncate_content(text: &str, max_len: usize) -> String {
    if text.len() <= max_len {
        return text.to_string();
    }
    let mut end = max_len;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    let head = &text[..end];
    match head.rfind(' ') {
        Some(idx) if idx > 0 => head[..idx].to_string(),
        _ => head.to_string(),
    }
}

/// Apply the session limits to a result list: keep the first
/// `search_results` entries and cap every `content`.
pub fn conform(results: Vec<SearchResult>, config: &ResearchConfig) -> Vec<SearchResult> {
    results
        .into_iter()
        .take(config.search_results())
        .map(|mut r| {
            r.content = truncate_content(&normalize_whitespace(&r.content), config.max_content_length());
            r
        })
        .collect()
}

/// A search gateway backed by canned results.
///
/// Queries without an entry get the fallback results (empty unless set).
/// Every query is recorded in call order.
#[derive(Default)]
pub struct StaticSearchGateway {
    by_query: HashMap<String, Vec<SearchResult>>,
    fallback: Vec<SearchResult>,
    queries: Mutex<Vec<String>>,
}

impl StaticSearchGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Results returned for an exact query.
    pub fn with_results(mut self, query: impl Into<String>, results: Vec<SearchResult>) -> Self {
        self.by_query.insert(query.into(), results);
        self
    }

    /// Results returned for any query without its own entry.
    pub fn with_fallback(mut self, results: Vec<SearchResult>) -> Self {
        self.fallback = results;
        self
    }

    /// Queries seen so far, in call order.
    pub fn queries(&self) -> Vec<String> {
        self.queries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl SearchGateway for StaticSearchGateway {
    async fn search(&self, query: &str, config: &ResearchConfig) -> SearchResponse {
        self.queries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(query.to_string());
        let results = self
            .by_query
            .get(query)
            .cloned()
            .unwrap_or_else(|| self.fallback.clone());
        SearchResponse::new(conform(results, config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_source_name_from_host() {
        assert_eq!(source_name("t", "https://www.nature.com/articles/1"), "nature");
        assert_eq!(source_name("t", "https://en.wikipedia.org/wiki/X"), "en");
        assert_eq!(source_name("t", "http://energy.gov"), "energy");
    }

    #[test]
    fn test_source_name_falls_back_to_title() {
        assert_eq!(
            source_name("Grid Scale Batteries Explained", "not a url"),
            "Grid Scale"
        );
        assert_eq!(source_name("Batteries Explained", "::"), "Batteries Explained");
    }

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(normalize_whitespace("  a \n\t b   c  "), "a b c");
        assert_eq!(normalize_whitespace(""), "");
    }

    #[test]
    fn test_truncate_prefers_word_boundary() {
        assert_eq!(truncate_content("hello world again", 13), "hello world");
        assert_eq!(truncate_content("short", 100), "short");
        assert_eq!(truncate_content("abcdefghij", 4), "abcd");
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let text = "ééééé";
        let out = truncate_content(text, 5);
        assert!(out.len() <= 5);
        assert_eq!(out, "éé");
    }

    #[tokio::test]
    async fn test_static_gateway_applies_limits() {
        let long = "word ".repeat(1000);
        let results = (0..5)
            .map(|i| SearchResult::new(format!("T{i}"), "s", format!("https://s{i}.com"), &long))
            .collect();
        let gateway = StaticSearchGateway::new().with_results("q", results);
        let config = ResearchConfig::new(3, 2, 1000, 1);

        let response = gateway.search("q", &config).await;
        assert_eq!(response.len(), 2);
        assert!(response.results.iter().all(|r| r.content.len() <= 1000));
        assert!(gateway.search("other", &config).await.is_empty());
        assert_eq!(gateway.queries(), vec!["q", "other"]);
    }
}

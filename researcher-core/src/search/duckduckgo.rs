//! DuckDuckGo HTML search with page enrichment.
//!
//! Scrapes the non-JavaScript results page, then fetches every hit and
//! replaces its snippet with the page's readable text. Page fetches run
//! concurrently up to `fetch_concurrency`; results keep search order.

use super::cache::TtlCache;
use super::fetch::{decode_entities, extract_readable_text, strip_tags};
use super::{SearchGateway, SearchResponse, SearchResult, normalize_whitespace, truncate_content};
use crate::config::{ResearchConfig, SearchConfig};
use crate::error::SearchError;
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use regex::Regex;
use reqwest::Client;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::{debug, warn};

/// Opening tag of a result container: an element whose class list holds the
/// exact token `result`.
static RESULT_START: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<div[^>]*\sclass="(?:[^"]*\s)?result(?:\s[^"]*)?""#)
        .expect("result pattern is valid")
});

static TITLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<[a-z0-9]+[^>]*class="[^"]*\bresult__title\b[^"]*"[^>]*>(.*?)</(?:h2|a|div)>"#)
        .expect("title pattern is valid")
});

static SNIPPET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<[a-z0-9]+[^>]*class="[^"]*\bresult__snippet\b[^"]*"[^>]*>(.*?)</(?:a|div|td)>"#)
        .expect("snippet pattern is valid")
});

static URL_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<a\b[^>]*\bresult__url\b[^>]*>"#).expect("url tag pattern is valid")
});

static HREF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)href="([^"]*)""#).expect("href pattern is valid"));

/// A search hit before its page has been fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResult {
    pub title: String,
    pub snippet: String,
    pub url: String,
}

/// Parse up to `max_results` hits from a DuckDuckGo HTML results page.
///
/// Hits without a result URL are skipped and do not count toward the limit.
pub fn parse_results(html: &str, max_results: usize) -> Vec<RawResult> {
    let starts: Vec<usize> = RESULT_START.find_iter(html).map(|m| m.start()).collect();
    let mut results = Vec::new();

    for (i, &start) in starts.iter().enumerate() {
        if results.len() >= max_results {
            break;
        }
        let end = starts.get(i + 1).copied().unwrap_or(html.len());
        let block = &html[start..end];

        let Some(href) = URL_TAG
            .find(block)
            .and_then(|tag| HREF.captures(tag.as_str()))
            .and_then(|caps| caps.get(1))
            .map(|m| decode_entities(m.as_str()))
        else {
            continue;
        };
        let url = clean_url(&href);
        if url.is_empty() {
            continue;
        }

        results.push(RawResult {
            title: inner_text(&TITLE, block),
            snippet: inner_text(&SNIPPET, block),
            url,
        });
    }
    results
}

fn inner_text(re: &Regex, block: &str) -> String {
    re.captures(block)
        .and_then(|caps| caps.get(1))
        .map(|m| normalize_whitespace(&decode_entities(&strip_tags(m.as_str()))))
        .unwrap_or_default()
}

/// Resolve a DuckDuckGo result link to its target URL.
///
/// `//duckduckgo.com/l/?uddg=<encoded>&rut=<token>` becomes the decoded
/// target with the tracking parameter dropped. Protocol-relative links get
/// `https:`. Anything else is returned unchanged.
pub fn clean_url(raw: &str) -> String {
    let raw = raw.trim();
    if raw.contains("duckduckgo.com/l/?uddg=")
        && let Some((_, encoded)) = raw.split_once("uddg=")
    {
        let encoded = encoded.split('&').next().unwrap_or(encoded);
        if let Ok(decoded) = urlencoding::decode(encoded) {
            return decoded.into_owned();
        }
    }
    if let Some(rest) = raw.strip_prefix("//") {
        return format!("https://{rest}");
    }
    raw.to_string()
}

/// Search gateway backed by DuckDuckGo's HTML endpoint.
pub struct DuckDuckGoSearch {
    client: Client,
    endpoint: String,
    fetch_concurrency: usize,
    search_cache: TtlCache<SearchResponse>,
    page_cache: TtlCache<String>,
}

impl DuckDuckGoSearch {
    pub fn new(config: &SearchConfig) -> Result<Self, SearchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| SearchError::Request {
                message: format!("Failed to create HTTP client: {e}"),
            })?;
        let ttl = Duration::from_secs(config.cache_ttl_secs);
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            fetch_concurrency: config.fetch_concurrency.max(1),
            search_cache: TtlCache::new(ttl),
            page_cache: TtlCache::new(ttl),
        })
    }

    async fn get_text(&self, url: &str) -> Result<String, SearchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| SearchError::Request {
                message: e.to_string(),
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(SearchError::Status {
                status: status.as_u16(),
            });
        }
        response.text().await.map_err(|e| SearchError::Parse {
            message: e.to_string(),
        })
    }

    async fn fetch_results(&self, query: &str, max_results: usize) -> Result<Vec<RawResult>, SearchError> {
        let url = format!("{}?q={}", self.endpoint, urlencoding::encode(query));
        debug!(url = %url, "Searching");
        let html = self.get_text(&url).await?;
        Ok(parse_results(&html, max_results))
    }

    /// Fetch a hit's page and build the enriched result. Falls back to the
    /// snippet when the page cannot be fetched.
    async fn enrich(&self, raw: RawResult, max_content_length: usize) -> SearchResult {
        let content = match self.page_cache.get(&raw.url) {
            Some(cached) => cached,
            None => match self.get_text(&raw.url).await {
                Ok(html) => {
                    // Cached uncapped; each search applies its own limit.
                    let text = extract_readable_text(&html);
                    self.page_cache.insert(raw.url.clone(), text.clone());
                    text
                }
                Err(e) => {
                    debug!(url = %raw.url, error = %e, "Page fetch failed; using snippet");
                    raw.snippet.clone()
                }
            },
        };
        let content = truncate_content(&normalize_whitespace(&content), max_content_length);
        SearchResult::new(raw.title, raw.snippet, raw.url, content)
    }
}

#[async_trait]
impl SearchGateway for DuckDuckGoSearch {
    async fn search(&self, query: &str, config: &ResearchConfig) -> SearchResponse {
        let max_results = config.search_results();
        let max_content_length = config.max_content_length();
        let key = format!("{query}:{max_results}:{max_content_length}");
        if let Some(cached) = self.search_cache.get(&key) {
            debug!(query = %query, "Search cache hit");
            return cached;
        }

        let raw = match self.fetch_results(query, max_results).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(query = %query, error = %e, "Search failed; continuing without results");
                return SearchResponse::empty();
            }
        };

        let results: Vec<SearchResult> = stream::iter(raw)
            .map(|r| self.enrich(r, max_content_length))
            .buffered(self.fetch_concurrency)
            .collect()
            .await;

        let response = SearchResponse::new(results);
        self.search_cache.insert(key, response.clone());
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const RESULTS_PAGE: &str = r#"
<div id="links" class="results">
  <div class="result results_links results_links_deep web-result ">
    <div class="links_main links_deep result__body">
      <h2 class="result__title">
        <a rel="nofollow" class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fwww.energy.gov%2Fstorage&amp;rut=abc123">Energy <b>Storage</b> Basics</a>
      </h2>
      <div class="result__extras"><div class="result__extras__url">
        <a class="result__url" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fwww.energy.gov%2Fstorage&amp;rut=abc123">www.energy.gov/storage</a>
      </div></div>
      <a class="result__snippet" href="x">Grid-scale <b>storage</b> &amp; batteries.</a>
    </div>
  </div>
  <div class="result results_links web-result result--no-url">
    <h2 class="result__title"><a class="result__a">No link here</a></h2>
  </div>
  <div class="result results_links web-result ">
    <h2 class="result__title"><a class="result__a" href="https://nrel.gov/x">NREL Research</a></h2>
    <a class="result__url" href="https://nrel.gov/x">nrel.gov/x</a>
    <a class="result__snippet">Flow batteries.</a>
  </div>
  <div class="result results_links web-result ">
    <h2 class="result__title"><a class="result__a" href="https://third.org">Third</a></h2>
    <a class="result__url" href="https://third.org">third.org</a>
  </div>
</div>"#;

    #[test]
    fn test_parse_results_skips_missing_links() {
        let results = parse_results(RESULTS_PAGE, 10);
        assert_eq!(results.len(), 3);
        assert_eq!(
            results[0],
            RawResult {
                title: "Energy Storage Basics".into(),
                snippet: "Grid-scale storage & batteries.".into(),
                url: "https://www.energy.gov/storage".into(),
            }
        );
        assert_eq!(results[1].url, "https://nrel.gov/x");
        assert_eq!(results[2].snippet, "");
    }

    #[test]
    fn test_parse_results_respects_limit() {
        let results = parse_results(RESULTS_PAGE, 2);
        assert_eq!(results.len(), 2);
        assert_eq!(results[1].title, "NREL Research");
    }

    #[test]
    fn test_parse_results_empty_page() {
        assert!(parse_results("<html><body>No results.</body></html>", 5).is_empty());
    }

    #[test]
    fn test_clean_url() {
        assert_eq!(
            clean_url("//duckduckgo.com/l/?uddg=https%3A%2F%2Fexample.com%2Fa%3Fb%3D1&rut=xyz"),
            "https://example.com/a?b=1"
        );
        assert_eq!(clean_url("//example.com/page"), "https://example.com/page");
        assert_eq!(clean_url("https://example.com"), "https://example.com");
        assert_eq!(clean_url(""), "");
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_yields_empty_response() {
        let config = SearchConfig {
            endpoint: "http://127.0.0.1:9/html/".into(),
            timeout_secs: 2,
            ..SearchConfig::default()
        };
        let search = DuckDuckGoSearch::new(&config).unwrap();
        let response = search.search("anything", &ResearchConfig::default()).await;
        assert!(response.is_empty());
    }
}

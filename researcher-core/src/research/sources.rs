//! URL-keyed source accumulation across cycles.

use crate::search::SearchResult;
use std::collections::HashSet;

/// Ordered set of sources, unique by URL.
///
/// The first record seen for a URL is kept; later duplicates are ignored.
/// Iteration follows first-insertion order, which is the order used for the
/// References list.
#[derive(Debug, Clone, Default)]
pub struct SourceSet {
    sources: Vec<SearchResult>,
    urls: HashSet<String>,
}

impl SourceSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a source. Returns `false` if its URL was already present.
    pub fn insert(&mut self, source: SearchResult) -> bool {
        if self.urls.contains(&source.url) {
            return false;
        }
        self.urls.insert(source.url.clone());
        self.sources.push(source);
        true
    }

    /// Merge a batch of sources, returning how many were new.
    pub fn extend<I: IntoIterator<Item = SearchResult>>(&mut self, sources: I) -> usize {
        sources
            .into_iter()
            .map(|s| self.insert(s))
            .filter(|added| *added)
            .count()
    }

    pub fn contains_url(&self, url: &str) -> bool {
        self.urls.contains(url)
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn as_slice(&self) -> &[SearchResult] {
        &self.sources
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SearchResult> {
        self.sources.iter()
    }
}

impl FromIterator<SearchResult> for SourceSet {
    fn from_iter<I: IntoIterator<Item = SearchResult>>(iter: I) -> Self {
        let mut set = SourceSet::new();
        set.extend(iter);
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn result(url: &str, content: &str) -> SearchResult {
        SearchResult::new("t", "s", url, content)
    }

    #[test]
    fn test_first_seen_wins() {
        let mut set = SourceSet::new();
        assert!(set.insert(result("https://a.com", "first")));
        assert!(!set.insert(result("https://a.com", "second")));
        assert_eq!(set.len(), 1);
        assert_eq!(set.as_slice()[0].content, "first");
    }

    #[test]
    fn test_extend_keeps_insertion_order() {
        let mut set: SourceSet = vec![result("https://b.com", ""), result("https://a.com", "")]
            .into_iter()
            .collect();
        let added = set.extend(vec![
            result("https://a.com", "dup"),
            result("https://c.com", ""),
        ]);
        assert_eq!(added, 1);
        let urls: Vec<&str> = set.iter().map(|s| s.url.as_str()).collect();
        assert_eq!(urls, vec!["https://b.com", "https://a.com", "https://c.com"]);
        assert!(set.contains_url("https://c.com"));
    }
}

//! In-process TTL cache for search responses and page contents.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// A string-keyed cache whose entries expire `ttl` after insertion.
///
/// Expired entries are evicted when they are read.
pub struct TtlCache<V> {
    ttl: Duration,
    entries: Mutex<HashMap<String, (Instant, V)>>,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn get(&self, key: &str) -> Option<V> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let fresh = entries
            .get(key)
            .map(|(stored_at, _)| stored_at.elapsed() < self.ttl)?;
        if fresh {
            entries.get(key).map(|(_, value)| value.clone())
        } else {
            entries.remove(key);
            None
        }
    }

    pub fn insert(&self, key: impl Into<String>, value: V) {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.into(), (Instant::now(), value));
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_within_ttl() {
        let cache = TtlCache::new(Duration::from_secs(60));
        cache.insert("k", "v".to_string());
        assert_eq!(cache.get("k").as_deref(), Some("v"));
        assert_eq!(cache.get("missing"), None);
    }

    #[test]
    fn test_expired_entry_is_evicted_on_read() {
        let cache = TtlCache::new(Duration::ZERO);
        cache.insert("k", 1u32);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("k"), None);
        assert!(cache.is_empty());
    }
}

//! Bounded keyword cache in front of the scraper.

use crate::dokotoku::SearchResponse;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tracing::debug;

/// A cached response for one normalized keyword.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub keyword: String,
    pub response: SearchResponse,
    /// Milliseconds since the epoch
    pub stored_at: i64,
    pub ttl_secs: u64,
}

impl CacheEntry {
    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        now_ms.saturating_sub(self.stored_at) >= (self.ttl_secs as i64).saturating_mul(1000)
    }
}

/// Normalizes a keyword into its cache key (case and whitespace folded).
pub fn cache_key(keyword: &str) -> String {
    keyword.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

/// Last-write-wins response cache with a TTL and an entry bound.
pub struct SearchCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    ttl: Duration,
    max_entries: usize,
}

impl SearchCache {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self { entries: Mutex::new(HashMap::new()), ttl, max_entries: max_entries.max(1) }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Returns a fresh cached response for the keyword.
    pub fn lookup(&self, keyword: &str) -> Option<SearchResponse> {
        self.lookup_at(keyword, Utc::now().timestamp_millis())
    }

    pub fn lookup_at(&self, keyword: &str, now_ms: i64) -> Option<SearchResponse> {
        let key = cache_key(keyword);
        let entries = self.lock();
        let entry = entries.get(&key)?;
        if entry.is_expired_at(now_ms) {
            debug!("Cache entry for '{}' expired", key);
            return None;
        }
        debug!("Cache hit for '{}'", key);
        Some(entry.response.clone())
    }

    /// Stores a response, purging expired entries and evicting the oldest past the bound.
    pub fn store(&self, keyword: &str, response: SearchResponse) {
        self.store_at(keyword, response, Utc::now().timestamp_millis());
    }

    pub fn store_at(&self, keyword: &str, response: SearchResponse, now_ms: i64) {
        let key = cache_key(keyword);
        let mut entries = self.lock();

        entries.retain(|_, entry| !entry.is_expired_at(now_ms));
        entries.insert(
            key.clone(),
            CacheEntry { keyword: key, response, stored_at: now_ms, ttl_secs: self.ttl.as_secs() },
        );

        while entries.len() > self.max_entries {
            let Some(oldest) = entries
                .iter()
                .min_by_key(|(_, entry)| entry.stored_at)
                .map(|(key, _)| key.clone())
            else {
                break;
            };
            debug!("Evicting cache entry '{}'", oldest);
            entries.remove(&oldest);
        }
    }

    /// Entries sorted newest first, for persistence.
    pub fn snapshot(&self) -> Vec<CacheEntry> {
        let mut entries: Vec<CacheEntry> = self.lock().values().cloned().collect();
        entries.sort_by(|a, b| b.stored_at.cmp(&a.stored_at));
        entries
    }

    /// Loads persisted entries, dropping expired ones.
    pub fn restore(&self, saved: Vec<CacheEntry>) {
        let now_ms = Utc::now().timestamp_millis();
        let mut entries = self.lock();
        for entry in saved.into_iter().filter(|e| !e.is_expired_at(now_ms)) {
            entries.insert(cache_key(&entry.keyword), entry);
        }
        while entries.len() > self.max_entries {
            let Some(oldest) = entries.iter().min_by_key(|(_, e)| e.stored_at).map(|(k, _)| k.clone())
            else {
                break;
            };
            entries.remove(&oldest);
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINUTE: i64 = 60_000;

    fn cache() -> SearchCache {
        SearchCache::new(Duration::from_secs(30 * 60), 10)
    }

    #[test]
    fn test_cache_key_normalization() {
        assert_eq!(cache_key("  Rakuten   CARD "), "rakuten card");
        assert_eq!(cache_key("楽天"), "楽天");
    }

    #[test]
    fn test_hit_within_ttl() {
        let cache = cache();
        cache.store_at("Card", SearchResponse::success("Card", vec![]), 0);

        assert!(cache.lookup_at("card", 29 * MINUTE).is_some());
        assert!(cache.lookup_at("  CARD ", 29 * MINUTE).is_some());
        assert!(cache.lookup_at("card", 30 * MINUTE).is_none());
        assert!(cache.lookup_at("other", 0).is_none());
    }

    #[test]
    fn test_failures_are_cached_too() {
        let cache = cache();
        cache.store_at("card", SearchResponse::failure("card", "browser launch failed"), 0);
        let hit = cache.lookup_at("card", MINUTE).unwrap();
        assert!(!hit.success);
    }

    #[test]
    fn test_bound_evicts_oldest() {
        let cache = SearchCache::new(Duration::from_secs(3600), 3);
        for (i, kw) in ["a", "b", "c", "d"].iter().enumerate() {
            cache.store_at(kw, SearchResponse::success(*kw, vec![]), i as i64 * MINUTE);
        }

        assert_eq!(cache.len(), 3);
        assert!(cache.lookup_at("a", 5 * MINUTE).is_none());
        assert!(cache.lookup_at("d", 5 * MINUTE).is_some());
    }

    #[test]
    fn test_store_purges_expired() {
        let cache = cache();
        cache.store_at("old", SearchResponse::success("old", vec![]), 0);
        cache.store_at("new", SearchResponse::success("new", vec![]), 31 * MINUTE);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_snapshot_and_restore() {
        let cache = cache();
        cache.store("a", SearchResponse::success("a", vec![]));
        cache.store("b", SearchResponse::success("b", vec![]));

        let json = serde_json::to_string(&cache.snapshot()).unwrap();
        assert!(json.contains("storedAt"));

        let restored = SearchCache::new(Duration::from_secs(1800), 10);
        restored.restore(serde_json::from_str(&json).unwrap());
        assert_eq!(restored.len(), 2);
        assert!(restored.lookup("A").is_some());
    }

    #[test]
    fn test_restore_drops_expired() {
        let stale = CacheEntry {
            keyword: "stale".to_string(),
            response: SearchResponse::success("stale", vec![]),
            stored_at: 0,
            ttl_secs: 60,
        };
        let cache = cache();
        cache.restore(vec![stale]);
        assert!(cache.is_empty());
    }
}

//! Last-known-good response cache.
//!
//! Consulted only after every provider candidate is exhausted. Entries are
//! keyed by a fingerprint of the normalized prompt and framework, expire
//! after a TTL, and are evicted least-recently-used beyond `max_entries`.

use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use lru::LruCache;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use tracing::debug;

use vigil_core::config::CacheConfig;
use vigil_core::types::GenerationResponse;
use vigil_core::utils::normalize_whitespace;

const FIELD_SEPARATOR: &str = "\u{1f}";

/// Cache key for `(prompt, framework)`.
///
/// Whitespace and case differences in the prompt do not change the key.
pub fn fingerprint(prompt: &str, framework: Option<&str>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalize_whitespace(prompt).as_bytes());
    hasher.update(FIELD_SEPARATOR.as_bytes());
    hasher.update(framework.unwrap_or("").trim().to_lowercase().as_bytes());
    format!("{:x}", hasher.finalize())
}

#[derive(Debug, Clone)]
struct CacheEntry {
    response: GenerationResponse,
    stored_at: Instant,
}

/// Bounded TTL cache of served responses.
///
/// Lookups reorder the LRU list, so reads take the same lock as writes.
pub struct ResponseCache {
    entries: Mutex<LruCache<String, CacheEntry>>,
    ttl: Duration,
}

impl ResponseCache {
    /// A `max_entries` of 0 is treated as 1.
    pub fn new(max_entries: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl,
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.max_entries, config.ttl())
    }

    /// Fresh entry for `key`, if any. Expired entries are dropped.
    pub fn lookup(&self, key: &str) -> Option<GenerationResponse> {
        self.lookup_at(key, Instant::now())
    }

    pub(crate) fn lookup_at(&self, key: &str, now: Instant) -> Option<GenerationResponse> {
        let mut entries = self.entries.lock();
        let fresh = match entries.get(key) {
            Some(entry) => now.saturating_duration_since(entry.stored_at) < self.ttl,
            None => {
                debug!(key = %short(key), "cache miss");
                return None;
            }
        };

        if fresh {
            debug!(key = %short(key), "cache hit");
            entries.get(key).map(|e| e.response.clone())
        } else {
            entries.pop(key);
            debug!(key = %short(key), "cache entry expired");
            None
        }
    }

    /// Store a live response. Responses that were themselves served from
    /// the cache are ignored so the timestamp always reflects a real call.
    pub fn store(&self, key: impl Into<String>, response: &GenerationResponse) {
        self.store_at(key, response, Instant::now());
    }

    pub(crate) fn store_at(&self, key: impl Into<String>, response: &GenerationResponse, now: Instant) {
        if response.from_cache {
            return;
        }
        let key = key.into();
        debug!(key = %short(&key), provider = %response.provider_id, "cache store");
        self.entries.lock().put(
            key,
            CacheEntry {
                response: response.clone(),
                stored_at: now,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

fn short(key: &str) -> &str {
    key.get(..12).unwrap_or(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(provider: &str, content: &str) -> GenerationResponse {
        GenerationResponse {
            content: content.to_string(),
            confidence: 90,
            sources: vec![],
            provider_id: provider.to_string(),
            model_name: "m".to_string(),
            from_cache: false,
            guardrail_findings: vec![],
        }
    }

    #[test]
    fn test_fingerprint_normalizes_prompt() {
        let a = fingerprint("Draft an  access\ncontrol policy", Some("ISO27001"));
        let b = fingerprint("  draft an access control POLICY ", Some("iso27001"));
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_fingerprint_distinguishes_framework() {
        let a = fingerprint("draft a policy", Some("iso27001"));
        let b = fingerprint("draft a policy", Some("soc2"));
        let c = fingerprint("draft a policy", None);
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_hit_within_ttl() {
        let cache = ResponseCache::new(8, Duration::from_secs(60));
        let now = Instant::now();
        cache.store_at("k", &response("A", "hello"), now);

        let hit = cache.lookup_at("k", now + Duration::from_secs(59)).unwrap();
        assert_eq!(hit.content, "hello");
    }

    #[test]
    fn test_expired_entry_is_a_miss() {
        let cache = ResponseCache::new(8, Duration::from_secs(60));
        let now = Instant::now();
        cache.store_at("k", &response("A", "hello"), now);

        // exactly at the TTL boundary counts as expired
        assert!(cache.lookup_at("k", now + Duration::from_secs(60)).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_lru_eviction() {
        let cache = ResponseCache::new(2, Duration::from_secs(60));
        let now = Instant::now();
        cache.store_at("a", &response("A", "1"), now);
        cache.store_at("b", &response("A", "2"), now);
        // touch "a" so "b" is least recently used
        assert!(cache.lookup_at("a", now).is_some());
        cache.store_at("c", &response("A", "3"), now);

        assert_eq!(cache.len(), 2);
        assert!(cache.lookup_at("b", now).is_none());
        assert!(cache.lookup_at("a", now).is_some());
        assert!(cache.lookup_at("c", now).is_some());
    }

    #[test]
    fn test_cached_responses_are_not_restored() {
        let cache = ResponseCache::new(8, Duration::from_secs(60));
        let mut r = response("A", "hello");
        r.from_cache = true;
        cache.store("k", &r);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_newer_store_replaces_entry() {
        let cache = ResponseCache::new(8, Duration::from_secs(60));
        let now = Instant::now();
        cache.store_at("k", &response("A", "old"), now);
        cache.store_at("k", &response("B", "new"), now + Duration::from_secs(1));

        let hit = cache.lookup_at("k", now + Duration::from_secs(2)).unwrap();
        assert_eq!(hit.provider_id, "B");
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let cache = ResponseCache::new(0, Duration::from_secs(60));
        cache.store("k", &response("A", "x"));
        assert_eq!(cache.len(), 1);
    }
}

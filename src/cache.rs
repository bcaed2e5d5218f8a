//! Suggestion cache: keyed by `(owner_id, normalized query)`, TTL-bounded.
//!
//! Backed by `moka`'s sync cache, which gives us per-entry TTL and bounded
//! capacity without a background eviction thread of our own.

use std::sync::Arc;
use std::time::Duration;

use moka::sync::Cache;

use crate::domain::SuggestionResult;

const DEFAULT_MAX_ENTRIES: u64 = 10_000;
const DEFAULT_SUGGESTION_TTL: Duration = Duration::from_secs(300);

/// Deterministically normalizes a query for cache-key purposes: lowercase,
/// trim, and collapse internal whitespace runs to a single space.
pub fn normalize_query(query: &str) -> String {
    query
        .trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn cache_key(owner_id: &str, query: &str) -> String {
    format!("{}\u{1f}{}", owner_id, normalize_query(query))
}

pub struct SuggestionCache {
    inner: Cache<String, Arc<SuggestionResult>>,
}

impl SuggestionCache {
    pub fn new(max_entries: u64, ttl: Duration) -> Self {
        let inner = Cache::builder()
            .max_capacity(max_entries)
            .time_to_live(ttl)
            .build();
        Self { inner }
    }

    pub fn get(&self, owner_id: &str, query: &str) -> Option<Arc<SuggestionResult>> {
        self.inner.get(&cache_key(owner_id, query))
    }

    pub fn put(&self, owner_id: &str, query: &str, result: Arc<SuggestionResult>) {
        self.inner.insert(cache_key(owner_id, query), result);
    }

    /// Invalidates every cached entry for `owner_id`. Called whenever any of
    /// that owner's catalog items changes, since any cached suggestion may
    /// now reference stale data.
    pub fn invalidate_owner(&self, owner_id: &str) {
        let prefix = format!("{}\u{1f}", owner_id);
        self.inner.invalidate_entries_if(move |k, _v| k.starts_with(&prefix)).ok();
    }
}

impl Default for SuggestionCache {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES, DEFAULT_SUGGESTION_TTL)
    }
}

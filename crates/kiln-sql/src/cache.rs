//! Parse result caches
//!
//! Entries are keyed by everything that feeds a parse: the file path, the
//! SQL text, the companion metadata text, and any explicit dialect. A change
//! to any of them misses the cache; a hit hands back the same `Arc`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Inputs that determine a parse result
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    path: PathBuf,
    content: String,
    companion: Option<String>,
    variant: Option<String>,
}

impl CacheKey {
    /// Key for `content` read from `path` with optional companion text
    pub fn new(path: &Path, content: &str, companion: Option<&str>) -> Self {
        Self {
            path: path.to_path_buf(),
            content: content.to_string(),
            companion: companion.map(str::to_string),
            variant: None,
        }
    }

    /// Distinguish parses of the same text under different settings
    /// (explicit dialect, target table name)
    pub fn with_variant(mut self, variant: Option<&str>) -> Self {
        self.variant = variant.map(str::to_string);
        self
    }
}

/// Per-parser cache of shared parse results, without eviction
#[derive(Debug)]
pub struct ParseCache<T> {
    entries: HashMap<CacheKey, Arc<T>>,
}

impl<T> Default for ParseCache<T> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<T> ParseCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &CacheKey) -> Option<Arc<T>> {
        self.entries.get(key).cloned()
    }

    /// Store a result and return the shared handle
    pub fn insert(&mut self, key: CacheKey, value: T) -> Arc<T> {
        let value = Arc::new(value);
        self.entries.insert(key, Arc::clone(&value));
        value
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_returns_same_arc() {
        let mut cache = ParseCache::new();
        let key = CacheKey::new(Path::new("a.sql"), "SELECT 1", None);
        let stored = cache.insert(key.clone(), 42);
        let hit = cache.get(&key).unwrap();
        assert!(Arc::ptr_eq(&stored, &hit));
    }

    #[test]
    fn test_companion_change_misses() {
        let mut cache = ParseCache::new();
        cache.insert(CacheKey::new(Path::new("a.sql"), "SELECT 1", Some("x: 1")), 1);
        let changed = CacheKey::new(Path::new("a.sql"), "SELECT 1", Some("x: 2"));
        assert!(cache.get(&changed).is_none());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_variant_distinguishes_entries() {
        let mut cache = ParseCache::new();
        let base = CacheKey::new(Path::new("a.sql"), "SELECT 1", None);
        cache.insert(base.clone().with_variant(Some("duckdb")), 1);
        assert!(cache.get(&base).is_none());
        assert!(cache.get(&base.with_variant(Some("duckdb"))).is_some());
    }
}

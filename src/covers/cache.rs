//! Process-local cover lookup cache.
//!
//! Maps a cache key to a resolved outcome: `Some(url)` for a found cover,
//! `None` for a confirmed miss (negative cache). A key goes through the
//! provider chain at most once per process: concurrent workers resolving
//! the same key serialize on a per-key slot, so the second worker observes
//! the first worker's outcome instead of repeating remote calls.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::covers::normalize::normalize_text;

/// Identity of a lookup, derived from the record being resolved.
///
/// Records with at least one ISBN candidate key on the first (highest
/// priority) candidate; everything else keys on normalized title+author.
/// Two records with the same key share a resolution outcome.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Isbn(String),
    TitleAuthor { title: String, author: String },
}

impl CacheKey {
    pub fn for_lookup(isbns: &[String], title: &str, author: &str) -> Self {
        match isbns.first() {
            Some(isbn) => CacheKey::Isbn(isbn.clone()),
            None => CacheKey::TitleAuthor {
                title: normalize_text(title),
                author: normalize_text(author),
            },
        }
    }
}

/// Per-key slot. `None` inside the inner Option means the chain confirmed
/// there is no cover; the outer `Option` distinguishes "not resolved yet".
type Slot = Arc<Mutex<Option<Option<String>>>>;

/// Cover cache scoped to one build run. Created empty, grows monotonically,
/// discarded with the builder; never persisted or shared across runs.
#[derive(Default)]
pub struct CoverCache {
    slots: Mutex<HashMap<CacheKey, Slot>>,
}

impl CoverCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached outcome for `key`, or run `resolve` to produce one.
    ///
    /// The outer map lock is held only long enough to fetch or insert the
    /// slot; the provider chain runs under the slot lock, so only workers
    /// contending on the *same* key wait on each other.
    pub fn get_or_resolve<F>(&self, key: &CacheKey, resolve: F) -> Option<String>
    where
        F: FnOnce() -> Option<String>,
    {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
            slots.entry(key.clone()).or_default().clone()
        };

        let mut guard = slot.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(outcome) = guard.as_ref() {
            return outcome.clone();
        }

        let outcome = resolve();
        *guard = Some(outcome.clone());
        outcome
    }

    /// Peek at a cached outcome without resolving.
    pub fn peek(&self, key: &CacheKey) -> Option<Option<String>> {
        let slot = {
            let slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
            slots.get(key).cloned()
        }?;
        let guard = slot.lock().unwrap_or_else(|e| e.into_inner());
        guard.clone()
    }

    /// Number of keys with a settled outcome.
    pub fn len(&self) -> usize {
        let slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots
            .values()
            .filter(|s| s.lock().unwrap_or_else(|e| e.into_inner()).is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_key_prefers_isbn() {
        let key = CacheKey::for_lookup(
            &["9780441013593".to_string()],
            "Dune",
            "Frank Herbert",
        );
        assert_eq!(key, CacheKey::Isbn("9780441013593".to_string()));
    }

    #[test]
    fn test_key_falls_back_to_normalized_title_author() {
        let key = CacheKey::for_lookup(&[], "Dune!", "Frank  Herbert");
        assert_eq!(
            key,
            CacheKey::TitleAuthor {
                title: "dune".to_string(),
                author: "frank herbert".to_string(),
            }
        );
    }

    #[test]
    fn test_resolve_runs_once_per_key() {
        let cache = CoverCache::new();
        let key = CacheKey::Isbn("123".to_string());
        let calls = AtomicUsize::new(0);

        let first = cache.get_or_resolve(&key, || {
            calls.fetch_add(1, Ordering::SeqCst);
            Some("https://example.com/cover.jpg".to_string())
        });
        let second = cache.get_or_resolve(&key, || {
            calls.fetch_add(1, Ordering::SeqCst);
            None
        });

        assert_eq!(first.as_deref(), Some("https://example.com/cover.jpg"));
        assert_eq!(second.as_deref(), Some("https://example.com/cover.jpg"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_negative_outcome_is_cached() {
        let cache = CoverCache::new();
        let key = CacheKey::TitleAuthor {
            title: "obscure".to_string(),
            author: "nobody".to_string(),
        };
        let calls = AtomicUsize::new(0);

        let first = cache.get_or_resolve(&key, || {
            calls.fetch_add(1, Ordering::SeqCst);
            None
        });
        let second = cache.get_or_resolve(&key, || {
            calls.fetch_add(1, Ordering::SeqCst);
            Some("should not run".to_string())
        });

        assert_eq!(first, None);
        assert_eq!(second, None);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.peek(&key), Some(None));
    }

    #[test]
    fn test_concurrent_same_key_resolves_once() {
        let cache = Arc::new(CoverCache::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let key = CacheKey::Isbn("999".to_string());

        std::thread::scope(|s| {
            for _ in 0..8 {
                let cache = cache.clone();
                let calls = calls.clone();
                let key = key.clone();
                s.spawn(move || {
                    cache.get_or_resolve(&key, || {
                        calls.fetch_add(1, Ordering::SeqCst);
                        // widen the race window
                        std::thread::sleep(std::time::Duration::from_millis(5));
                        Some("https://example.com/x.jpg".to_string())
                    });
                });
            }
        });

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
    }
}

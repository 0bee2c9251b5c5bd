//! Cascading cover-image resolution.
//!
//! Given a book record, finds a cover-image URL through a chain of external
//! providers, consulting the fewest sources necessary and never repeating a
//! lookup for an equivalent record:
//!
//! 1. a cover URL already on the record is returned untouched;
//! 2. the cover cache is consulted (positive and negative entries);
//! 3. each normalized ISBN candidate is tried against every provider;
//! 4. title/author fuzzy search runs as a throttled fallback;
//! 5. the outcome, found or confirmed absent, is cached before returning.
//!
//! Provider failures are typed outcomes, not aborts: a resolution that
//! exhausts the chain yields a confirmed-absent cover, never an error.

pub mod cache;
pub mod normalize;
pub mod providers;
pub mod throttle;

use std::time::Duration;

use crate::index::record::{BookRecord, CoverStatus};
use cache::{CacheKey, CoverCache};
use providers::google_books::GoogleBooksProvider;
use providers::open_library::OpenLibraryProvider;
use providers::{CoverProvider, ProviderOutcome};
use throttle::Throttle;

pub struct CoverResolver {
    /// Providers in priority order; the same order applies to the ISBN path
    /// and the title-fallback path.
    providers: Vec<Box<dyn CoverProvider>>,
    cache: CoverCache,
    throttle: Throttle,
}

impl CoverResolver {
    /// Resolver with the default provider chain: Google Books first, then
    /// Open Library.
    pub fn new(timeout: Duration, throttle_interval: Duration) -> Self {
        Self::with_providers(
            vec![
                Box::new(GoogleBooksProvider::new(timeout)),
                Box::new(OpenLibraryProvider::new(timeout)),
            ],
            Throttle::new(throttle_interval),
        )
    }

    /// Resolver over an explicit chain. Used by tests to script providers.
    pub fn with_providers(providers: Vec<Box<dyn CoverProvider>>, throttle: Throttle) -> Self {
        Self {
            providers,
            cache: CoverCache::new(),
            throttle,
        }
    }

    /// Resolve a cover for `record`. Always returns `Url` or `Missing`,
    /// never `Unresolved`.
    pub fn resolve(&self, record: &BookRecord) -> CoverStatus {
        // Passthrough: a record that already carries a cover URL costs
        // nothing, not even a cache entry.
        if let CoverStatus::Url(url) = &record.cover {
            return CoverStatus::Url(url.clone());
        }

        let key = CacheKey::for_lookup(&record.isbns, &record.title, &record.author);
        let outcome = self
            .cache
            .get_or_resolve(&key, || self.resolve_uncached(record));

        match outcome {
            Some(url) => CoverStatus::Url(url),
            None => CoverStatus::Missing,
        }
    }

    /// Number of settled cache entries (for end-of-build reporting).
    pub fn cached_outcomes(&self) -> usize {
        self.cache.len()
    }

    fn resolve_uncached(&self, record: &BookRecord) -> Option<String> {
        // ISBN path first: candidates in source-priority order, providers
        // in chain order, first hit wins.
        for isbn in &record.isbns {
            for provider in &self.providers {
                match provider.lookup_isbn(isbn) {
                    ProviderOutcome::Hit(url) => {
                        log::info!("provider={} kind=isbn outcome=hit isbn={isbn}", provider.name());
                        return Some(url);
                    }
                    ProviderOutcome::Miss => {
                        log::debug!("provider={} kind=isbn outcome=miss isbn={isbn}", provider.name());
                    }
                    ProviderOutcome::Error(reason) => {
                        log::warn!(
                            "provider={} kind=isbn outcome=error isbn={isbn} err={reason}",
                            provider.name()
                        );
                    }
                }
            }
        }

        // Title fallback is the expensive, rate-limited path.
        self.throttle.pause();

        for provider in &self.providers {
            match provider.lookup_title(&record.title, &record.author) {
                ProviderOutcome::Hit(url) => {
                    log::info!(
                        "provider={} kind=title outcome=hit title={:?}",
                        provider.name(),
                        record.title
                    );
                    return Some(url);
                }
                ProviderOutcome::Miss => {
                    log::debug!(
                        "provider={} kind=title outcome=miss title={:?}",
                        provider.name(),
                        record.title
                    );
                }
                ProviderOutcome::Error(reason) => {
                    log::warn!(
                        "provider={} kind=title outcome=error title={:?} err={reason}",
                        provider.name(),
                        record.title
                    );
                }
            }
        }

        log::debug!("cover not found title={:?} author={:?}", record.title, record.author);
        None
    }
}

pub mod google_books;
pub mod open_library;

/// Typed result of a single provider call.
///
/// A provider never aborts the resolution chain: timeouts, network errors
/// and malformed payloads surface as `Error`, which the resolver logs and
/// treats the same as `Miss`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderOutcome {
    Hit(String),
    Miss,
    Error(String),
}

/// A cover lookup strategy. Implementations are consulted in priority order
/// by the resolver; a strategy that does not support a lookup kind simply
/// returns `Miss`.
pub trait CoverProvider: Send + Sync {
    /// Name for logging/debugging.
    fn name(&self) -> &'static str;

    /// Resolve a normalized ISBN to a cover image URL.
    fn lookup_isbn(&self, _isbn: &str) -> ProviderOutcome {
        ProviderOutcome::Miss
    }

    /// Resolve a title (and optional author) to a cover image URL.
    fn lookup_title(&self, _title: &str, _author: &str) -> ProviderOutcome {
        ProviderOutcome::Miss
    }
}

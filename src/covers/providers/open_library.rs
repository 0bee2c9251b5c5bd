//! Open Library: deterministic ISBN cover template plus search.json
//! title/author fallback.
//!
//! The template URL is best-effort by design -- Open Library serves a
//! placeholder for unknown ISBNs -- so `lookup_isbn` returns a Hit without
//! checking existence, exactly as the catalog-search contract describes.

use std::time::Duration;

use serde_json::Value;

use crate::covers::normalize::{normalize_text, titles_match};
use crate::covers::providers::{CoverProvider, ProviderOutcome};
use crate::http;

const SEARCH_URL: &str = "https://openlibrary.org/search.json";

/// Deterministic cover URL for a normalized ISBN, large size.
pub fn isbn_cover_url(isbn: &str) -> String {
    format!("https://covers.openlibrary.org/b/isbn/{isbn}-L.jpg")
}

/// Cover URL for an internal Open Library cover id, large size.
fn cover_id_url(cover_i: i64) -> String {
    format!("https://covers.openlibrary.org/b/id/{cover_i}-L.jpg")
}

pub struct OpenLibraryProvider {
    timeout: Duration,
}

impl OpenLibraryProvider {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl CoverProvider for OpenLibraryProvider {
    fn name(&self) -> &'static str {
        "OpenLibrary"
    }

    fn lookup_isbn(&self, isbn: &str) -> ProviderOutcome {
        if isbn.is_empty() {
            return ProviderOutcome::Miss;
        }
        ProviderOutcome::Hit(isbn_cover_url(isbn))
    }

    fn lookup_title(&self, title: &str, author: &str) -> ProviderOutcome {
        if title.trim().is_empty() {
            return ProviderOutcome::Miss;
        }

        let mut query: Vec<(&str, &str)> = vec![("title", title)];
        if !author.trim().is_empty() {
            query.push(("author", author));
        }

        match http::get_json(SEARCH_URL, &query, self.timeout) {
            Ok(payload) => pick_search_cover(&payload, title),
            Err(e) => ProviderOutcome::Error(e.to_string()),
        }
    }
}

/// Pick a cover from a search.json response: prefer docs whose normalized
/// title matches the query (equal or substring either way) and that carry a
/// `cover_i`; otherwise the first doc with any `cover_i`.
fn pick_search_cover(payload: &Value, title: &str) -> ProviderOutcome {
    let docs = match payload.get("docs").and_then(|v| v.as_array()) {
        Some(docs) if !docs.is_empty() => docs,
        _ => return ProviderOutcome::Miss,
    };

    let title_norm = normalize_text(title);

    for doc in docs {
        let cover_i = doc.get("cover_i").and_then(|v| v.as_i64());
        let doc_title = normalize_text(doc.get("title").and_then(|v| v.as_str()).unwrap_or(""));
        if let Some(cover_i) = cover_i {
            if titles_match(&title_norm, &doc_title) {
                return ProviderOutcome::Hit(cover_id_url(cover_i));
            }
        }
    }

    for doc in docs {
        if let Some(cover_i) = doc.get("cover_i").and_then(|v| v.as_i64()) {
            return ProviderOutcome::Hit(cover_id_url(cover_i));
        }
    }

    ProviderOutcome::Miss
}

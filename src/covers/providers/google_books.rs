//! Google Books volumes API: structured bibliographic search by ISBN or
//! free text. Candidates carry multiple image-size variants; the largest
//! available one wins.

use std::time::Duration;

use serde_json::Value;

use crate::covers::normalize::{authors_overlap, normalize_text, titles_match};
use crate::covers::providers::{open_library, CoverProvider, ProviderOutcome};
use crate::http;

const VOLUMES_URL: &str = "https://www.googleapis.com/books/v1/volumes";

/// Image variants in descending resolution order.
const IMAGE_VARIANTS: [&str; 5] = [
    "extraLarge",
    "large",
    "medium",
    "thumbnail",
    "smallThumbnail",
];

pub struct GoogleBooksProvider {
    timeout: Duration,
}

impl GoogleBooksProvider {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    fn query(&self, q: &str, max_results: &str) -> Result<Value, http::HttpError> {
        http::get_json(
            VOLUMES_URL,
            &[("q", q), ("maxResults", max_results)],
            self.timeout,
        )
    }
}

impl CoverProvider for GoogleBooksProvider {
    fn name(&self) -> &'static str {
        "GoogleBooks"
    }

    fn lookup_isbn(&self, isbn: &str) -> ProviderOutcome {
        let q = format!("isbn:{isbn}");
        match self.query(&q, "1") {
            Ok(payload) => pick_isbn_cover(&payload),
            Err(e) => ProviderOutcome::Error(e.to_string()),
        }
    }

    fn lookup_title(&self, title: &str, author: &str) -> ProviderOutcome {
        if title.trim().is_empty() {
            return ProviderOutcome::Miss;
        }

        let mut q = format!("intitle:{title}");
        if !author.trim().is_empty() {
            q.push_str(&format!("+inauthor:{author}"));
        }

        match self.query(&q, "5") {
            Ok(payload) => pick_title_cover(&payload, title, author),
            Err(e) => ProviderOutcome::Error(e.to_string()),
        }
    }
}

/// First item's largest image variant, if any.
fn pick_isbn_cover(payload: &Value) -> ProviderOutcome {
    let items = match payload.get("items").and_then(|v| v.as_array()) {
        Some(items) if !items.is_empty() => items,
        _ => return ProviderOutcome::Miss,
    };

    match items.first().and_then(largest_image_url) {
        Some(url) => ProviderOutcome::Hit(url),
        None => ProviderOutcome::Miss,
    }
}

/// Pick a cover from a free-text search response.
///
/// Candidates are verified by normalized-title match and, when an author
/// was supplied, at least one overlapping author token. Preference order:
/// 1. largest image variant of a verified candidate;
/// 2. an ISBN extracted from a verified candidate, resolved through the
///    deterministic Open Library template;
/// 3. last resort, the first image from any candidate.
fn pick_title_cover(payload: &Value, title: &str, author: &str) -> ProviderOutcome {
    let items = match payload.get("items").and_then(|v| v.as_array()) {
        Some(items) if !items.is_empty() => items,
        _ => return ProviderOutcome::Miss,
    };

    let title_norm = normalize_text(title);
    let author_norm = normalize_text(author);

    for item in items {
        let vol = match item.get("volumeInfo") {
            Some(v) => v,
            None => continue,
        };

        let vol_title = normalize_text(vol.get("title").and_then(|v| v.as_str()).unwrap_or(""));
        let vol_authors = vol
            .get("authors")
            .and_then(|v| v.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|a| a.as_str())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .unwrap_or_default();
        let vol_authors_norm = normalize_text(&vol_authors);

        if !titles_match(&title_norm, &vol_title) || !authors_overlap(&author_norm, &vol_authors_norm) {
            continue;
        }

        if let Some(url) = largest_image_url(item) {
            return ProviderOutcome::Hit(url);
        }

        // Verified candidate without images: fall back to its ISBN through
        // the deterministic template.
        if let Some(isbn) = extract_isbn(vol) {
            return ProviderOutcome::Hit(open_library::isbn_cover_url(&isbn));
        }
    }

    // Last resort: first available image on any candidate.
    for item in items {
        if let Some(url) = largest_image_url(item) {
            return ProviderOutcome::Hit(url);
        }
    }

    ProviderOutcome::Miss
}

/// Largest `imageLinks` variant of a volume item, upgraded to https.
fn largest_image_url(item: &Value) -> Option<String> {
    let links = item.get("volumeInfo")?.get("imageLinks")?;
    for variant in IMAGE_VARIANTS {
        if let Some(url) = links.get(variant).and_then(|v| v.as_str()) {
            return Some(url.replacen("http://", "https://", 1));
        }
    }
    None
}

/// First ISBN-typed industry identifier on a volume.
fn extract_isbn(vol: &Value) -> Option<String> {
    let ids = vol.get("industryIdentifiers")?.as_array()?;
    for id in ids {
        let id_type = id.get("type").and_then(|v| v.as_str()).unwrap_or("");
        if id_type.starts_with("ISBN") {
            if let Some(isbn) = id.get("identifier").and_then(|v| v.as_str()) {
                return Some(isbn.to_string());
            }
        }
    }
    None
}

//! Book records and the raw-catalog coalescing rules that produce them.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::covers::normalize::normalize_isbn;

/// Placeholder for catalog rows missing a title. Rows are coerced, never
/// dropped: dropping would desynchronize positions with the embedding
/// matrix.
pub const UNTITLED: &str = "Untitled";
/// Placeholder for catalog rows missing an author.
pub const UNKNOWN_AUTHOR: &str = "Unknown";

/// Maximum stored description length in characters.
pub const MAX_DESCRIPTION_CHARS: usize = 2000;

/// Cover-url passthrough keys on raw records, first non-empty string wins.
const COVER_KEYS: [&str; 6] = ["cover_url", "cover", "imageUrl", "image", "thumbnail", "coverUrl"];

/// Scalar/list ISBN keys on raw records, in source-priority order.
const ISBN_KEYS: [&str; 3] = ["isbn", "isbn13", "isbn10"];

/// Identifier-list keys whose ISBN-typed entries also contribute candidates.
const IDENTIFIER_KEYS: [&str; 2] = ["industryIdentifiers", "identifiers"];

/// Resolution state of a record's cover image.
///
/// `Unresolved` means no lookup was ever attempted; `Missing` means the
/// provider chain ran and confirmed there is no cover. The distinction is
/// persisted so a reloaded index never repeats settled lookups.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", content = "url", rename_all = "snake_case")]
pub enum CoverStatus {
    #[default]
    Unresolved,
    Missing,
    Url(String),
}

impl CoverStatus {
    pub fn url(&self) -> Option<&str> {
        match self {
            CoverStatus::Url(url) => Some(url),
            _ => None,
        }
    }
}

/// One catalog entry. Immutable once the index is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookRecord {
    pub title: String,
    pub author: String,
    pub description: String,
    /// Normalized ISBN candidates, deduplicated, source-priority order.
    #[serde(default)]
    pub isbns: Vec<String>,
    #[serde(default)]
    pub cover: CoverStatus,
}

impl BookRecord {
    /// Build a record from a loose JSON catalog row.
    ///
    /// Field resolution follows a fixed precedence list; an earlier hit is
    /// never overwritten by a later key. Missing title/author are coerced
    /// to documented placeholders.
    pub fn from_raw(raw: &Value) -> Self {
        let title = string_field(raw, "title").unwrap_or_else(|| UNTITLED.to_string());
        let author = string_field(raw, "author").unwrap_or_else(|| UNKNOWN_AUTHOR.to_string());
        let description = string_field(raw, "description")
            .map(|d| truncate_chars(&d, MAX_DESCRIPTION_CHARS))
            .unwrap_or_default();

        let cover = COVER_KEYS
            .iter()
            .find_map(|key| string_field(raw, key))
            .map(CoverStatus::Url)
            .unwrap_or_default();

        Self {
            title,
            author,
            description,
            isbns: collect_isbns(raw),
            cover,
        }
    }

    /// Description prefix for result listings.
    pub fn snippet(&self, max_chars: usize) -> String {
        if self.description.chars().count() <= max_chars {
            return self.description.clone();
        }
        let cut: String = self.description.chars().take(max_chars).collect();
        format!("{cut}...")
    }
}

fn string_field(raw: &Value, key: &str) -> Option<String> {
    let s = raw.get(key)?.as_str()?.trim();
    if s.is_empty() {
        return None;
    }
    Some(s.to_string())
}

fn truncate_chars(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    s.chars().take(max_chars).collect()
}

/// Gather ISBN candidates from scalar/list fields and identifier objects,
/// normalized and deduplicated preserving first-seen order.
fn collect_isbns(raw: &Value) -> Vec<String> {
    let mut candidates: Vec<String> = Vec::new();

    let mut push = |value: &str| {
        if let Some(isbn) = normalize_isbn(value) {
            if !candidates.contains(&isbn) {
                candidates.push(isbn);
            }
        }
    };

    for key in ISBN_KEYS {
        match raw.get(key) {
            Some(Value::String(s)) => push(s),
            Some(Value::Number(n)) => push(&n.to_string()),
            Some(Value::Array(arr)) => {
                for item in arr {
                    match item {
                        Value::String(s) => push(s),
                        Value::Number(n) => push(&n.to_string()),
                        _ => {}
                    }
                }
            }
            _ => {}
        }
    }

    for key in IDENTIFIER_KEYS {
        if let Some(ids) = raw.get(key).and_then(|v| v.as_array()) {
            for id in ids {
                let id_type = id.get("type").and_then(|v| v.as_str()).unwrap_or("");
                if id_type.to_uppercase().starts_with("ISBN") {
                    if let Some(ident) = id.get("identifier").and_then(|v| v.as_str()) {
                        push(ident);
                    }
                }
            }
        }
    }

    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_raw_basic_fields() {
        let raw = json!({
            "title": "Dune",
            "author": "Frank Herbert",
            "description": "Spice and sand",
        });
        let rec = BookRecord::from_raw(&raw);
        assert_eq!(rec.title, "Dune");
        assert_eq!(rec.author, "Frank Herbert");
        assert_eq!(rec.description, "Spice and sand");
        assert!(rec.isbns.is_empty());
        assert_eq!(rec.cover, CoverStatus::Unresolved);
    }

    #[test]
    fn test_from_raw_coerces_missing_title_author() {
        let rec = BookRecord::from_raw(&json!({"description": "anonymous"}));
        assert_eq!(rec.title, UNTITLED);
        assert_eq!(rec.author, UNKNOWN_AUTHOR);
    }

    #[test]
    fn test_from_raw_blank_title_is_coerced() {
        let rec = BookRecord::from_raw(&json!({"title": "   "}));
        assert_eq!(rec.title, UNTITLED);
    }

    #[test]
    fn test_cover_passthrough_precedence() {
        let raw = json!({
            "title": "X",
            "thumbnail": "https://later/thumb.jpg",
            "cover_url": "https://first/cover.jpg",
        });
        let rec = BookRecord::from_raw(&raw);
        assert_eq!(rec.cover, CoverStatus::Url("https://first/cover.jpg".to_string()));
    }

    #[test]
    fn test_cover_passthrough_skips_empty_strings() {
        let raw = json!({
            "title": "X",
            "cover_url": "  ",
            "imageUrl": "https://real/image.jpg",
        });
        let rec = BookRecord::from_raw(&raw);
        assert_eq!(rec.cover, CoverStatus::Url("https://real/image.jpg".to_string()));
    }

    #[test]
    fn test_isbn_collection_order_and_dedup() {
        let raw = json!({
            "title": "X",
            "isbn": "978-0-441-01359-3",
            "isbn13": ["9780441013593", "9780553293357"],
            "industryIdentifiers": [
                {"type": "ISBN_10", "identifier": "0441013597"},
                {"type": "OTHER", "identifier": "ignored"},
            ],
        });
        let rec = BookRecord::from_raw(&raw);
        assert_eq!(
            rec.isbns,
            vec![
                "9780441013593".to_string(),
                "9780553293357".to_string(),
                "0441013597".to_string(),
            ]
        );
    }

    #[test]
    fn test_isbn_numeric_field() {
        let rec = BookRecord::from_raw(&json!({"title": "X", "isbn": 9780441013593_i64}));
        assert_eq!(rec.isbns, vec!["9780441013593".to_string()]);
    }

    #[test]
    fn test_isbn_numeric_array_entries() {
        let rec = BookRecord::from_raw(&json!({
            "title": "X",
            "isbn13": [9780441013593_i64, "9780553293357"],
        }));
        assert_eq!(
            rec.isbns,
            vec!["9780441013593".to_string(), "9780553293357".to_string()]
        );
    }

    #[test]
    fn test_description_truncated_for_storage() {
        let long = "x".repeat(MAX_DESCRIPTION_CHARS + 500);
        let rec = BookRecord::from_raw(&json!({"title": "X", "description": long}));
        assert_eq!(rec.description.chars().count(), MAX_DESCRIPTION_CHARS);
    }

    #[test]
    fn test_cover_status_serde_tri_state() {
        let states = [
            CoverStatus::Unresolved,
            CoverStatus::Missing,
            CoverStatus::Url("https://x/c.jpg".to_string()),
        ];
        for state in states {
            let bytes = serde_json::to_string(&state).unwrap();
            let back: CoverStatus = serde_json::from_str(&bytes).unwrap();
            assert_eq!(state, back);
        }
    }

    #[test]
    fn test_snippet_truncation() {
        let rec = BookRecord {
            title: "X".to_string(),
            author: "Y".to_string(),
            description: "abcdefghij".to_string(),
            isbns: vec![],
            cover: CoverStatus::Unresolved,
        };
        assert_eq!(rec.snippet(4), "abcd...");
        assert_eq!(rec.snippet(20), "abcdefghij");
    }
}

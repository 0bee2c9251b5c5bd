use once_cell::sync::Lazy;
use regex::Regex;

static NON_ALNUM: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9\s]+").unwrap());
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Normalize a title or author for cache keys and fuzzy matching:
/// lowercase, strip punctuation, collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    let lowered = s.to_lowercase();
    let stripped = NON_ALNUM.replace_all(&lowered, "");
    WHITESPACE.replace_all(stripped.trim(), " ").to_string()
}

/// Normalize an ISBN candidate: drop hyphens/spaces, keep digits and a
/// trailing check character `X`. Returns `None` if nothing usable remains.
pub fn normalize_isbn(raw: &str) -> Option<String> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == 'x' || *c == 'X')
        .map(|c| c.to_ascii_uppercase())
        .collect();

    if cleaned.is_empty() {
        return None;
    }
    Some(cleaned)
}

/// Fuzzy title match: exact or substring containment in either direction,
/// on already-normalized strings. Empty candidates never match.
pub fn titles_match(query_norm: &str, candidate_norm: &str) -> bool {
    if query_norm.is_empty() || candidate_norm.is_empty() {
        return false;
    }
    query_norm == candidate_norm
        || candidate_norm.contains(query_norm)
        || query_norm.contains(candidate_norm)
}

/// Author verification: at least one token of the normalized query author
/// appears in the candidate's normalized author string. An empty query
/// author vacuously matches.
pub fn authors_overlap(query_author_norm: &str, candidate_authors_norm: &str) -> bool {
    if query_author_norm.is_empty() {
        return true;
    }
    query_author_norm
        .split_whitespace()
        .any(|tok| candidate_authors_norm.contains(tok))
}

//! Query-term handling: tokenization, expansion merging, length caps.
//!
//! Expanded queries must stay short — unbounded term growth turns round 3
//! into a full-corpus scan. Base terms always survive the cap; discovered
//! terms fill the remainder newest-first.

use librarian_core::identifiers;
use rustc_hash::FxHashSet;

/// Split a natural-language query into search terms: extracted identifiers
/// first, then plain words. Stopword-filtered, deduplicated
/// case-insensitively, order-preserving.
pub fn tokenize_query(query: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut seen: FxHashSet<String> = FxHashSet::default();

    for term in identifiers::extract(query) {
        if seen.insert(term.to_lowercase()) {
            out.push(term);
        }
    }
    for word in query.split(|c: char| !c.is_alphanumeric() && c != '_') {
        let word = word.trim();
        if word.len() < 2 || identifiers::is_stopword(word) {
            continue;
        }
        if seen.insert(word.to_lowercase()) {
            out.push(word.to_string());
        }
    }
    out
}

/// Compose the next round's query terms: all base terms, then discovered
/// terms newest-first, truncated to `max_terms`.
pub fn compose_query(base: &[String], discovered: &[String], max_terms: usize) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(max_terms);
    let mut seen: FxHashSet<String> = FxHashSet::default();
    for term in base.iter().chain(discovered.iter().rev()) {
        if out.len() >= max_terms {
            break;
        }
        if seen.insert(term.to_lowercase()) {
            out.push(term.clone());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_keeps_identifiers_and_plain_words() {
        let terms = tokenize_query("How does UserService handle login");
        assert_eq!(terms[0], "UserService");
        assert!(terms.contains(&"login".to_string()));
        assert!(terms.contains(&"handle".to_string()));
        assert!(!terms.iter().any(|t| t.eq_ignore_ascii_case("does")));
    }

    #[test]
    fn tokenize_single_plain_word() {
        assert_eq!(tokenize_query("Agent"), vec!["Agent".to_string()]);
    }

    #[test]
    fn tokenize_empty_query() {
        assert!(tokenize_query("").is_empty());
        assert!(tokenize_query("   the is a   ").is_empty());
    }

    #[test]
    fn compose_caps_and_prefers_base_then_newest() {
        let base = vec!["a1".to_string(), "a2".to_string()];
        let discovered = vec!["d1".to_string(), "d2".to_string(), "d3".to_string()];
        let composed = compose_query(&base, &discovered, 4);
        assert_eq!(composed, vec!["a1", "a2", "d3", "d2"]);
    }

    #[test]
    fn compose_dedups_case_insensitively() {
        let base = vec!["UserService".to_string()];
        let discovered = vec!["userservice".to_string(), "other".to_string()];
        let composed = compose_query(&base, &discovered, 10);
        assert_eq!(composed, vec!["UserService", "other"]);
    }
}

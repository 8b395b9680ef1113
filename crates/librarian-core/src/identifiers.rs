//! Identifier extraction from free text and code snippets.
//!
//! Pure `&str -> Vec<String>` scanning, independently testable without a
//! live fact store. Recognizes CamelCase/PascalCase humps, snake_case,
//! backtick-quoted identifiers, import-source path segments, and type
//! annotations. Approximate by design — callers treat the output as
//! candidate terms, not ground truth.

use regex::Regex;
use rustc_hash::FxHashSet;

/// Words that look like identifiers to the regexes but never are.
const STOPWORDS: &[&str] = &[
    "the", "a", "an", "is", "are", "was", "were", "this", "that", "these", "those", "and", "or",
    "not", "in", "of", "to", "for", "from", "with", "it", "as", "on", "at", "by", "be", "if",
    "else", "do", "does", "did", "can", "will", "would", "should", "which", "what", "how", "when",
    "where", "why", "all", "any", "each", "into", "its", "also", "than", "then", "there", "via",
    "return", "returns", "function", "class", "const", "let", "var", "async", "await", "import",
    "export", "new", "true", "false", "null", "undefined", "extends", "implements", "method",
    "methods", "has", "takes", "parameter", "parameters", "type", "interface", "void", "string",
    "number", "boolean", "object", "default", "public", "private", "static",
];

/// Is `word` too generic to be a useful search term? (case-insensitive)
pub fn is_stopword(word: &str) -> bool {
    STOPWORDS.contains(&word.to_lowercase().as_str())
}

/// Compiled identifier-extraction patterns.
pub struct IdentifierScanner {
    backtick: Regex,
    camel: Regex,
    snake: Regex,
    import_source: Regex,
    type_annotation: Regex,
}

impl IdentifierScanner {
    pub fn new() -> Self {
        Self {
            // `quoted.identifier` — anything identifier-like between backticks.
            backtick: Regex::new(r"`([A-Za-z_][A-Za-z0-9_.:]*)`").unwrap(),
            // At least one interior hump: fetchUser, UserService, HTMLParser.
            camel: Regex::new(r"\b[A-Za-z][a-z0-9]*(?:[A-Z][A-Za-z0-9]*)+\b").unwrap(),
            // At least one underscore: build_index, max_rounds.
            snake: Regex::new(r"\b[a-z][a-z0-9]*(?:_[a-z0-9]+)+\b").unwrap(),
            // import ... from './x' | require('x') | import('x')
            import_source: Regex::new(r#"(?:from\s+|require\s*\(\s*|import\s*\(\s*)['"]([^'"]+)['"]"#)
                .unwrap(),
            // : TypeName — annotation with an uppercase base name.
            type_annotation: Regex::new(r":\s*([A-Z][A-Za-z0-9_]*)").unwrap(),
        }
    }

    /// Extract candidate identifiers from `text`, order-preserving,
    /// deduplicated case-insensitively, stopwords removed.
    pub fn extract(&self, text: &str) -> Vec<String> {
        let mut out = Vec::new();
        let mut seen: FxHashSet<String> = FxHashSet::default();
        let mut push = |term: &str, out: &mut Vec<String>, seen: &mut FxHashSet<String>| {
            let term = term.trim();
            if term.len() < 2 {
                return;
            }
            let lower = term.to_lowercase();
            if STOPWORDS.contains(&lower.as_str()) || !seen.insert(lower) {
                return;
            }
            out.push(term.to_string());
        };

        for cap in self.backtick.captures_iter(text) {
            push(&cap[1], &mut out, &mut seen);
        }
        for m in self.camel.find_iter(text) {
            push(m.as_str(), &mut out, &mut seen);
        }
        for m in self.snake.find_iter(text) {
            push(m.as_str(), &mut out, &mut seen);
        }
        for cap in self.import_source.captures_iter(text) {
            for segment in cap[1].split('/') {
                if segment == "." || segment == ".." || segment.is_empty() {
                    continue;
                }
                // Strip a file extension if present.
                let base = segment.rsplit_once('.').map_or(segment, |(b, _)| b);
                push(base, &mut out, &mut seen);
            }
        }
        for cap in self.type_annotation.captures_iter(text) {
            push(&cap[1], &mut out, &mut seen);
        }

        out
    }

    /// Extract identifiers from `text` that are not already in `known`
    /// (lowercased membership check).
    pub fn extract_new(&self, text: &str, known: &FxHashSet<String>) -> Vec<String> {
        self.extract(text)
            .into_iter()
            .filter(|t| !known.contains(&t.to_lowercase()))
            .collect()
    }
}

impl Default for IdentifierScanner {
    fn default() -> Self {
        Self::new()
    }
}

/// One-shot convenience wrapper around [`IdentifierScanner::extract`].
pub fn extract(text: &str) -> Vec<String> {
    IdentifierScanner::new().extract(text)
}

//! Cross-file reference chasing.
//!
//! Resolves static import/export specifiers in matched files to additional
//! file paths, relative specifiers normalized against the importing file's
//! directory. Only files the store can actually read count as chased.

use librarian_core::store::FactStore;
use regex::Regex;
use rustc_hash::FxHashSet;

/// Extensions (and index-file forms) probed when a specifier has none.
const PROBE_SUFFIXES: &[&str] = &[
    "", ".ts", ".tsx", ".js", ".jsx", ".mjs", ".py", ".rs", "/index.ts", "/index.js",
];

pub struct ImportChaser {
    specifier: Regex,
}

impl ImportChaser {
    pub fn new() -> Self {
        Self {
            // import … from 'x' | export … from 'x' | require('x') | import('x')
            specifier: Regex::new(
                r#"(?:import|export)\s+[^'"]*?from\s+['"]([^'"]+)['"]|require\s*\(\s*['"]([^'"]+)['"]|import\s*\(\s*['"]([^'"]+)['"]"#,
            )
            .unwrap(),
        }
    }

    /// All module specifiers referenced by `content`.
    pub fn specifiers(&self, content: &str) -> Vec<String> {
        self.specifier
            .captures_iter(content)
            .filter_map(|cap| cap.get(1).or_else(|| cap.get(2)).or_else(|| cap.get(3)))
            .map(|m| m.as_str().to_string())
            .collect()
    }

    /// Chase every relative specifier in `content` (a file at `from_file`)
    /// to a readable path. `seen` deduplicates across the whole run.
    pub fn chase(
        &self,
        store: &dyn FactStore,
        from_file: &str,
        content: &str,
        seen: &mut FxHashSet<String>,
    ) -> Vec<String> {
        let mut chased = Vec::new();
        for spec in self.specifiers(content) {
            if !spec.starts_with("./") && !spec.starts_with("../") {
                // Bare specifier — a package, not a corpus file.
                continue;
            }
            let Some(normalized) = resolve_relative(from_file, &spec) else {
                continue;
            };
            for suffix in PROBE_SUFFIXES {
                let candidate = format!("{normalized}{suffix}");
                if seen.contains(&candidate) {
                    break;
                }
                if store.read_file(&candidate).is_some() {
                    seen.insert(candidate.clone());
                    chased.push(candidate);
                    break;
                }
            }
        }
        chased
    }
}

impl Default for ImportChaser {
    fn default() -> Self {
        Self::new()
    }
}

/// Join `spec` onto the directory of `from_file` and normalize `.`/`..`
/// segments. Returns `None` when `..` escapes above the corpus root.
pub fn resolve_relative(from_file: &str, spec: &str) -> Option<String> {
    let dir = match from_file.rsplit_once('/') {
        Some((dir, _)) => dir,
        None => "",
    };
    let mut stack: Vec<&str> = dir.split('/').filter(|s| !s.is_empty()).collect();
    for segment in spec.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                stack.pop()?;
            }
            other => stack.push(other),
        }
    }
    Some(stack.join("/"))
}

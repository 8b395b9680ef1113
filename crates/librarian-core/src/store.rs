//! The Fact Store seam: the opaque capability every component consumes.
//!
//! Two reference implementations ship with the core: an in-memory store for
//! tests and embedding-free use, and a directory-backed store that serves
//! term search and lightweight fact sniffing straight off the file system.
//! Neither does AST extraction — real fact extraction lives upstream.

use std::fs;
use std::path::{Path, PathBuf};

use ignore::WalkBuilder;
use regex::Regex;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::facts::{Fact, FactKind};

/// Source file extensions the directory store indexes.
const SOURCE_EXTENSIONS: &[&str] = &[
    "ts", "tsx", "js", "jsx", "mjs", "py", "rs", "go", "java", "rb", "cs",
];

/// Files larger than this are skipped during search (generated bundles).
const MAX_FILE_BYTES: u64 = 1_048_576;

/// A file read result: line count plus full content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileContent {
    pub line_count: usize,
    pub content: String,
}

impl FileContent {
    pub fn new(content: impl Into<String>) -> Self {
        let content = content.into();
        Self {
            line_count: content.lines().count(),
            content,
        }
    }
}

/// One ranked search match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultItem {
    pub file: String,
    /// Relevance in [0, 1].
    pub score: f64,
    pub snippet: String,
    pub matched_terms: Vec<String>,
}

/// The opaque search/read/facts capability (spec'd external interface).
pub trait FactStore {
    /// Ranked file/snippet matches for a single term.
    fn search(&self, term: &str) -> Vec<ResultItem>;
    /// Read a file; `None` for a file that does not exist (typed absence,
    /// never an error).
    fn read_file(&self, path: &str) -> Option<FileContent>;
    /// Facts extracted for one file.
    fn list_facts(&self, file: &str) -> Vec<Fact>;
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

/// In-memory fact store over explicit facts and file contents.
#[derive(Debug, Default)]
pub struct MemoryFactStore {
    files: FxHashMap<String, String>,
    facts: Vec<Fact>,
}

impl MemoryFactStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: impl Into<String>, content: impl Into<String>) -> Self {
        self.files.insert(path.into(), content.into());
        self
    }

    pub fn with_fact(mut self, fact: Fact) -> Self {
        self.facts.push(fact);
        self
    }
}

impl FactStore for MemoryFactStore {
    fn search(&self, term: &str) -> Vec<ResultItem> {
        let term_lower = term.trim().to_lowercase();
        if term_lower.is_empty() {
            return Vec::new();
        }
        let mut items: Vec<ResultItem> = self
            .files
            .iter()
            .filter_map(|(path, content)| {
                score_content(content, &term_lower).map(|(score, snippet)| ResultItem {
                    file: path.clone(),
                    score,
                    snippet,
                    matched_terms: vec![term.to_string()],
                })
            })
            .collect();
        items.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.file.cmp(&b.file)));
        items
    }

    fn read_file(&self, path: &str) -> Option<FileContent> {
        self.files.get(path).map(|c| FileContent::new(c.clone()))
    }

    fn list_facts(&self, file: &str) -> Vec<Fact> {
        self.facts.iter().filter(|f| f.file == file).cloned().collect()
    }
}

// ---------------------------------------------------------------------------
// Directory-backed store
// ---------------------------------------------------------------------------

/// Directory-backed store: walks a corpus root (gitignore-aware) and serves
/// term search with frequency-scored snippets plus line-regex fact sniffing.
/// A non-existent root yields an empty store, never an error.
pub struct DirFactStore {
    root: PathBuf,
    files: Vec<PathBuf>,
    sniffer: FactSniffer,
}

impl DirFactStore {
    pub fn open(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref().to_path_buf();
        let mut files: Vec<PathBuf> = if root.is_dir() {
            WalkBuilder::new(&root)
                .hidden(true)
                .build()
                .filter_map(Result::ok)
                .filter(|e| e.file_type().is_some_and(|t| t.is_file()))
                .filter(|e| {
                    e.path()
                        .extension()
                        .and_then(|x| x.to_str())
                        .is_some_and(|x| SOURCE_EXTENSIONS.contains(&x))
                })
                .filter(|e| e.metadata().is_ok_and(|m| m.len() <= MAX_FILE_BYTES))
                .map(|e| e.into_path())
                .collect()
        } else {
            debug!(root = %root.display(), "corpus root does not exist — empty store");
            Vec::new()
        };
        // Walk order is not guaranteed; sort for deterministic search output.
        files.sort();
        Self {
            root,
            files,
            sniffer: FactSniffer::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    fn resolve(&self, path: &str) -> PathBuf {
        let p = Path::new(path);
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            self.root.join(p)
        }
    }

    fn relative_name(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/")
    }
}

impl FactStore for DirFactStore {
    fn search(&self, term: &str) -> Vec<ResultItem> {
        let term_lower = term.trim().to_lowercase();
        if term_lower.is_empty() {
            return Vec::new();
        }
        let mut items = Vec::new();
        for path in &self.files {
            let Ok(content) = fs::read_to_string(path) else {
                continue;
            };
            if let Some((score, snippet)) = score_content(&content, &term_lower) {
                items.push(ResultItem {
                    file: self.relative_name(path),
                    score,
                    snippet,
                    matched_terms: vec![term.to_string()],
                });
            }
        }
        items.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.file.cmp(&b.file)));
        items
    }

    fn read_file(&self, path: &str) -> Option<FileContent> {
        fs::read_to_string(self.resolve(path)).ok().map(FileContent::new)
    }

    fn list_facts(&self, file: &str) -> Vec<Fact> {
        match self.read_file(file) {
            Some(content) => self.sniffer.sniff(file, &content.content),
            None => Vec::new(),
        }
    }
}

/// Frequency-scored match of a lowercased term against file content.
/// Returns `(score, snippet)` or `None` when the term does not occur.
/// Score saturates at 1.0 after five occurrences.
fn score_content(content: &str, term_lower: &str) -> Option<(f64, String)> {
    let mut occurrences = 0usize;
    let mut snippet_lines: Vec<&str> = Vec::new();
    for line in content.lines() {
        if line.to_lowercase().contains(term_lower) {
            occurrences += 1;
            if snippet_lines.len() < 3 {
                snippet_lines.push(line.trim());
            }
        }
    }
    if occurrences == 0 {
        return None;
    }
    let score = (occurrences as f64 / 5.0).min(1.0);
    Some((score, snippet_lines.join("\n")))
}

// ---------------------------------------------------------------------------
// Line-regex fact sniffing
// ---------------------------------------------------------------------------

/// Line-oriented signature sniffing: classes, functions, imports, exports.
/// Deliberately shallow — a stand-in evidence provider, not a parser.
struct FactSniffer {
    class: Regex,
    function: Regex,
    method_like: Regex,
    import: Regex,
    export: Regex,
}

impl FactSniffer {
    fn new() -> Self {
        Self {
            class: Regex::new(
                r"class\s+(\w+)(?:\s+extends\s+([\w.]+))?(?:\s+implements\s+([\w,\s]+))?",
            )
            .unwrap(),
            function: Regex::new(
                r"(?:(async)\s+)?(?:function\s+|fn\s+|def\s+)(\w+)\s*\(([^)]*)\)(?:\s*(?:->|:)\s*([\w.<>\[\], ]+))?",
            )
            .unwrap(),
            method_like: Regex::new(r"^\s{2,}(?:(async)\s+)?(\w+)\s*\(([^)]*)\)\s*[{:]").unwrap(),
            import: Regex::new(
                r#"import\s+(?:\{([^}]*)\}|(\w+))\s+from\s+['"]([^'"]+)['"]"#,
            )
            .unwrap(),
            export: Regex::new(r"export\s+(?:default\s+)?(?:const|let|var|function|class|async function)\s+(\w+)")
                .unwrap(),
        }
    }

    fn sniff(&self, file: &str, content: &str) -> Vec<Fact> {
        let mut facts = Vec::new();
        let mut current_class: Option<String> = None;
        for (idx, line) in content.lines().enumerate() {
            let lineno = (idx + 1) as u32;

            if let Some(cap) = self.class.captures(line) {
                let identifier = cap[1].to_string();
                let implements = cap
                    .get(3)
                    .map(|m| {
                        m.as_str()
                            .split(',')
                            .map(|s| s.trim().to_string())
                            .filter(|s| !s.is_empty())
                            .collect()
                    })
                    .unwrap_or_default();
                facts.push(Fact::new(
                    identifier.clone(),
                    file,
                    lineno,
                    FactKind::Class {
                        extends: cap.get(2).map(|m| m.as_str().to_string()),
                        implements,
                        methods: Vec::new(),
                    },
                ));
                current_class = Some(identifier);
                continue;
            }

            if let Some(cap) = self.function.captures(line) {
                facts.push(Fact::new(
                    &cap[2],
                    file,
                    lineno,
                    FactKind::FunctionDef {
                        return_type: cap.get(4).map(|m| m.as_str().trim().to_string()),
                        parameters: split_params(&cap[3]),
                        is_async: cap.get(1).is_some(),
                    },
                ));
            } else if let Some(cap) = self.method_like.captures(line) {
                // Indented name(args) { — a method of the enclosing class.
                let name = cap[2].to_string();
                if !matches!(name.as_str(), "if" | "for" | "while" | "switch" | "catch") {
                    facts.push(Fact::new(
                        &name,
                        file,
                        lineno,
                        FactKind::FunctionDef {
                            return_type: None,
                            parameters: split_params(&cap[3]),
                            is_async: cap.get(1).is_some(),
                        },
                    ));
                    if let Some(class_name) = &current_class {
                        if let Some(Fact {
                            kind: FactKind::Class { methods, .. },
                            ..
                        }) = facts
                            .iter_mut()
                            .find(|f| &f.identifier == class_name && matches!(f.kind, FactKind::Class { .. }))
                        {
                            methods.push(name);
                        }
                    }
                }
            }

            if let Some(cap) = self.import.captures(line) {
                let names: Vec<String> = cap
                    .get(1)
                    .map(|m| {
                        m.as_str()
                            .split(',')
                            .map(|s| s.trim().to_string())
                            .filter(|s| !s.is_empty())
                            .collect()
                    })
                    .or_else(|| cap.get(2).map(|m| vec![m.as_str().to_string()]))
                    .unwrap_or_default();
                let identifier = names.first().cloned().unwrap_or_else(|| cap[3].to_string());
                facts.push(Fact::new(
                    identifier,
                    file,
                    lineno,
                    FactKind::Import {
                        source: cap[3].to_string(),
                        names,
                    },
                ));
            }

            if let Some(cap) = self.export.captures(line) {
                facts.push(Fact::new(
                    &cap[1],
                    file,
                    lineno,
                    FactKind::Export {
                        names: vec![cap[1].to_string()],
                    },
                ));
            }
        }
        facts
    }
}

fn split_params(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|p| {
            // Drop type annotations and defaults: `id: string = "x"` → `id`.
            p.split([':', '=']).next().unwrap_or("").trim().to_string()
        })
        .filter(|p| !p.is_empty())
        .collect()
}

// ---------------------------------------------------------------------------
// Per-invocation evidence cache
// ---------------------------------------------------------------------------

/// Memoizes fact and file lookups within a single retrieve/verify call.
/// Passed explicitly by the caller, never process-global, so concurrent
/// calls from different callers stay independent.
#[derive(Default)]
pub struct EvidenceCache {
    facts: FxHashMap<String, Vec<Fact>>,
    files: FxHashMap<String, Option<FileContent>>,
    /// Files already consulted, for reporting.
    touched: FxHashSet<String>,
}

impl EvidenceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn facts_for(&mut self, store: &dyn FactStore, file: &str) -> &[Fact] {
        self.touched.insert(file.to_string());
        self.facts
            .entry(file.to_string())
            .or_insert_with(|| store.list_facts(file))
    }

    pub fn read(&mut self, store: &dyn FactStore, path: &str) -> Option<&FileContent> {
        self.touched.insert(path.to_string());
        self.files
            .entry(path.to_string())
            .or_insert_with(|| store.read_file(path))
            .as_ref()
    }

    pub fn touched_files(&self) -> impl Iterator<Item = &str> {
        self.touched.iter().map(String::as_str)
    }
}

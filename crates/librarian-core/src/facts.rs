//! Typed code facts and their evidence-string rendering.
//!
//! Facts are extracted upstream (AST layer, out of scope here) and consumed
//! read-only by the retrieval and verification components. The closed
//! `FactKind` union keeps verifier pattern matching exhaustive: adding a new
//! fact kind is a compile-time-checked decision, not a stringly-typed one.

use serde::{Deserialize, Serialize};

/// The per-kind payload of a fact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FactKind {
    /// A function definition.
    FunctionDef {
        return_type: Option<String>,
        parameters: Vec<String>,
        is_async: bool,
    },
    /// A class definition.
    Class {
        extends: Option<String>,
        implements: Vec<String>,
        methods: Vec<String>,
    },
    /// An import of names from a module source.
    Import { source: String, names: Vec<String> },
    /// An export of names.
    Export { names: Vec<String> },
    /// A call site.
    Call { callee: String },
    /// A type alias or declaration.
    Type { definition: Option<String> },
}

impl FactKind {
    /// Short tag name, matching the serialized `kind` field.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::FunctionDef { .. } => "function_def",
            Self::Class { .. } => "class",
            Self::Import { .. } => "import",
            Self::Export { .. } => "export",
            Self::Call { .. } => "call",
            Self::Type { .. } => "type",
        }
    }
}

/// A typed, file/line-located assertion extracted from source.
/// Immutable once extracted; the core only reads facts, never mutates them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fact {
    pub identifier: String,
    pub file: String,
    /// 1-based line number.
    pub line: u32,
    #[serde(flatten)]
    pub kind: FactKind,
}

impl Fact {
    pub fn new(identifier: impl Into<String>, file: impl Into<String>, line: u32, kind: FactKind) -> Self {
        Self {
            identifier: identifier.into(),
            file: file.into(),
            line,
            kind,
        }
    }

    /// Render this fact as a flat evidence string — the unit the verifiers
    /// compare claims against. The wording deliberately mirrors the
    /// relationship patterns the scorer recognizes (extends / implements /
    /// returns / has method / takes parameter / is async / imported from),
    /// so a rendered fact entails the claims it supports. Each relation is
    /// emitted as its own `subject relation object` clause so relation
    /// parsing never attributes a clause to the wrong subject.
    pub fn render(&self) -> String {
        match &self.kind {
            FactKind::FunctionDef {
                return_type,
                parameters,
                is_async,
            } => {
                let mut s = String::new();
                if *is_async {
                    s.push_str("async ");
                }
                s.push_str("function ");
                s.push_str(&self.identifier);
                s.push('(');
                s.push_str(&parameters.join(", "));
                s.push(')');
                if let Some(ret) = return_type {
                    s.push_str(" returns ");
                    s.push_str(ret);
                }
                for param in parameters {
                    s.push_str(&format!("; {} takes parameter {}", self.identifier, param));
                }
                s
            }
            FactKind::Class {
                extends,
                implements,
                methods,
            } => {
                let mut s = format!("class {}", self.identifier);
                if let Some(base) = extends {
                    s.push_str(" extends ");
                    s.push_str(base);
                }
                for iface in implements {
                    s.push_str(&format!("; {} implements {}", self.identifier, iface));
                }
                for method in methods {
                    s.push_str(&format!("; {} has method {}", self.identifier, method));
                }
                s
            }
            FactKind::Import { source, names } => {
                if names.is_empty() {
                    format!("{} imported from {}", self.identifier, source)
                } else {
                    format!("{} imported from {}", names.join(", "), source)
                }
            }
            FactKind::Export { names } => {
                if names.is_empty() {
                    format!("export {}", self.identifier)
                } else {
                    format!("export {}", names.join(", "))
                }
            }
            FactKind::Call { callee } => format!("{} calls {}", self.identifier, callee),
            FactKind::Type { definition } => match definition {
                Some(def) => format!("type {} = {}", self.identifier, def),
                None => format!("type {}", self.identifier),
            },
        }
    }

    /// Evidence location in `file:line` form.
    pub fn location(&self) -> String {
        format!("{}:{}", self.file, self.line)
    }
}

//! Relationship-pattern recognition over claim and evidence text.
//!
//! A relation is the verb-like half of a checkable assertion: `X extends Y`,
//! `f returns T`, `f is async`. Parsing is pure string scanning; the
//! entailment checker combines these matches with typed facts for the
//! three-way entailed/contradicted/neutral split.

use regex::Regex;
use serde::{Deserialize, Serialize};

/// The relations the verifiers recognize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relation {
    Extends,
    Implements,
    Returns,
    HasMethod,
    TakesParameter,
    IsAsync,
    ImportedFrom,
}

impl Relation {
    pub const ALL: [Relation; 7] = [
        Self::Extends,
        Self::Implements,
        Self::Returns,
        Self::HasMethod,
        Self::TakesParameter,
        Self::IsAsync,
        Self::ImportedFrom,
    ];
}

/// A parsed `subject relation object` triple. `object` is `None` only for
/// object-less relations (`IsAsync`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationMatch {
    pub subject: String,
    pub relation: Relation,
    pub object: Option<String>,
}

/// Compiled relation patterns.
pub struct RelationScanner {
    extends: Regex,
    implements: Regex,
    returns: Regex,
    has_method: Regex,
    takes_parameter: Regex,
    is_async: Regex,
    imported_from: Regex,
}

impl RelationScanner {
    pub fn new() -> Self {
        // Subjects are bare identifiers; objects also allow generics,
        // path separators and array brackets (Promise<User>, ./services/user).
        const SUBJ: &str = r"([A-Za-z_][A-Za-z0-9_.]*)";
        const OBJ: &str = r"([A-Za-z_./][A-Za-z0-9_.<>,\[\]/-]*)";
        let re = |pattern: String| Regex::new(&pattern).unwrap();
        Self {
            extends: re(format!(r"{SUBJ}\s+extends\s+{OBJ}")),
            implements: re(format!(r"{SUBJ}\s+implements\s+{OBJ}")),
            returns: re(format!(r"{SUBJ}(?:\([^)]*\))?\s+returns\s+(?:an?\s+)?{OBJ}")),
            has_method: re(format!(
                r"{SUBJ}\s+has\s+(?:an?\s+)?methods?\s+(?:called\s+|named\s+)?{OBJ}"
            )),
            takes_parameter: re(format!(
                r"{SUBJ}\s+takes\s+(?:an?\s+)?parameters?\s+(?:called\s+|named\s+)?{OBJ}"
            )),
            is_async: re(format!(
                r"(?:async\s+function\s+{SUBJ}|{SUBJ}\s+is\s+(?:an\s+)?async)"
            )),
            imported_from: re(format!(
                r"{SUBJ}\s+(?:is\s+)?imported\s+from\s+{OBJ}"
            )),
        }
    }

    /// Parse the first recognizable relation in `text`.
    pub fn parse(&self, text: &str) -> Option<RelationMatch> {
        self.parse_all(text).into_iter().next()
    }

    /// Parse every recognizable relation in `text`, in pattern order.
    pub fn parse_all(&self, text: &str) -> Vec<RelationMatch> {
        let mut out = Vec::new();
        let pairs: [(&Regex, Relation); 6] = [
            (&self.extends, Relation::Extends),
            (&self.implements, Relation::Implements),
            (&self.returns, Relation::Returns),
            (&self.has_method, Relation::HasMethod),
            (&self.takes_parameter, Relation::TakesParameter),
            (&self.imported_from, Relation::ImportedFrom),
        ];
        for (regex, relation) in pairs {
            for cap in regex.captures_iter(text) {
                out.push(RelationMatch {
                    subject: cap[1].to_string(),
                    relation,
                    object: Some(cap[2].trim_end_matches(['.', ',']).to_string()),
                });
            }
        }
        for cap in self.is_async.captures_iter(text) {
            // Either alternative binds the subject.
            let subject = cap.get(1).or_else(|| cap.get(2));
            if let Some(subject) = subject {
                out.push(RelationMatch {
                    subject: subject.as_str().to_string(),
                    relation: Relation::IsAsync,
                    object: None,
                });
            }
        }
        out
    }

    /// Does `evidence` express the same relation as `claim_match`?
    /// Case-insensitive; objects compare on their base name (generics and
    /// trailing punctuation ignored) so `Promise<User>` matches `Promise`.
    pub fn evidence_expresses(&self, claim_match: &RelationMatch, evidence: &str) -> bool {
        let subject = claim_match.subject.to_lowercase();
        let evidence_lower = evidence.to_lowercase();
        if !evidence_lower.contains(&subject) {
            return false;
        }
        match claim_match.relation {
            Relation::IsAsync => {
                evidence_lower.contains("async") && evidence_lower.contains(&subject)
            }
            _ => {
                let object = match &claim_match.object {
                    Some(o) => o.to_lowercase(),
                    None => return false,
                };
                self.parse_all(evidence).into_iter().any(|m| {
                    m.relation == claim_match.relation
                        && m.subject.to_lowercase() == subject
                        && m.object
                            .as_deref()
                            .is_some_and(|o| objects_compatible(&o.to_lowercase(), &object))
                })
            }
        }
    }
}

impl Default for RelationScanner {
    fn default() -> Self {
        Self::new()
    }
}

/// Object equality up to generic parameters: `promise<user>` ~ `promise`,
/// and list objects match when either side contains the other's base.
pub fn objects_compatible(a: &str, b: &str) -> bool {
    let base = |s: &str| s.split('<').next().unwrap_or(s).trim().to_string();
    let (a_base, b_base) = (base(a), base(b));
    a == b || a_base == b_base || a.contains(&b_base) || b.contains(&a_base)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scanner() -> RelationScanner {
        RelationScanner::new()
    }

    #[test]
    fn parses_extends() {
        let m = scanner().parse("UserService extends BaseService").unwrap();
        assert_eq!(m.subject, "UserService");
        assert_eq!(m.relation, Relation::Extends);
        assert_eq!(m.object.as_deref(), Some("BaseService"));
    }

    #[test]
    fn parses_returns_with_article() {
        let m = scanner().parse("fetchUser returns a Promise<User>").unwrap();
        assert_eq!(m.relation, Relation::Returns);
        assert_eq!(m.object.as_deref(), Some("Promise<User>"));
    }

    #[test]
    fn parses_has_method_with_filler() {
        let m = scanner()
            .parse("UserService has a method called findUser")
            .unwrap();
        assert_eq!(m.relation, Relation::HasMethod);
        assert_eq!(m.subject, "UserService");
        assert_eq!(m.object.as_deref(), Some("findUser"));
    }

    #[test]
    fn parses_is_async_both_forms() {
        let m = scanner().parse("fetchUser is async").unwrap();
        assert_eq!(m.relation, Relation::IsAsync);
        assert_eq!(m.subject, "fetchUser");
        assert!(m.object.is_none());

        let m = scanner().parse("async function fetchUser(id)").unwrap();
        assert_eq!(m.relation, Relation::IsAsync);
        assert_eq!(m.subject, "fetchUser");
    }

    #[test]
    fn parses_imported_from() {
        let m = scanner()
            .parse("UserService is imported from ./services/user")
            .unwrap();
        assert_eq!(m.relation, Relation::ImportedFrom);
        assert_eq!(m.object.as_deref(), Some("./services/user"));
    }

    #[test]
    fn no_relation_in_plain_text() {
        assert!(scanner().parse("the quick brown fox").is_none());
    }

    #[test]
    fn evidence_expresses_matching_extends() {
        let s = scanner();
        let m = s.parse("UserService extends BaseService").unwrap();
        assert!(s.evidence_expresses(&m, "class UserService extends BaseService has method findUser"));
        assert!(!s.evidence_expresses(&m, "class UserService extends OtherBase"));
        assert!(!s.evidence_expresses(&m, "class OrderService extends BaseService"));
    }

    #[test]
    fn evidence_expresses_async() {
        let s = scanner();
        let m = s.parse("fetchUser is async").unwrap();
        assert!(s.evidence_expresses(&m, "async function fetchUser(id) returns Promise<User>"));
        assert!(!s.evidence_expresses(&m, "function fetchUser(id)"));
    }

    #[test]
    fn objects_compatible_ignores_generics() {
        assert!(objects_compatible("promise<user>", "promise"));
        assert!(objects_compatible("promise", "promise<user>"));
        assert!(!objects_compatible("promise<user>", "widget"));
    }
}

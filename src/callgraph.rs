//! Call-graph facts for summarization context
//!
//! Facts are textual: a name is a "call" if it appears as `name(` and a
//! "reference" if it is a PascalCase identifier. Nothing is type-resolved, so
//! these lists only say what appears in the source, not what is invoked at
//! runtime.

use std::collections::{BTreeSet, HashSet};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::schema::{ParsedClass, ParsedFile};

static CALL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b([A-Za-z_][A-Za-z0-9_]*)\s*\(").expect("valid call regex"));

static TYPE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b([A-Z][A-Za-z0-9_]*)\b").expect("valid type regex"));

/// Keywords that look like calls when followed by `(`
const NON_CALL_KEYWORDS: &[&str] = &[
    "if", "for", "while", "switch", "catch", "new", "return", "throw", "assert",
    "synchronized", "super", "this", "try", "else", "do", "case",
];

/// Types too common to say anything about a class
const COMMON_TYPES: &[&str] = &[
    "String", "Integer", "Boolean", "Long", "Double", "Float", "Short", "Byte",
    "Character", "List", "Map", "Set", "ArrayList", "HashMap", "HashSet",
    "Object", "Class", "System", "Exception", "RuntimeException", "Override",
    "Deprecated", "SuppressWarnings", "View", "Context", "Bundle", "Intent",
];

/// Method names textually called in `code`
///
/// Capitalized names are constructor invocations and are left to
/// [`extract_class_references`].
pub fn extract_method_calls(code: &str) -> BTreeSet<String> {
    CALL_PATTERN
        .captures_iter(code)
        .filter_map(|cap| cap.get(1))
        .map(|m| m.as_str())
        .filter(|name| !name.starts_with(|c: char| c.is_ascii_uppercase()))
        .filter(|name| !NON_CALL_KEYWORDS.contains(name))
        .map(str::to_string)
        .collect()
}

/// Class names textually referenced in `code`, minus ubiquitous platform types
pub fn extract_class_references(code: &str) -> BTreeSet<String> {
    TYPE_PATTERN
        .captures_iter(code)
        .filter_map(|cap| cap.get(1))
        .map(|m| m.as_str())
        .filter(|name| !COMMON_TYPES.contains(name))
        .filter(|name| !is_constant_name(name))
        .map(str::to_string)
        .collect()
}

/// `MAX_RETRIES`-style constants match the PascalCase pattern but are not types
fn is_constant_name(name: &str) -> bool {
    name.len() > 1
        && name
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

/// Names defined anywhere in the parsed project
#[derive(Debug, Clone, Default)]
pub struct ProjectSymbols {
    classes: HashSet<String>,
    methods: HashSet<String>,
}

impl ProjectSymbols {
    /// Collect class and method names from parsed files
    pub fn from_files(files: &[ParsedFile]) -> Self {
        let mut symbols = Self::default();
        for class in files.iter().flat_map(|f| f.classes.iter()) {
            symbols.classes.insert(class.name.clone());
            for method in &class.methods {
                symbols.methods.insert(method.name.clone());
            }
        }
        symbols
    }

    pub fn defines_class(&self, name: &str) -> bool {
        self.classes.contains(name)
    }

    pub fn defines_method(&self, name: &str) -> bool {
        self.methods.contains(name)
    }
}

/// Calls and references of one class, ranked for prompt use
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallGraphFacts {
    pub called_methods: Vec<String>,
    pub referenced_classes: Vec<String>,
    pub defined_methods: Vec<String>,
}

impl CallGraphFacts {
    /// Facts for `class`, with project-defined names ranked ahead of external ones
    pub fn for_class(class: &ParsedClass, symbols: &ProjectSymbols) -> Self {
        let called_methods = rank_by(&class.calls, |n| symbols.defines_method(n));
        let referenced_classes = rank_by(&class.references, |n| symbols.defines_class(n));

        let mut defined_methods: Vec<String> = Vec::new();
        for method in &class.methods {
            if !defined_methods.contains(&method.name) {
                defined_methods.push(method.name.clone());
            }
        }

        Self {
            called_methods,
            referenced_classes,
            defined_methods,
        }
    }
}

/// Stable partition: names satisfying `known` first, original order kept within each half
fn rank_by(names: &[String], known: impl Fn(&str) -> bool) -> Vec<String> {
    let (mut first, rest): (Vec<String>, Vec<String>) =
        names.iter().cloned().partition(|n| known(n));
    first.extend(rest);
    first
}

/// Calls and references for a class body, excluding the class's own name
pub fn class_facts(name: &str, code: &str) -> (Vec<String>, Vec<String>) {
    let calls = extract_method_calls(code).into_iter().collect();
    let references = extract_class_references(code)
        .into_iter()
        .filter(|r| r != name)
        .collect();
    (calls, references)
}

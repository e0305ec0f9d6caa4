//! Data model shared by all pipeline stages
//!
//! Everything here is plain data with serde derives. The persisted JSON files
//! (`parsed_files.json`, `clusters.json`, `summaries.json`, `results.json`) are
//! direct serializations of these types, so field names are part of the output
//! format.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Method name used for findings that no parsed method contains
pub const UNKNOWN: &str = "unknown";

/// Text stored for a summary the report could not find
pub const SUMMARY_NOT_FOUND: &str = "[summary not found]";

/// Prefix of the text stored when summarization of an entity failed
pub const SUMMARY_FAILED_PREFIX: &str = "[summary failed";

// ============================================================================
// Parsed source
// ============================================================================

/// Source span with 1-based lines and 0-based columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Position {
    pub start_line: usize,
    pub end_line: usize,
    pub start_column: usize,
    pub end_column: usize,
}

impl Position {
    /// Whether `line` falls inside this span (inclusive on both ends)
    pub fn contains_line(&self, line: usize) -> bool {
        self.start_line <= line && line <= self.end_line
    }

    /// Number of lines covered by the span
    pub fn line_span(&self) -> usize {
        self.end_line.saturating_sub(self.start_line) + 1
    }
}

/// A formal parameter of a method
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: String,
}

/// A method or constructor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedMethod {
    pub name: String,
    /// Name of the owning class
    pub class: String,
    pub file: String,
    pub return_type: String,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    pub position: Position,
    pub code: String,
}

impl ParsedMethod {
    /// Key used in the method summary mapping (`Class.method`)
    pub fn qualified_name(&self) -> String {
        qualified_method_name(&self.class, &self.name)
    }

    /// Human readable signature, e.g. `boolean login(String user, String pass)`
    pub fn signature(&self) -> String {
        let params = self
            .parameters
            .iter()
            .map(|p| format!("{} {}", p.param_type, p.name))
            .collect::<Vec<_>>()
            .join(", ");
        format!("{} {}({})", self.return_type, self.name, params)
    }
}

/// Build the `Class.method` key
pub fn qualified_method_name(class: &str, method: &str) -> String {
    format!("{}.{}", class, method)
}

/// Kind of type declaration a class came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassKind {
    #[default]
    Class,
    Interface,
    Enum,
    Record,
    Annotation,
}

/// A class, interface, enum, record or annotation type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedClass {
    pub name: String,
    pub file: String,
    #[serde(default)]
    pub kind: ClassKind,
    pub position: Position,
    pub code: String,
    /// Method names textually called from the class body
    #[serde(default)]
    pub calls: Vec<String>,
    /// Class names textually referenced from the class body
    #[serde(default)]
    pub references: Vec<String>,
    #[serde(default)]
    pub methods: Vec<ParsedMethod>,
}

/// One parsed source file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedFile {
    pub path: String,
    #[serde(default)]
    pub classes: Vec<ParsedClass>,
}

impl ParsedFile {
    /// All methods of all classes in the file
    pub fn methods(&self) -> impl Iterator<Item = &ParsedMethod> {
        self.classes.iter().flat_map(|c| c.methods.iter())
    }
}

// ============================================================================
// Clusters
// ============================================================================

/// A class listed as a cluster member
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterClass {
    pub name: String,
    pub file: String,
    pub num_methods: usize,
}

/// A method listed as a cluster member (legacy method-level clustering)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterMethod {
    pub name: String,
    pub class: String,
    #[serde(default)]
    pub file: String,
}

impl ClusterMethod {
    /// `Class.method` key, tolerating names that are already qualified
    pub fn qualified_name(&self) -> String {
        if self.name.contains('.') {
            self.name.clone()
        } else {
            qualified_method_name(&self.class, &self.name)
        }
    }
}

/// Cluster membership, resolved from whichever field the file carries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClusterMembers {
    Classes { classes: Vec<ClusterClass> },
    Methods { methods: Vec<ClusterMethod> },
}

impl ClusterMembers {
    /// Number of listed members
    pub fn len(&self) -> usize {
        match self {
            Self::Classes { classes } => classes.len(),
            Self::Methods { methods } => methods.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A group of semantically related classes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassCluster {
    /// 1-based cluster id; legacy files may omit it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_id: Option<u32>,
    pub size: usize,
    #[serde(flatten)]
    pub members: ClusterMembers,
}

impl ClassCluster {
    /// Build a class-level cluster
    pub fn of_classes(id: u32, classes: Vec<ClusterClass>) -> Self {
        Self {
            cluster_id: Some(id),
            size: classes.len(),
            members: ClusterMembers::Classes { classes },
        }
    }

    /// Id of the cluster at `index` in a cluster list
    pub fn id_at(&self, index: usize) -> u32 {
        self.cluster_id.unwrap_or(index as u32 + 1)
    }

    /// Names of member classes (legacy clusters report the classes of their methods)
    pub fn class_names(&self) -> Vec<&str> {
        match &self.members {
            ClusterMembers::Classes { classes } => classes.iter().map(|c| c.name.as_str()).collect(),
            ClusterMembers::Methods { methods } => {
                let mut names: Vec<&str> = Vec::new();
                for m in methods {
                    if !names.contains(&m.class.as_str()) {
                        names.push(m.class.as_str());
                    }
                }
                names
            }
        }
    }
}

/// Key used in the cluster summary mapping
pub fn cluster_key(id: u32) -> String {
    format!("cluster_{}", id)
}

// ============================================================================
// Summaries
// ============================================================================

/// The three summary mappings written to `summaries.json`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summaries {
    #[serde(default)]
    pub clusters: BTreeMap<String, String>,
    #[serde(default)]
    pub classes: BTreeMap<String, String>,
    #[serde(default)]
    pub methods: BTreeMap<String, String>,
}

impl Summaries {
    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty() && self.classes.is_empty() && self.methods.is_empty()
    }
}

/// Whether a stored summary is a failure placeholder
pub fn is_placeholder(text: &str) -> bool {
    text.starts_with(SUMMARY_FAILED_PREFIX) || text == SUMMARY_NOT_FOUND
}

// ============================================================================
// Findings and results
// ============================================================================

/// A single scanner match, before mapping
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub file: String,
    pub line: usize,
    pub vulnerability: String,
    pub matched: String,
    pub severity: Option<String>,
    pub cwe: Option<String>,
}

/// Where a finding landed in the parsed code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappedFinding {
    pub finding: Finding,
    /// Path of the parsed file that matched, if any
    pub parsed_file: Option<String>,
    /// `Class.method` key, if a method contains the finding
    pub method: Option<String>,
    pub class: Option<String>,
    pub cluster: Option<u32>,
}

/// Summaries attached to one result entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntrySummaries {
    pub method: String,
    pub class: String,
    pub cluster: String,
}

/// One row of `results.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultEntry {
    pub file: String,
    pub line: usize,
    pub method: String,
    pub class: String,
    pub cluster: String,
    pub vulnerability: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwe: Option<String>,
    #[serde(rename = "match")]
    pub matched: String,
    pub summaries: EntrySummaries,
}

/// The `results.json` document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultsDocument {
    pub results: Vec<ResultEntry>,
}

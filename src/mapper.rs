//! Finding → method/class/cluster mapping
//!
//! Scanner paths and parser paths rarely agree byte for byte (different roots,
//! Windows separators, case), so files are matched with [`paths_match`]. Within
//! a matching file the innermost method whose line range contains the finding
//! wins.

use std::collections::BTreeMap;

use crate::schema::{ClassCluster, ClusterMembers, Finding, MappedFinding, ParsedFile, ParsedMethod};
use crate::utils::{normalize_path, path_components};

/// Package anchors; the path after them is the package path plus file name
const SOURCE_ANCHORS: &[&str] = &["/java/", "/kotlin/"];

/// Trailing components that must agree in the last-resort comparison
const MIN_TAIL_MATCH: usize = 3;

/// Whether a scanner path and a parsed path name the same file
///
/// Checked in order: equality, one path being a component-aligned suffix of
/// the other, equal package paths after `/java/` or `/kotlin/`, and finally the
/// same file name with at least three equal trailing components.
pub fn paths_match(a: &str, b: &str) -> bool {
    let a = normalize_path(a);
    let b = normalize_path(b);
    if a == b {
        return true;
    }

    let a_parts = path_components(&a);
    let b_parts = path_components(&b);
    if a_parts.is_empty() || b_parts.is_empty() || a_parts.last() != b_parts.last() {
        return false;
    }

    if a_parts.ends_with(&b_parts) || b_parts.ends_with(&a_parts) {
        return true;
    }

    for anchor in SOURCE_ANCHORS {
        if let (Some((_, a_pkg)), Some((_, b_pkg))) = (a.rsplit_once(anchor), b.rsplit_once(anchor)) {
            return a_pkg == b_pkg;
        }
    }

    let tail = a_parts
        .iter()
        .rev()
        .zip(b_parts.iter().rev())
        .take_while(|(x, y)| x == y)
        .count();
    tail >= MIN_TAIL_MATCH
}

// ============================================================================
// Cluster index
// ============================================================================

/// Lookup from classes (and legacy methods) to cluster ids
///
/// Built from either `clusters.json` layout. Class-level clusters resolve by
/// class name, preferring the entry from the same file when two classes share
/// a name. Method-level clusters resolve by `Class.method` first and by the
/// method's class second.
#[derive(Debug, Clone, Default)]
pub struct ClusterIndex {
    classes: BTreeMap<String, Vec<(String, u32)>>,
    methods: BTreeMap<String, u32>,
}

impl ClusterIndex {
    pub fn new(clusters: &[ClassCluster]) -> Self {
        let mut index = Self::default();
        for (i, cluster) in clusters.iter().enumerate() {
            let id = cluster.id_at(i);
            if cluster.members.is_empty() {
                tracing::debug!("Cluster {} has no members", id);
                continue;
            }
            match &cluster.members {
                ClusterMembers::Classes { classes } => {
                    for class in classes {
                        index.add_class(&class.name, &class.file, id);
                    }
                }
                ClusterMembers::Methods { methods } => {
                    for method in methods {
                        index.methods.entry(method.qualified_name()).or_insert(id);
                        index.add_class(&method.class, &method.file, id);
                    }
                }
            }
        }
        index
    }

    fn add_class(&mut self, name: &str, file: &str, id: u32) {
        let entries = self.classes.entry(name.to_string()).or_default();
        if !entries.iter().any(|(f, _)| f == file) {
            entries.push((file.to_string(), id));
        }
    }

    /// Cluster of `method` (a parsed method), by qualified name then by class
    pub fn cluster_of(&self, method: &ParsedMethod) -> Option<u32> {
        if let Some(&id) = self.methods.get(&method.qualified_name()) {
            return Some(id);
        }
        self.cluster_of_class(&method.class, &method.file)
    }

    /// Cluster of a class; `file` breaks ties between same-named classes
    ///
    /// Entries recorded without a file match any file. Entries with a file
    /// only match that file, so a same-named class that was never clustered
    /// does not borrow another class's cluster.
    pub fn cluster_of_class(&self, class: &str, file: &str) -> Option<u32> {
        let entries = self.classes.get(class)?;
        entries
            .iter()
            .find(|(f, _)| !f.is_empty() && paths_match(f, file))
            .or_else(|| entries.iter().find(|(f, _)| f.is_empty()))
            .map(|&(_, id)| id)
    }
}

// ============================================================================
// Mapping
// ============================================================================

/// Attach each finding to its enclosing method, class and cluster
///
/// Every finding yields exactly one [`MappedFinding`], in input order. Findings
/// outside any parsed method keep `None` for method, class and cluster.
pub fn map_findings(findings: &[Finding], files: &[ParsedFile], clusters: &ClusterIndex) -> Vec<MappedFinding> {
    let mapped: Vec<MappedFinding> = findings
        .iter()
        .map(|finding| map_finding(finding, files, clusters))
        .collect();

    let located = mapped.iter().filter(|m| m.method.is_some()).count();
    tracing::info!("Mapped {} of {} findings to methods", located, mapped.len());

    if located == 0 && !findings.is_empty() {
        tracing::warn!("No finding fell inside a parsed method; check path matching");
        tracing::warn!("  scanner path example: {}", findings[0].file);
        if let Some(file) = files.first() {
            tracing::warn!("  parsed path example:  {}", file.path);
        }
    }
    mapped
}

fn map_finding(finding: &Finding, files: &[ParsedFile], clusters: &ClusterIndex) -> MappedFinding {
    let matching: Vec<&ParsedFile> = files.iter().filter(|f| paths_match(&finding.file, &f.path)).collect();

    let enclosing = matching
        .iter()
        .flat_map(|f| f.methods())
        .filter(|m| m.position.contains_line(finding.line))
        .fold(None, |best: Option<&ParsedMethod>, m| match best {
            Some(b) if b.position.line_span() <= m.position.line_span() => Some(b),
            _ => Some(m),
        });

    match enclosing {
        Some(method) => MappedFinding {
            finding: finding.clone(),
            parsed_file: Some(method.file.clone()),
            method: Some(method.qualified_name()),
            class: Some(method.class.clone()),
            cluster: clusters.cluster_of(method),
        },
        None => {
            tracing::debug!(
                "No method contains {}:{} ({})",
                finding.file,
                finding.line,
                finding.vulnerability
            );
            MappedFinding {
                finding: finding.clone(),
                parsed_file: matching.first().map(|f| f.path.clone()),
                method: None,
                class: None,
                cluster: None,
            }
        }
    }
}

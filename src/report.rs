//! Report assembly
//!
//! Joins mapped findings with the three summary levels into `results.json`.
//! Assembly is a pure function of its inputs, so rebuilding from unchanged
//! files yields byte-identical output.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::Serialize;

use crate::config::ScannerConfig;
use crate::error::Result;
use crate::mapper::{map_findings, ClusterIndex};
use crate::persist::OutputStore;
use crate::scanner::filter_report;
use crate::schema::{
    cluster_key, is_placeholder, EntrySummaries, MappedFinding, ResultEntry, ResultsDocument, Summaries,
    SUMMARY_NOT_FOUND, UNKNOWN,
};

/// Build the results document from mapped findings and summaries
///
/// Duplicate (file, line, vulnerability) entries keep their first occurrence.
/// Entries are sorted by (file, line); the sort is stable, so entries on the
/// same line keep scanner order.
pub fn assemble_results(findings: &[MappedFinding], summaries: &Summaries) -> ResultsDocument {
    let mut seen: HashSet<(String, usize, String)> = HashSet::new();
    let mut results: Vec<ResultEntry> = Vec::with_capacity(findings.len());

    for mapped in findings {
        let entry = build_entry(mapped, summaries);
        let key = (entry.file.clone(), entry.line, entry.vulnerability.clone());
        if seen.insert(key) {
            results.push(entry);
        } else {
            tracing::debug!("Dropping duplicate finding {}:{} ({})", entry.file, entry.line, entry.vulnerability);
        }
    }

    results.sort_by(|a, b| a.file.cmp(&b.file).then(a.line.cmp(&b.line)));
    ResultsDocument { results }
}

fn build_entry(mapped: &MappedFinding, summaries: &Summaries) -> ResultEntry {
    let finding = &mapped.finding;
    let cluster = mapped.cluster.map(cluster_key);

    ResultEntry {
        file: mapped.parsed_file.clone().unwrap_or_else(|| finding.file.clone()),
        line: finding.line,
        method: mapped.method.clone().unwrap_or_else(|| UNKNOWN.to_string()),
        class: mapped.class.clone().unwrap_or_else(|| UNKNOWN.to_string()),
        cluster: cluster.clone().unwrap_or_else(|| UNKNOWN.to_string()),
        vulnerability: finding.vulnerability.clone(),
        severity: finding.severity.clone(),
        cwe: finding.cwe.clone(),
        matched: finding.matched.clone(),
        summaries: EntrySummaries {
            method: lookup(&summaries.methods, mapped.method.as_deref()),
            class: lookup(&summaries.classes, mapped.class.as_deref()),
            cluster: lookup(&summaries.clusters, cluster.as_deref()),
        },
    }
}

fn lookup(map: &BTreeMap<String, String>, key: Option<&str>) -> String {
    key.and_then(|k| map.get(k))
        .filter(|s| !s.trim().is_empty())
        .cloned()
        .unwrap_or_else(|| SUMMARY_NOT_FOUND.to_string())
}

/// Rebuild `results.json` from the files in an output directory
///
/// Reads the scan report, parsed files, clusters and summaries; only the scan
/// report, parsed files and clusters are required.
pub fn generate_results(store: &OutputStore, scanner: &ScannerConfig) -> Result<ResultsDocument> {
    tracing::info!("Loading pipeline outputs from '{}'", store.root.display());
    let scan = filter_report(store.load_scan()?, scanner);
    let files = store.load_parsed()?;
    let clusters = store.load_clusters()?;
    let summaries = store.load_summaries()?;

    let index = ClusterIndex::new(&clusters);
    let mapped = map_findings(&scan.findings(), &files, &index);
    let document = assemble_results(&mapped, &summaries);

    let path = store.save_results(&document)?;
    let stats = ReportStats::from_document(&document);
    stats.log();
    tracing::info!("Saved {} results to {}", document.results.len(), path.display());
    Ok(document)
}

// ============================================================================
// Statistics
// ============================================================================

/// Counts describing a results document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReportStats {
    pub total: usize,
    /// Instances per vulnerability kind
    pub by_vulnerability: BTreeMap<String, usize>,
    pub unique_methods: usize,
    pub unique_files: usize,
    pub unmapped: usize,
    /// Entries whose method, class and cluster summaries are all real text
    pub fully_summarized: usize,
}

impl ReportStats {
    pub fn from_document(document: &ResultsDocument) -> Self {
        let mut stats = Self {
            total: document.results.len(),
            ..Self::default()
        };
        let mut methods = BTreeSet::new();
        let mut files = BTreeSet::new();

        for entry in &document.results {
            *stats.by_vulnerability.entry(entry.vulnerability.clone()).or_insert(0) += 1;
            files.insert(entry.file.as_str());
            if entry.method == UNKNOWN {
                stats.unmapped += 1;
            } else {
                methods.insert(entry.method.as_str());
            }
            let s = &entry.summaries;
            if !is_placeholder(&s.method) && !is_placeholder(&s.class) && !is_placeholder(&s.cluster) {
                stats.fully_summarized += 1;
            }
        }

        stats.unique_methods = methods.len();
        stats.unique_files = files.len();
        stats
    }

    pub fn log(&self) {
        tracing::info!("Vulnerability instances by type:");
        for (kind, count) in &self.by_vulnerability {
            tracing::info!("  {}: {}", kind, count);
        }
        tracing::info!(
            "{} results: {} unique methods, {} files, {} vulnerability types, {} unmapped",
            self.total,
            self.unique_methods,
            self.unique_files,
            self.by_vulnerability.len(),
            self.unmapped
        );
        tracing::info!("{} of {} results have all three summaries", self.fully_summarized, self.total);
    }

    /// Human-readable summary for the terminal
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("Results: {}\n", self.total));
        for (kind, count) in &self.by_vulnerability {
            out.push_str(&format!("  {:<40} {}\n", kind, count));
        }
        out.push_str(&format!("Unique methods: {}\n", self.unique_methods));
        out.push_str(&format!("Unique files: {}\n", self.unique_files));
        out.push_str(&format!("Unmapped findings: {}\n", self.unmapped));
        out.push_str(&format!("Fully summarized: {}/{}\n", self.fully_summarized, self.total));
        out
    }
}

//! Pipeline orchestration
//!
//! Runs the stages strictly in order (scan, parse, cluster, map, summarize,
//! assemble) and persists each stage's output before the next one starts.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::cluster::ClassClusterer;
use crate::config::PipelineConfig;
use crate::error::Result;
use crate::mapper::{map_findings, ClusterIndex};
use crate::parser::{parse_project, SourceParser};
use crate::persist::OutputStore;
use crate::report::{assemble_results, ReportStats};
use crate::scanner::{load_scan_report, ScanReport, VulnerabilityScanner};
use crate::schema::{ParsedClass, Summaries};
use crate::summarize::{summarize_all, Summarizer, SummaryTargets};

/// Where the scan report comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanSource {
    /// Run the scanner over the app directory
    Run,
    /// Reuse a report written earlier
    Existing(PathBuf),
}

/// Counts gathered over one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    pub findings: usize,
    pub files_parsed: usize,
    pub classes: usize,
    pub methods: usize,
    pub clusters: usize,
    pub method_summaries: usize,
    pub class_summaries: usize,
    pub cluster_summaries: usize,
    pub report: ReportStats,
    pub output_dir: String,
}

impl RunStats {
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("Output: {}\n", self.output_dir));
        out.push_str(&format!("Findings: {}\n", self.findings));
        out.push_str(&format!(
            "Parsed: {} files, {} classes, {} methods\n",
            self.files_parsed, self.classes, self.methods
        ));
        out.push_str(&format!("Clusters: {}\n", self.clusters));
        out.push_str(&format!(
            "Summaries: {} methods, {} classes, {} clusters\n",
            self.method_summaries, self.class_summaries, self.cluster_summaries
        ));
        out.push_str(&self.report.render_text());
        out
    }
}

/// The stage implementations for one run
pub struct Pipeline<V, P, C, S> {
    pub scanner: V,
    pub parser: P,
    pub clusterer: C,
    /// `None` skips the model stage; the report then carries placeholders
    pub summarizer: Option<S>,
    pub config: PipelineConfig,
    pub store: OutputStore,
}

impl<V, P, C, S> Pipeline<V, P, C, S>
where
    V: VulnerabilityScanner,
    P: SourceParser + Sync,
    C: ClassClusterer,
    S: Summarizer + Sync,
{
    /// Run every stage over `app_dir`
    pub async fn run(&self, app_dir: &Path, scan_source: &ScanSource) -> Result<RunStats> {
        self.store.init()?;

        tracing::info!("[1/6] Vulnerability scan");
        let scan = self.scan(app_dir, scan_source)?;
        self.store.save_scan(&scan)?;
        let findings = scan.findings();

        tracing::info!("[2/6] Parsing");
        let files = parse_project(app_dir, &self.parser)?;
        self.store.save_parsed(&files)?;
        let classes: Vec<ParsedClass> = files.iter().flat_map(|f| f.classes.iter().cloned()).collect();
        let method_count: usize = classes.iter().map(|c| c.methods.len()).sum();

        tracing::info!("[3/6] Clustering {} classes", classes.len());
        let clusters = self.clusterer.cluster(&classes).await?;
        self.store.save_clusters(&clusters)?;

        tracing::info!("[4/6] Mapping {} findings", findings.len());
        let index = ClusterIndex::new(&clusters);
        let mapped = map_findings(&findings, &files, &index);

        tracing::info!("[5/6] Summarization");
        let summaries = match &self.summarizer {
            Some(summarizer) => {
                let targets = SummaryTargets::from_findings(&mapped);
                summarize_all(
                    summarizer,
                    &files,
                    &clusters,
                    &targets,
                    &self.config.summaries,
                    self.config.models.max_concurrent_requests,
                )
                .await
            }
            None => {
                tracing::info!("Summarization disabled");
                Summaries::default()
            }
        };
        self.store.save_summaries(&summaries)?;

        tracing::info!("[6/6] Assembling report");
        let document = assemble_results(&mapped, &summaries);
        let results_path = self.store.save_results(&document)?;
        let report = ReportStats::from_document(&document);
        report.log();
        tracing::info!("Results saved to {}", results_path.display());

        Ok(RunStats {
            findings: findings.len(),
            files_parsed: files.len(),
            classes: classes.len(),
            methods: method_count,
            clusters: clusters.len(),
            method_summaries: summaries.methods.len(),
            class_summaries: summaries.classes.len(),
            cluster_summaries: summaries.clusters.len(),
            report,
            output_dir: self.store.root.display().to_string(),
        })
    }

    fn scan(&self, app_dir: &Path, source: &ScanSource) -> Result<ScanReport> {
        match source {
            ScanSource::Run => self.scanner.scan(app_dir),
            ScanSource::Existing(path) => {
                tracing::info!("Loading existing scan report from '{}'", path.display());
                load_scan_report(path, &self.config.scanner)
            }
        }
    }
}

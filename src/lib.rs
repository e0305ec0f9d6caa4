//! vulnlens: vulnerability reports with semantic context
//!
//! Scans Android app sources with `mobsfscan`, parses the Java code with
//! tree-sitter, clusters classes by embedding similarity, summarizes methods,
//! classes and clusters with a chat model, and joins everything into a
//! `results.json` where each finding carries all three summary levels.
//!
//! # Pipeline
//!
//! ```text
//! scan → parse → cluster → map findings → summarize → assemble
//! ```
//!
//! Each stage persists its output (see [`persist`]), so `vulnlens report` can
//! rebuild the results from an existing output directory.
//!
//! # Example
//!
//! ```ignore
//! use std::path::Path;
//! use vulnlens::{parse_project, JavaParser};
//!
//! let files = parse_project(Path::new("apps/dvb"), &JavaParser::new())?;
//! for class in files.iter().flat_map(|f| &f.classes) {
//!     println!("{} ({} methods)", class.name, class.methods.len());
//! }
//! ```

pub mod callgraph;
pub mod cli;
pub mod cluster;
pub mod config;
pub mod embedding;
pub mod error;
pub mod http;
pub mod mapper;
pub mod parser;
pub mod persist;
pub mod pipeline;
pub mod report;
pub mod scanner;
pub mod schema;
pub mod summarize;
pub mod utils;

// Re-export commonly used types
pub use cli::{Cli, OutputFormat};
pub use cluster::{ClassClusterer, EmbeddingClusterer};
pub use config::{PipelineConfig, SummaryScope};
pub use embedding::{Embedder, HttpEmbedder};
pub use error::{Result, VulnLensError};
pub use mapper::{map_findings, paths_match, ClusterIndex};
pub use parser::{parse_project, JavaParser, SourceParser};
pub use persist::OutputStore;
pub use pipeline::{Pipeline, RunStats, ScanSource};
pub use report::{assemble_results, generate_results, ReportStats};
pub use scanner::{load_scan_report, MobsfScanner, ScanReport, VulnerabilityScanner};
pub use schema::{
    ClassCluster, ClusterMembers, Finding, MappedFinding, ParsedClass, ParsedFile, ParsedMethod, ResultEntry,
    ResultsDocument, Summaries,
};
pub use summarize::{ChatSummarizer, Summarizer, SummaryRequest};

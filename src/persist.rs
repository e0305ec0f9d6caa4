//! Output directory layout and JSON persistence
//!
//! Every stage writes its output as pretty-printed JSON into one directory so
//! a later `report` run can rebuild `results.json` without touching the
//! scanner or the models.

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Result, VulnLensError};
use crate::scanner::ScanReport;
use crate::schema::{ClassCluster, ParsedFile, ResultsDocument, Summaries};

pub const SCAN_FILE: &str = "mobsf_scan.json";
pub const PARSED_FILE: &str = "parsed_files.json";
pub const CLUSTERS_FILE: &str = "clusters.json";
pub const SUMMARIES_FILE: &str = "summaries.json";
pub const RESULTS_FILE: &str = "results.json";

/// The pipeline's output directory
#[derive(Debug, Clone)]
pub struct OutputStore {
    pub root: PathBuf,
}

impl OutputStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create the directory if needed
    pub fn init(&self) -> Result<()> {
        fs::create_dir_all(&self.root)?;
        Ok(())
    }

    // ========== Path accessors ==========

    pub fn scan_path(&self) -> PathBuf {
        self.root.join(SCAN_FILE)
    }

    pub fn parsed_path(&self) -> PathBuf {
        self.root.join(PARSED_FILE)
    }

    pub fn clusters_path(&self) -> PathBuf {
        self.root.join(CLUSTERS_FILE)
    }

    pub fn summaries_path(&self) -> PathBuf {
        self.root.join(SUMMARIES_FILE)
    }

    pub fn results_path(&self) -> PathBuf {
        self.root.join(RESULTS_FILE)
    }

    // ========== Save ==========

    pub fn save_scan(&self, report: &ScanReport) -> Result<PathBuf> {
        self.save(SCAN_FILE, report)
    }

    pub fn save_parsed(&self, files: &[ParsedFile]) -> Result<PathBuf> {
        self.save(PARSED_FILE, files)
    }

    pub fn save_clusters(&self, clusters: &[ClassCluster]) -> Result<PathBuf> {
        self.save(CLUSTERS_FILE, clusters)
    }

    pub fn save_summaries(&self, summaries: &Summaries) -> Result<PathBuf> {
        self.save(SUMMARIES_FILE, summaries)
    }

    pub fn save_results(&self, results: &ResultsDocument) -> Result<PathBuf> {
        self.save(RESULTS_FILE, results)
    }

    /// Atomic write: serialize to a temp file, then rename over the target
    fn save<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> Result<PathBuf> {
        self.init()?;
        let path = self.root.join(name);
        let temp_path = path.with_extension("json.tmp");

        let mut json = serde_json::to_string_pretty(value).map_err(|e| VulnLensError::json(name, e))?;
        json.push('\n');

        fs::write(&temp_path, &json)?;
        fs::rename(&temp_path, &path)?;
        tracing::debug!("Wrote {}", path.display());
        Ok(path)
    }

    // ========== Load ==========

    pub fn load_scan(&self) -> Result<ScanReport> {
        load_json(&self.scan_path())
    }

    pub fn load_parsed(&self) -> Result<Vec<ParsedFile>> {
        load_json(&self.parsed_path())
    }

    /// Accepts both the class-level and the legacy method-level layout
    pub fn load_clusters(&self) -> Result<Vec<ClassCluster>> {
        load_json(&self.clusters_path())
    }

    /// A missing summaries file reads as empty; the report then carries placeholders
    pub fn load_summaries(&self) -> Result<Summaries> {
        let path = self.summaries_path();
        if !path.exists() {
            tracing::warn!("{} not found, all summaries will be placeholders", path.display());
            return Ok(Summaries::default());
        }
        load_json(&path)
    }
}

/// Read and deserialize a JSON file
pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    if !path.exists() {
        return Err(VulnLensError::FileNotFound {
            path: path.display().to_string(),
        });
    }
    let text = fs::read_to_string(path)?;
    serde_json::from_str(&text).map_err(|e| VulnLensError::json(path.display().to_string(), e))
}

//! Vulnerability scanner adapter
//!
//! Runs `mobsfscan` over an app directory (or loads a report it wrote earlier)
//! and narrows the report to the rules and file types the pipeline maps.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use serde::{Deserialize, Serialize};

use crate::config::ScannerConfig;
use crate::error::{Result, VulnLensError};
use crate::schema::Finding;
use crate::utils::truncate_to_char_boundary;

/// mobsfscan JSON report
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanReport {
    /// Rule id → matches
    #[serde(default)]
    pub results: BTreeMap<String, RuleResult>,
    #[serde(default)]
    pub errors: Vec<serde_json::Value>,
}

/// All matches of one rule
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleResult {
    #[serde(default)]
    pub files: Vec<FileMatch>,
    #[serde(default)]
    pub metadata: RuleMetadata,
}

/// One match location; each entry is one finding
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileMatch {
    pub file_path: String,
    /// `[first, last]` line of the match, 1-based
    #[serde(default)]
    pub match_lines: Vec<usize>,
    #[serde(default)]
    pub match_position: Vec<usize>,
    #[serde(default)]
    pub match_string: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwe: Option<String>,
    /// masvs, owasp-mobile, reference, ...
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl ScanReport {
    /// Total number of matches across rules
    pub fn match_count(&self) -> usize {
        self.results.values().map(|r| r.files.len()).sum()
    }

    /// Flatten into findings, ordered by rule id then report order
    pub fn findings(&self) -> Vec<Finding> {
        let mut findings = Vec::with_capacity(self.match_count());
        for (rule, result) in &self.results {
            for file in &result.files {
                findings.push(Finding {
                    file: file.file_path.clone(),
                    line: file.match_lines.first().copied().unwrap_or(0),
                    vulnerability: rule.clone(),
                    matched: file.match_string.trim().to_string(),
                    severity: result.metadata.severity.clone(),
                    cwe: result.metadata.cwe.clone(),
                });
            }
        }
        findings
    }
}

/// Drop skipped rules and matches in files of other languages
///
/// Rules left without any match are removed entirely.
pub fn filter_report(report: ScanReport, config: &ScannerConfig) -> ScanReport {
    let results = report
        .results
        .into_iter()
        .filter(|(rule, _)| !config.skip_rules.iter().any(|s| s == rule))
        .filter_map(|(rule, mut result)| {
            result.files.retain(|f| has_extension(&f.file_path, &config.extensions));
            (!result.files.is_empty()).then_some((rule, result))
        })
        .collect();

    ScanReport {
        results,
        errors: report.errors,
    }
}

fn has_extension(path: &str, extensions: &[String]) -> bool {
    Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|ext| extensions.iter().any(|x| x.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

/// Load a previously written report and filter it
pub fn load_scan_report(path: &Path, config: &ScannerConfig) -> Result<ScanReport> {
    if !path.is_file() {
        return Err(VulnLensError::FileNotFound {
            path: path.display().to_string(),
        });
    }
    let text = fs::read_to_string(path)?;
    let report: ScanReport =
        serde_json::from_str(&text).map_err(|e| VulnLensError::json(path.display().to_string(), e))?;
    Ok(filter_report(report, config))
}

/// Directory → filtered scan report
pub trait VulnerabilityScanner {
    fn scan(&self, dir: &Path) -> Result<ScanReport>;
}

/// Runs the `mobsfscan` CLI as a subprocess
#[derive(Debug, Clone)]
pub struct MobsfScanner {
    config: ScannerConfig,
    /// Where mobsfscan writes its raw report before filtering
    work_dir: PathBuf,
}

impl MobsfScanner {
    pub fn new(config: ScannerConfig, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            config,
            work_dir: work_dir.into(),
        }
    }

    fn raw_output_path(&self) -> PathBuf {
        self.work_dir.join("mobsf_temp.json")
    }
}

impl VulnerabilityScanner for MobsfScanner {
    fn scan(&self, dir: &Path) -> Result<ScanReport> {
        if !dir.is_dir() {
            return Err(VulnLensError::FileNotFound {
                path: dir.display().to_string(),
            });
        }
        fs::create_dir_all(&self.work_dir)?;
        let raw = self.raw_output_path();
        if raw.exists() {
            fs::remove_file(&raw)?;
        }

        tracing::info!("Running {} on '{}'", self.config.command, dir.display());
        let output = Command::new(&self.config.command)
            .arg("--json")
            .arg("-o")
            .arg(&raw)
            .arg(dir)
            .output()
            .map_err(|e| VulnLensError::ScannerFailure {
                message: format!("failed to run '{}': {}", self.config.command, e),
            })?;

        // mobsfscan exits non-zero whenever it finds something
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::warn!(
                "{} exited with {}, continuing: {}",
                self.config.command,
                output.status,
                truncate_to_char_boundary(stderr.trim(), 300)
            );
        }

        if !raw.is_file() {
            return Err(VulnLensError::ScannerFailure {
                message: format!("{} produced no output file", self.config.command),
            });
        }

        let loaded = load_scan_report(&raw, &self.config);
        if let Err(e) = fs::remove_file(&raw) {
            tracing::debug!("Could not remove {}: {}", raw.display(), e);
        }
        let report = loaded?;

        tracing::info!(
            "Scan complete: {} rules, {} matches",
            report.results.len(),
            report.match_count()
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const RAW_REPORT: &str = r#"{
  "results": {
    "android_logging": {
      "files": [
        {
          "file_path": "app/src/main/java/com/app/BankLogin.java",
          "match_lines": [86, 86],
          "match_position": [9, 38],
          "match_string": "  Log.d(\"Login\", pass);  "
        },
        {
          "file_path": "app/src/main/res/values/strings.xml",
          "match_lines": [3, 3],
          "match_position": [1, 20],
          "match_string": "x"
        }
      ],
      "metadata": {
        "cwe": "CWE-532: Insertion of Sensitive Information into Log File",
        "description": "The App logs information.",
        "masvs": "MSTG-STORAGE-3",
        "severity": "INFO"
      }
    },
    "hardcoded_secret": {
      "files": [
        {"file_path": "app/src/main/java/com/app/Keys.java", "match_lines": [5, 5], "match_string": "KEY"}
      ],
      "metadata": {"severity": "WARNING"}
    },
    "android_manifest_debug": {
      "files": [
        {"file_path": "app/src/main/AndroidManifest.xml", "match_lines": [1, 1], "match_string": "debuggable"}
      ],
      "metadata": {}
    }
  },
  "errors": []
}"#;

    fn raw() -> ScanReport {
        serde_json::from_str(RAW_REPORT).unwrap()
    }

    #[test]
    fn test_filter_report() {
        let report = filter_report(raw(), &ScannerConfig::default());
        let rules: Vec<&str> = report.results.keys().map(String::as_str).collect();
        assert_eq!(rules, vec!["android_logging"]);
        assert_eq!(report.results["android_logging"].files.len(), 1);
        assert_eq!(
            report.results["android_logging"].metadata.extra["masvs"],
            serde_json::json!("MSTG-STORAGE-3")
        );
    }

    #[test]
    fn test_filter_report_respects_config() {
        let config = ScannerConfig {
            skip_rules: Vec::new(),
            extensions: vec!["java".to_string(), "xml".to_string()],
            ..ScannerConfig::default()
        };
        let report = filter_report(raw(), &config);
        assert_eq!(report.results.len(), 3);
        assert_eq!(report.match_count(), 4);
    }

    #[test]
    fn test_findings() {
        let report = filter_report(raw(), &ScannerConfig::default());
        let findings = report.findings();
        assert_eq!(findings.len(), 1);
        let f = &findings[0];
        assert_eq!(f.line, 86);
        assert_eq!(f.vulnerability, "android_logging");
        assert_eq!(f.matched, "Log.d(\"Login\", pass);");
        assert_eq!(f.severity.as_deref(), Some("INFO"));
        assert!(f.cwe.as_deref().unwrap().starts_with("CWE-532"));
    }

    #[test]
    fn test_findings_missing_lines_default_to_zero() {
        let report: ScanReport =
            serde_json::from_str(r#"{"results":{"r":{"files":[{"file_path":"A.java"}]}}}"#).unwrap();
        assert_eq!(report.findings()[0].line, 0);
    }

    #[test]
    fn test_load_scan_report() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("scan.json");
        fs::write(&path, RAW_REPORT).unwrap();

        let report = load_scan_report(&path, &ScannerConfig::default()).unwrap();
        assert_eq!(report.match_count(), 1);

        let missing = load_scan_report(&tmp.path().join("nope.json"), &ScannerConfig::default());
        assert!(matches!(missing, Err(VulnLensError::FileNotFound { .. })));

        fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            load_scan_report(&path, &ScannerConfig::default()),
            Err(VulnLensError::Json { .. })
        ));
    }

    #[test]
    fn test_scan_missing_binary() {
        let tmp = TempDir::new().unwrap();
        let config = ScannerConfig {
            command: "vulnlens-no-such-scanner".to_string(),
            ..ScannerConfig::default()
        };
        let scanner = MobsfScanner::new(config, tmp.path());
        let err = scanner.scan(tmp.path()).unwrap_err();
        assert!(matches!(err, VulnLensError::ScannerFailure { .. }));
    }

    #[cfg(unix)]
    fn fake_scanner(dir: &Path, body: &str) -> String {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("fake-mobsfscan");
        fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path.display().to_string()
    }

    #[cfg(unix)]
    #[test]
    fn test_scan_ignores_leftover_output() {
        let tmp = TempDir::new().unwrap();
        let work = tmp.path().join("work");
        fs::create_dir_all(&work).unwrap();
        fs::write(
            work.join("mobsf_temp.json"),
            r#"{"results":{"stale_rule":{"files":[{"file_path":"A.java","match_lines":[1,1]}]}}}"#,
        )
        .unwrap();

        let config = ScannerConfig {
            command: "false".to_string(),
            ..ScannerConfig::default()
        };
        let err = MobsfScanner::new(config, &work).scan(tmp.path()).unwrap_err();
        assert!(matches!(err, VulnLensError::ScannerFailure { .. }));
        assert!(!work.join("mobsf_temp.json").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_scan_removes_unreadable_output() {
        let tmp = TempDir::new().unwrap();
        let work = tmp.path().join("work");
        let config = ScannerConfig {
            command: fake_scanner(tmp.path(), r#"printf '{not json' > "$3""#),
            ..ScannerConfig::default()
        };
        let err = MobsfScanner::new(config, &work).scan(tmp.path()).unwrap_err();
        assert!(matches!(err, VulnLensError::Json { .. }));
        assert!(!work.join("mobsf_temp.json").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_scan_reads_fresh_output() {
        let tmp = TempDir::new().unwrap();
        let work = tmp.path().join("work");
        let report_src = tmp.path().join("report.json");
        fs::write(&report_src, RAW_REPORT).unwrap();
        let config = ScannerConfig {
            command: fake_scanner(tmp.path(), &format!(r#"cp '{}' "$3"; exit 1"#, report_src.display())),
            ..ScannerConfig::default()
        };
        let report = MobsfScanner::new(config, &work).scan(tmp.path()).unwrap();
        assert_eq!(report.results.keys().collect::<Vec<_>>(), vec!["android_logging"]);
        assert!(!work.join("mobsf_temp.json").exists());
    }
}

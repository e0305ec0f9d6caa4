//! Shared fixtures for the vulnlens integration tests
//!
//! - `TestApp`: a small Android-style source tree in a temp directory
//! - fake `Embedder`, `Summarizer` and `VulnerabilityScanner` implementations so
//!   no test touches the network or needs mobsfscan installed

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use vulnlens::config::ClusterConfig;
use vulnlens::{
    Embedder, EmbeddingClusterer, JavaParser, OutputStore, Pipeline, PipelineConfig, Result, ScanReport,
    Summarizer, SummaryRequest, VulnLensError, VulnerabilityScanner,
};

pub const PACKAGE_DIR: &str = "app/src/main/java/com/app/damnvulnerablebank";

/// Line of the `Log.d` call inside `BankLogin.bankLogin`
pub const LOGIN_LOG_LINE: usize = 86;

/// `BankLogin.java` with `bankLogin` spanning lines 80-89 and a log call at 86
pub fn bank_login_source() -> String {
    let mut lines: Vec<String> = vec![
        "package com.app.damnvulnerablebank;".into(),
        "".into(),
        "import android.util.Log;".into(),
        "".into(),
        "public class BankLogin extends AppCompatActivity {".into(),
        "    @Override".into(),
        "    protected void onCreate(Bundle savedInstanceState) {".into(),
        "        super.onCreate(savedInstanceState);".into(),
        "        setContentView(R.layout.activity_banklogin);".into(),
        "    }".into(),
    ];
    while lines.len() < 79 {
        lines.push(format!("    // login screen notes {}", lines.len() + 1));
    }
    lines.push("    public boolean bankLogin(String user, String pass) {".into()); // 80
    while lines.len() < 85 {
        lines.push("        user = user.trim();".into());
    }
    lines.push("        Log.d(\"Login\", pass);".into()); // 86
    lines.push("        SharedPreferences prefs = getPreferences(0);".into());
    lines.push("        return HttpHelper.post(user, pass);".into());
    lines.push("    }".into()); // 89
    lines.push("}".into());
    lines.join("\n") + "\n"
}

pub const HTTP_HELPER: &str = r#"package com.app.damnvulnerablebank;

public class HttpHelper {
    public static boolean post(String user, String pass) {
        HttpURLConnection net = open("http://bank.local/login");
        return net.send(user + ":" + pass);
    }
}
"#;

pub const API_CLIENT: &str = r#"package com.app.damnvulnerablebank;

public class ApiClient {
    String fetch(String path) {
        return HttpHelper.get(path);
    }
}
"#;

pub const CRYPTO_UTIL: &str = r#"package com.app.damnvulnerablebank;

public class CryptoUtil {
    static byte[] hash(String input) {
        MessageDigest md = MessageDigest.getInstance("MD5");
        return md.digest(input.getBytes());
    }
}
"#;

pub const KEY_STORE: &str = r#"package com.app.damnvulnerablebank;

public class KeyStore {
    String key() {
        return CryptoUtil.hash("k").toString();
    }
}
"#;

/// A temp Android project plus an output directory
pub struct TestApp {
    pub dir: TempDir,
}

impl TestApp {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("temp dir");
        let app = Self { dir };
        app.write("BankLogin.java", &bank_login_source());
        app.write("HttpHelper.java", HTTP_HELPER);
        app.write("ApiClient.java", API_CLIENT);
        app.write("CryptoUtil.java", CRYPTO_UTIL);
        app.write("KeyStore.java", KEY_STORE);
        app
    }

    pub fn write(&self, name: &str, content: &str) {
        let path = self.source_path(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    pub fn app_dir(&self) -> PathBuf {
        self.dir.path().join("dvb")
    }

    pub fn source_path(&self, name: &str) -> PathBuf {
        self.app_dir().join(PACKAGE_DIR).join(name)
    }

    pub fn output_dir(&self) -> PathBuf {
        self.dir.path().join("output")
    }

    pub fn store(&self) -> OutputStore {
        OutputStore::new(self.output_dir())
    }

    /// Scanner report as mobsfscan would write it for this app
    pub fn scan_report(&self) -> ScanReport {
        let login = self.source_path("BankLogin.java").display().to_string();
        let crypto = self.source_path("CryptoUtil.java").display().to_string();
        let json = serde_json::json!({
            "results": {
                "android_logging": {
                    "files": [
                        {
                            "file_path": login,
                            "match_lines": [LOGIN_LOG_LINE, LOGIN_LOG_LINE],
                            "match_position": [9, 30],
                            "match_string": "        Log.d(\"Login\", pass);"
                        },
                        {
                            "file_path": login,
                            "match_lines": [LOGIN_LOG_LINE, LOGIN_LOG_LINE],
                            "match_position": [9, 30],
                            "match_string": "        Log.d(\"Login\", pass);"
                        }
                    ],
                    "metadata": {
                        "cwe": "CWE-532: Insertion of Sensitive Information into Log File",
                        "severity": "INFO",
                        "description": "The App logs information. Sensitive information should never be logged."
                    }
                },
                "android_insecure_random": {
                    "files": [
                        {
                            "file_path": login,
                            "match_lines": [3, 3],
                            "match_position": [1, 24],
                            "match_string": "import android.util.Log;"
                        }
                    ],
                    "metadata": {"severity": "WARNING"}
                },
                "android_md5": {
                    "files": [
                        {
                            "file_path": crypto,
                            "match_lines": [5, 5],
                            "match_position": [9, 60],
                            "match_string": "MessageDigest.getInstance(\"MD5\")"
                        }
                    ],
                    "metadata": {"cwe": "CWE-327", "severity": "WARNING"}
                },
                "hardcoded_secret": {
                    "files": [
                        {"file_path": login, "match_lines": [1, 1], "match_string": "secret"}
                    ],
                    "metadata": {}
                }
            },
            "errors": []
        });
        serde_json::from_value(json).unwrap()
    }

    /// Write the scanner report to disk and return its path
    pub fn write_scan_report(&self) -> PathBuf {
        let path = self.dir.path().join("mobsf_raw.json");
        fs::write(&path, serde_json::to_string_pretty(&self.scan_report()).unwrap()).unwrap();
        path
    }

    /// A pipeline wired with the fakes below
    pub fn pipeline(&self, summarize: bool) -> Pipeline<FixtureScanner, JavaParser, EmbeddingClusterer<KeywordEmbedder>, EchoSummarizer> {
        let config = PipelineConfig::default();
        Pipeline {
            scanner: FixtureScanner {
                report: self.scan_report(),
            },
            parser: JavaParser::new(),
            clusterer: EmbeddingClusterer::new(KeywordEmbedder, ClusterConfig::default(), 4),
            summarizer: summarize.then_some(EchoSummarizer),
            store: self.store(),
            config,
        }
    }
}

/// Returns a canned report after filtering it like the real scanner
pub struct FixtureScanner {
    pub report: ScanReport,
}

impl VulnerabilityScanner for FixtureScanner {
    fn scan(&self, dir: &Path) -> Result<ScanReport> {
        if !dir.is_dir() {
            return Err(VulnLensError::FileNotFound {
                path: dir.display().to_string(),
            });
        }
        Ok(vulnlens::scanner::filter_report(
            self.report.clone(),
            &vulnlens::config::ScannerConfig::default(),
        ))
    }
}

/// Embeds network code and crypto code into two distant regions
pub struct KeywordEmbedder;

impl Embedder for KeywordEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|t| {
                let spread = (t.len() % 5) as f32 * 0.01;
                if t.contains("MessageDigest") || t.contains("CryptoUtil") {
                    vec![0.0 + spread, 1.0]
                } else {
                    vec![1.0 + spread, 0.0]
                }
            })
            .collect())
    }
}

/// Summaries that name their entity
pub struct EchoSummarizer;

impl Summarizer for EchoSummarizer {
    async fn summarize(&self, request: &SummaryRequest) -> Result<String> {
        Ok(format!("Summary of {}", request.key))
    }
}

/// Parse a results.json file
pub fn read_results(path: &Path) -> serde_json::Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

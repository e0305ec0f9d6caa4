//! Report regeneration from persisted outputs

mod common;

use std::fs;

use common::{read_results, TestApp, LOGIN_LOG_LINE};
use vulnlens::config::ScannerConfig;
use vulnlens::schema::{ClusterMethod, SUMMARY_NOT_FOUND};
use vulnlens::{generate_results, ClassCluster, ClusterMembers, OutputStore, ScanSource, VulnLensError};

#[tokio::test]
async fn test_report_regeneration_is_byte_identical() {
    let app = TestApp::new();
    app.pipeline(true).run(&app.app_dir(), &ScanSource::Run).await.unwrap();
    let store = app.store();
    let original = fs::read(store.results_path()).unwrap();

    generate_results(&store, &ScannerConfig::default()).unwrap();
    let first = fs::read(store.results_path()).unwrap();
    generate_results(&store, &ScannerConfig::default()).unwrap();
    let second = fs::read(store.results_path()).unwrap();

    assert_eq!(original, first);
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_legacy_cluster_file_resolves_same_cluster() {
    let app = TestApp::new();
    app.pipeline(true).run(&app.app_dir(), &ScanSource::Run).await.unwrap();
    let store = app.store();
    let before = read_results(&store.results_path());

    // method-level clusters without ids, listing a method of each class
    let legacy = vec![
        ClassCluster {
            cluster_id: None,
            size: 1,
            members: ClusterMembers::Methods {
                methods: vec![ClusterMethod {
                    name: "bankLogin".to_string(),
                    class: "BankLogin".to_string(),
                    file: String::new(),
                }],
            },
        },
        ClassCluster {
            cluster_id: None,
            size: 1,
            members: ClusterMembers::Methods {
                methods: vec![ClusterMethod {
                    name: "key".to_string(),
                    class: "KeyStore".to_string(),
                    file: String::new(),
                }],
            },
        },
        ClassCluster {
            cluster_id: None,
            size: 1,
            members: ClusterMembers::Methods {
                methods: vec![ClusterMethod {
                    name: "hash".to_string(),
                    class: "CryptoUtil".to_string(),
                    file: String::new(),
                }],
            },
        },
    ];
    fs::write(store.clusters_path(), serde_json::to_string_pretty(&legacy).unwrap()).unwrap();
    assert!(fs::read_to_string(store.clusters_path()).unwrap().contains("\"methods\""));

    let document = generate_results(&store, &ScannerConfig::default()).unwrap();
    let login = document
        .results
        .iter()
        .find(|e| e.line == LOGIN_LOG_LINE)
        .unwrap();
    assert_eq!(login.cluster, "cluster_1");
    assert_eq!(
        before["results"].as_array().unwrap().iter().find(|e| e["line"] == LOGIN_LOG_LINE).unwrap()["cluster"],
        "cluster_1"
    );

    // CryptoUtil.hash is listed in the third legacy cluster
    let md5 = document.results.iter().find(|e| e.vulnerability == "android_md5").unwrap();
    assert_eq!(md5.cluster, "cluster_3");
}

#[test]
fn test_report_without_summaries_uses_placeholders() {
    let app = TestApp::new();
    let store = app.store();
    let parsed = vulnlens::parse_project(&app.app_dir(), &vulnlens::JavaParser::new()).unwrap();
    store.save_parsed(&parsed).unwrap();
    store.save_scan(&app.scan_report()).unwrap();
    store.save_clusters(&[]).unwrap();

    let document = generate_results(&store, &ScannerConfig::default()).unwrap();
    assert_eq!(document.results.len(), 3);
    for entry in &document.results {
        assert_eq!(entry.summaries.cluster, SUMMARY_NOT_FOUND);
        assert_eq!(entry.summaries.class, SUMMARY_NOT_FOUND);
    }
    let login = document.results.iter().find(|e| e.line == LOGIN_LOG_LINE).unwrap();
    assert_eq!(login.method, "BankLogin.bankLogin");
    assert_eq!(login.cluster, "unknown");
}

#[test]
fn test_report_requires_persisted_inputs() {
    let tmp = tempfile::TempDir::new().unwrap();
    let store = OutputStore::new(tmp.path());
    let err = generate_results(&store, &ScannerConfig::default()).unwrap_err();
    assert!(matches!(err, VulnLensError::FileNotFound { .. }));
}

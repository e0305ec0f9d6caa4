//! Request fan-out for a whole project
//!
//! Runs in three phases: methods, then classes, then clusters. Cluster prompts
//! are built from the class summaries, so the class phase must finish first.
//! Within a phase requests go through an ordered stream with at most
//! `concurrency` in flight.

use std::collections::{BTreeMap, BTreeSet};

use futures_util::stream::{self, StreamExt};

use crate::callgraph::{CallGraphFacts, ProjectSymbols};
use crate::config::{SummaryConfig, SummaryScope};
use crate::schema::{
    cluster_key, is_placeholder, ClassCluster, MappedFinding, ParsedClass, ParsedFile, Summaries,
    SUMMARY_FAILED_PREFIX,
};
use crate::summarize::prompt::{class_prompt, cluster_prompt, method_prompt, ClusterMember};
use crate::summarize::{SummaryKind, SummaryRequest, Summarizer};

/// Methods and classes that carry at least one finding
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SummaryTargets {
    pub methods: BTreeSet<String>,
    pub classes: BTreeSet<String>,
}

impl SummaryTargets {
    pub fn from_findings(findings: &[MappedFinding]) -> Self {
        let mut targets = Self::default();
        for finding in findings {
            if let Some(method) = &finding.method {
                targets.methods.insert(method.clone());
            }
            if let Some(class) = &finding.class {
                targets.classes.insert(class.clone());
            }
        }
        targets
    }
}

/// Summarize methods, classes and clusters of a project
///
/// Never fails: an entity whose request fails gets a `[summary failed: ...]`
/// placeholder and the batch carries on.
pub async fn summarize_all<S>(
    summarizer: &S,
    files: &[ParsedFile],
    clusters: &[ClassCluster],
    targets: &SummaryTargets,
    config: &SummaryConfig,
    concurrency: usize,
) -> Summaries
where
    S: Summarizer + Sync,
{
    let wants = |set: &BTreeSet<String>, key: &str| config.scope == SummaryScope::All || set.contains(key);
    let symbols = ProjectSymbols::from_files(files);

    // first declaration wins when keys collide (overloads, same-named classes)
    let mut classes: BTreeMap<String, &ParsedClass> = BTreeMap::new();
    let mut method_requests = Vec::new();
    let mut seen_methods = BTreeSet::new();
    for class in files.iter().flat_map(|f| f.classes.iter()) {
        for method in &class.methods {
            let key = method.qualified_name();
            if wants(&targets.methods, &key) && seen_methods.insert(key.clone()) {
                method_requests.push(SummaryRequest {
                    kind: SummaryKind::Method,
                    prompt: method_prompt(method, config),
                    key,
                });
            }
        }
        classes.entry(class.name.clone()).or_insert(class);
    }

    let facts: BTreeMap<&str, CallGraphFacts> = classes
        .iter()
        .map(|(name, class)| (name.as_str(), CallGraphFacts::for_class(class, &symbols)))
        .collect();

    let mut summaries = Summaries::default();

    tracing::info!("Summarizing {} methods", method_requests.len());
    summaries.methods = run_requests(summarizer, method_requests, concurrency).await;

    let class_requests: Vec<SummaryRequest> = classes
        .iter()
        .filter(|(name, _)| wants(&targets.classes, name))
        .map(|(name, class)| SummaryRequest {
            kind: SummaryKind::Class,
            key: name.clone(),
            prompt: class_prompt(class, &facts[name.as_str()], config),
        })
        .collect();
    tracing::info!("Summarizing {} classes", class_requests.len());
    summaries.classes = run_requests(summarizer, class_requests, concurrency).await;

    let cluster_requests: Vec<SummaryRequest> = clusters
        .iter()
        .enumerate()
        .map(|(index, cluster)| {
            let members: Vec<ClusterMember<'_>> = cluster
                .class_names()
                .into_iter()
                .map(|name| ClusterMember {
                    name,
                    summary: summaries
                        .classes
                        .get(name)
                        .map(String::as_str)
                        .filter(|s| !is_placeholder(s)),
                    facts: facts.get(name),
                    code: classes.get(name).map(|c| c.code.as_str()),
                })
                .collect();
            SummaryRequest {
                kind: SummaryKind::Cluster,
                key: cluster_key(cluster.id_at(index)),
                prompt: cluster_prompt(&members, config),
            }
        })
        .collect();
    tracing::info!("Summarizing {} clusters", cluster_requests.len());
    summaries.clusters = run_requests(summarizer, cluster_requests, concurrency).await;

    summaries
}

/// Run requests with bounded concurrency, keeping request order
async fn run_requests<S>(summarizer: &S, requests: Vec<SummaryRequest>, concurrency: usize) -> BTreeMap<String, String>
where
    S: Summarizer + Sync,
{
    let total = requests.len();
    let results: Vec<(String, String)> = stream::iter(requests)
        .map(|request| async move {
            let text = match summarizer.summarize(&request).await {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!("Failed to summarize {} {}: {}", request.kind, request.key, e);
                    failure_placeholder(&e.to_string())
                }
            };
            (request.key, text)
        })
        .buffered(concurrency.max(1))
        .collect()
        .await;

    let failed = results.iter().filter(|(_, text)| is_placeholder(text)).count();
    if failed > 0 {
        tracing::warn!("{} of {} summaries failed", failed, total);
    }
    results.into_iter().collect()
}

/// `[summary failed: <reason>]`
pub fn failure_placeholder(reason: &str) -> String {
    format!("{}: {}]", SUMMARY_FAILED_PREFIX, reason)
}

//! Class clustering stage
//!
//! Groups the project's classes by semantic similarity of their source. The
//! default [`EmbeddingClusterer`] embeds each class body, sweeps k over the
//! configured range with deterministic k-means and keeps the labelling with the
//! best silhouette score.

pub mod kmeans;
pub mod metrics;

use std::future::Future;

use crate::config::ClusterConfig;
use crate::embedding::{embed_all, Embedder};
use crate::error::Result;
use crate::schema::{ClassCluster, ClusterClass, ParsedClass};
use crate::utils::truncate_to_char_boundary;

use metrics::{relabel_by_appearance, select_k};

/// Classes → clusters capability
pub trait ClassClusterer {
    fn cluster(&self, classes: &[ParsedClass]) -> impl Future<Output = Result<Vec<ClassCluster>>> + Send;
}

/// [`ClassClusterer`] built on an [`Embedder`] and k-means
#[derive(Debug, Clone)]
pub struct EmbeddingClusterer<E> {
    embedder: E,
    config: ClusterConfig,
    batch_size: usize,
}

impl<E: Embedder + Sync> EmbeddingClusterer<E> {
    pub fn new(embedder: E, config: ClusterConfig, batch_size: usize) -> Self {
        Self {
            embedder,
            config,
            batch_size,
        }
    }
}

impl<E: Embedder + Sync> ClassClusterer for EmbeddingClusterer<E> {
    async fn cluster(&self, classes: &[ParsedClass]) -> Result<Vec<ClassCluster>> {
        tracing::info!("Embedding {} classes", classes.len());
        let texts: Vec<String> = classes
            .iter()
            .map(|c| truncate_to_char_boundary(&c.code, self.config.max_embed_chars).to_string())
            .collect();
        let vectors = embed_all(&self.embedder, &texts, self.batch_size).await;

        let mut members: Vec<&ParsedClass> = Vec::new();
        let mut points: Vec<Vec<f32>> = Vec::new();
        for (class, vector) in classes.iter().zip(vectors) {
            match vector {
                Some(v) => {
                    members.push(class);
                    points.push(v);
                }
                None => tracing::warn!("Excluding class {} ({}) from clustering: no embedding", class.name, class.file),
            }
        }

        if members.is_empty() && !classes.is_empty() {
            tracing::warn!("No class could be embedded, using a single cluster for all {}", classes.len());
            let all: Vec<&ParsedClass> = classes.iter().collect();
            return Ok(single_cluster(&all));
        }

        let points = match consistent_dimensions(points, &members) {
            Some(points) => points,
            None => return Ok(single_cluster(&members)),
        };

        Ok(cluster_points(&members, &points, &self.config))
    }
}

/// Drop a batch of vectors whose dimensions disagree; a mixed set cannot be clustered
fn consistent_dimensions(points: Vec<Vec<f32>>, members: &[&ParsedClass]) -> Option<Vec<Vec<f32>>> {
    let dim = points.first().map(|p| p.len())?;
    if points.iter().all(|p| p.len() == dim) {
        Some(points)
    } else {
        tracing::warn!(
            "Embeddings for {} classes have inconsistent dimensions, using a single cluster",
            members.len()
        );
        None
    }
}

/// Cluster already-embedded classes
///
/// With fewer points than the k range admits, every class goes into cluster 1.
pub fn cluster_points(members: &[&ParsedClass], points: &[Vec<f32>], config: &ClusterConfig) -> Vec<ClassCluster> {
    if members.is_empty() {
        tracing::warn!("No classes to cluster");
        return Vec::new();
    }

    let Some(selection) = select_k(points, config.min_k, config.max_k, config.max_iterations) else {
        tracing::info!(
            "{} classes is too few for k >= {}, using a single cluster",
            members.len(),
            config.min_k
        );
        return single_cluster(members);
    };

    tracing::info!("Selected k={} (silhouette {:.4})", selection.k, selection.score);
    let ids = relabel_by_appearance(&selection.labels);
    group_by_id(members, &ids)
}

fn single_cluster(members: &[&ParsedClass]) -> Vec<ClassCluster> {
    if members.is_empty() {
        return Vec::new();
    }
    vec![ClassCluster::of_classes(1, members.iter().map(|c| cluster_class(c)).collect())]
}

/// Bucket classes by their 1-based id; ids are dense so the cluster list is ordered by id
fn group_by_id(members: &[&ParsedClass], ids: &[u32]) -> Vec<ClassCluster> {
    let count = ids.iter().copied().max().unwrap_or(0) as usize;
    let mut buckets: Vec<Vec<ClusterClass>> = vec![Vec::new(); count];
    for (class, &id) in members.iter().zip(ids) {
        buckets[id as usize - 1].push(cluster_class(class));
    }

    buckets
        .into_iter()
        .enumerate()
        .map(|(i, classes)| ClassCluster::of_classes(i as u32 + 1, classes))
        .collect()
}

fn cluster_class(class: &ParsedClass) -> ClusterClass {
    ClusterClass {
        name: class.name.clone(),
        file: class.file.clone(),
        num_methods: class.methods.len(),
    }
}

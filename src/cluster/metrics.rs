//! Distance and cluster quality metrics

use rayon::prelude::*;

use crate::cluster::kmeans::kmeans;

pub fn squared_euclidean(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

pub fn euclidean(a: &[f64], b: &[f64]) -> f64 {
    squared_euclidean(a, b).sqrt()
}

/// Mean silhouette coefficient of a labelling
///
/// For each point, `a` is the mean distance to the rest of its own cluster and
/// `b` the smallest mean distance to any other cluster; the point scores
/// `(b - a) / max(a, b)`. Points in singleton clusters score 0. Returns `None`
/// when fewer than two clusters are populated.
pub fn silhouette_score(points: &[Vec<f64>], labels: &[usize]) -> Option<f64> {
    let n = points.len();
    let k = labels.iter().copied().max().map(|m| m + 1).unwrap_or(0);
    let mut sizes = vec![0usize; k];
    for &l in labels {
        sizes[l] += 1;
    }
    if sizes.iter().filter(|&&s| s > 0).count() < 2 {
        return None;
    }

    let total: f64 = (0..n)
        .into_par_iter()
        .map(|i| {
            let own = labels[i];
            if sizes[own] <= 1 {
                return 0.0;
            }

            let mut sums = vec![0.0f64; k];
            for j in 0..n {
                if i != j {
                    sums[labels[j]] += euclidean(&points[i], &points[j]);
                }
            }

            let a = sums[own] / (sizes[own] - 1) as f64;
            let b = (0..k)
                .filter(|&c| c != own && sizes[c] > 0)
                .map(|c| sums[c] / sizes[c] as f64)
                .fold(f64::INFINITY, f64::min);

            let denom = a.max(b);
            if denom > 0.0 {
                (b - a) / denom
            } else {
                0.0
            }
        })
        .sum();

    Some(total / n as f64)
}

/// Outcome of the k sweep
#[derive(Debug, Clone, PartialEq)]
pub struct KSelection {
    pub k: usize,
    pub labels: Vec<usize>,
    pub score: f64,
}

/// Try every k in `min_k..=min(max_k, n - 1)` and keep the best silhouette
///
/// Candidates run in parallel; ties go to the smallest k. Returns `None` when
/// the range is empty or no candidate yields a defined score.
pub fn select_k(points: &[Vec<f32>], min_k: usize, max_k: usize, max_iterations: usize) -> Option<KSelection> {
    let n = points.len();
    if n < 3 {
        return None;
    }
    let lo = min_k.max(2);
    let hi = max_k.min(n - 1);
    if lo > hi {
        return None;
    }

    let data: Vec<Vec<f64>> = points
        .iter()
        .map(|p| p.iter().map(|&x| x as f64).collect())
        .collect();

    let candidates: Vec<KSelection> = (lo..=hi)
        .into_par_iter()
        .filter_map(|k| {
            let result = kmeans(points, k, max_iterations);
            let score = silhouette_score(&data, &result.labels)?;
            tracing::debug!("k={} silhouette={:.4}", k, score);
            Some(KSelection {
                k,
                labels: result.labels,
                score,
            })
        })
        .collect();

    // collect keeps k order, so the first maximum is the smallest k
    let mut best: Option<KSelection> = None;
    for candidate in candidates {
        if best.as_ref().map(|b| candidate.score > b.score).unwrap_or(true) {
            best = Some(candidate);
        }
    }
    best
}

/// Renumber labels 1.. in order of first appearance
pub fn relabel_by_appearance(labels: &[usize]) -> Vec<u32> {
    let mut mapping: Vec<Option<u32>> = Vec::new();
    let mut next = 1u32;
    labels
        .iter()
        .map(|&l| {
            if l >= mapping.len() {
                mapping.resize(l + 1, None);
            }
            *mapping[l].get_or_insert_with(|| {
                let id = next;
                next += 1;
                id
            })
        })
        .collect()
}

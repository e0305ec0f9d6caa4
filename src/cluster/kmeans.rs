//! Deterministic k-means
//!
//! Seeding is farthest-first traversal starting from the point closest to the
//! global mean, so a given input and k always produce the same labels. Lloyd
//! iterations then run until assignments stop changing or the iteration cap is
//! hit.

use crate::cluster::metrics::squared_euclidean;

/// Result of one k-means run
#[derive(Debug, Clone, PartialEq)]
pub struct KMeansResult {
    /// Cluster index per input point, in `0..k`
    pub labels: Vec<usize>,
    pub centroids: Vec<Vec<f64>>,
    /// Sum of squared distances of points to their centroid
    pub inertia: f64,
    pub iterations: usize,
}

/// Run k-means over `points` (all of equal dimension)
///
/// `k` is clamped to `1..=points.len()`. Empty input yields an empty result.
pub fn kmeans(points: &[Vec<f32>], k: usize, max_iterations: usize) -> KMeansResult {
    let n = points.len();
    if n == 0 {
        return KMeansResult {
            labels: Vec::new(),
            centroids: Vec::new(),
            inertia: 0.0,
            iterations: 0,
        };
    }
    let k = k.clamp(1, n);
    let data: Vec<Vec<f64>> = points
        .iter()
        .map(|p| p.iter().map(|&x| x as f64).collect())
        .collect();

    let mut centroids = seed_centroids(&data, k);
    let mut labels = vec![usize::MAX; n];
    let mut iterations = 0;

    while iterations < max_iterations.max(1) {
        iterations += 1;
        let changed = assign(&data, &centroids, &mut labels);
        if !changed && iterations > 1 {
            break;
        }
        update_centroids(&data, &mut labels, &mut centroids);
    }

    let inertia: f64 = data
        .iter()
        .zip(&labels)
        .map(|(p, &l)| squared_euclidean(p, &centroids[l]))
        .sum();

    KMeansResult {
        labels,
        centroids,
        inertia,
        iterations,
    }
}

/// Farthest-first seeding
fn seed_centroids(data: &[Vec<f64>], k: usize) -> Vec<Vec<f64>> {
    let mean = centroid_of(data.iter());
    let first = argmin(data.iter().map(|p| squared_euclidean(p, &mean)));

    let mut centroids = vec![data[first].clone()];
    let mut nearest: Vec<f64> = data.iter().map(|p| squared_euclidean(p, &data[first])).collect();

    while centroids.len() < k {
        let next = argmax(nearest.iter().copied());
        let center = data[next].clone();
        for (d, p) in nearest.iter_mut().zip(data) {
            *d = d.min(squared_euclidean(p, &center));
        }
        centroids.push(center);
    }
    centroids
}

/// Assign each point to its nearest centroid; returns whether any label changed
fn assign(data: &[Vec<f64>], centroids: &[Vec<f64>], labels: &mut [usize]) -> bool {
    let mut changed = false;
    for (point, label) in data.iter().zip(labels.iter_mut()) {
        let best = argmin(centroids.iter().map(|c| squared_euclidean(point, c)));
        if *label != best {
            *label = best;
            changed = true;
        }
    }
    changed
}

/// Move centroids to the mean of their members
///
/// An empty cluster is re-seeded with the point farthest from its own centroid.
fn update_centroids(data: &[Vec<f64>], labels: &mut [usize], centroids: &mut [Vec<f64>]) {
    for c in 0..centroids.len() {
        let members = data.iter().zip(labels.iter()).filter(|(_, &l)| l == c).map(|(p, _)| p);
        let mut members = members.peekable();
        if members.peek().is_some() {
            centroids[c] = centroid_of(members);
            continue;
        }

        let far = argmax(
            data.iter()
                .zip(labels.iter())
                .map(|(p, &l)| squared_euclidean(p, &centroids[l])),
        );
        centroids[c] = data[far].clone();
        labels[far] = c;
    }
}

fn centroid_of<'a>(points: impl Iterator<Item = &'a Vec<f64>>) -> Vec<f64> {
    let mut sum: Vec<f64> = Vec::new();
    let mut count = 0usize;
    for p in points {
        if sum.is_empty() {
            sum = vec![0.0; p.len()];
        }
        for (s, x) in sum.iter_mut().zip(p) {
            *s += x;
        }
        count += 1;
    }
    if count > 0 {
        for s in sum.iter_mut() {
            *s /= count as f64;
        }
    }
    sum
}

/// Index of the smallest value; first wins ties
fn argmin(values: impl Iterator<Item = f64>) -> usize {
    let mut best = 0;
    let mut best_value = f64::INFINITY;
    for (i, v) in values.enumerate() {
        if v < best_value {
            best = i;
            best_value = v;
        }
    }
    best
}

/// Index of the largest value; first wins ties
fn argmax(values: impl Iterator<Item = f64>) -> usize {
    let mut best = 0;
    let mut best_value = f64::NEG_INFINITY;
    for (i, v) in values.enumerate() {
        if v > best_value {
            best = i;
            best_value = v;
        }
    }
    best
}

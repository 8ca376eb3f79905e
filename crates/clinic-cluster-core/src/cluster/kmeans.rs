//! Lloyd's k-means with k-means++ seeding.
//!
//! Samples carry an opaque tag through the computation so callers get their
//! own identifiers back in each cluster without any matching step.

use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;

use super::features::FeatureVector;

/// K-means errors.
#[derive(Error, Debug, PartialEq)]
pub enum KMeansError {
    #[error("invalid cluster count {k} for {samples} samples")]
    InvalidK { k: usize, samples: usize },

    #[error("sample {index} has {found} features, expected {expected}")]
    DimensionMismatch {
        index: usize,
        expected: usize,
        found: usize,
    },
}

pub type KMeansResult<T> = Result<T, KMeansError>;

/// K-means parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct KMeansConfig {
    /// Number of clusters
    pub k: usize,
    /// Iteration cap per restart
    pub max_iterations: usize,
    /// Stop once no centroid moves further than this
    pub tolerance: f64,
    /// Restarts; the lowest inertia wins
    pub n_init: usize,
    /// RNG seed for reproducible runs
    pub seed: Option<u64>,
}

impl KMeansConfig {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            max_iterations: 300,
            tolerance: 1e-4,
            n_init: 10,
            seed: None,
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_n_init(mut self, n_init: usize) -> Self {
        self.n_init = n_init;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// A feature vector with its caller-defined tag.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample<T> {
    pub tag: T,
    pub vector: FeatureVector,
}

impl<T> Sample<T> {
    pub fn new(tag: T, vector: FeatureVector) -> Self {
        Self { tag, vector }
    }
}

/// One output group.
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster<T> {
    pub label: usize,
    pub centroid: Vec<f64>,
    pub members: Vec<Sample<T>>,
}

/// Result of partitioning a sample set.
#[derive(Debug, Clone, PartialEq)]
pub struct Partition<T> {
    /// Exactly `k` non-empty clusters, indexed by label
    pub clusters: Vec<Cluster<T>>,
    /// Within-cluster sum of squared distances
    pub inertia: f64,
    /// Lloyd iterations of the kept restart
    pub iterations: usize,
}

impl<T> Partition<T> {
    pub fn cluster_sizes(&self) -> Vec<usize> {
        self.clusters.iter().map(|c| c.members.len()).collect()
    }
}

/// Fitted state of one restart.
struct Fit {
    labels: Vec<usize>,
    centroids: Vec<Vec<f64>>,
    inertia: f64,
    iterations: usize,
}

/// Partition samples into `config.k` non-empty clusters.
///
/// Distances are Euclidean over the raw vector values.
pub fn partition<T>(samples: Vec<Sample<T>>, config: &KMeansConfig) -> KMeansResult<Partition<T>> {
    let n = samples.len();
    if config.k == 0 || config.k > n {
        return Err(KMeansError::InvalidK {
            k: config.k,
            samples: n,
        });
    }

    let dim = samples[0].vector.len();
    if let Some((index, sample)) = samples
        .iter()
        .enumerate()
        .find(|(_, s)| s.vector.len() != dim)
    {
        return Err(KMeansError::DimensionMismatch {
            index,
            expected: dim,
            found: sample.vector.len(),
        });
    }

    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let data: Vec<&[f64]> = samples.iter().map(|s| s.vector.as_slice()).collect();
    let mut best: Option<Fit> = None;
    for restart in 0..config.n_init.max(1) {
        let fit = lloyd(&data, config, &mut rng);
        tracing::debug!(
            restart,
            inertia = fit.inertia,
            iterations = fit.iterations,
            "k-means restart finished"
        );
        if best.as_ref().map_or(true, |b| fit.inertia < b.inertia) {
            best = Some(fit);
        }
    }
    let Fit {
        labels,
        centroids,
        inertia,
        iterations,
    } = match best {
        Some(fit) => fit,
        None => lloyd(&data, config, &mut rng),
    };

    let mut clusters: Vec<Cluster<T>> = centroids
        .into_iter()
        .enumerate()
        .map(|(label, centroid)| Cluster {
            label,
            centroid,
            members: Vec::new(),
        })
        .collect();
    for (sample, label) in samples.into_iter().zip(labels) {
        clusters[label].members.push(sample);
    }

    Ok(Partition {
        clusters,
        inertia,
        iterations,
    })
}

/// One seeded run of Lloyd's algorithm.
fn lloyd<R: Rng>(data: &[&[f64]], config: &KMeansConfig, rng: &mut R) -> Fit {
    let k = config.k;
    let mut centroids = seed_centroids(data, k, rng);

    let mut labels: Vec<usize> = data.iter().map(|p| nearest(p, &centroids)).collect();
    fill_empty_clusters(data, &mut centroids, &mut labels);
    update_centroids(data, &labels, &mut centroids);

    let mut iterations = 1;
    while iterations < config.max_iterations {
        iterations += 1;

        let mut changed = reassign(data, &centroids, &mut labels);
        changed |= fill_empty_clusters(data, &mut centroids, &mut labels);
        let max_shift_sq = update_centroids(data, &labels, &mut centroids);

        if !changed || max_shift_sq < config.tolerance * config.tolerance {
            break;
        }
    }

    let inertia = data
        .iter()
        .zip(&labels)
        .map(|(p, &label)| distance_sq(p, &centroids[label]))
        .sum();

    Fit {
        labels,
        centroids,
        inertia,
        iterations,
    }
}

/// k-means++: each next seed is drawn with probability proportional to its
/// squared distance from the nearest seed so far.
fn seed_centroids<R: Rng>(data: &[&[f64]], k: usize, rng: &mut R) -> Vec<Vec<f64>> {
    let n = data.len();
    let first = rng.gen_range(0..n);
    let mut chosen = vec![first];
    let mut closest: Vec<f64> = data.iter().map(|p| distance_sq(p, data[first])).collect();

    while chosen.len() < k {
        let next = match WeightedIndex::new(&closest) {
            Ok(weights) => weights.sample(rng),
            // Every point coincides with a seed; fall back to an unused index.
            Err(_) => {
                let unused: Vec<usize> = (0..n).filter(|i| !chosen.contains(i)).collect();
                unused[rng.gen_range(0..unused.len())]
            }
        };
        chosen.push(next);
        for (i, p) in data.iter().enumerate() {
            let d = distance_sq(p, data[next]);
            if d < closest[i] {
                closest[i] = d;
            }
        }
    }

    chosen.into_iter().map(|i| data[i].to_vec()).collect()
}

/// Index of the closest centroid; ties go to the lowest index.
fn nearest(point: &[f64], centroids: &[Vec<f64>]) -> usize {
    let mut best = 0;
    let mut best_dist = f64::INFINITY;
    for (idx, centroid) in centroids.iter().enumerate() {
        let dist = distance_sq(point, centroid);
        if dist < best_dist {
            best_dist = dist;
            best = idx;
        }
    }
    best
}

/// Move points to a strictly closer centroid. Returns whether any moved.
fn reassign(data: &[&[f64]], centroids: &[Vec<f64>], labels: &mut [usize]) -> bool {
    let mut changed = false;
    for (point, label) in data.iter().zip(labels.iter_mut()) {
        let mut best = *label;
        let mut best_dist = distance_sq(point, &centroids[best]);
        for (idx, centroid) in centroids.iter().enumerate() {
            let dist = distance_sq(point, centroid);
            if dist < best_dist {
                best_dist = dist;
                best = idx;
            }
        }
        if best != *label {
            *label = best;
            changed = true;
        }
    }
    changed
}

/// Give every empty cluster the point farthest from its centroid among
/// clusters that can spare one. Requires `data.len() >= centroids.len()`.
fn fill_empty_clusters(data: &[&[f64]], centroids: &mut [Vec<f64>], labels: &mut [usize]) -> bool {
    let k = centroids.len();
    let mut counts = vec![0usize; k];
    for &label in labels.iter() {
        counts[label] += 1;
    }

    let mut changed = false;
    for cluster in 0..k {
        if counts[cluster] > 0 {
            continue;
        }
        let donor = (0..data.len())
            .filter(|&i| counts[labels[i]] > 1)
            .max_by(|&a, &b| {
                let da = distance_sq(data[a], &centroids[labels[a]]);
                let db = distance_sq(data[b], &centroids[labels[b]]);
                da.total_cmp(&db)
            });
        if let Some(i) = donor {
            counts[labels[i]] -= 1;
            counts[cluster] += 1;
            labels[i] = cluster;
            centroids[cluster] = data[i].to_vec();
            changed = true;
        }
    }
    changed
}

/// Recompute centroids as member means. Returns the largest squared shift.
fn update_centroids(data: &[&[f64]], labels: &[usize], centroids: &mut [Vec<f64>]) -> f64 {
    let k = centroids.len();
    let dim = centroids.first().map_or(0, Vec::len);
    let mut sums = vec![vec![0.0; dim]; k];
    let mut counts = vec![0usize; k];
    for (point, &label) in data.iter().zip(labels) {
        counts[label] += 1;
        for (sum, value) in sums[label].iter_mut().zip(point.iter()) {
            *sum += value;
        }
    }

    let mut max_shift_sq: f64 = 0.0;
    for (cluster, sum) in sums.into_iter().enumerate() {
        if counts[cluster] == 0 {
            continue;
        }
        let mean: Vec<f64> = sum.into_iter().map(|s| s / counts[cluster] as f64).collect();
        max_shift_sq = max_shift_sq.max(distance_sq(&centroids[cluster], &mean));
        centroids[cluster] = mean;
    }
    max_shift_sq
}

/// Squared Euclidean distance.
pub fn distance_sq(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b.iter())
        .fold(0.0, |acc, (&x, &y)| acc + (x - y).powi(2))
}

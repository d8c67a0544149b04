//! Two-class intensity clustering over the disk inscribed in the crop.
//!
//! Cluster identity carries no meaning here: which label ends up as 255 is
//! an accident of initialization. The side classifier decides later which
//! half is the object from mean intensities on the original grid.

use image::{GrayImage, Luma};
use rand::prelude::*;
use serde::{Deserialize, Serialize};

use crate::preprocess::FloatImage;

/// k-means parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// RNG seed for centroid initialization; `None` seeds from entropy.
    pub seed: Option<u64>,
    /// Maximum Lloyd iterations.
    pub max_iters: usize,
    /// Stop once both centroids move less than this.
    pub tolerance: f64,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            seed: None,
            max_iters: 100,
            tolerance: 1e-4,
        }
    }
}

/// Result of clustering one crop.
#[derive(Debug, Clone)]
pub struct Clustering {
    /// Binary image: 255 for cluster 1, 0 for cluster 0 and outside the disk.
    pub binary: GrayImage,
    /// Final centroids `[c0, c1]`.
    pub centroids: [f64; 2],
    /// Lloyd iterations actually run.
    pub iterations: usize,
}

#[inline]
fn in_disk(col: i64, row: i64, r: i64) -> bool {
    let dr = row - r;
    let dc = col - r;
    dr * dr + dc * dc <= r * r
}

/// Nearest-centroid label; ties go to cluster 0.
#[inline]
fn assign(v: f64, centroids: &[f64; 2]) -> usize {
    if (v - centroids[1]).abs() < (v - centroids[0]).abs() {
        1
    } else {
        0
    }
}

/// Pick two initial centroids from the samples, preferring distinct values.
fn init_centroids(values: &[f64], rng: &mut StdRng) -> [f64; 2] {
    let first = values[rng.gen_range(0..values.len())];
    // k-means++ style: second centroid drawn proportionally to squared gap.
    let weights: Vec<f64> = values.iter().map(|v| (v - first) * (v - first)).collect();
    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        return [first, first];
    }
    let mut target = rng.gen::<f64>() * total;
    for (v, w) in values.iter().zip(&weights) {
        if target < *w {
            return [first, *v];
        }
        target -= w;
    }
    let far = values
        .iter()
        .copied()
        .max_by(|a, b| (a - first).abs().total_cmp(&(b - first).abs()))
        .unwrap_or(first);
    [first, far]
}

/// Cluster the pixels of the disk `(row-r)² + (col-r)² <= r²`,
/// `r = diameter / 2`, into two intensity classes.
pub fn cluster_disk(crop: &FloatImage, diameter: u32, config: &ClusterConfig) -> Clustering {
    let r = (diameter / 2) as i64;
    let (w, h) = crop.dimensions();

    let mut coords = Vec::new();
    let mut values = Vec::new();
    for row in 0..h {
        for col in 0..w {
            if in_disk(col as i64, row as i64, r) {
                coords.push((col, row));
                values.push(crop.get_pixel(col, row)[0] as f64);
            }
        }
    }

    let mut binary = GrayImage::new(w, h);
    if values.is_empty() {
        return Clustering {
            binary,
            centroids: [0.0, 0.0],
            iterations: 0,
        };
    }

    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let mut centroids = init_centroids(&values, &mut rng);

    let mut iterations = 0;
    for _ in 0..config.max_iters.max(1) {
        iterations += 1;
        let mut sum = [0.0f64; 2];
        let mut count = [0usize; 2];
        for &v in &values {
            let k = assign(v, &centroids);
            sum[k] += v;
            count[k] += 1;
        }
        let mut next = centroids;
        for k in 0..2 {
            if count[k] > 0 {
                next[k] = sum[k] / count[k] as f64;
            }
        }
        let shift = (next[0] - centroids[0])
            .abs()
            .max((next[1] - centroids[1]).abs());
        centroids = next;
        if shift < config.tolerance {
            break;
        }
    }

    for (&(col, row), &v) in coords.iter().zip(&values) {
        if assign(v, &centroids) == 1 {
            binary.put_pixel(col, row, Luma([255]));
        }
    }

    tracing::debug!(
        "k-means converged in {} iterations, centroids {:.2} / {:.2}",
        iterations,
        centroids[0],
        centroids[1]
    );

    Clustering {
        binary,
        centroids,
        iterations,
    }
}

//! SMOTE oversampling

use super::neighbors::k_nearest;
use super::{class_counts, class_indices, ResampleResult, Sampler};
use crate::error::{FraudError, Result};
use ndarray::{Array1, Array2, ArrayView1};
use rand::prelude::*;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// SMOTE (Synthetic Minority Over-sampling Technique)
///
/// Every class below the majority count is grown to that count by
/// interpolating between a random class member and one of its
/// `k_neighbors` nearest same-class neighbours.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Smote {
    /// Number of nearest neighbors
    k_neighbors: usize,
    /// Random seed
    seed: Option<u64>,
    /// Target samples per class
    #[serde(skip)]
    target_counts: Option<BTreeMap<i64, usize>>,
}

impl Smote {
    /// Create new SMOTE sampler
    pub fn new() -> Self {
        Self {
            k_neighbors: 5,
            seed: None,
            target_counts: None,
        }
    }

    /// Set number of neighbors
    pub fn with_k_neighbors(mut self, k: usize) -> Self {
        self.k_neighbors = k.max(1);
        self
    }

    /// Set random seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn k_neighbors(&self) -> usize {
        self.k_neighbors
    }

    /// Generate synthetic sample between two points
    fn generate_sample(point: ArrayView1<f64>, neighbor: ArrayView1<f64>, rng: &mut StdRng) -> Vec<f64> {
        let gap: f64 = rng.gen();
        point
            .iter()
            .zip(neighbor.iter())
            .map(|(&p, &n)| p + gap * (n - p))
            .collect()
    }
}

impl Default for Smote {
    fn default() -> Self {
        Self::new()
    }
}

impl Sampler for Smote {
    fn fit(&mut self, _x: &Array2<f64>, y: &Array1<i64>) -> Result<()> {
        let counts = class_counts(y);

        if counts.len() < 2 {
            return Err(FraudError::ResamplingError(format!(
                "need at least 2 classes for SMOTE, got {}",
                counts.len()
            )));
        }

        let max_count = counts.values().copied().max().unwrap_or(0);
        let targets = counts.keys().map(|&class| (class, max_count)).collect();

        self.target_counts = Some(targets);
        Ok(())
    }

    fn resample(&self, x: &Array2<f64>, y: &Array1<i64>) -> Result<ResampleResult> {
        let targets = self
            .target_counts
            .as_ref()
            .ok_or_else(|| FraudError::ResamplingError("SMOTE not fitted".to_string()))?;

        if x.nrows() != y.len() {
            return Err(FraudError::ShapeError {
                expected: format!("{} label rows", x.nrows()),
                actual: y.len().to_string(),
            });
        }

        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let indices = class_indices(y);
        let n_features = x.ncols();

        // Collect only synthetic samples (original data reused from x directly)
        let mut synthetic_x: Vec<Vec<f64>> = Vec::new();
        let mut synthetic_y: Vec<i64> = Vec::new();
        let mut n_synthetic = BTreeMap::new();

        for (&class, &target_count) in targets {
            let class_idx = match indices.get(&class) {
                Some(idx) => idx,
                None => continue,
            };
            let n_to_generate = target_count.saturating_sub(class_idx.len());
            n_synthetic.insert(class, n_to_generate);

            if n_to_generate == 0 {
                continue;
            }

            if class_idx.len() == 1 {
                warn!(class, n_to_generate, "single-sample class, duplicating instead of interpolating");
                let row = x.row(class_idx[0]).to_vec();
                for _ in 0..n_to_generate {
                    synthetic_x.push(row.clone());
                    synthetic_y.push(class);
                }
                continue;
            }

            let k = self.k_neighbors.min(class_idx.len() - 1);
            let neighbors: Vec<Vec<usize>> = class_idx
                .par_iter()
                .map(|&i| k_nearest(x, i, class_idx, k))
                .collect();

            for _ in 0..n_to_generate {
                let pos = rng.gen_range(0..class_idx.len());
                let own = &neighbors[pos];
                let neighbor = own[rng.gen_range(0..own.len())];

                synthetic_x.push(Self::generate_sample(x.row(class_idx[pos]), x.row(neighbor), &mut rng));
                synthetic_y.push(class);
            }

            debug!(class, n_to_generate, k, "generated synthetic samples");
        }

        // Build result: original rows + synthetic rows using from_shape_fn
        let n_original = x.nrows();
        let n_total = n_original + synthetic_x.len();
        let result_x = Array2::from_shape_fn((n_total, n_features), |(i, j)| {
            if i < n_original {
                x[[i, j]]
            } else {
                synthetic_x[i - n_original][j]
            }
        });

        let mut all_y: Vec<i64> = y.iter().copied().collect();
        all_y.extend_from_slice(&synthetic_y);

        Ok(ResampleResult {
            x: result_x,
            y: Array1::from_vec(all_y),
            n_synthetic,
            n_removed: BTreeMap::new(),
        })
    }
}

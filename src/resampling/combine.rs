//! Combined over- and under-sampling

use super::enn::{CleaningTarget, EditedNearestNeighbours, EnnSelection};
use super::smote::Smote;
use super::{ResampleResult, Sampler};
use crate::error::Result;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use tracing::info;

/// SMOTE oversampling followed by Edited Nearest Neighbours cleaning
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SmoteEnn {
    smote: Smote,
    enn: EditedNearestNeighbours,
}

impl SmoteEnn {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set random seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.smote = self.smote.with_seed(seed);
        self
    }

    /// Set k neighbors for SMOTE
    pub fn with_k_neighbors(mut self, k: usize) -> Self {
        self.smote = self.smote.with_k_neighbors(k);
        self
    }

    /// Set neighbourhood size for ENN
    pub fn with_enn_neighbors(mut self, n: usize) -> Self {
        self.enn = self.enn.with_n_neighbors(n);
        self
    }

    pub fn with_enn_selection(mut self, selection: EnnSelection) -> Self {
        self.enn = self.enn.with_selection(selection);
        self
    }

    pub fn with_enn_target(mut self, target: CleaningTarget) -> Self {
        self.enn = self.enn.with_target(target);
        self
    }
}

impl Sampler for SmoteEnn {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<i64>) -> Result<()> {
        self.smote.fit(x, y)
    }

    fn resample(&self, x: &Array2<f64>, y: &Array1<i64>) -> Result<ResampleResult> {
        let oversampled = self.smote.resample(x, y)?;
        let cleaned = self.enn.resample(&oversampled.x, &oversampled.y)?;

        info!(
            before = y.len(),
            synthetic = oversampled.n_synthetic.values().sum::<usize>(),
            removed = cleaned.n_removed.values().sum::<usize>(),
            after = cleaned.y.len(),
            "smoteenn resampled"
        );

        Ok(ResampleResult {
            x: cleaned.x,
            y: cleaned.y,
            n_synthetic: oversampled.n_synthetic,
            n_removed: cleaned.n_removed,
        })
    }
}

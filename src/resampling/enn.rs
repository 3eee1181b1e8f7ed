//! Edited Nearest Neighbours undersampling

use super::neighbors::k_nearest;
use super::{class_counts, class_indices, ResampleResult, Sampler};
use crate::error::{FraudError, Result};
use ndarray::{Array1, Array2, Axis};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Rule deciding whether a sample disagrees with its neighbourhood
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnnSelection {
    /// Keep only if every neighbour shares the label
    All,
    /// Keep if the most common neighbour label is the sample's own
    Mode,
}

/// Which classes are eligible for cleaning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CleaningTarget {
    /// Every class
    All,
    /// Every class except the smallest one
    NotMinority,
}

/// Edited Nearest Neighbours
///
/// Removes samples whose `n_neighbors` nearest neighbours (over all
/// classes) disagree with their label. A class is never emptied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditedNearestNeighbours {
    n_neighbors: usize,
    selection: EnnSelection,
    target: CleaningTarget,
}

impl EditedNearestNeighbours {
    pub fn new() -> Self {
        Self {
            n_neighbors: 3,
            selection: EnnSelection::All,
            target: CleaningTarget::All,
        }
    }

    /// Set number of neighbors
    pub fn with_n_neighbors(mut self, n: usize) -> Self {
        self.n_neighbors = n.max(1);
        self
    }

    pub fn with_selection(mut self, selection: EnnSelection) -> Self {
        self.selection = selection;
        self
    }

    pub fn with_target(mut self, target: CleaningTarget) -> Self {
        self.target = target;
        self
    }

    fn agrees(&self, label: i64, neighbor_labels: &[i64]) -> bool {
        match self.selection {
            EnnSelection::All => neighbor_labels.iter().all(|&l| l == label),
            EnnSelection::Mode => {
                let mut votes: BTreeMap<i64, usize> = BTreeMap::new();
                for &l in neighbor_labels {
                    *votes.entry(l).or_insert(0) += 1;
                }
                // Ties resolve to the smallest label
                let mode = votes
                    .iter()
                    .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(a.0)))
                    .map(|(&l, _)| l);
                mode.map_or(true, |m| m == label)
            }
        }
    }
}

impl Default for EditedNearestNeighbours {
    fn default() -> Self {
        Self::new()
    }
}

impl Sampler for EditedNearestNeighbours {
    fn fit(&mut self, _x: &Array2<f64>, _y: &Array1<i64>) -> Result<()> {
        Ok(())
    }

    fn resample(&self, x: &Array2<f64>, y: &Array1<i64>) -> Result<ResampleResult> {
        if x.nrows() != y.len() {
            return Err(FraudError::ShapeError {
                expected: format!("{} label rows", x.nrows()),
                actual: y.len().to_string(),
            });
        }

        let counts = class_counts(y);
        let indices = class_indices(y);
        let all: Vec<usize> = (0..y.len()).collect();
        let k = self.n_neighbors.min(y.len().saturating_sub(1));

        let minority = counts
            .iter()
            .min_by(|a, b| a.1.cmp(b.1).then(a.0.cmp(b.0)))
            .map(|(&c, _)| c);

        let mut kept: Vec<usize> = Vec::with_capacity(y.len());
        let mut n_removed = BTreeMap::new();

        for (&class, class_idx) in &indices {
            let eligible = match self.target {
                CleaningTarget::All => true,
                CleaningTarget::NotMinority => Some(class) != minority,
            };
            if !eligible || k == 0 {
                kept.extend_from_slice(class_idx);
                n_removed.insert(class, 0);
                continue;
            }

            let survivors: Vec<usize> = class_idx
                .par_iter()
                .filter(|&&i| {
                    let neighbor_labels: Vec<i64> =
                        k_nearest(x, i, &all, k).into_iter().map(|j| y[j]).collect();
                    self.agrees(class, &neighbor_labels)
                })
                .copied()
                .collect();

            if survivors.is_empty() {
                warn!(class, size = class_idx.len(), "cleaning would empty the class, keeping it intact");
                kept.extend_from_slice(class_idx);
                n_removed.insert(class, 0);
                continue;
            }

            let removed = class_idx.len() - survivors.len();
            debug!(class, removed, kept = survivors.len(), "edited nearest neighbours");
            n_removed.insert(class, removed);
            kept.extend(survivors);
        }

        Ok(ResampleResult {
            x: x.select(Axis(0), &kept),
            y: y.select(Axis(0), &kept),
            n_synthetic: counts.keys().map(|&c| (c, 0)).collect(),
            n_removed,
        })
    }
}

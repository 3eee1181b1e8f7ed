//! Class rebalancing
//!
//! Provides the two-stage balancing used before training:
//! - Stratified subsampling of the training partition
//! - SMOTE (Synthetic Minority Over-sampling Technique)
//! - Edited Nearest Neighbours cleaning
//! - SMOTEENN, SMOTE followed by ENN

mod combine;
mod enn;
mod neighbors;
mod smote;

pub use combine::SmoteEnn;
pub use enn::{CleaningTarget, EditedNearestNeighbours, EnnSelection};
pub use smote::Smote;

use crate::error::Result;
use crate::split::stratified_split;
use ndarray::{Array1, Array2, Axis};
use std::collections::BTreeMap;

/// Result of resampling
#[derive(Debug, Clone)]
pub struct ResampleResult {
    /// Resampled features
    pub x: Array2<f64>,
    /// Resampled labels
    pub y: Array1<i64>,
    /// Synthetic rows generated per class
    pub n_synthetic: BTreeMap<i64, usize>,
    /// Rows removed per class
    pub n_removed: BTreeMap<i64, usize>,
}

impl ResampleResult {
    /// Class distribution of the resampled labels
    pub fn class_counts(&self) -> BTreeMap<i64, usize> {
        class_counts(&self.y)
    }
}

/// Trait for samplers
pub trait Sampler: Send + Sync {
    /// Fit the sampler on data
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<i64>) -> Result<()>;

    /// Resample data
    fn resample(&self, x: &Array2<f64>, y: &Array1<i64>) -> Result<ResampleResult>;

    /// Fit and resample in one step
    fn fit_resample(&mut self, x: &Array2<f64>, y: &Array1<i64>) -> Result<ResampleResult> {
        self.fit(x, y)?;
        self.resample(x, y)
    }
}

/// Get class distribution
pub fn class_counts(y: &Array1<i64>) -> BTreeMap<i64, usize> {
    let mut counts = BTreeMap::new();
    for &label in y.iter() {
        *counts.entry(label).or_insert(0) += 1;
    }
    counts
}

/// Get indices for each class
pub fn class_indices(y: &Array1<i64>) -> BTreeMap<i64, Vec<usize>> {
    let mut indices: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
    for (i, &label) in y.iter().enumerate() {
        indices.entry(label).or_default().push(i);
    }
    indices
}

/// Keep a stratified `fraction` of the rows
///
/// The kept rows are the train side of a stratified split with
/// `test_size = 1 - fraction`. A fraction of 1 keeps everything.
pub fn stratified_subsample(
    x: &Array2<f64>,
    y: &Array1<i64>,
    fraction: f64,
    seed: u64,
) -> Result<(Array2<f64>, Array1<i64>)> {
    if fraction >= 1.0 {
        return Ok((x.clone(), y.clone()));
    }
    let split = stratified_split(y, 1.0 - fraction, seed)?;
    Ok((
        x.select(Axis(0), &split.train),
        y.select(Axis(0), &split.train),
    ))
}

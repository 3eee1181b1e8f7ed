//! XGBoost-style gradient boosting with second-order approximation
//!
//! - Uses both gradient (first derivative) and hessian (second derivative) of the logistic loss
//! - Regularized leaf weights: w* = -G / (H + lambda)
//! - Gain-based split scoring: Gain = 0.5 * [GL²/(HL+λ) + GR²/(HR+λ) - (GL+GR)²/(HL+HR+λ)] - γ
//! - L1 (alpha) and L2 (lambda) regularization
//! - Minimum child weight constraint
//! - Positive rows weighted by `scale_pos_weight`

use super::ProbabilisticClassifier;
use crate::error::{FraudError, Result};
use crate::scoring::{apply_threshold, Threshold};
use ndarray::{Array1, Array2, ArrayView1};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use tracing::{debug, info};

/// XGBoost configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct XGBoostConfig {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    pub min_child_weight: f64,
    /// L2 regularization on leaf weights
    pub reg_lambda: f64,
    /// L1 regularization on leaf weights
    pub reg_alpha: f64,
    /// Minimum loss reduction to make a split (gamma)
    pub gamma: f64,
    pub subsample: f64,
    pub colsample_bytree: f64,
    /// Weight applied to gradient and hessian of positive rows
    pub scale_pos_weight: f64,
    pub random_state: Option<u64>,
}

impl Default for XGBoostConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
            max_depth: 6,
            min_child_weight: 1.0,
            reg_lambda: 1.0,
            reg_alpha: 0.0,
            gamma: 0.0,
            subsample: 1.0,
            colsample_bytree: 1.0,
            scale_pos_weight: 10.0,
            random_state: Some(42),
        }
    }
}

impl XGBoostConfig {
    pub fn validate(&self) -> Result<()> {
        if self.n_estimators == 0 {
            return Err(FraudError::invalid_parameter("n_estimators", 0, "must be at least 1"));
        }
        if !(self.learning_rate > 0.0) {
            return Err(FraudError::invalid_parameter(
                "learning_rate",
                self.learning_rate,
                "must be positive",
            ));
        }
        for (name, value) in [("subsample", self.subsample), ("colsample_bytree", self.colsample_bytree)] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(FraudError::invalid_parameter(name, value, "must be in (0, 1]"));
            }
        }
        if !(self.scale_pos_weight > 0.0) {
            return Err(FraudError::invalid_parameter(
                "scale_pos_weight",
                self.scale_pos_weight,
                "must be positive",
            ));
        }
        if self.reg_lambda < 0.0 || self.reg_alpha < 0.0 || self.gamma < 0.0 || self.min_child_weight < 0.0 {
            return Err(FraudError::ValidationError(
                "regularization terms and min_child_weight must be non-negative".to_string(),
            ));
        }
        Ok(())
    }
}

/// A single node in the boosted tree
#[derive(Debug, Clone, Serialize, Deserialize)]
enum XGBNode {
    Leaf { weight: f64 },
    Split {
        feature: usize,
        threshold: f64,
        /// Loss reduction of this split
        #[serde(default)]
        gain: f64,
        left: Box<XGBNode>,
        right: Box<XGBNode>,
    },
}

impl XGBNode {
    fn predict(&self, sample: ArrayView1<f64>) -> f64 {
        match self {
            XGBNode::Leaf { weight } => *weight,
            XGBNode::Split { feature, threshold, left, right, .. } => {
                if sample[*feature] <= *threshold {
                    left.predict(sample)
                } else {
                    right.predict(sample)
                }
            }
        }
    }
}

/// Best split candidate for one feature
#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    feature: usize,
    threshold: f64,
    gain: f64,
}

/// Build a tree using exact greedy split finding
fn build_xgb_tree(
    x: &Array2<f64>,
    grad: &Array1<f64>,
    hess: &Array1<f64>,
    indices: &[usize],
    feature_indices: &[usize],
    depth: usize,
    config: &XGBoostConfig,
) -> XGBNode {
    let g_sum: f64 = indices.iter().map(|&i| grad[i]).sum();
    let h_sum: f64 = indices.iter().map(|&i| hess[i]).sum();

    let leaf_weight = compute_leaf_weight(g_sum, h_sum, config.reg_lambda, config.reg_alpha);

    if depth >= config.max_depth || indices.len() < 2 || h_sum < config.min_child_weight {
        return XGBNode::Leaf { weight: leaf_weight };
    }

    // Equal gains resolve to the lowest feature index so results do not depend on thread scheduling
    let best_split = feature_indices
        .par_iter()
        .filter_map(|&f| find_best_split_for_feature(x, grad, hess, indices, f, config))
        .max_by(|a, b| a.gain.total_cmp(&b.gain).then(b.feature.cmp(&a.feature)));

    match best_split {
        Some(split) if split.gain > config.gamma => {
            let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
                .iter()
                .partition(|&&i| x[[i, split.feature]] <= split.threshold);

            if left_idx.is_empty() || right_idx.is_empty() {
                return XGBNode::Leaf { weight: leaf_weight };
            }

            let left = build_xgb_tree(x, grad, hess, &left_idx, feature_indices, depth + 1, config);
            let right = build_xgb_tree(x, grad, hess, &right_idx, feature_indices, depth + 1, config);

            XGBNode::Split {
                feature: split.feature,
                threshold: split.threshold,
                gain: split.gain,
                left: Box::new(left),
                right: Box::new(right),
            }
        }
        _ => XGBNode::Leaf { weight: leaf_weight },
    }
}

/// Optimal leaf weight with L1 (alpha) and L2 (lambda) regularization
fn compute_leaf_weight(g_sum: f64, h_sum: f64, lambda: f64, alpha: f64) -> f64 {
    let g_adj = if g_sum > alpha {
        g_sum - alpha
    } else if g_sum < -alpha {
        g_sum + alpha
    } else {
        return 0.0;
    };
    -g_adj / (h_sum + lambda)
}

/// Find best split for a single feature using exact greedy method
fn find_best_split_for_feature(
    x: &Array2<f64>,
    grad: &Array1<f64>,
    hess: &Array1<f64>,
    indices: &[usize],
    feature: usize,
    config: &XGBoostConfig,
) -> Option<SplitCandidate> {
    if indices.len() < 2 {
        return None;
    }
    let mut sorted: Vec<usize> = indices.to_vec();
    sorted.sort_by(|&a, &b| x[[a, feature]].total_cmp(&x[[b, feature]]).then(a.cmp(&b)));

    let g_total: f64 = sorted.iter().map(|&i| grad[i]).sum();
    let h_total: f64 = sorted.iter().map(|&i| hess[i]).sum();
    let lambda = config.reg_lambda;
    let parent_score = (g_total * g_total) / (h_total + lambda);

    let mut g_left = 0.0;
    let mut h_left = 0.0;
    let mut best: Option<SplitCandidate> = None;

    for pos in 0..sorted.len() - 1 {
        let idx = sorted[pos];
        let next = sorted[pos + 1];
        g_left += grad[idx];
        h_left += hess[idx];

        // No threshold separates identical values
        if (x[[idx, feature]] - x[[next, feature]]).abs() < 1e-12 {
            continue;
        }

        let g_right = g_total - g_left;
        let h_right = h_total - h_left;

        if h_left < config.min_child_weight || h_right < config.min_child_weight {
            continue;
        }

        let gain = 0.5
            * ((g_left * g_left) / (h_left + lambda) + (g_right * g_right) / (h_right + lambda)
                - parent_score);

        if best.map_or(true, |b| gain > b.gain) {
            best = Some(SplitCandidate {
                feature,
                threshold: (x[[idx, feature]] + x[[next, feature]]) / 2.0,
                gain,
            });
        }
    }

    best
}

/// Average split gain per feature, normalized to sum to one
///
/// Features never used in a split get zero.
fn xgb_tree_importances(trees: &[XGBNode], n_features: usize) -> Array1<f64> {
    let mut gains = vec![0.0f64; n_features];
    let mut counts = vec![0usize; n_features];
    for tree in trees {
        xgb_accumulate_gain(tree, &mut gains, &mut counts);
    }

    let mut importances: Vec<f64> = gains
        .iter()
        .zip(counts.iter())
        .map(|(&g, &n)| if n > 0 { g / n as f64 } else { 0.0 })
        .collect();
    let total: f64 = importances.iter().sum();
    if total > 0.0 {
        for v in importances.iter_mut() {
            *v /= total;
        }
    }
    Array1::from_vec(importances)
}

fn xgb_accumulate_gain(node: &XGBNode, gains: &mut [f64], counts: &mut [usize]) {
    if let XGBNode::Split { feature, gain, left, right, .. } = node {
        if *feature < gains.len() {
            gains[*feature] += gain;
            counts[*feature] += 1;
        }
        xgb_accumulate_gain(left, gains, counts);
        xgb_accumulate_gain(right, gains, counts);
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Mean binary cross-entropy
pub fn log_loss(y: &Array1<i64>, proba: &Array1<f64>) -> f64 {
    if y.is_empty() {
        return 0.0;
    }
    let eps = 1e-15;
    let total: f64 = y
        .iter()
        .zip(proba.iter())
        .map(|(&label, &p)| {
            let p = p.clamp(eps, 1.0 - eps);
            if label == 1 {
                -p.ln()
            } else {
                -(1.0 - p).ln()
            }
        })
        .sum();
    total / y.len() as f64
}

// ─── XGBoost Classifier ────────────────────────────────────────────────────

/// XGBoost Classifier (logistic loss with second-order approximation)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XGBoostClassifier {
    config: XGBoostConfig,
    trees: Vec<XGBNode>,
    base_score: f64,
    n_features: usize,
    train_log_loss: Option<f64>,
}

impl XGBoostClassifier {
    pub fn new(config: XGBoostConfig) -> Self {
        Self {
            config,
            trees: Vec::new(),
            base_score: 0.0,
            n_features: 0,
            train_log_loss: None,
        }
    }

    pub fn config(&self) -> &XGBoostConfig {
        &self.config
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Log loss on the training sample after the final round
    pub fn train_log_loss(&self) -> Option<f64> {
        self.train_log_loss
    }

    fn raw_score(&self, sample: ArrayView1<f64>) -> f64 {
        self.base_score
            + self
                .trees
                .iter()
                .map(|tree| self.config.learning_rate * tree.predict(sample))
                .sum::<f64>()
    }

    /// Binary predictions with the strict rule `p > threshold`
    pub fn predict(&self, x: &Array2<f64>, threshold: Threshold) -> Result<Array1<i64>> {
        let proba = self.predict_proba(x)?;
        Ok(apply_threshold(&proba, threshold))
    }

    /// Gain-based feature importances (mean gain per split, normalized)
    pub fn feature_importances(&self) -> Option<Array1<f64>> {
        if self.trees.is_empty() {
            return None;
        }
        Some(xgb_tree_importances(&self.trees, self.n_features))
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let writer = BufWriter::new(File::create(path.as_ref())?);
        serde_json::to_writer(writer, self)?;
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let reader = BufReader::new(File::open(path.as_ref())?);
        Ok(serde_json::from_reader(reader)?)
    }
}

impl ProbabilisticClassifier for XGBoostClassifier {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<i64>) -> Result<()> {
        self.config.validate()?;

        let n_samples = x.nrows();
        let n_features = x.ncols();

        if n_samples == 0 || n_features == 0 {
            return Err(FraudError::TrainingError("cannot fit on an empty matrix".to_string()));
        }
        if y.len() != n_samples {
            return Err(FraudError::ShapeError {
                expected: format!("{} labels", n_samples),
                actual: y.len().to_string(),
            });
        }
        if let Some(bad) = y.iter().find(|&&label| label != 0 && label != 1) {
            return Err(FraudError::TrainingError(format!(
                "labels must be 0 or 1, found {}",
                bad
            )));
        }

        self.n_features = n_features;
        self.trees.clear();

        let target: Array1<f64> = y.mapv(|label| label as f64);
        let weights: Array1<f64> =
            y.mapv(|label| if label == 1 { self.config.scale_pos_weight } else { 1.0 });

        // Base score in log-odds space of the weighted positive rate
        let p = ((&target * &weights).sum() / weights.sum()).clamp(1e-7, 1.0 - 1e-7);
        self.base_score = (p / (1.0 - p)).ln();
        let mut raw_preds = Array1::from_elem(n_samples, self.base_score);

        let mut rng = match self.config.random_state {
            Some(seed) => Xoshiro256PlusPlus::seed_from_u64(seed),
            None => Xoshiro256PlusPlus::from_entropy(),
        };

        for round in 0..self.config.n_estimators {
            // Logistic loss: grad = w (p - y), hess = w p (1 - p)
            let probs: Array1<f64> = raw_preds.mapv(sigmoid);
            let grad: Array1<f64> = (&probs - &target) * &weights;
            let hess: Array1<f64> = probs.mapv(|p| (p * (1.0 - p)).max(1e-7)) * &weights;

            let row_indices = subsample(&mut rng, n_samples, self.config.subsample);
            let col_indices = subsample(&mut rng, n_features, self.config.colsample_bytree);

            let tree = build_xgb_tree(x, &grad, &hess, &row_indices, &col_indices, 0, &self.config);

            // Out-of-bag rows advance too, so the next round sees the full ensemble
            let lr = self.config.learning_rate;
            raw_preds
                .iter_mut()
                .zip(x.rows())
                .for_each(|(raw, row)| *raw += lr * tree.predict(row));

            self.trees.push(tree);

            if (round + 1) % 10 == 0 {
                let loss = log_loss(y, &raw_preds.mapv(sigmoid));
                debug!(round = round + 1, train_logloss = loss, "boosting round");
            }
        }

        let loss = log_loss(y, &raw_preds.mapv(sigmoid));
        self.train_log_loss = Some(loss);
        info!(
            n_samples,
            n_features,
            n_trees = self.trees.len(),
            train_logloss = loss,
            "xgboost fitted"
        );

        Ok(())
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if !self.is_fitted() {
            return Err(FraudError::ModelNotFitted);
        }
        if x.ncols() != self.n_features {
            return Err(FraudError::ShapeError {
                expected: format!("{} features", self.n_features),
                actual: x.ncols().to_string(),
            });
        }

        let rows: Vec<ArrayView1<f64>> = x.rows().into_iter().collect();
        let proba: Vec<f64> = rows.par_iter().map(|row| sigmoid(self.raw_score(row.view()))).collect();
        Ok(Array1::from_vec(proba))
    }

    fn is_fitted(&self) -> bool {
        !self.trees.is_empty()
    }
}

// ─── Helpers ────────────────────────────────────────────────────────────────

fn subsample(rng: &mut Xoshiro256PlusPlus, n: usize, ratio: f64) -> Vec<usize> {
    if ratio >= 1.0 {
        return (0..n).collect();
    }
    let k = (((n as f64) * ratio).ceil() as usize).max(1);
    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(rng);
    indices.truncate(k);
    indices.sort_unstable();
    indices
}

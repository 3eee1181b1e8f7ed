//! Model training
//!
//! Gradient-boosted trees with second-order (XGBoost-style) updates, the
//! classifier the pipeline fits on the balanced sample.

pub mod xgboost;

pub use xgboost::{log_loss, XGBoostClassifier, XGBoostConfig};

use crate::error::Result;
use ndarray::{Array1, Array2};

/// A binary classifier that scores rows with a positive-class probability
pub trait ProbabilisticClassifier: Send + Sync {
    /// Fit on a feature matrix and 0/1 labels
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<i64>) -> Result<()>;

    /// Probability of the positive class for each row
    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>>;

    fn is_fitted(&self) -> bool;
}

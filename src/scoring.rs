//! Probability thresholding

use crate::error::{FraudError, Result};
use crate::training::ProbabilisticClassifier;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Decision threshold in `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Threshold(f64);

impl Threshold {
    pub fn new(value: f64) -> Result<Self> {
        if (0.0..=1.0).contains(&value) {
            Ok(Self(value))
        } else {
            Err(FraudError::invalid_parameter("threshold", value, "must be in [0, 1]"))
        }
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for Threshold {
    type Error = FraudError;

    fn try_from(value: f64) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Threshold> for f64 {
    fn from(t: Threshold) -> f64 {
        t.0
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 1 where `p > threshold`, else 0
pub fn apply_threshold(proba: &Array1<f64>, threshold: Threshold) -> Array1<i64> {
    proba.mapv(|p| i64::from(p > threshold.0))
}

pub fn count_positive(pred: &Array1<i64>) -> usize {
    pred.iter().filter(|&&p| p == 1).count()
}

/// Probabilities and decisions for one batch of rows
#[derive(Debug, Clone)]
pub struct ScoredBatch {
    pub probabilities: Array1<f64>,
    pub predictions: Array1<i64>,
    pub threshold: Threshold,
}

impl ScoredBatch {
    pub fn len(&self) -> usize {
        self.predictions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predictions.is_empty()
    }

    pub fn n_positive(&self) -> usize {
        count_positive(&self.predictions)
    }
}

/// Score a matrix with any fitted classifier and apply the threshold
pub fn score_and_threshold<C: ProbabilisticClassifier + ?Sized>(
    model: &C,
    x: &Array2<f64>,
    threshold: Threshold,
) -> Result<ScoredBatch> {
    let probabilities = model.predict_proba(x)?;
    let predictions = apply_threshold(&probabilities, threshold);
    Ok(ScoredBatch {
        probabilities,
        predictions,
        threshold,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_range() {
        assert!(Threshold::new(0.0).is_ok());
        assert!(Threshold::new(1.0).is_ok());
        assert!(Threshold::new(-0.1).is_err());
        assert!(Threshold::new(1.5).is_err());
        assert!(Threshold::new(f64::NAN).is_err());
    }

    #[test]
    fn test_comparison_is_strict() {
        let proba = Array1::from_vec(vec![0.1, 0.10001, 0.05, 0.4]);
        let pred = apply_threshold(&proba, Threshold::new(0.1).unwrap());
        assert_eq!(pred.to_vec(), vec![0, 1, 0, 1]);
    }

    #[test]
    fn test_raising_threshold_never_adds_positives() {
        let proba = Array1::from_iter((0..200).map(|i| ((i * 37) % 101) as f64 / 100.0));
        let mut previous = usize::MAX;
        for step in 0..=20 {
            let t = Threshold::new(step as f64 / 20.0).unwrap();
            let n = count_positive(&apply_threshold(&proba, t));
            assert!(n <= previous);
            previous = n;
        }
    }

    #[test]
    fn test_threshold_serde() {
        let t: Threshold = serde_json::from_str("0.4").unwrap();
        assert_eq!(t.value(), 0.4);
        assert!(serde_json::from_str::<Threshold>("2.0").is_err());
    }
}

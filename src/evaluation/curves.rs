//! ROC and precision-recall curves

use crate::error::{FraudError, Result};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Receiver operating characteristic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RocCurve {
    pub fpr: Vec<f64>,
    pub tpr: Vec<f64>,
    /// Decreasing; the first entry is `+inf`
    pub thresholds: Vec<f64>,
}

/// Precision-recall pairs, ordered by increasing threshold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrCurve {
    /// Ends at 1
    pub precision: Vec<f64>,
    /// Ends at 0
    pub recall: Vec<f64>,
    /// One shorter than `precision`
    pub thresholds: Vec<f64>,
}

/// Cumulative false/true positives at each distinct score, scores descending
struct BinaryCounts {
    fps: Vec<f64>,
    tps: Vec<f64>,
    thresholds: Vec<f64>,
}

fn binary_counts(y_true: &Array1<i64>, scores: &Array1<f64>) -> Result<BinaryCounts> {
    if y_true.len() != scores.len() {
        return Err(FraudError::ShapeError {
            expected: format!("{} scores", y_true.len()),
            actual: scores.len().to_string(),
        });
    }
    if y_true.is_empty() {
        return Err(FraudError::ValidationError("no samples to evaluate".to_string()));
    }
    if let Some(bad) = y_true.iter().find(|&&l| l != 0 && l != 1) {
        return Err(FraudError::ValidationError(format!(
            "curves need 0/1 labels, found {}",
            bad
        )));
    }
    if scores.iter().any(|s| s.is_nan()) {
        return Err(FraudError::ValidationError("scores contain NaN".to_string()));
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));

    let mut counts = BinaryCounts {
        fps: Vec::new(),
        tps: Vec::new(),
        thresholds: Vec::new(),
    };
    let mut tp = 0.0;
    let mut fp = 0.0;
    for (pos, &i) in order.iter().enumerate() {
        if y_true[i] == 1 {
            tp += 1.0;
        } else {
            fp += 1.0;
        }
        let last_of_value = order
            .get(pos + 1)
            .map_or(true, |&next| scores[next] != scores[i]);
        if last_of_value {
            counts.tps.push(tp);
            counts.fps.push(fp);
            counts.thresholds.push(scores[i]);
        }
    }
    Ok(counts)
}

/// ROC curve with collinear points dropped and a leading `(0, 0)` at threshold `+inf`
///
/// With no negatives (or no positives) the corresponding rate is NaN.
pub fn roc_curve(y_true: &Array1<i64>, scores: &Array1<f64>) -> Result<RocCurve> {
    let BinaryCounts { fps, tps, thresholds } = binary_counts(y_true, scores)?;

    // Keep the endpoints and every point where the curve changes direction
    let keep: Vec<usize> = if fps.len() > 2 {
        (0..fps.len())
            .filter(|&i| {
                i == 0
                    || i == fps.len() - 1
                    || fps[i + 1] - 2.0 * fps[i] + fps[i - 1] != 0.0
                    || tps[i + 1] - 2.0 * tps[i] + tps[i - 1] != 0.0
            })
            .collect()
    } else {
        (0..fps.len()).collect()
    };

    let mut fp_path = vec![0.0];
    let mut tp_path = vec![0.0];
    let mut thr_path = vec![f64::INFINITY];
    for &i in &keep {
        fp_path.push(fps[i]);
        tp_path.push(tps[i]);
        thr_path.push(thresholds[i]);
    }

    let n_neg = fps.last().copied().unwrap_or(0.0);
    let n_pos = tps.last().copied().unwrap_or(0.0);
    if n_neg == 0.0 {
        warn!("no negative samples, false positive rate is undefined");
    }
    if n_pos == 0.0 {
        warn!("no positive samples, true positive rate is undefined");
    }

    Ok(RocCurve {
        fpr: fp_path.iter().map(|&v| if n_neg > 0.0 { v / n_neg } else { f64::NAN }).collect(),
        tpr: tp_path.iter().map(|&v| if n_pos > 0.0 { v / n_pos } else { f64::NAN }).collect(),
        thresholds: thr_path,
    })
}

/// Area under a curve by the trapezoidal rule
///
/// `x` must be monotonic; a decreasing `x` yields the same positive area.
pub fn auc(x: &[f64], y: &[f64]) -> Result<f64> {
    if x.len() != y.len() {
        return Err(FraudError::ShapeError {
            expected: format!("{} y values", x.len()),
            actual: y.len().to_string(),
        });
    }
    if x.len() < 2 {
        return Err(FraudError::ValidationError(
            "at least 2 points are needed to compute an area".to_string(),
        ));
    }

    let dx: Vec<f64> = x.windows(2).map(|w| w[1] - w[0]).collect();
    let direction = if dx.iter().all(|&d| d >= 0.0) {
        1.0
    } else if dx.iter().all(|&d| d <= 0.0) {
        -1.0
    } else {
        return Err(FraudError::ValidationError("x is neither increasing nor decreasing".to_string()));
    };

    let area: f64 = dx
        .iter()
        .zip(y.windows(2))
        .map(|(&d, w)| d * (w[0] + w[1]) / 2.0)
        .sum();
    Ok(direction * area)
}

/// Area under the ROC curve
pub fn roc_auc(curve: &RocCurve) -> Result<f64> {
    auc(&curve.fpr, &curve.tpr)
}

/// Precision and recall at every distinct score
///
/// With no positive samples recall is 1 everywhere before the final 0.
pub fn precision_recall_curve(y_true: &Array1<i64>, scores: &Array1<f64>) -> Result<PrCurve> {
    let BinaryCounts { fps, tps, thresholds } = binary_counts(y_true, scores)?;

    let precision: Vec<f64> = tps
        .iter()
        .zip(fps.iter())
        .map(|(&tp, &fp)| if tp + fp > 0.0 { tp / (tp + fp) } else { 0.0 })
        .collect();

    let n_pos = tps.last().copied().unwrap_or(0.0);
    if n_pos == 0.0 {
        warn!("no positive samples, recall is set to 1 for all thresholds");
    }
    let recall: Vec<f64> = tps
        .iter()
        .map(|&tp| if n_pos > 0.0 { tp / n_pos } else { 1.0 })
        .collect();

    Ok(PrCurve {
        precision: precision.into_iter().rev().chain(std::iter::once(1.0)).collect(),
        recall: recall.into_iter().rev().chain(std::iter::once(0.0)).collect(),
        thresholds: thresholds.into_iter().rev().collect(),
    })
}

/// Step-wise area under the precision-recall curve
pub fn average_precision(curve: &PrCurve) -> f64 {
    -curve
        .recall
        .windows(2)
        .zip(curve.precision.iter())
        .map(|(r, &p)| (r[1] - r[0]) * p)
        .sum::<f64>()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: &[f64], b: &[f64]) {
        assert_eq!(a.len(), b.len(), "{:?} vs {:?}", a, b);
        for (x, y) in a.iter().zip(b) {
            assert!((x - y).abs() < 1e-9, "{:?} vs {:?}", a, b);
        }
    }

    fn sample() -> (Array1<i64>, Array1<f64>) {
        (
            Array1::from_vec(vec![0, 0, 1, 1]),
            Array1::from_vec(vec![0.1, 0.4, 0.35, 0.8]),
        )
    }

    #[test]
    fn test_roc_points() {
        let (y, s) = sample();
        let roc = roc_curve(&y, &s).unwrap();
        assert_close(&roc.fpr, &[0.0, 0.0, 0.5, 0.5, 1.0]);
        assert_close(&roc.tpr, &[0.0, 0.5, 0.5, 1.0, 1.0]);
        assert!(roc.thresholds[0].is_infinite());
        assert_close(&roc.thresholds[1..], &[0.8, 0.4, 0.35, 0.1]);
        assert!((roc_auc(&roc).unwrap() - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_roc_drops_collinear_points() {
        let y = Array1::from_vec(vec![1, 1, 1, 0, 0]);
        let s = Array1::from_vec(vec![0.9, 0.8, 0.7, 0.2, 0.1]);
        let roc = roc_curve(&y, &s).unwrap();
        assert_close(&roc.fpr, &[0.0, 0.0, 0.0, 1.0]);
        assert_close(&roc.tpr, &[0.0, 1.0 / 3.0, 1.0, 1.0]);
        assert!((roc_auc(&roc).unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_tied_scores_collapse() {
        let y = Array1::from_vec(vec![0, 1, 0, 1]);
        let s = Array1::from_vec(vec![0.5, 0.5, 0.5, 0.5]);
        let roc = roc_curve(&y, &s).unwrap();
        assert_close(&roc.fpr, &[0.0, 1.0]);
        assert_close(&roc.tpr, &[0.0, 1.0]);
        assert!((roc_auc(&roc).unwrap() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_pr_points() {
        let (y, s) = sample();
        let pr = precision_recall_curve(&y, &s).unwrap();
        assert_close(&pr.precision, &[0.5, 2.0 / 3.0, 0.5, 1.0, 1.0]);
        assert_close(&pr.recall, &[1.0, 1.0, 0.5, 0.5, 0.0]);
        assert_close(&pr.thresholds, &[0.1, 0.35, 0.4, 0.8]);
        assert!((average_precision(&pr) - 0.8333333333333333).abs() < 1e-12);
    }

    #[test]
    fn test_auc_directions() {
        assert!((auc(&[0.0, 0.5, 1.0], &[0.0, 0.5, 1.0]).unwrap() - 0.5).abs() < 1e-12);
        assert!((auc(&[1.0, 0.5, 0.0], &[1.0, 1.0, 1.0]).unwrap() - 1.0).abs() < 1e-12);
        assert!(auc(&[0.0, 1.0, 0.5], &[0.0, 1.0, 1.0]).is_err());
    }

    #[test]
    fn test_single_class_rates() {
        let y = Array1::from_vec(vec![1, 1]);
        let s = Array1::from_vec(vec![0.2, 0.7]);
        let roc = roc_curve(&y, &s).unwrap();
        assert!(roc.fpr.iter().all(|v| v.is_nan()));

        let pr = precision_recall_curve(&Array1::from_vec(vec![0, 0]), &s).unwrap();
        assert_eq!(pr.recall.last(), Some(&0.0));
        assert!(pr.recall[..pr.recall.len() - 1].iter().all(|&r| r == 1.0));
    }

    #[test]
    fn test_rejects_mismatch_and_bad_labels() {
        let s = Array1::from_vec(vec![0.1, 0.2]);
        assert!(roc_curve(&Array1::from_vec(vec![0]), &s).is_err());
        assert!(roc_curve(&Array1::from_vec(vec![0, 3]), &s).is_err());
    }
}

//! Confusion matrix and classification report

use crate::error::{FraudError, Result};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::Write as _;

/// Confusion matrix over an ordered label set
///
/// Entry `(i, j)` counts samples whose actual label is `labels[i]` and
/// predicted label is `labels[j]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub labels: Vec<i64>,
    /// Row-major: `matrix[actual][predicted]`
    pub matrix: Vec<Vec<usize>>,
}

impl ConfusionMatrix {
    /// Build from labels, using the sorted union of observed values
    pub fn new(y_true: &Array1<i64>, y_pred: &Array1<i64>) -> Result<Self> {
        let labels: BTreeSet<i64> = y_true.iter().chain(y_pred.iter()).copied().collect();
        Self::with_labels(y_true, y_pred, labels.into_iter().collect())
    }

    /// Build over an explicit label order; values outside `labels` are ignored
    pub fn with_labels(y_true: &Array1<i64>, y_pred: &Array1<i64>, labels: Vec<i64>) -> Result<Self> {
        check_lengths(y_true.len(), y_pred.len())?;
        if labels.is_empty() {
            return Err(FraudError::ValidationError("empty label set".to_string()));
        }

        let position = |label: i64| labels.iter().position(|&l| l == label);
        let mut matrix = vec![vec![0usize; labels.len()]; labels.len()];
        for (&t, &p) in y_true.iter().zip(y_pred.iter()) {
            if let (Some(i), Some(j)) = (position(t), position(p)) {
                matrix[i][j] += 1;
            }
        }

        Ok(Self { labels, matrix })
    }

    pub fn n_classes(&self) -> usize {
        self.labels.len()
    }

    pub fn get(&self, actual: usize, predicted: usize) -> usize {
        self.matrix[actual][predicted]
    }

    pub fn total(&self) -> usize {
        self.matrix.iter().flatten().sum()
    }

    pub fn max_count(&self) -> usize {
        self.matrix.iter().flatten().copied().max().unwrap_or(0)
    }

    /// Rows actually labelled `labels[class]`
    pub fn support(&self, class: usize) -> usize {
        self.matrix[class].iter().sum()
    }

    fn predicted(&self, class: usize) -> usize {
        self.matrix.iter().map(|row| row[class]).sum()
    }

    pub fn accuracy(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        let correct: usize = (0..self.n_classes()).map(|i| self.matrix[i][i]).sum();
        correct as f64 / total as f64
    }

    /// Precision for one class; 0 when nothing was predicted as it
    pub fn precision(&self, class: usize) -> f64 {
        ratio(self.matrix[class][class], self.predicted(class))
    }

    /// Recall for one class; 0 when the class has no support
    pub fn recall(&self, class: usize) -> f64 {
        ratio(self.matrix[class][class], self.support(class))
    }

    pub fn f1(&self, class: usize) -> f64 {
        let p = self.precision(class);
        let r = self.recall(class);
        if p + r == 0.0 {
            0.0
        } else {
            2.0 * p * r / (p + r)
        }
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

fn check_lengths(n_true: usize, n_pred: usize) -> Result<()> {
    if n_true != n_pred {
        return Err(FraudError::ShapeError {
            expected: format!("{} predictions", n_true),
            actual: n_pred.to_string(),
        });
    }
    if n_true == 0 {
        return Err(FraudError::ValidationError("no samples to evaluate".to_string()));
    }
    Ok(())
}

/// Per-class precision, recall, F1 and support
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub label: String,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// Per-class metrics plus accuracy and macro/weighted averages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub classes: Vec<ClassMetrics>,
    pub accuracy: f64,
    pub macro_avg: ClassMetrics,
    pub weighted_avg: ClassMetrics,
    pub digits: usize,
}

/// Build a classification report from true and predicted labels
pub fn classification_report(y_true: &Array1<i64>, y_pred: &Array1<i64>, digits: usize) -> Result<ClassificationReport> {
    let cm = ConfusionMatrix::new(y_true, y_pred)?;
    Ok(ClassificationReport::from_confusion(&cm, digits))
}

impl ClassificationReport {
    pub fn from_confusion(cm: &ConfusionMatrix, digits: usize) -> Self {
        let classes: Vec<ClassMetrics> = (0..cm.n_classes())
            .map(|i| ClassMetrics {
                label: cm.labels[i].to_string(),
                precision: cm.precision(i),
                recall: cm.recall(i),
                f1: cm.f1(i),
                support: cm.support(i),
            })
            .collect();

        let total: usize = classes.iter().map(|c| c.support).sum();
        let n = classes.len() as f64;
        let mean = |f: fn(&ClassMetrics) -> f64| classes.iter().map(f).sum::<f64>() / n;
        let weighted = |f: fn(&ClassMetrics) -> f64| {
            if total == 0 {
                0.0
            } else {
                classes.iter().map(|c| f(c) * c.support as f64).sum::<f64>() / total as f64
            }
        };

        let macro_avg = ClassMetrics {
            label: "macro avg".to_string(),
            precision: mean(|c| c.precision),
            recall: mean(|c| c.recall),
            f1: mean(|c| c.f1),
            support: total,
        };
        let weighted_avg = ClassMetrics {
            label: "weighted avg".to_string(),
            precision: weighted(|c| c.precision),
            recall: weighted(|c| c.recall),
            f1: weighted(|c| c.f1),
            support: total,
        };

        Self {
            classes,
            accuracy: cm.accuracy(),
            macro_avg,
            weighted_avg,
            digits,
        }
    }

    /// Render in the familiar fixed-width layout
    pub fn render(&self) -> String {
        let d = self.digits;
        let width = self
            .classes
            .iter()
            .map(|c| c.label.len())
            .chain(["weighted avg".len(), d])
            .max()
            .unwrap_or(12);

        let mut out = String::new();
        let _ = write!(out, "{:>width$} ", "");
        for header in ["precision", "recall", "f1-score", "support"] {
            let _ = write!(out, " {:>9}", header);
        }
        out.push_str("\n\n");

        let row = |out: &mut String, m: &ClassMetrics| {
            let _ = writeln!(
                out,
                "{:>width$}  {:>9.d$} {:>9.d$} {:>9.d$} {:>9}",
                m.label, m.precision, m.recall, m.f1, m.support
            );
        };

        for class in &self.classes {
            row(&mut out, class);
        }
        out.push('\n');

        let _ = writeln!(
            out,
            "{:>width$}  {:>9} {:>9} {:>9.d$} {:>9}",
            "accuracy", "", "", self.accuracy, self.macro_avg.support
        );
        row(&mut out, &self.macro_avg);
        row(&mut out, &self.weighted_avg);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels() -> (Array1<i64>, Array1<i64>) {
        let y_true = Array1::from_vec(vec![0, 0, 0, 0, 0, 0, 1, 1, 1, 1]);
        let y_pred = Array1::from_vec(vec![0, 0, 0, 0, 0, 1, 1, 1, 1, 0]);
        (y_true, y_pred)
    }

    #[test]
    fn test_confusion_counts() {
        let (y_true, y_pred) = labels();
        let cm = ConfusionMatrix::new(&y_true, &y_pred).unwrap();
        assert_eq!(cm.labels, vec![0, 1]);
        assert_eq!(cm.matrix, vec![vec![5, 1], vec![1, 3]]);
        assert_eq!(cm.total(), 10);
        assert!((cm.accuracy() - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_fixed_labels_keep_shape() {
        let y_true = Array1::from_vec(vec![0, 0, 0]);
        let y_pred = Array1::from_vec(vec![0, 0, 0]);
        let cm = ConfusionMatrix::with_labels(&y_true, &y_pred, vec![0, 1]).unwrap();
        assert_eq!(cm.matrix, vec![vec![3, 0], vec![0, 0]]);
        // zero division resolves to zero
        assert_eq!(cm.precision(1), 0.0);
        assert_eq!(cm.recall(1), 0.0);
        assert_eq!(cm.f1(1), 0.0);
    }

    #[test]
    fn test_report_values() {
        let (y_true, y_pred) = labels();
        let report = classification_report(&y_true, &y_pred, 4).unwrap();

        assert!((report.classes[0].precision - 5.0 / 6.0).abs() < 1e-12);
        assert!((report.classes[1].recall - 0.75).abs() < 1e-12);
        assert_eq!(report.classes[1].support, 4);
        assert!((report.macro_avg.precision - (5.0 / 6.0 + 0.75) / 2.0).abs() < 1e-12);
        assert_eq!(report.weighted_avg.support, 10);
    }

    #[test]
    fn test_report_layout() {
        let (y_true, y_pred) = labels();
        let text = classification_report(&y_true, &y_pred, 4).unwrap().render();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "              precision    recall  f1-score   support");
        assert_eq!(lines[1], "");
        assert_eq!(lines[2], "           0     0.8333    0.8333    0.8333         6");
        assert_eq!(lines[3], "           1     0.7500    0.7500    0.7500         4");
        assert_eq!(lines[5], "    accuracy                         0.8000        10");
        assert!(lines[6].starts_with("   macro avg     0.7917"));
        assert!(lines[7].starts_with("weighted avg     0.8000"));
    }

    #[test]
    fn test_length_mismatch() {
        let a = Array1::from_vec(vec![0, 1]);
        let b = Array1::from_vec(vec![0]);
        assert!(ConfusionMatrix::new(&a, &b).is_err());
    }
}

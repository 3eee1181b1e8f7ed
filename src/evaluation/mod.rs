//! Evaluation of a scored test partition
//!
//! Provides:
//! - Confusion matrix and classification report
//! - ROC curve with AUC, precision-recall curve with average precision
//! - Terminal charts for all three diagnostics, plus JSON export of their points

pub mod curves;
pub mod metrics;
pub mod render;

pub use curves::{auc, average_precision, precision_recall_curve, roc_auc, roc_curve, PrCurve, RocCurve};
pub use metrics::{classification_report, ClassMetrics, ClassificationReport, ConfusionMatrix};

use crate::error::Result;
use crate::scoring::{apply_threshold, Threshold};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::info;

/// Digits shown in the classification report
pub const REPORT_DIGITS: usize = 4;

/// Everything computed for one evaluation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub threshold: Threshold,
    pub n_samples: usize,
    pub confusion: ConfusionMatrix,
    pub report: ClassificationReport,
    pub roc: RocCurve,
    pub roc_auc: f64,
    pub pr: PrCurve,
    pub average_precision: f64,
}

/// Evaluate probabilities against binary labels at `threshold`
pub fn evaluate(y_true: &Array1<i64>, proba: &Array1<f64>, threshold: Threshold) -> Result<EvaluationReport> {
    let y_pred = apply_threshold(proba, threshold);
    let confusion = ConfusionMatrix::with_labels(y_true, &y_pred, vec![0, 1])?;
    let report = ClassificationReport::from_confusion(&confusion, REPORT_DIGITS);

    let roc = roc_curve(y_true, proba)?;
    let roc_auc = roc_auc(&roc)?;
    let pr = precision_recall_curve(y_true, proba)?;
    let average_precision = average_precision(&pr);

    info!(
        n_samples = y_true.len(),
        threshold = threshold.value(),
        accuracy = report.accuracy,
        roc_auc,
        average_precision,
        "evaluation complete"
    );

    Ok(EvaluationReport {
        threshold,
        n_samples: y_true.len(),
        confusion,
        report,
        roc,
        roc_auc,
        pr,
        average_precision,
    })
}

impl EvaluationReport {
    /// Classification report text
    pub fn render_text(&self) -> String {
        self.report.render()
    }

    /// Heatmap, ROC chart and PR chart, in that order
    pub fn render_diagnostics(&self) -> String {
        format!(
            "{}\n{}\n{}",
            render::confusion_heatmap(&self.confusion),
            render::roc_chart(&self.roc, self.roc_auc),
            render::pr_chart(&self.pr)
        )
    }

    /// Write the matrix and curve points as JSON files under `dir`
    pub fn write_json(&self, dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;

        let files = [
            ("confusion_matrix.json", serde_json::to_value(&self.confusion)?),
            (
                "roc_curve.json",
                serde_json::json!({ "curve": &self.roc, "auc": self.roc_auc }),
            ),
            (
                "precision_recall_curve.json",
                serde_json::json!({ "curve": &self.pr, "average_precision": self.average_precision }),
            ),
            ("classification_report.json", serde_json::to_value(&self.report)?),
        ];

        let mut written = Vec::with_capacity(files.len());
        for (name, value) in files {
            let path = dir.join(name);
            serde_json::to_writer_pretty(BufWriter::new(File::create(&path)?), &value)?;
            info!(path = %path.display(), "wrote diagnostics");
            written.push(path);
        }
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scored() -> (Array1<i64>, Array1<f64>) {
        (
            Array1::from_vec(vec![0, 0, 0, 0, 1, 1]),
            Array1::from_vec(vec![0.05, 0.2, 0.45, 0.3, 0.9, 0.35]),
        )
    }

    #[test]
    fn test_evaluate_uses_threshold() {
        let (y, p) = scored();
        let report = evaluate(&y, &p, Threshold::new(0.4).unwrap()).unwrap();
        // 0.45 is a false positive, 0.35 a false negative
        assert_eq!(report.confusion.matrix, vec![vec![3, 1], vec![1, 1]]);
        assert_eq!(report.n_samples, 6);

        let lenient = evaluate(&y, &p, Threshold::new(0.1).unwrap()).unwrap();
        assert_eq!(lenient.confusion.matrix, vec![vec![1, 3], vec![0, 2]]);
    }

    #[test]
    fn test_evaluate_curve_summaries() {
        let (y, p) = scored();
        let report = evaluate(&y, &p, Threshold::new(0.4).unwrap()).unwrap();
        // positives outrank 7 of the 8 positive/negative pairs
        assert!((report.roc_auc - 0.875).abs() < 1e-12);
        assert!(report.average_precision > 0.5 && report.average_precision <= 1.0);
        assert!(report.render_text().contains("weighted avg"));
        assert!(report.render_diagnostics().contains("AUC = 0.88"));
    }

    #[test]
    fn test_write_json() {
        let (y, p) = scored();
        let report = evaluate(&y, &p, Threshold::new(0.4).unwrap()).unwrap();
        let dir = tempfile::tempdir().unwrap();

        let written = report.write_json(dir.path().join("plots")).unwrap();
        assert_eq!(written.len(), 4);
        let roc: serde_json::Value =
            serde_json::from_reader(File::open(&written[1]).unwrap()).unwrap();
        assert!((roc["auc"].as_f64().unwrap() - 0.875).abs() < 1e-12);
    }
}

//! Integration test: Thresholding and evaluation diagnostics

use fraud_pipeline::evaluation::render::{CONFUSION_TITLE, PR_TITLE, ROC_TITLE};
use fraud_pipeline::prelude::*;
use ndarray::{Array1, Array2};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

/// Two noisy gaussian-ish blobs with 20% positives
fn create_classification_data(n: usize, seed: u64) -> (Array2<f64>, Array1<i64>) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut x = Array2::zeros((n, 3));
    let mut y = Array1::zeros(n);
    for i in 0..n {
        let label = i64::from(i % 5 == 0);
        let shift = if label == 1 { 1.5 } else { 0.0 };
        for j in 0..3 {
            x[[i, j]] = shift + rng.gen_range(-1.0..1.0);
        }
        y[i] = label;
    }
    (x, y)
}

fn fitted_model() -> XGBoostClassifier {
    let (x, y) = create_classification_data(200, 1);
    let mut model = XGBoostClassifier::new(XGBoostConfig {
        n_estimators: 30,
        max_depth: 3,
        ..Default::default()
    });
    model.fit(&x, &y).unwrap();
    model
}

#[test]
fn test_held_out_evaluation_is_informative() {
    let model = fitted_model();
    let (x_test, y_test) = create_classification_data(100, 2);
    let proba = model.predict_proba(&x_test).unwrap();

    let report = evaluate(&y_test, &proba, Threshold::new(0.4).unwrap()).unwrap();
    assert_eq!(report.n_samples, 100);
    assert_eq!(report.confusion.total(), 100);
    assert_eq!(report.confusion.support(1), 20);
    assert!(report.roc_auc > 0.8, "roc auc {}", report.roc_auc);
    assert!(report.average_precision > 0.5, "ap {}", report.average_precision);

    // curve endpoints
    assert_eq!(report.roc.fpr.first(), Some(&0.0));
    assert_eq!(report.roc.tpr.last(), Some(&1.0));
    assert_eq!(report.pr.precision.last(), Some(&1.0));
    assert_eq!(report.pr.recall.last(), Some(&0.0));
}

#[test]
fn test_raising_threshold_never_adds_positives() {
    let model = fitted_model();
    let (x_test, _) = create_classification_data(100, 3);
    let proba = model.predict_proba(&x_test).unwrap();

    let mut previous = usize::MAX;
    for t in [0.0, 0.1, 0.25, 0.4, 0.5, 0.75, 0.9, 1.0] {
        let positives = count_positive(&apply_threshold(&proba, Threshold::new(t).unwrap()));
        assert!(positives <= previous);
        previous = positives;
    }
    // strict comparison: nothing exceeds 1
    assert_eq!(previous, 0);
}

#[test]
fn test_gold_and_evaluation_thresholds_differ() {
    let model = fitted_model();
    let (x_test, y_test) = create_classification_data(100, 4);
    let proba = model.predict_proba(&x_test).unwrap();

    let gold = evaluate(&y_test, &proba, Threshold::new(0.1).unwrap()).unwrap();
    let strict = evaluate(&y_test, &proba, Threshold::new(0.4).unwrap()).unwrap();

    let predicted_pos = |r: &EvaluationReport| r.confusion.get(0, 1) + r.confusion.get(1, 1);
    assert!(predicted_pos(&gold) >= predicted_pos(&strict));
    assert!(gold.report.classes[1].recall >= strict.report.classes[1].recall);
    // ranking metrics do not depend on the threshold
    assert_eq!(gold.roc_auc, strict.roc_auc);
    assert_eq!(gold.average_precision, strict.average_precision);
}

#[test]
fn test_report_rendering() {
    let y = Array1::from_vec(vec![0, 0, 0, 0, 1, 1]);
    let p = Array1::from_vec(vec![0.05, 0.2, 0.45, 0.3, 0.9, 0.35]);
    let report = evaluate(&y, &p, Threshold::new(0.4).unwrap()).unwrap();

    let text = report.render_text();
    let lines: Vec<&str> = text.lines().collect();
    assert!(lines[0].trim_start().starts_with("precision"));
    assert!(lines[0].ends_with("support"));
    assert!(text.contains("macro avg"));
    assert!(text.contains("weighted avg"));
    assert!(text.contains("0.6667"));

    let diagnostics = report.render_diagnostics();
    assert!(diagnostics.contains(CONFUSION_TITLE));
    assert!(diagnostics.contains(ROC_TITLE));
    assert!(diagnostics.contains(PR_TITLE));
}

#[test]
fn test_write_json_diagnostics() {
    let y = Array1::from_vec(vec![0, 1, 0, 1]);
    let p = Array1::from_vec(vec![0.1, 0.8, 0.4, 0.35]);
    let report = evaluate(&y, &p, Threshold::new(0.4).unwrap()).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let written = report.write_json(dir.path().join("plots")).unwrap();
    assert_eq!(written.len(), 4);
    assert!(written.iter().all(|p| p.exists()));

    let roc: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dir.path().join("plots/roc_curve.json")).unwrap()).unwrap();
    assert!((roc["auc"].as_f64().unwrap() - 0.75).abs() < 1e-12);

    let cm: ConfusionMatrix = serde_json::from_str(
        &std::fs::read_to_string(dir.path().join("plots/confusion_matrix.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(cm, report.confusion);
}

#[test]
fn test_mismatched_lengths_error() {
    let y = Array1::from_vec(vec![0, 1, 0]);
    let p = Array1::from_vec(vec![0.1, 0.8]);
    assert!(evaluate(&y, &p, Threshold::new(0.5).unwrap()).is_err());
}

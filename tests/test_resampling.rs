//! Integration test: Subsample + SMOTEENN balancing

use fraud_pipeline::prelude::*;
use fraud_pipeline::resampling::class_counts;
use ndarray::{Array1, Array2};

/// 50 legitimate rows on a grid near the origin, 8 fraud rows near (20, 20)
fn create_imbalanced_data() -> (Array2<f64>, Array1<i64>) {
    let mut values = Vec::new();
    let mut labels = Vec::new();
    for i in 0..50 {
        values.push((i % 10) as f64);
        values.push((i / 10) as f64);
        labels.push(0i64);
    }
    for i in 0..8 {
        values.push(20.0 + (i % 3) as f64);
        values.push(20.0 + (i / 3) as f64);
        labels.push(1i64);
    }
    (
        Array2::from_shape_vec((58, 2), values).unwrap(),
        Array1::from_vec(labels),
    )
}

#[test]
fn test_subsample_then_smoteenn_balances_classes() {
    let (x, y) = create_imbalanced_data();
    let (xs, ys) = stratified_subsample(&x, &y, 0.5, 42).unwrap();

    let sub_counts = class_counts(&ys);
    assert_eq!(xs.nrows(), 29);
    assert_eq!(sub_counts[&0], 25);
    assert_eq!(sub_counts[&1], 4);

    let result = SmoteEnn::new().with_seed(42).fit_resample(&xs, &ys).unwrap();
    let counts = result.class_counts();

    // separated clusters: SMOTE tops up the minority, ENN has nothing to clean
    assert_eq!(result.n_synthetic[&1], 21);
    assert_eq!(result.n_removed.values().sum::<usize>(), 0);
    assert_eq!(counts[&0], 25);
    assert_eq!(counts[&1], 25);
}

#[test]
fn test_synthetic_rows_stay_inside_minority_region() {
    let (x, y) = create_imbalanced_data();
    let result = SmoteEnn::new().with_seed(7).fit_resample(&x, &y).unwrap();

    for (row, &label) in result.x.rows().into_iter().zip(result.y.iter()) {
        if label == 1 {
            assert!(row.iter().all(|&v| (20.0..=22.0).contains(&v)));
        }
    }
}

#[test]
fn test_no_class_emptied() {
    // every fraud row sits inside the legitimate cluster
    let mut values = Vec::new();
    let mut labels = Vec::new();
    for i in 0..30 {
        values.push((i % 6) as f64);
        values.push((i / 6) as f64);
        labels.push(0i64);
    }
    for &(a, b) in &[(1.5, 1.5), (3.5, 2.5), (2.5, 3.5)] {
        values.push(a);
        values.push(b);
        labels.push(1i64);
    }
    let x = Array2::from_shape_vec((33, 2), values).unwrap();
    let y = Array1::from_vec(labels);

    let result = SmoteEnn::new().with_seed(42).fit_resample(&x, &y).unwrap();
    let counts = result.class_counts();
    assert!(counts.get(&0).copied().unwrap_or(0) > 0);
    assert!(counts.get(&1).copied().unwrap_or(0) > 0);
}

#[test]
fn test_balancing_is_deterministic_per_seed() {
    let (x, y) = create_imbalanced_data();

    let a = SmoteEnn::new().with_seed(42).fit_resample(&x, &y).unwrap();
    let b = SmoteEnn::new().with_seed(42).fit_resample(&x, &y).unwrap();
    assert_eq!(a.x, b.x);
    assert_eq!(a.y, b.y);

    let c = SmoteEnn::new().with_seed(43).fit_resample(&x, &y).unwrap();
    assert_ne!(a.x, c.x);

    let (xs1, _) = stratified_subsample(&x, &y, 0.3, 1).unwrap();
    let (xs2, _) = stratified_subsample(&x, &y, 0.3, 1).unwrap();
    assert_eq!(xs1, xs2);
}

#[test]
fn test_smoteenn_rejects_single_class() {
    let x = Array2::from_shape_vec((4, 1), vec![0.0, 1.0, 2.0, 3.0]).unwrap();
    let y = Array1::from_vec(vec![0, 0, 0, 0]);
    assert!(SmoteEnn::new().fit_resample(&x, &y).is_err());
}

#[test]
fn test_mode_selection_removes_no_more_than_all() {
    let (x, y) = create_imbalanced_data();
    let strict = SmoteEnn::new().with_seed(3).fit_resample(&x, &y).unwrap();
    let lenient = SmoteEnn::new()
        .with_seed(3)
        .with_enn_selection(EnnSelection::Mode)
        .fit_resample(&x, &y)
        .unwrap();
    assert!(lenient.y.len() >= strict.y.len());
}

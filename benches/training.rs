use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use fraud_pipeline::prelude::*;
use ndarray::{Array1, Array2};
use rand::prelude::*;

/// Imbalanced binary data: roughly 5% positives, shifted on every feature
fn create_fraud_data(n_rows: usize, n_features: usize) -> (Array2<f64>, Array1<i64>) {
    let mut rng = StdRng::seed_from_u64(42);

    let y: Array1<i64> = (0..n_rows).map(|_| i64::from(rng.gen::<f64>() < 0.05)).collect();
    let x = Array2::from_shape_fn((n_rows, n_features), |(i, _)| {
        let shift = if y[i] == 1 { 2.0 } else { 0.0 };
        shift + rng.gen::<f64>() * 10.0
    });

    (x, y)
}

fn bench_training(c: &mut Criterion) {
    let mut group = c.benchmark_group("training");
    group.sample_size(10); // Fewer samples for training benchmarks

    for n_rows in [1000, 5000, 10000].iter() {
        let (x, y) = create_fraud_data(*n_rows, 10);

        group.bench_with_input(BenchmarkId::new("fit", n_rows), &(x, y), |b, (x, y)| {
            b.iter(|| {
                let mut model = XGBoostClassifier::new(XGBoostConfig {
                    n_estimators: 20,
                    ..Default::default()
                });
                model.fit(black_box(x), black_box(y)).unwrap()
            })
        });
    }

    group.finish();
}

fn bench_prediction(c: &mut Criterion) {
    let mut group = c.benchmark_group("prediction");

    // Train model once
    let (x_train, y_train) = create_fraud_data(5000, 10);
    let mut model = XGBoostClassifier::new(XGBoostConfig {
        n_estimators: 20,
        ..Default::default()
    });
    model.fit(&x_train, &y_train).unwrap();

    for n_rows in [100, 1000, 10000].iter() {
        let (x_test, _) = create_fraud_data(*n_rows, 10);

        group.bench_with_input(BenchmarkId::new("predict_proba", n_rows), &x_test, |b, x| {
            b.iter(|| model.predict_proba(black_box(x)).unwrap())
        });
    }

    group.finish();
}

fn bench_resampling(c: &mut Criterion) {
    let mut group = c.benchmark_group("resampling");
    group.sample_size(10);

    for n_rows in [1000, 5000].iter() {
        let (x, y) = create_fraud_data(*n_rows, 10);

        group.bench_with_input(BenchmarkId::new("smoteenn", n_rows), &(x, y), |b, (x, y)| {
            b.iter(|| {
                let mut sampler = SmoteEnn::new().with_seed(42);
                sampler.fit_resample(black_box(x), black_box(y)).unwrap()
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_training, bench_prediction, bench_resampling);
criterion_main!(benches);

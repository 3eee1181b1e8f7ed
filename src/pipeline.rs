//! End-to-end training, scoring and export

use crate::config::PipelineConfig;
use crate::error::{FraudError, Result};
use crate::evaluation::{evaluate, EvaluationReport};
use crate::gold::{export_gold, GoldReport};
use crate::preprocessing::Preprocessor;
use crate::resampling::{stratified_subsample, ResampleResult, Sampler, SmoteEnn};
use crate::scoring::{score_and_threshold, ScoredBatch, Threshold};
use crate::split::{train_test_split, TrainTestSplit};
use crate::training::{ProbabilisticClassifier, XGBoostClassifier};
use crate::utils::{timed, DataLoader};
use chrono::{DateTime, Utc};
use ndarray::{Array1, Array2};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use tracing::{info, info_span, warn};

/// Drop rows whose label is null; returns the kept rows and the number dropped
pub fn drop_null_labels(df: &DataFrame, label: &str) -> Result<(DataFrame, usize)> {
    let column = df
        .column(label)
        .map_err(|_| FraudError::FeatureNotFound(label.to_string()))?;
    let mask = column.is_not_null();
    let kept = df.filter(&mask)?;
    let dropped = df.height() - kept.height();
    if dropped > 0 {
        warn!(dropped, label, "dropped rows with a missing label");
    }
    Ok((kept, dropped))
}

/// Read the label column as 0/1
///
/// Booleans and numeric 0/1 are accepted; anything else is an error.
pub fn extract_labels(df: &DataFrame, label: &str) -> Result<Array1<i64>> {
    let column = df
        .column(label)
        .map_err(|_| FraudError::FeatureNotFound(label.to_string()))?;
    if matches!(column.dtype(), DataType::String) {
        return Err(FraudError::ValidationError(format!(
            "label column '{}' must be boolean or numeric",
            label
        )));
    }
    let values = column.cast(&DataType::Float64)?;
    let ca = values.f64()?;

    ca.into_iter()
        .map(|v| match v {
            Some(x) if x == 0.0 => Ok(0),
            Some(x) if x == 1.0 => Ok(1),
            Some(x) => Err(FraudError::ValidationError(format!(
                "label column '{}' must be binary, found {}",
                label, x
            ))),
            None => Err(FraudError::ValidationError(format!(
                "label column '{}' has missing values",
                label
            ))),
        })
        .collect::<Result<Vec<i64>>>()
        .map(Array1::from_vec)
}

/// Encoded features, labels and their train/test partition
#[derive(Debug, Clone)]
pub struct PreparedData {
    pub preprocessor: Preprocessor,
    pub split: TrainTestSplit,
    /// Rows dropped because their label was null
    pub n_dropped: usize,
}

impl PreparedData {
    pub fn feature_names(&self) -> &[String] {
        self.preprocessor.feature_names()
    }

    pub fn n_train(&self) -> usize {
        self.split.y_train.len()
    }

    pub fn n_test(&self) -> usize {
        self.split.y_test.len()
    }
}

/// Sequences preprocessing, balancing and model fitting under one configuration
#[derive(Debug, Clone)]
pub struct FraudPipeline {
    config: PipelineConfig,
}

impl FraudPipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Read the source table with the configured CSV options
    pub fn load(&self, path: impl AsRef<Path>) -> Result<DataFrame> {
        DataLoader::new().with_options(self.config.csv.clone()).load_csv(path)
    }

    /// Drop unlabelled rows, fit the preprocessor and split
    pub fn prepare(&self, df: &DataFrame) -> Result<PreparedData> {
        let _span = info_span!("prepare").entered();
        let label = &self.config.label_column;

        let (prepared, elapsed) = timed(|| -> Result<(Preprocessor, TrainTestSplit, usize)> {
            let (labelled, n_dropped) = drop_null_labels(df, label)?;
            let y = extract_labels(&labelled, label)?;

            let mut preprocessor = Preprocessor::new(label.as_str());
            let features = preprocessor.fit_transform(&labelled)?;

            let split = train_test_split(&features.x, &y, self.config.split.test_size, self.config.split.seed)?;
            Ok((preprocessor, split, n_dropped))
        });
        let (preprocessor, split, n_dropped) = prepared?;

        info!(
            train = split.y_train.len(),
            test = split.y_test.len(),
            features = preprocessor.feature_names().len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "data prepared"
        );

        Ok(PreparedData {
            preprocessor,
            split,
            n_dropped,
        })
    }

    /// Stratified subsample of the training rows followed by SMOTEENN
    pub fn balance(&self, x_train: &Array2<f64>, y_train: &Array1<i64>) -> Result<ResampleResult> {
        let _span = info_span!("balance").entered();
        let rs = &self.config.resample;

        let (result, elapsed) = timed(|| -> Result<ResampleResult> {
            let (x_sub, y_sub) = stratified_subsample(x_train, y_train, rs.sample_fraction, rs.seed)?;
            info!(rows = y_sub.len(), fraction = rs.sample_fraction, "subsampled training rows");

            let mut sampler = SmoteEnn::new()
                .with_seed(rs.seed)
                .with_k_neighbors(rs.k_neighbors)
                .with_enn_neighbors(rs.enn_neighbors)
                .with_enn_selection(rs.enn_selection)
                .with_enn_target(rs.enn_target);
            sampler.fit_resample(&x_sub, &y_sub)
        });
        let result = result?;

        info!(
            rows = result.y.len(),
            classes = ?result.class_counts(),
            elapsed_ms = elapsed.as_millis() as u64,
            "training sample balanced"
        );
        Ok(result)
    }

    /// Balance the training partition and fit the classifier on it
    pub fn train(&self, prepared: &PreparedData) -> Result<TrainedPipeline> {
        let balanced = self.balance(&prepared.split.x_train, &prepared.split.y_train)?;

        let _span = info_span!("train").entered();
        let mut model = XGBoostClassifier::new(self.config.model.clone());
        let (fitted, elapsed) = timed(|| model.fit(&balanced.x, &balanced.y));
        fitted?;

        info!(
            trees = model.n_trees(),
            train_logloss = model.train_log_loss(),
            elapsed_ms = elapsed.as_millis() as u64,
            "model trained"
        );

        Ok(TrainedPipeline {
            config: self.config.clone(),
            preprocessor: prepared.preprocessor.clone(),
            model,
            balanced_counts: balanced.class_counts(),
        })
    }

    /// Prepare and train in one step
    pub fn fit(&self, df: &DataFrame) -> Result<(PreparedData, TrainedPipeline)> {
        let prepared = self.prepare(df)?;
        let trained = self.train(&prepared)?;
        Ok((prepared, trained))
    }
}

/// A fitted preprocessor and model, ready to score new tables
#[derive(Debug, Clone)]
pub struct TrainedPipeline {
    config: PipelineConfig,
    preprocessor: Preprocessor,
    model: XGBoostClassifier,
    balanced_counts: BTreeMap<i64, usize>,
}

impl TrainedPipeline {
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn preprocessor(&self) -> &Preprocessor {
        &self.preprocessor
    }

    pub fn model(&self) -> &XGBoostClassifier {
        &self.model
    }

    /// Class distribution of the sample the model was fitted on
    pub fn balanced_counts(&self) -> &BTreeMap<i64, usize> {
        &self.balanced_counts
    }

    /// Positive-class probability for every row of `df`
    pub fn score(&self, df: &DataFrame) -> Result<Array1<f64>> {
        let features = self.preprocessor.transform(df)?;
        self.model.predict_proba(&features.x)
    }

    /// Probabilities and 0/1 decisions for every row of `df`
    pub fn predict(&self, df: &DataFrame, threshold: Threshold) -> Result<ScoredBatch> {
        let features = self.preprocessor.transform(df)?;
        let batch = score_and_threshold(&self.model, &features.x, threshold)?;
        info!(
            rows = batch.len(),
            positive = batch.n_positive(),
            threshold = threshold.value(),
            "scored rows"
        );
        Ok(batch)
    }

    /// Score the held-out partition and compute diagnostics
    pub fn evaluate(&self, prepared: &PreparedData, threshold: Threshold) -> Result<EvaluationReport> {
        let _span = info_span!("evaluate").entered();
        let batch = score_and_threshold(&self.model, &prepared.split.x_test, threshold)?;
        evaluate(&prepared.split.y_test, &batch.probabilities, threshold)
    }

    /// Score every row of `source` and write the gold table to `path`
    pub fn export_gold(&self, source: &DataFrame, path: impl AsRef<Path>, threshold: Threshold) -> Result<GoldReport> {
        let _span = info_span!("export_gold").entered();
        let batch = self.predict(source, threshold)?;
        export_gold(source, &batch.predictions, &self.config.gold, path, &self.config.csv)
    }

    pub fn into_bundle(self) -> ModelBundle {
        ModelBundle {
            version: env!("CARGO_PKG_VERSION").to_string(),
            trained_at: Utc::now(),
            config: self.config,
            preprocessor: self.preprocessor,
            model: self.model,
            balanced_counts: self.balanced_counts,
        }
    }
}

/// Persisted preprocessor, model and the configuration that produced them
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelBundle {
    pub version: String,
    pub trained_at: DateTime<Utc>,
    pub config: PipelineConfig,
    pub preprocessor: Preprocessor,
    pub model: XGBoostClassifier,
    #[serde(default)]
    pub balanced_counts: BTreeMap<i64, usize>,
}

impl ModelBundle {
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        serde_json::to_writer(BufWriter::new(File::create(path)?), self)?;
        info!(path = %path.display(), "saved model bundle");
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bundle: Self = serde_json::from_reader(BufReader::new(File::open(path)?))?;
        if !bundle.preprocessor.is_fitted() || !bundle.model.is_fitted() {
            return Err(FraudError::ModelNotFitted);
        }
        info!(path = %path.display(), version = %bundle.version, trained_at = %bundle.trained_at, "loaded model bundle");
        Ok(bundle)
    }

    pub fn into_pipeline(self) -> TrainedPipeline {
        TrainedPipeline {
            config: self.config,
            preprocessor: self.preprocessor,
            model: self.model,
            balanced_counts: self.balanced_counts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drop_null_labels() {
        let df = df!(
            "amount" => &[1.0, 2.0, 3.0],
            "fraud_bool" => &[Some(0i64), None, Some(1)]
        )
        .unwrap();
        let (kept, dropped) = drop_null_labels(&df, "fraud_bool").unwrap();
        assert_eq!(kept.height(), 2);
        assert_eq!(dropped, 1);
        assert!(matches!(
            drop_null_labels(&df, "is_fraud"),
            Err(FraudError::FeatureNotFound(_))
        ));
    }

    #[test]
    fn test_extract_labels_accepts_bool_and_numeric() {
        let df = df!(
            "a" => &[true, false, true],
            "b" => &[0.0, 1.0, 1.0],
            "c" => &[0i64, 2, 1],
            "d" => &["0", "1", "0"]
        )
        .unwrap();
        assert_eq!(extract_labels(&df, "a").unwrap().to_vec(), vec![1, 0, 1]);
        assert_eq!(extract_labels(&df, "b").unwrap().to_vec(), vec![0, 1, 1]);
        assert!(extract_labels(&df, "c").is_err());
        assert!(extract_labels(&df, "d").is_err());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = PipelineConfig::new().with_test_size(0.0);
        assert!(FraudPipeline::new(config).is_err());
    }
}

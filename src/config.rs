//! Pipeline configuration

use crate::error::{FraudError, Result};
use crate::gold::GoldConfig;
use crate::resampling::{CleaningTarget, EnnSelection};
use crate::scoring::Threshold;
use crate::training::XGBoostConfig;
use crate::utils::CsvOptions;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_LABEL_COLUMN: &str = "fraud_bool";
pub const DEFAULT_SEED: u64 = 42;
/// Decision threshold used when exporting the gold table
pub const DEFAULT_GOLD_THRESHOLD: f64 = 0.1;
/// Decision threshold used when evaluating on the test partition
pub const DEFAULT_EVALUATION_THRESHOLD: f64 = 0.4;

/// Train/test split settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    /// Fraction of rows held out for testing
    pub test_size: f64,
    pub seed: u64,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            test_size: 0.2,
            seed: DEFAULT_SEED,
        }
    }
}

/// Class rebalancing settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResampleConfig {
    /// Stratified fraction of the training partition kept before SMOTEENN
    pub sample_fraction: f64,
    /// SMOTE neighbourhood size
    pub k_neighbors: usize,
    /// ENN neighbourhood size
    pub enn_neighbors: usize,
    pub enn_selection: EnnSelection,
    pub enn_target: CleaningTarget,
    pub seed: u64,
}

impl Default for ResampleConfig {
    fn default() -> Self {
        Self {
            sample_fraction: 0.2,
            k_neighbors: 5,
            enn_neighbors: 3,
            enn_selection: EnnSelection::All,
            enn_target: CleaningTarget::All,
            seed: DEFAULT_SEED,
        }
    }
}

/// Per-variant decision thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    pub gold: f64,
    pub evaluation: f64,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            gold: DEFAULT_GOLD_THRESHOLD,
            evaluation: DEFAULT_EVALUATION_THRESHOLD,
        }
    }
}

impl ThresholdConfig {
    pub fn gold(&self) -> Result<Threshold> {
        Threshold::new(self.gold)
    }

    pub fn evaluation(&self) -> Result<Threshold> {
        Threshold::new(self.evaluation)
    }
}

/// Configuration for the whole pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Binary target column
    pub label_column: String,
    pub csv: CsvOptions,
    pub split: SplitConfig,
    pub resample: ResampleConfig,
    pub model: XGBoostConfig,
    pub thresholds: ThresholdConfig,
    pub gold: GoldConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            label_column: DEFAULT_LABEL_COLUMN.to_string(),
            csv: CsvOptions::default(),
            split: SplitConfig::default(),
            resample: ResampleConfig::default(),
            model: XGBoostConfig::default(),
            thresholds: ThresholdConfig::default(),
            gold: GoldConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_label_column(mut self, label: impl Into<String>) -> Self {
        self.label_column = label.into();
        self
    }

    pub fn with_csv(mut self, csv: CsvOptions) -> Self {
        self.csv = csv;
        self
    }

    pub fn with_test_size(mut self, test_size: f64) -> Self {
        self.split.test_size = test_size;
        self
    }

    /// Seed the split, the resamplers and the model together
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.split.seed = seed;
        self.resample.seed = seed;
        self.model.random_state = Some(seed);
        self
    }

    pub fn with_sample_fraction(mut self, fraction: f64) -> Self {
        self.resample.sample_fraction = fraction;
        self
    }

    pub fn with_resample(mut self, resample: ResampleConfig) -> Self {
        self.resample = resample;
        self
    }

    pub fn with_model(mut self, model: XGBoostConfig) -> Self {
        self.model = model;
        self
    }

    pub fn with_gold_threshold(mut self, threshold: f64) -> Self {
        self.thresholds.gold = threshold;
        self
    }

    pub fn with_evaluation_threshold(mut self, threshold: f64) -> Self {
        self.thresholds.evaluation = threshold;
        self
    }

    pub fn with_gold(mut self, gold: GoldConfig) -> Self {
        self.gold = gold;
        self
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.label_column.trim().is_empty() {
            return Err(FraudError::ConfigError("label_column is empty".to_string()));
        }
        if !(self.split.test_size > 0.0 && self.split.test_size < 1.0) {
            return Err(FraudError::invalid_parameter(
                "split.test_size",
                self.split.test_size,
                "must be in (0, 1)",
            ));
        }
        if !(self.resample.sample_fraction > 0.0 && self.resample.sample_fraction <= 1.0) {
            return Err(FraudError::invalid_parameter(
                "resample.sample_fraction",
                self.resample.sample_fraction,
                "must be in (0, 1]",
            ));
        }
        if self.resample.k_neighbors == 0 {
            return Err(FraudError::invalid_parameter("resample.k_neighbors", 0, "must be at least 1"));
        }
        if self.resample.enn_neighbors == 0 {
            return Err(FraudError::invalid_parameter("resample.enn_neighbors", 0, "must be at least 1"));
        }
        self.thresholds.gold()?;
        self.thresholds.evaluation()?;
        self.model.validate()?;
        if self.gold.prediction_column.trim().is_empty() {
            return Err(FraudError::ConfigError("gold.prediction_column is empty".to_string()));
        }
        Ok(())
    }

    /// Load from JSON; absent fields take their defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            FraudError::ConfigError(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_file(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.label_column, "fraud_bool");
        assert_eq!(config.split.test_size, 0.2);
        assert_eq!(config.resample.sample_fraction, 0.2);
        assert_eq!(config.thresholds.gold, 0.1);
        assert_eq!(config.thresholds.evaluation, 0.4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{"label_column": "is_fraud", "model": {"n_estimators": 10}}"#).unwrap();
        assert_eq!(config.label_column, "is_fraud");
        assert_eq!(config.model.n_estimators, 10);
        assert_eq!(config.model.max_depth, 6);
        assert_eq!(config.resample.enn_neighbors, 3);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(PipelineConfig::new().with_test_size(1.0).validate().is_err());
        assert!(PipelineConfig::new().with_sample_fraction(0.0).validate().is_err());
        assert!(PipelineConfig::new().with_gold_threshold(1.5).validate().is_err());
        assert!(PipelineConfig::new().with_label_column(" ").validate().is_err());
    }

    #[test]
    fn test_seed_propagates() {
        let config = PipelineConfig::new().with_seed(7);
        assert_eq!(config.split.seed, 7);
        assert_eq!(config.resample.seed, 7);
        assert_eq!(config.model.random_state, Some(7));
    }

    #[test]
    fn test_json_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let config = PipelineConfig::new().with_evaluation_threshold(0.3);
        config.to_json_file(&path).unwrap();
        assert_eq!(PipelineConfig::from_json_file(&path).unwrap(), config);
    }
}

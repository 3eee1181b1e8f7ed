//! Fraud pipeline - fraud-detection model training and evaluation
//!
//! This crate provides one linear pipeline over tabular transaction data:
//! - Categorical label encoding and median imputation
//! - Stratified train/test splitting
//! - Stratified subsampling followed by SMOTEENN rebalancing
//! - Gradient-boosted trees with second-order updates
//! - Threshold-based classification
//! - Gold table export and evaluation diagnostics
//!
//! # Modules
//!
//! - [`preprocessing`] - Label encoding, median imputation, the fitted preprocessor
//! - [`split`] - Stratified train/test split
//! - [`resampling`] - Stratified subsample, SMOTE, ENN, SMOTEENN
//! - [`training`] - XGBoost-style classifier
//! - [`scoring`] - Probability thresholding
//! - [`gold`] - Gold table export
//! - [`evaluation`] - Classification report, ROC and PR curves, terminal charts
//! - [`pipeline`] - End-to-end orchestration and model bundles
//! - [`config`] - Pipeline configuration
//! - [`cli`] - Command-line interface

// Core error handling
pub mod error;

// Pipeline stages
pub mod preprocessing;
pub mod split;
pub mod resampling;
pub mod training;
pub mod scoring;

// Outputs
pub mod gold;
pub mod evaluation;

// Orchestration
pub mod config;
pub mod pipeline;

// Services
pub mod cli;

// Utilities
pub mod utils;

pub use error::{FraudError, Result};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::error::{FraudError, Result};

    // Configuration
    pub use crate::config::{PipelineConfig, ResampleConfig, SplitConfig, ThresholdConfig};

    // Preprocessing
    pub use crate::preprocessing::{FeatureMatrix, LabelEncoder, MedianImputer, Preprocessor};

    // Splitting and resampling
    pub use crate::split::{stratified_split, train_test_split, TrainTestSplit};
    pub use crate::resampling::{
        stratified_subsample, CleaningTarget, EditedNearestNeighbours, EnnSelection, ResampleResult,
        Sampler, Smote, SmoteEnn,
    };

    // Training and scoring
    pub use crate::training::{ProbabilisticClassifier, XGBoostClassifier, XGBoostConfig};
    pub use crate::scoring::{apply_threshold, count_positive, Threshold};

    // Outputs
    pub use crate::gold::{export_gold, GoldConfig, GoldReport};
    pub use crate::evaluation::{evaluate, ClassificationReport, ConfusionMatrix, EvaluationReport};

    // Orchestration
    pub use crate::pipeline::{FraudPipeline, ModelBundle, PreparedData, TrainedPipeline};

    // Data I/O
    pub use crate::utils::{CsvOptions, DataLoader, DataSaver};
}

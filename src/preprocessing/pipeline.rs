//! Fitted encode-then-impute preprocessor

use super::encoder::{categorical_columns, LabelEncoder};
use super::imputer::MedianImputer;
use crate::error::{FraudError, Result};
use ndarray::Array2;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// Dense numeric features with their column names
#[derive(Debug, Clone)]
pub struct FeatureMatrix {
    pub x: Array2<f64>,
    pub feature_names: Vec<String>,
}

impl FeatureMatrix {
    pub fn n_rows(&self) -> usize {
        self.x.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.x.ncols()
    }
}

/// Label encoder and median imputer fitted once over the feature columns
///
/// The fitted state is the artifact reused for every later transform,
/// so training rows and scored rows see identical codes and medians.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Preprocessor {
    label_column: String,
    feature_names: Vec<String>,
    encoder: LabelEncoder,
    imputer: MedianImputer,
    is_fitted: bool,
}

impl Preprocessor {
    /// Create an unfitted preprocessor that ignores `label_column`
    pub fn new(label_column: impl Into<String>) -> Self {
        Self {
            label_column: label_column.into(),
            feature_names: Vec::new(),
            encoder: LabelEncoder::new(),
            imputer: MedianImputer::new(),
            is_fitted: false,
        }
    }

    /// Fit on every column of `df` except the label
    pub fn fit(&mut self, df: &DataFrame) -> Result<&mut Self> {
        let features = self.feature_frame(df, None)?;
        self.feature_names = features
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();

        if self.feature_names.is_empty() {
            return Err(FraudError::PreprocessingError(
                "no feature columns besides the label".to_string(),
            ));
        }

        let categorical = categorical_columns(&features);
        let cat_refs: Vec<&str> = categorical.iter().map(String::as_str).collect();
        let encoded = self.encoder.fit_transform(&features, &cat_refs)?;

        let all_refs: Vec<&str> = self.feature_names.iter().map(String::as_str).collect();
        self.imputer.fit(&encoded, &all_refs)?;

        self.is_fitted = true;
        info!(
            features = self.feature_names.len(),
            categorical = categorical.len(),
            rows = df.height(),
            "fitted preprocessor"
        );
        Ok(self)
    }

    /// Encoded and imputed feature table, columns in fit order
    pub fn transform_frame(&self, df: &DataFrame) -> Result<DataFrame> {
        if !self.is_fitted {
            return Err(FraudError::ModelNotFitted);
        }
        let features = self.feature_frame(df, Some(&self.feature_names))?;
        let encoded = self.encoder.transform(&features)?;
        self.imputer.transform(&encoded)
    }

    /// Encoded and imputed features as a dense matrix
    pub fn transform(&self, df: &DataFrame) -> Result<FeatureMatrix> {
        let frame = self.transform_frame(df)?;
        let n_rows = frame.height();
        let n_cols = self.feature_names.len();

        let mut x = Array2::<f64>::zeros((n_rows, n_cols));
        for (j, name) in self.feature_names.iter().enumerate() {
            let ca = frame.column(name)?.f64()?;
            for (i, value) in ca.into_iter().enumerate() {
                x[[i, j]] = value.ok_or_else(|| {
                    FraudError::PreprocessingError(format!(
                        "null left in column '{}' after imputation",
                        name
                    ))
                })?;
            }
        }

        debug!(rows = n_rows, cols = n_cols, "transformed feature matrix");
        Ok(FeatureMatrix {
            x,
            feature_names: self.feature_names.clone(),
        })
    }

    /// Fit and transform in one step
    pub fn fit_transform(&mut self, df: &DataFrame) -> Result<FeatureMatrix> {
        self.fit(df)?;
        self.transform(df)
    }

    fn feature_frame(&self, df: &DataFrame, expected: Option<&[String]>) -> Result<DataFrame> {
        match expected {
            Some(names) => {
                if let Some(missing) = names.iter().find(|n| df.column(n).is_err()) {
                    return Err(FraudError::FeatureNotFound(missing.clone()));
                }
                Ok(df.select(names.iter().map(String::as_str))?)
            }
            None => {
                let names: Vec<String> = df
                    .get_column_names()
                    .iter()
                    .map(|s| s.to_string())
                    .filter(|s| s != &self.label_column)
                    .collect();
                Ok(df.select(names.iter().map(String::as_str))?)
            }
        }
    }

    /// Save the fitted state as JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load a fitted state saved with [`Preprocessor::save`]
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let preprocessor: Self = serde_json::from_str(&json)?;
        Ok(preprocessor)
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn label_column(&self) -> &str {
        &self.label_column
    }

    pub fn encoder(&self) -> &LabelEncoder {
        &self.encoder
    }

    pub fn imputer(&self) -> &MedianImputer {
        &self.imputer
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }
}

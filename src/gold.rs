//! Gold export: scored source rows reduced to a fixed column set

use crate::error::{FraudError, Result};
use crate::utils::{CsvOptions, DataSaver};
use ndarray::Array1;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Columns written to the gold file, in output order
pub const DEFAULT_GOLD_COLUMNS: [&str; 7] = [
    "fraud_bool",
    "month",
    "month_named",
    "predicted_fraud",
    "credit_risk_score",
    "source",
    "payment_type",
];

pub const DEFAULT_PREDICTION_COLUMN: &str = "predicted_fraud";

/// Gold export settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GoldConfig {
    pub columns: Vec<String>,
    /// Name of the attached 0/1 prediction column
    pub prediction_column: String,
    /// Prefix the file with a UTF-8 byte-order mark
    pub include_bom: bool,
}

impl Default for GoldConfig {
    fn default() -> Self {
        Self {
            columns: DEFAULT_GOLD_COLUMNS.iter().map(|s| s.to_string()).collect(),
            prediction_column: DEFAULT_PREDICTION_COLUMN.to_string(),
            include_bom: true,
        }
    }
}

impl GoldConfig {
    pub fn with_columns<S: Into<String>>(mut self, columns: impl IntoIterator<Item = S>) -> Self {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_prediction_column(mut self, name: impl Into<String>) -> Self {
        self.prediction_column = name.into();
        self
    }

    pub fn with_bom(mut self, include_bom: bool) -> Self {
        self.include_bom = include_bom;
        self
    }
}

/// Wanted columns split by availability, both in the wanted order
#[derive(Debug, Clone, PartialEq)]
pub struct GoldSelection {
    pub present: Vec<String>,
    pub missing: Vec<String>,
}

/// Outcome of a gold export
#[derive(Debug, Clone, Serialize)]
pub struct GoldReport {
    pub rows_written: usize,
    pub columns_written: Vec<String>,
    pub columns_missing: Vec<String>,
    pub n_predicted_positive: usize,
    pub path: PathBuf,
}

/// Split `wanted` into the columns `df` has and the ones it lacks
pub fn select_gold_columns(df: &DataFrame, wanted: &[String]) -> GoldSelection {
    let (present, missing): (Vec<String>, Vec<String>) = wanted
        .iter()
        .cloned()
        .partition(|name| df.column(name).is_ok());
    GoldSelection { present, missing }
}

/// Add `predictions` as an Int64 column, replacing any column of that name
pub fn attach_predictions(df: &DataFrame, column: &str, predictions: &Array1<i64>) -> Result<DataFrame> {
    if predictions.len() != df.height() {
        return Err(FraudError::ShapeError {
            expected: format!("{} predictions", df.height()),
            actual: predictions.len().to_string(),
        });
    }
    let mut out = df.clone();
    out.with_column(Series::new(column.into(), predictions.to_vec()))?;
    Ok(out)
}

/// Attach predictions, keep the configured columns and write them out
///
/// Missing columns are reported once and skipped. Fails only when none of
/// the configured columns exist.
pub fn export_gold(
    df: &DataFrame,
    predictions: &Array1<i64>,
    config: &GoldConfig,
    path: impl AsRef<Path>,
    csv: &CsvOptions,
) -> Result<GoldReport> {
    let path = path.as_ref();
    let scored = attach_predictions(df, &config.prediction_column, predictions)?;

    let available: Vec<String> = scored
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();
    info!(columns = ?available, "available columns");

    let selection = select_gold_columns(&scored, &config.columns);
    if !selection.missing.is_empty() {
        warn!(missing = ?selection.missing, "gold columns not found, skipping them");
    }
    if selection.present.is_empty() {
        return Err(FraudError::DataError(
            "none of the configured gold columns exist".to_string(),
        ));
    }

    let mut gold = scored.select(selection.present.iter().map(String::as_str))?;
    DataSaver::save_csv(&mut gold, path, csv, config.include_bom)?;

    let n_predicted_positive = predictions.iter().filter(|&&p| p == 1).count();
    info!(
        path = %path.display(),
        rows = gold.height(),
        columns = selection.present.len(),
        predicted_positive = n_predicted_positive,
        "gold table written"
    );

    Ok(GoldReport {
        rows_written: gold.height(),
        columns_written: selection.present,
        columns_missing: selection.missing,
        n_predicted_positive,
        path: path.to_path_buf(),
    })
}

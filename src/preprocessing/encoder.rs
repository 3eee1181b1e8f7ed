//! Categorical label encoding

use crate::error::{FraudError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// Category used for a missing value in a string column
pub const MISSING_CATEGORY: &str = "nan";

/// How a single column is encoded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ColumnEncoding {
    /// String column; code = position in the sorted class list
    Categorical { classes: Vec<String> },
    /// Boolean column; `false -> 0`, `true -> 1`, null stays null
    Boolean,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct EncodedColumn {
    name: String,
    encoding: ColumnEncoding,
}

/// Per-column label encoder
///
/// Fitted once and reused, so the same category always maps to the same
/// code no matter which subset of rows is transformed later.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LabelEncoder {
    columns: Vec<EncodedColumn>,
    is_fitted: bool,
}

/// Names of the string and boolean columns of `df`
pub fn categorical_columns(df: &DataFrame) -> Vec<String> {
    df.get_columns()
        .iter()
        .filter(|c| matches!(c.dtype(), DataType::String | DataType::Boolean))
        .map(|c| c.name().to_string())
        .collect()
}

impl LabelEncoder {
    /// Create an unfitted encoder
    pub fn new() -> Self {
        Self::default()
    }

    /// Fit the encoder on `columns` of `df`
    pub fn fit(&mut self, df: &DataFrame, columns: &[&str]) -> Result<&mut Self> {
        self.columns.clear();

        for col_name in columns {
            let column = df
                .column(col_name)
                .map_err(|_| FraudError::FeatureNotFound(col_name.to_string()))?;
            let series = column.as_materialized_series();

            let encoding = match series.dtype() {
                DataType::String => {
                    let ca = series.str()?;
                    let classes: BTreeSet<&str> = ca
                        .into_iter()
                        .map(|v| v.unwrap_or(MISSING_CATEGORY))
                        .collect();
                    ColumnEncoding::Categorical {
                        classes: classes.into_iter().map(str::to_string).collect(),
                    }
                }
                DataType::Boolean => ColumnEncoding::Boolean,
                other => {
                    return Err(FraudError::PreprocessingError(format!(
                        "column '{}' has dtype {} and cannot be label encoded",
                        col_name, other
                    )))
                }
            };

            debug!(column = %col_name, ?encoding, "fitted label encoding");
            self.columns.push(EncodedColumn {
                name: col_name.to_string(),
                encoding,
            });
        }

        self.is_fitted = true;
        Ok(self)
    }

    /// Replace every fitted column of `df` with its integer codes
    ///
    /// Values unseen at fit time become null.
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        if !self.is_fitted {
            return Err(FraudError::ModelNotFitted);
        }

        let mut result = df.clone();

        for col in &self.columns {
            let series = df
                .column(&col.name)
                .map_err(|_| FraudError::FeatureNotFound(col.name.clone()))?
                .as_materialized_series();

            let codes: Vec<Option<i64>> = match &col.encoding {
                ColumnEncoding::Categorical { classes } => {
                    let ca = series.str().map_err(|_| {
                        FraudError::PreprocessingError(format!(
                            "column '{}' was fitted as categorical but is {}",
                            col.name,
                            series.dtype()
                        ))
                    })?;
                    let codes: Vec<Option<i64>> = ca
                        .into_iter()
                        .map(|v| {
                            let key = v.unwrap_or(MISSING_CATEGORY);
                            classes
                                .binary_search_by(|c| c.as_str().cmp(key))
                                .ok()
                                .map(|i| i as i64)
                        })
                        .collect();

                    let unseen = codes.iter().filter(|c| c.is_none()).count();
                    if unseen > 0 {
                        warn!(column = %col.name, unseen, "categories unseen at fit time encoded as missing");
                    }
                    codes
                }
                ColumnEncoding::Boolean => {
                    let ca = series.bool().map_err(|_| {
                        FraudError::PreprocessingError(format!(
                            "column '{}' was fitted as boolean but is {}",
                            col.name,
                            series.dtype()
                        ))
                    })?;
                    ca.into_iter().map(|v| v.map(i64::from)).collect()
                }
            };

            result.with_column(Series::new(col.name.as_str().into(), codes))?;
        }

        Ok(result)
    }

    /// Fit and transform in one step
    pub fn fit_transform(&mut self, df: &DataFrame, columns: &[&str]) -> Result<DataFrame> {
        self.fit(df, columns)?;
        self.transform(df)
    }

    /// Sorted class list of a fitted categorical column
    pub fn classes(&self, column: &str) -> Option<&[String]> {
        self.columns.iter().find(|c| c.name == column).and_then(|c| match &c.encoding {
            ColumnEncoding::Categorical { classes } => Some(classes.as_slice()),
            ColumnEncoding::Boolean => None,
        })
    }

    /// Names of the fitted columns, in fit order
    pub fn encoded_columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }
}

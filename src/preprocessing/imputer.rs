//! Median imputation for numeric columns

use crate::error::{FraudError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct FillValue {
    column: String,
    median: f64,
}

/// Replaces missing numeric values with the column median seen at fit time
///
/// Every transformed column comes out as `Float64`. NaN counts as missing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MedianImputer {
    fill_values: Vec<FillValue>,
    is_fitted: bool,
}

/// Check if dtype is numeric
pub(crate) fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

fn as_f64(series: &Series, name: &str) -> Result<Float64Chunked> {
    if !is_numeric_dtype(series.dtype()) && series.dtype() != &DataType::Boolean {
        return Err(FraudError::PreprocessingError(format!(
            "column '{}' has non-numeric dtype {}",
            name,
            series.dtype()
        )));
    }
    let cast = series.cast(&DataType::Float64)?;
    Ok(cast.f64()?.clone())
}

impl MedianImputer {
    /// Create an unfitted imputer
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute the median of each of `columns`
    pub fn fit(&mut self, df: &DataFrame, columns: &[&str]) -> Result<&mut Self> {
        self.fill_values.clear();

        for col_name in columns {
            let series = df
                .column(col_name)
                .map_err(|_| FraudError::FeatureNotFound(col_name.to_string()))?
                .as_materialized_series();

            let ca = as_f64(series, col_name)?;
            // NaN is treated as missing, not as a value
            let observed: Float64Chunked = ca
                .into_iter()
                .map(|v| v.filter(|x| !x.is_nan()))
                .collect();

            let median = match observed.median() {
                Some(m) => m,
                None => {
                    warn!(column = %col_name, "column has no observed values, imputing 0.0");
                    0.0
                }
            };

            self.fill_values.push(FillValue {
                column: col_name.to_string(),
                median,
            });
        }

        self.is_fitted = true;
        Ok(self)
    }

    /// Fill the missing values of every fitted column
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        if !self.is_fitted {
            return Err(FraudError::ModelNotFitted);
        }

        let mut result = df.clone();

        for fill in &self.fill_values {
            let series = df
                .column(&fill.column)
                .map_err(|_| FraudError::FeatureNotFound(fill.column.clone()))?
                .as_materialized_series();

            let ca = as_f64(series, &fill.column)?;
            let filled: Float64Chunked = ca
                .into_iter()
                .map(|v| match v {
                    Some(x) if !x.is_nan() => Some(x),
                    _ => Some(fill.median),
                })
                .collect();

            result.with_column(filled.with_name(fill.column.as_str().into()).into_series())?;
        }

        Ok(result)
    }

    /// Fit and transform in one step
    pub fn fit_transform(&mut self, df: &DataFrame, columns: &[&str]) -> Result<DataFrame> {
        self.fit(df, columns)?;
        self.transform(df)
    }

    /// Median fitted for `column`
    pub fn median(&self, column: &str) -> Option<f64> {
        self.fill_values
            .iter()
            .find(|f| f.column == column)
            .map(|f| f.median)
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }
}

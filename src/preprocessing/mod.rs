//! Data preprocessing module
//!
//! Turns the raw transaction table into a dense numeric feature matrix:
//! - Label encoding of string and boolean columns
//! - Median imputation of missing numeric values
//! - A fitted [`Preprocessor`] that composes both and can be persisted

mod encoder;
mod imputer;
mod pipeline;

pub use encoder::{categorical_columns, ColumnEncoding, LabelEncoder, MISSING_CATEGORY};
pub use imputer::MedianImputer;
pub use pipeline::{FeatureMatrix, Preprocessor};

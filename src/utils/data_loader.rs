//! Data loading utilities

use crate::error::{FraudError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

/// Field values read as missing, matching the usual dataframe defaults
pub const DEFAULT_NULL_VALUES: [&str; 18] = [
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Options for reading and writing delimited files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsvOptions {
    /// Field separator. A `.tsv` extension switches the default `,` to tab.
    pub separator: char,
    /// Rows used for schema inference (`None` scans the whole file)
    pub infer_schema_length: Option<usize>,
    /// Tokens read as null in every column; empty fields are always null
    pub null_values: Vec<String>,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            separator: ',',
            infer_schema_length: None,
            null_values: DEFAULT_NULL_VALUES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl CsvOptions {
    /// Set the field separator
    pub fn with_separator(mut self, separator: char) -> Self {
        self.separator = separator;
        self
    }

    /// Replace the tokens read as missing
    pub fn with_null_values<S: Into<String>>(mut self, values: impl IntoIterator<Item = S>) -> Self {
        self.null_values = values.into_iter().map(Into::into).collect();
        self
    }

    fn polars_null_values(&self) -> Option<NullValues> {
        if self.null_values.is_empty() {
            return None;
        }
        Some(NullValues::AllColumns(
            self.null_values.iter().map(|v| v.as_str().into()).collect(),
        ))
    }

    /// Separator byte to use for `path`
    pub fn separator_for(&self, path: &Path) -> Result<u8> {
        let is_tsv = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("tsv"))
            .unwrap_or(false);

        let separator = if is_tsv && self.separator == ',' {
            '\t'
        } else {
            self.separator
        };

        if !separator.is_ascii() {
            return Err(FraudError::invalid_parameter(
                "separator",
                separator,
                "must be a single ASCII character",
            ));
        }
        Ok(separator as u8)
    }
}

/// Data loader for delimited files
#[derive(Debug, Clone, Default)]
pub struct DataLoader {
    options: CsvOptions,
}

impl DataLoader {
    /// Create a new data loader with default options
    pub fn new() -> Self {
        Self::default()
    }

    /// Use the given CSV options
    pub fn with_options(mut self, options: CsvOptions) -> Self {
        self.options = options;
        self
    }

    /// Load a delimited file with a header row
    pub fn load_csv(&self, path: impl AsRef<Path>) -> Result<DataFrame> {
        let path = path.as_ref();
        let start = Instant::now();

        let file = File::open(path).map_err(|e| {
            FraudError::DataError(format!("cannot open {}: {}", path.display(), e))
        })?;

        let parse_opts = CsvParseOptions::default()
            .with_separator(self.options.separator_for(path)?)
            .with_null_values(self.options.polars_null_values());

        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(self.options.infer_schema_length)
            .with_parse_options(parse_opts)
            .into_reader_with_file_handle(file)
            .finish()
            .map_err(|e| FraudError::DataError(format!("{}: {}", path.display(), e)))?;

        info!(
            path = %path.display(),
            rows = df.height(),
            cols = df.width(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "loaded dataset"
        );
        Ok(df)
    }
}

/// Save a DataFrame to a delimited file
pub struct DataSaver;

impl DataSaver {
    /// Write `df` with a header row. `include_bom` prefixes a UTF-8 byte-order mark.
    pub fn save_csv(
        df: &mut DataFrame,
        path: impl AsRef<Path>,
        options: &CsvOptions,
        include_bom: bool,
    ) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = File::create(path)?;

        CsvWriter::new(&mut file)
            .include_header(true)
            .include_bom(include_bom)
            .with_separator(options.separator_for(path)?)
            .finish(df)
            .map_err(|e| FraudError::DataError(e.to_string()))?;

        debug!(path = %path.display(), rows = df.height(), "wrote csv");
        Ok(())
    }
}

/// Per-column summary
#[derive(Debug, Clone, Serialize)]
pub struct ColumnSummary {
    pub name: String,
    pub dtype: String,
    pub null_count: usize,
}

/// Shape and column overview of a dataset
#[derive(Debug, Clone, Serialize)]
pub struct DatasetSummary {
    pub n_rows: usize,
    pub n_cols: usize,
    pub columns: Vec<ColumnSummary>,
}

impl DatasetSummary {
    /// Columns with at least one null
    pub fn columns_with_nulls(&self) -> impl Iterator<Item = &ColumnSummary> {
        self.columns.iter().filter(|c| c.null_count > 0)
    }
}

/// Summarize the shape, dtypes and null counts of `df`
pub fn describe(df: &DataFrame) -> DatasetSummary {
    let columns = df
        .get_columns()
        .iter()
        .map(|col| ColumnSummary {
            name: col.name().to_string(),
            dtype: col.dtype().to_string(),
            null_count: col.null_count(),
        })
        .collect();

    DatasetSummary {
        n_rows: df.height(),
        n_cols: df.width(),
        columns,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_separator_for_tsv() {
        let opts = CsvOptions::default();
        assert_eq!(opts.separator_for(Path::new("data.tsv")).unwrap(), b'\t');
        assert_eq!(opts.separator_for(Path::new("data.csv")).unwrap(), b',');

        let opts = CsvOptions::default().with_separator(';');
        assert_eq!(opts.separator_for(Path::new("data.tsv")).unwrap(), b';');
    }

    #[test]
    fn test_non_ascii_separator_rejected() {
        let opts = CsvOptions::default().with_separator('§');
        assert!(opts.separator_for(Path::new("data.csv")).is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let err = DataLoader::new().load_csv("/definitely/not/here.csv").unwrap_err();
        assert!(matches!(err, FraudError::DataError(_)));
    }

    #[test]
    fn test_load_and_describe() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "a,b,label").unwrap();
        writeln!(file, "1.0,x,0").unwrap();
        writeln!(file, ",y,1").unwrap();
        file.flush().unwrap();

        let df = DataLoader::new().load_csv(file.path()).unwrap();
        assert_eq!(df.height(), 2);

        let summary = describe(&df);
        assert_eq!(summary.n_cols, 3);
        let with_nulls: Vec<&str> = summary.columns_with_nulls().map(|c| c.name.as_str()).collect();
        assert_eq!(with_nulls, vec!["a"]);
    }

    #[test]
    fn test_schema_inferred_from_whole_file() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "amount,fraud_bool").unwrap();
        for i in 0..10_300 {
            if i == 10_200 {
                writeln!(file, "1.5,0").unwrap();
            } else {
                writeln!(file, "{},0", i).unwrap();
            }
        }
        file.flush().unwrap();

        let df = DataLoader::new().load_csv(file.path()).unwrap();
        assert_eq!(df.height(), 10_300);
        let amount = df.column("amount").unwrap();
        assert_eq!(amount.dtype(), &DataType::Float64);
        assert_eq!(amount.f64().unwrap().get(10_200), Some(1.5));
    }

    #[test]
    fn test_missing_value_tokens_read_as_null() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "velocity,source").unwrap();
        writeln!(file, "1.0,INTERNET").unwrap();
        writeln!(file, "NA,N/A").unwrap();
        writeln!(file, "3.0,TELEAPP").unwrap();
        file.flush().unwrap();

        let df = DataLoader::new().load_csv(file.path()).unwrap();
        let velocity = df.column("velocity").unwrap();
        assert_eq!(velocity.dtype(), &DataType::Float64);
        assert_eq!(velocity.null_count(), 1);
        assert_eq!(df.column("source").unwrap().null_count(), 1);

        // with no tokens configured, NA is an ordinary string
        let raw = DataLoader::new()
            .with_options(CsvOptions::default().with_null_values(Vec::<String>::new()))
            .load_csv(file.path())
            .unwrap();
        assert_eq!(raw.column("velocity").unwrap().dtype(), &DataType::String);
    }

    #[test]
    fn test_save_with_bom() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let mut df = df!("x" => &[1i64, 2]).unwrap();

        DataSaver::save_csv(&mut df, &path, &CsvOptions::default(), true).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[..3], &[0xEF, 0xBB, 0xBF]);
        assert!(String::from_utf8_lossy(&bytes[3..]).starts_with("x\n1\n2"));
    }
}

use crate::fetch::FetchError;

/// Why a dataset could not be loaded.
#[derive(thiserror::Error, Debug)]
pub enum LoadError {
    #[error("reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("malformed Parquet: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),
    #[error("unreadable Arrow data: {0}")]
    Arrow(#[from] arrow::error::ArrowError),
    #[error("the source is empty")]
    EmptySource,
    #[error("dataset is missing columns: {0:?}")]
    MissingColumns(Vec<String>),
    #[error("column '{0}' appears more than once")]
    DuplicateColumn(String),
    #[error("row {row}, column '{column}': '{value}' is not a number")]
    InvalidNumber {
        row: usize,
        column: String,
        value: String,
    },
    #[error("column '{column}' has unsupported type {data_type}")]
    UnsupportedType { column: String, data_type: String },
}

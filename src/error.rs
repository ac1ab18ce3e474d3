use std::path::PathBuf;

use thiserror::Error;

/// The dataset lacks a column the pipeline cannot run without.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("data is missing required column(s): {}", .missing.join(", "))]
pub struct SchemaError {
    pub missing: Vec<String>,
}

/// The data source could not produce a table.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP: {0}")]
    Http(#[from] reqwest::Error),
    #[error("fetch timed out after {0} seconds")]
    Timeout(u64),
    #[error("sheet export returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("workbook {path}: {message}")]
    Workbook { path: PathBuf, message: String },
    #[error("workbook {0} has no worksheets")]
    EmptyWorkbook(PathBuf),
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),
}

/// Why a dataset could not be loaded; the pipeline does not run.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("log table not found at {}", .0.display())]
    NotFound(PathBuf),
    #[error("log table is missing expected columns: {}", .missing.join(", "))]
    SchemaMismatch { missing: Vec<String> },
    #[error("malformed row at line {line}: {reason}")]
    MalformedRow { line: u64, reason: String },
    #[error("I/O failure on log table: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV failure on log table: {0}")]
    Csv(#[from] csv::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

// errors.rs
use thiserror::Error;

/// Errors from the SQLite-backed listing store.
/// Any of these aborts the current transaction; callers see the batch as not applied.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Corrupt row: {0}")]
    Corrupt(String),

    #[error("Database connection poisoned")]
    Poisoned,
}

/// A single raw record could not be normalized. The record is skipped.
#[derive(Debug, Error)]
pub enum NormalizationError {
    #[error("record has no fields")]
    EmptyRecord,

    #[error("invalid value for '{field}': {reason}")]
    InvalidField { field: &'static str, reason: String },
}

/// Aborts one source's run. Everything below this granularity is recovered.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("could not prepare storage for source '{source_name}': {error}")]
    Storage {
        source_name: String,
        error: StorageError,
    },

    #[error("could not build acquisition client: {0}")]
    Client(String),
}

/// The listings workbook could not be built or written.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Xlsx error: {0}")]
    Xlsx(String),

    #[error("could not write {path}: {error}")]
    Io {
        path: String,
        error: std::io::Error,
    },
}

/// Invalid configuration values. Only fatal at start-up.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("environment variable {name} has invalid value '{value}'")]
    InvalidValue { name: &'static str, value: String },

    #[error("{0}")]
    Invalid(String),
}

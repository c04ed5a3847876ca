//! Error types for the study importer

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for import operations
pub type Result<T> = std::result::Result<T, ImportError>;

/// Importer errors
///
/// Only configuration problems abort a run. Per-file failures are recorded
/// as report entries tagged with an [`ErrorKind`] instead.
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("The folder '{}' does not exist", path.display())]
    MissingRoot { path: PathBuf },

    #[error("Invalid study schema: {0}")]
    SchemaCompile(String),

    #[error("Invalid collection name '{0}': expected letters, digits and underscores")]
    InvalidCollection(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Store error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("Config error: {0}")]
    Config(#[from] config_crate::ConfigError),
}

/// Closed set of per-file failure categories written to the reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// File content is not well-formed JSON
    Decode,
    /// Record does not conform to the study schema
    Validation,
    /// The backing store rejected the insert
    Persistence,
    /// Anything else (unreadable file, failed lookup)
    Unexpected,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Decode => "decode",
            ErrorKind::Validation => "validation",
            ErrorKind::Persistence => "persistence",
            ErrorKind::Unexpected => "unexpected",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

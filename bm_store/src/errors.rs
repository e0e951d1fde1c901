use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{} not found", .0.display())]
    Missing(PathBuf),

    #[error("Database query failed: {0}")]
    Query(#[from] rusqlite::Error),

    #[error("I/O error on {}: {source}", path.display())]
    Io { path: PathBuf, source: std::io::Error },

    #[error("Malformed {what}: {reason}")]
    Malformed { what: String, reason: String },
}

impl StoreError {
    /// Classify an I/O error, mapping "not found" to [`StoreError::Missing`]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound { StoreError::Missing(path) } else { StoreError::Io { path, source } }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, StoreError::Missing(_))
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;

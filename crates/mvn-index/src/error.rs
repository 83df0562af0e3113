use std::fs;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Extraction failed for {}: {message}", path.display())]
    Extraction { path: PathBuf, message: String },

    #[error("Lifecycle error: {0}")]
    Lifecycle(String),

    #[error("Index engine error: {0}")]
    Engine(String),

    #[error("Operation cancelled")]
    Cancelled,
}

impl IndexError {
    pub(crate) fn extraction(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::Extraction {
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// Returns true when the error must abort an in-progress scan instead of
    /// being recorded against the offending file.
    pub fn aborts_scan(&self) -> bool {
        matches!(self, Self::Engine(_) | Self::Lifecycle(_) | Self::Cancelled)
    }
}

pub type Result<T> = std::result::Result<T, IndexError>;

/// Canonicalizes a path, returning the original if canonicalization fails.
pub fn canonicalize_existing_path(path: PathBuf) -> PathBuf {
    fs::canonicalize(&path).unwrap_or(path)
}

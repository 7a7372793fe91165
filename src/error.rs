use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum KnapForgeError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV Error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON Parsing Error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("Data Validation Error: {0}")]
    Validation(String),

    #[error("File not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("Corrupted array file {}: {reason}", path.display())]
    Corrupted { path: PathBuf, reason: String },

    #[error("{0} already initialized")]
    AlreadyInitialized(&'static str),

    #[error("{0} not initialized")]
    NotInitialized(&'static str),

    #[error("Transient conflict replacing {} with {}: {source}", dst.display(), src.display())]
    CommitConflict {
        src: PathBuf,
        dst: PathBuf,
        source: std::io::Error,
    },

    #[error(
        "Commit failed after {attempts} attempt(s).\nDst: {}\nSrc: {}\nWith error: {source}",
        dst.display(),
        src.display()
    )]
    CommitFailed {
        src: PathBuf,
        dst: PathBuf,
        attempts: usize,
        source: std::io::Error,
    },
}

impl KnapForgeError {
    pub fn corrupted(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Corrupted {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn not_found(path: impl Into<PathBuf>) -> Self {
        Self::NotFound { path: path.into() }
    }
}

pub type KfResult<T> = Result<T, KnapForgeError>;

//! Error handling utilities shared across the crate.

use std::path::PathBuf;

use thiserror::Error;

/// Convenient result type used throughout the crate.
pub type Result<T, E = WordGroupError> = std::result::Result<T, E>;

/// Domain-specific error describing failures while loading embeddings or grouping tokens.
#[derive(Debug, Error)]
pub enum WordGroupError {
    /// Grouping or corpus configuration failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// Filesystem IO error with optional context path.
    #[error("io error while processing {path:?}: {source}")]
    Io {
        /// Underlying IO error returned by the standard library.
        source: std::io::Error,
        /// Target path associated with the IO failure if available.
        path: Option<PathBuf>,
    },
    /// An embedding line could not be parsed.
    #[error("parse error in {source_name} at line {line}: {message}")]
    Parse {
        /// Human-readable name of the input (usually the file path).
        source_name: String,
        /// 1-based line number of the offending record.
        line: usize,
        /// Description of the malformed field.
        message: String,
    },
    /// A vector did not match the dimension fixed by the first vector of the table.
    #[error("vector dimension mismatch at line {line:?}: expected {expected}, found {found}")]
    DimensionMismatch {
        /// Dimension established by the table.
        expected: usize,
        /// Dimension of the rejected vector.
        found: usize,
        /// Source line of the rejected vector when loading from text.
        line: Option<usize>,
    },
    /// The run was cancelled before the chunk was scheduled.
    #[error("grouping cancelled")]
    Cancelled,
    /// A worker panicked while processing a chunk.
    #[error("worker panicked: {0}")]
    WorkerPanic(String),
    /// Catch-all variant for invariants that should not occur.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<rayon::ThreadPoolBuildError> for WordGroupError {
    fn from(err: rayon::ThreadPoolBuildError) -> Self {
        Self::Internal(format!("unable to build worker pool: {err}"))
    }
}

impl WordGroupError {
    /// Helper constructor that attaches an optional path when wrapping IO errors.
    pub fn io(source: std::io::Error, path: Option<PathBuf>) -> Self {
        Self::Io { source, path }
    }
}

//! Centralized error types for mboxtune.

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the mboxtune library.
#[derive(Error, Debug)]
pub enum TuneError {
    /// I/O error with the associated file path.
    #[error("I/O error reading '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The specified file does not exist.
    #[error("MBOX file not found: {0}")]
    FileNotFound(PathBuf),

    /// A single mail record could not be turned into a message.
    ///
    /// The pipeline logs and counts these; it never aborts on one.
    #[error("Parse error at offset {offset}: {reason}")]
    Parse { offset: u64, reason: String },

    /// Missing owner address or an invalid setting, raised before any mail is read.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A filter pattern failed to compile.
    #[error("Invalid pattern for filter category '{category}': {source}")]
    Pattern {
        category: String,
        source: regex::Error,
    },

    /// The prompt enhancer could not produce prompts for a batch.
    #[error("Prompt enhancement failed: {0}")]
    Enhancement(String),

    /// Writing the dataset failed.
    #[error("Export error: {0}")]
    Export(String),
}

/// Convenience alias for `Result<T, TuneError>`.
pub type Result<T> = std::result::Result<T, TuneError>;

impl TuneError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a `Parse` variant for the record starting at `offset`.
    pub fn parse(offset: u64, reason: impl Into<String>) -> Self {
        Self::Parse {
            offset,
            reason: reason.into(),
        }
    }
}

/// Allow `?` on `std::io::Error` when no path context is available
/// (rare; prefer `TuneError::io`).
impl From<std::io::Error> for TuneError {
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            path: PathBuf::from("<unknown>"),
            source,
        }
    }
}

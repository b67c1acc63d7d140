//! Error types for the staging module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while managing job directories.
#[derive(Debug, Error)]
pub enum StagingError {
    /// A directory could not be created.
    #[error("Failed to create directory {path}: {source}")]
    CreateFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A directory could not be removed.
    #[error("Failed to remove directory {path}: {source}")]
    RemoveFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A directory exists but could not be read.
    #[error("Failed to list directory {path}: {source}")]
    ListFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file name would resolve outside the job's output directory.
    #[error("Invalid file name: {0}")]
    InvalidFileName(String),
}

//! Error types for the upscaler module.

use std::path::PathBuf;
use thiserror::Error;

use crate::staging::StagingError;

/// Errors that can occur while upscaling.
#[derive(Debug, Error)]
pub enum UpscaleError {
    /// Upscaler binary not found.
    #[error("Upscaler not found at path: {path}")]
    ExecutableNotFound { path: PathBuf },

    /// Models directory missing.
    #[error("Upscaler models directory not found: {path}")]
    ModelsNotFound { path: PathBuf },

    /// The upscaler exited unsuccessfully.
    #[error("Upscaling {file} failed with exit code {code:?}")]
    ProcessFailed {
        file: String,
        code: Option<i32>,
        stderr: Option<String>,
    },

    /// The upscaler exceeded its time budget and was killed.
    #[error("Upscaling {file} timed out after {timeout_secs} seconds")]
    Timeout { file: String, timeout_secs: u64 },

    /// The upscaler reported success but produced nothing.
    #[error("Upscaler produced no output at {path}")]
    OutputMissing { path: PathBuf },

    /// Listing the input directory failed.
    #[error(transparent)]
    Staging(#[from] StagingError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl UpscaleError {
    /// Creates a process failure error.
    pub fn process_failed(file: impl Into<String>, code: Option<i32>, stderr: Option<String>) -> Self {
        Self::ProcessFailed {
            file: file.into(),
            code,
            stderr,
        }
    }

    /// Metric label for this error.
    pub(crate) fn result_label(&self) -> &'static str {
        match self {
            Self::Timeout { .. } => "timeout",
            _ => "failed",
        }
    }
}

//! Types for the job orchestrator.

use serde::Serialize;
use thiserror::Error;

use crate::job::JobError;
use crate::queue::QueueError;
use crate::scraper::ScrapeError;
use crate::staging::StagingError;
use crate::upscaler::UpscaleError;

/// Errors returned by orchestrator operations.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Submission carried no image URLs.
    #[error("image list is empty")]
    EmptyImageList,

    /// Job not found.
    #[error("job not found: {0}")]
    NotFound(String),

    /// No page scraper is configured.
    #[error("page scraping is not available")]
    ScraperUnavailable,

    /// Job store error.
    #[error("job store error: {0}")]
    Store(#[from] JobError),

    /// Staging directory error.
    #[error("staging error: {0}")]
    Staging(#[from] StagingError),

    /// Admission queue error.
    #[error("queue error: {0}")]
    Queue(#[from] QueueError),

    /// Page scraping error.
    #[error("scrape error: {0}")]
    Scrape(#[from] ScrapeError),
}

/// Why a pipeline run stopped early.
#[derive(Debug, Error)]
pub(crate) enum RunError {
    /// The record disappeared mid-run.
    #[error("job was deleted")]
    Deleted,

    #[error(transparent)]
    Store(#[from] JobError),

    #[error(transparent)]
    Staging(#[from] StagingError),

    #[error(transparent)]
    Upscale(#[from] UpscaleError),
}

/// Outcome of startup recovery.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RecoveryReport {
    /// RUNNING jobs marked failed.
    pub interrupted: usize,
    /// PENDING jobs put back on the queue.
    pub readmitted: usize,
}

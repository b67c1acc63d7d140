//! Job storage trait and errors.

use thiserror::Error;

use super::types::{Job, JobStatus};

/// Error type for job store operations.
#[derive(Debug, Error)]
pub enum JobError {
    /// Job not found.
    #[error("Job not found: {0}")]
    NotFound(String),

    /// The requested status change is not an edge of the state machine.
    #[error("Cannot move job {job_id} from {from} to {to}")]
    InvalidTransition {
        job_id: String,
        from: JobStatus,
        to: JobStatus,
    },

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),
}

/// Request to create a new job.
#[derive(Debug, Clone)]
pub struct CreateJobRequest {
    /// Source image URLs, in order.
    pub images: Vec<String>,
    /// Display label; the job id is used when absent.
    pub title: Option<String>,
}

/// Trait for job record storage backends.
///
/// Every method is a single atomic operation on one row (or a read).
pub trait JobStore: Send + Sync {
    /// Create a new PENDING job with a freshly generated id.
    fn create(&self, request: CreateJobRequest) -> Result<Job, JobError>;

    /// Get a job by ID.
    fn get(&self, id: &str) -> Result<Option<Job>, JobError>;

    /// List every job. No ordering is guaranteed.
    fn list(&self) -> Result<Vec<Job>, JobError>;

    /// List jobs in the given status, oldest first.
    fn list_by_status(&self, status: JobStatus) -> Result<Vec<Job>, JobError>;

    /// Count jobs in the given status.
    fn count_by_status(&self, status: JobStatus) -> Result<i64, JobError>;

    /// Move a job to a new status, rejecting transitions the state machine forbids.
    fn update_status(
        &self,
        id: &str,
        status: JobStatus,
        failure_reason: Option<&str>,
    ) -> Result<Job, JobError>;

    /// Permanently delete a job record. Returns whether it existed.
    fn delete(&self, id: &str) -> Result<bool, JobError>;
}

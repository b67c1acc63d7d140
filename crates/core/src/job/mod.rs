//! Job records: status state machine and persistence.

mod sqlite_store;
mod store;
mod types;

pub use sqlite_store::SqliteJobStore;
pub use store::{CreateJobRequest, JobError, JobStore};
pub use types::{Job, JobResult, JobStatus, JobUpdate};

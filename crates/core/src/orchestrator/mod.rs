//! Job orchestration: admission, the fetch/upscale pipeline and job reads.
//!
//! The orchestrator is the only writer of job status. A run moves a job from
//! PENDING to RUNNING and then to exactly one of COMPLETED or FAILED; nothing
//! that goes wrong inside a run escapes it.

mod runner;
mod types;

pub use runner::{JobOrchestrator, INTERRUPTED_REASON};
pub use types::{OrchestratorError, RecoveryReport};
